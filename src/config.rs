use std::time::Duration;

use crate::coalesce::CoalesceTable;

/// Defaults shared by every [`crate::RoutingClient::map`] /
/// [`crate::RoutingClient::fanout`] call that doesn't override them
/// explicitly.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub max_concurrency: usize,
    pub auto_batch: bool,
    pub back_pressure_timeout: Duration,
    pub coalesce_table: CoalesceTable,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 64,
            auto_batch: true,
            back_pressure_timeout: Duration::from_secs(1),
            coalesce_table: CoalesceTable::default(),
        }
    }
}
