use crate::collaborators::{Cluster, ClusterConnection, Pool};
use crate::error::Result;
use crate::types::HostId;

/// Adapter in front of a [`Cluster`] that resolves a host id to its pool on
/// every call, so acquiring and releasing a connection never needs to carry
/// a handle back to "the pool it came from" — the host id already is that
/// handle.
pub struct RoutingPool<'c, CL: Cluster> {
    cluster: &'c CL,
}

impl<'c, CL: Cluster> RoutingPool<'c, CL> {
    pub fn new(cluster: &'c CL) -> Self {
        Self { cluster }
    }

    pub fn acquire(
        &self,
        host_id: HostId,
        command_name: &'static str,
    ) -> Result<ClusterConnection<CL>> {
        self.cluster.pool_for_host(host_id)?.acquire(command_name)
    }

    pub fn release(&self, host_id: HostId, connection: ClusterConnection<CL>) -> Result<()> {
        self.cluster.pool_for_host(host_id)?.release(connection);
        Ok(())
    }
}
