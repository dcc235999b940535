use std::time::{Duration, Instant};

use log::debug;

use crate::buffer::CommandBuffer;
use crate::coalesce::CoalesceTable;
use crate::collaborators::{Cluster, ClusterConnection};
use crate::error::Result;
use crate::registry::PollRegistry;
use crate::routing_pool::RoutingPool;
use crate::types::HostId;

/// Back-pressure and readiness bookkeeping shared by [`crate::MappingClient`],
/// [`crate::FanoutClient`] and [`crate::LocalClient`]: none of those types
/// differ in how they acquire a buffer, wait for concurrency slack, or join
/// and cancel, only in how they pick which host(s) a command targets.
pub(crate) struct Session<'c, CL: Cluster> {
    cluster: &'c CL,
    pool: RoutingPool<'c, CL>,
    max_concurrency: usize,
    auto_batch: bool,
    coalesce_table: CoalesceTable,
    back_pressure_timeout: Duration,
    registry: PollRegistry<ClusterConnection<CL>>,
}

impl<'c, CL: Cluster> Session<'c, CL> {
    pub fn new(
        cluster: &'c CL,
        max_concurrency: usize,
        auto_batch: bool,
        coalesce_table: CoalesceTable,
        back_pressure_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            cluster,
            pool: RoutingPool::new(cluster),
            max_concurrency: max_concurrency.max(1),
            auto_batch,
            coalesce_table,
            back_pressure_timeout,
            registry: PollRegistry::new()?,
        })
    }

    pub fn get_or_create_buffer(
        &mut self,
        host_id: HostId,
        command_name: &'static str,
    ) -> Result<&mut CommandBuffer<ClusterConnection<CL>>> {
        if !self.registry.contains(host_id) {
            while self.registry.len() >= self.max_concurrency {
                self.relieve_back_pressure()?;
            }
            let connection = self.pool.acquire(host_id, command_name)?;
            let buffer = CommandBuffer::new(
                host_id,
                connection,
                self.auto_batch,
                self.coalesce_table.clone(),
            )?;
            self.registry.register(host_id, buffer)?;
        }
        Ok(self.registry.get_mut(host_id).expect("just registered"))
    }

    fn relieve_back_pressure(&mut self) -> Result<()> {
        let closed = self.registry.flush_all();
        for host_id in closed {
            self.drain_and_release(host_id);
        }
        let ready = self.registry.poll(Some(self.back_pressure_timeout))?;
        for host_id in ready {
            self.drain_and_release(host_id);
        }
        Ok(())
    }

    fn drain_and_release(&mut self, host_id: HostId) {
        if let Some(mut buffer) = self.registry.unregister(host_id) {
            let _ = buffer.drain();
            if let Some(connection) = buffer.take_connection() {
                let _ = self.pool.release(host_id, connection);
            }
        }
    }

    pub fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        let closed = self.registry.flush_all();
        for host_id in closed {
            self.drain_and_release(host_id);
        }

        let mut remaining = timeout;
        while !self.registry.is_empty() {
            if let Some(budget) = remaining {
                if budget.is_zero() {
                    debug!("join timed out with {} host(s) outstanding", self.registry.len());
                    break;
                }
            }
            let started = Instant::now();
            let ready = self.registry.poll(remaining)?;
            if let Some(budget) = remaining {
                remaining = Some(budget.saturating_sub(started.elapsed()));
            }
            if ready.is_empty() && remaining == Some(Duration::ZERO) {
                break;
            }
            for host_id in ready {
                self.drain_and_release(host_id);
            }
        }
        Ok(())
    }

    pub fn cancel(&mut self) {
        for (host_id, mut buffer) in self.registry.drain() {
            if let Some(connection) = buffer.take_connection() {
                let _ = self.pool.release(host_id, connection);
            }
        }
    }

    pub fn cluster_hosts(&self) -> Vec<HostId> {
        self.cluster.hosts()
    }

    pub fn outstanding(&self) -> usize {
        self.registry.len()
    }
}
