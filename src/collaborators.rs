use bytes::Bytes;

use crate::error::Result;
use crate::types::{Command, HostId, Value};

/// Decides which host owns a command. Implementations typically hash the
/// first key-bearing argument against a slot map; the actual sharding
/// scheme is a collaborator concern this crate does not implement.
pub trait Router {
    fn host_for(&self, command_name: &'static str, args: &[Bytes]) -> Result<HostId>;
}

/// A byte-level connection to a single backend host.
///
/// Implementations own the wire codec (RESP or otherwise): `pack` turns a
/// batch of commands into bytes, `parse_response` turns the next reply off
/// the wire into a [`Value`]. `source` exposes the underlying socket for
/// registration with the poll registry's readiness primitive.
pub trait Connection {
    fn connect(&mut self) -> Result<()>;
    fn pack(&self, commands: &[Command]) -> Result<Vec<u8>>;
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
    fn parse_response(&mut self, command_name: &'static str) -> Result<Value>;
    fn disconnect(&mut self) -> Result<()>;
    fn retry_on_timeout(&self) -> bool;
    fn source(&mut self) -> &mut dyn mio::event::Source;
}

/// A pool of connections to a single host.
pub trait Pool {
    type Connection: Connection;

    fn acquire(&self, command_name: &'static str) -> Result<Self::Connection>;
    fn release(&self, connection: Self::Connection);
}

/// The cluster topology: which hosts exist and which pool serves each one.
pub trait Cluster {
    type Pool: Pool;

    fn pool_for_host(&self, host_id: HostId) -> Result<&Self::Pool>;
    fn hosts(&self) -> Vec<HostId>;

    /// Disconnects every pool's idle connections. Not called by this crate
    /// directly; exposed for callers tearing the whole cluster handle down.
    fn disconnect_all(&self) -> Result<()> {
        Ok(())
    }
}

/// Connection type reachable for a given [`Cluster`] implementation.
pub type ClusterConnection<C> = <<C as Cluster>::Pool as Pool>::Connection;
