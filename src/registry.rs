use std::time::Duration;

use indexmap::IndexMap;
use log::warn;
use mio::{Events, Interest, Poll, Token};

use crate::buffer::CommandBuffer;
use crate::collaborators::Connection;
use crate::error::{Error, Result};
use crate::types::HostId;

fn io_error(context: &str, error: std::io::Error) -> Error {
    Error::Transport {
        message: format!("{context}: {error}"),
        timeout: false,
    }
}

/// Ordered `HostId -> CommandBuffer` map with a blocking readiness
/// primitive, letting one thread multiplex I/O over many host connections.
/// Iteration order is insertion order, which is the order flush/join walk
/// buffers in.
pub struct PollRegistry<C: Connection> {
    poll: Poll,
    events: Events,
    buffers: IndexMap<HostId, CommandBuffer<C>>,
}

impl<C: Connection> PollRegistry<C> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            poll: Poll::new().map_err(|e| io_error("creating poll", e))?,
            events: Events::with_capacity(64),
            buffers: IndexMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn contains(&self, host_id: HostId) -> bool {
        self.buffers.contains_key(&host_id)
    }

    pub fn get_mut(&mut self, host_id: HostId) -> Option<&mut CommandBuffer<C>> {
        self.buffers.get_mut(&host_id)
    }

    /// Register a freshly created buffer, enrolling its connection's socket
    /// for readiness events keyed by `host_id`.
    pub fn register(&mut self, host_id: HostId, mut buffer: CommandBuffer<C>) -> Result<()> {
        let token = Token(host_id.0 as usize);
        self.poll
            .registry()
            .register(buffer.source(), token, Interest::READABLE)
            .map_err(|e| io_error("registering host", e))?;
        self.buffers.insert(host_id, buffer);
        Ok(())
    }

    /// Remove a buffer from the registry, deregistering its socket first if
    /// the connection is still live.
    pub fn unregister(&mut self, host_id: HostId) -> Option<CommandBuffer<C>> {
        let mut buffer = self.buffers.shift_remove(&host_id)?;
        if !buffer.closed() {
            let _ = self.poll.registry().deregister(buffer.source());
        }
        Some(buffer)
    }

    /// Flush every registered buffer. Returns the host ids whose flush
    /// failed (and are therefore now closed) so the caller can reclaim them.
    pub fn flush_all(&mut self) -> Vec<HostId> {
        let mut closed = Vec::new();
        for (host_id, buffer) in self.buffers.iter_mut() {
            if let Err(error) = buffer.flush() {
                warn!("[{host_id}] removing from registry after flush error: {error}");
                closed.push(*host_id);
            }
        }
        closed
    }

    /// Block until at least one registered socket is readable, or `timeout`
    /// elapses. `None` waits indefinitely; `Some(Duration::ZERO)` polls
    /// without blocking.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<Vec<HostId>> {
        self.events.clear();
        self.poll
            .poll(&mut self.events, timeout)
            .map_err(|e| io_error("polling", e))?;
        Ok(self
            .events
            .iter()
            .map(|event| HostId(event.token().0 as u64))
            .collect())
    }

    /// Remove and return every registered buffer, in insertion order.
    pub fn drain(&mut self) -> Vec<(HostId, CommandBuffer<C>)> {
        self.buffers.drain(..).collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&HostId, &mut CommandBuffer<C>)> {
        self.buffers.iter_mut()
    }
}
