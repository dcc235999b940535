use std::collections::VecDeque;

use bytes::Bytes;
use log::{error, trace};

use crate::coalesce::{coalesce, CoalesceTable, EffectiveCommand, PendingCommand};
use crate::collaborators::Connection;
use crate::error::{Error, Result};
use crate::promise::Promise;
use crate::types::{Command, HostId, Value};

/// Per-host command queue: enqueue, flush (pack + write), drain (parse +
/// resolve). Moves through `absent -> registered -> flushed -> drained ->
/// released`; once the underlying connection is dropped (on a write or read
/// failure) the buffer is closed and further enqueues fail.
pub struct CommandBuffer<C: Connection> {
    host_id: HostId,
    connection: Option<C>,
    auto_batch: bool,
    coalesce_table: CoalesceTable,
    commands: VecDeque<PendingCommand>,
    pending_responses: VecDeque<(&'static str, Promise<Value>)>,
}

impl<C: Connection> CommandBuffer<C> {
    pub fn new(
        host_id: HostId,
        mut connection: C,
        auto_batch: bool,
        coalesce_table: CoalesceTable,
    ) -> Result<Self> {
        connection.connect()?;
        Ok(Self {
            host_id,
            connection: Some(connection),
            auto_batch,
            coalesce_table,
            commands: VecDeque::new(),
            pending_responses: VecDeque::new(),
        })
    }

    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    pub fn closed(&self) -> bool {
        self.connection.is_none()
    }

    pub fn source(&mut self) -> &mut dyn mio::event::Source {
        self.connection
            .as_mut()
            .expect("source() called on a closed buffer")
            .source()
    }

    /// Queue a command, returning the promise a caller resolves against.
    /// Does not touch the wire; call [`CommandBuffer::flush`] to send.
    pub fn enqueue(&mut self, name: &'static str, args: Vec<Bytes>) -> Result<Promise<Value>> {
        if self.closed() {
            return Err(Error::BufferClosed);
        }
        let promise = Promise::new();
        self.commands.push_back(PendingCommand {
            name,
            args,
            promise: promise.clone(),
        });
        Ok(promise)
    }

    /// Pack and write every queued command. On write failure every promise
    /// that was accepted into this flush (including the members of any
    /// coalesced batch) is rejected with a transport error and the buffer
    /// is closed.
    pub fn flush(&mut self) -> Result<()> {
        if self.commands.is_empty() {
            return Ok(());
        }
        let queued: Vec<PendingCommand> = self.commands.drain(..).collect();
        let effective: Vec<EffectiveCommand> = if self.auto_batch {
            coalesce(queued, &self.coalesce_table)
        } else {
            queued
                .into_iter()
                .map(|c| EffectiveCommand {
                    name: c.name,
                    args: c.args,
                    promise: c.promise,
                })
                .collect()
        };

        let connection = self.connection.as_mut().ok_or(Error::BufferClosed)?;
        let wire_commands: Vec<Command> = effective
            .iter()
            .map(|c| Command {
                name: c.name,
                args: c.args.clone(),
            })
            .collect();

        let packed = match connection.pack(&wire_commands) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.reject_and_close(effective, error.clone());
                return Err(error);
            }
        };

        match connection.write(&packed) {
            Ok(()) => {
                trace!(
                    "[{}] flushed {} command(s)",
                    self.host_id,
                    effective.len()
                );
                for command in effective {
                    self.pending_responses.push_back((command.name, command.promise));
                }
                Ok(())
            }
            Err(error) => {
                self.reject_and_close(effective, error.clone());
                Err(error)
            }
        }
    }

    fn reject_and_close(&mut self, effective: Vec<EffectiveCommand>, error: Error) {
        error!("[{}] flush failed: {}", self.host_id, error);
        for command in effective {
            let _ = command.promise.reject(error.clone());
        }
        self.close();
    }

    /// Read and resolve one reply per pending response, in FIFO order. A
    /// read failure rejects the current entry and every subsequent pending
    /// entry, then closes the buffer.
    pub fn drain(&mut self) -> Result<()> {
        if self.closed() {
            return Ok(());
        }
        while let Some((name, promise)) = self.pending_responses.pop_front() {
            let connection = self.connection.as_mut().expect("checked closed() above");
            match connection.parse_response(name) {
                Ok(value) => {
                    let _ = promise.resolve(value);
                }
                Err(error) => {
                    error!("[{}] drain failed: {}", self.host_id, error);
                    let _ = promise.reject(error.clone());
                    while let Some((_, pending)) = self.pending_responses.pop_front() {
                        let _ = pending.reject(error.clone());
                    }
                    self.close();
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    pub fn has_pending_responses(&self) -> bool {
        !self.pending_responses.is_empty()
    }

    fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.disconnect();
        }
    }

    /// Detach the underlying connection so the caller can return it to its
    /// pool. Returns `None` if the buffer is already closed.
    pub fn take_connection(&mut self) -> Option<C> {
        self.connection.take()
    }
}
