//! In-memory collaborator doubles: a Unix-socket-pair connection speaking a
//! tiny line protocol of our own, a scripted fake server on the other end,
//! and a modulo router/cluster/pool over a handful of fake hosts.
//!
//! None of this is part of the crate's public wire codec; it only needs to
//! satisfy the `Connection`/`Pool`/`Cluster`/`Router` traits well enough to
//! exercise flush/drain/poll end to end over a real socket.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream as StdUnixStream;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use indexmap::IndexMap;
use mio::net::UnixStream as MioUnixStream;

use shardis::{Cluster, Command, Connection, Error, HostId, Pool, Result, Router, Value};

const ARG_SEP: u8 = 0x01;

pub struct FakeConnection {
    stream: MioUnixStream,
    leftover: Vec<u8>,
    retry_on_timeout: bool,
    fail_writes: bool,
}

impl FakeConnection {
    fn read_line(&mut self) -> std::io::Result<String> {
        loop {
            if let Some(pos) = self.leftover.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.leftover.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
            }
            let mut buf = [0u8; 4096];
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "peer closed",
                    ))
                }
                Ok(n) => self.leftover.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn parse_value(&mut self, line: &str) -> Result<Value> {
        let mut iter = line.chars();
        let tag = iter.next().ok_or_else(|| protocol_error("empty reply"))?;
        let rest = &line[tag.len_utf8()..];
        match tag {
            '+' => Ok(Value::Ok),
            ':' => rest
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| protocol_error("bad integer")),
            '$' => {
                if rest == "NIL" {
                    Ok(Value::Nil)
                } else {
                    Ok(Value::Bulk(Bytes::from(rest.to_owned())))
                }
            }
            '*' => {
                let count: usize = rest.parse().map_err(|_| protocol_error("bad array len"))?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let line = self.read_line().map_err(|e| transport_error(e.to_string()))?;
                    items.push(self.parse_value(&line)?);
                }
                Ok(Value::Array(items))
            }
            '-' => Err(Error::Protocol(rest.to_owned())),
            _ => Err(protocol_error("unknown reply tag")),
        }
    }
}

fn protocol_error(message: &str) -> Error {
    Error::Protocol(message.to_owned())
}

fn transport_error(message: String) -> Error {
    Error::Transport {
        message,
        timeout: false,
    }
}

impl Connection for FakeConnection {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn pack(&self, commands: &[Command]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for command in commands {
            out.extend_from_slice(command.name.as_bytes());
            for arg in &command.args {
                out.push(ARG_SEP);
                out.extend_from_slice(&arg[..]);
            }
            out.push(b'\n');
        }
        Ok(out)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(transport_error("simulated write failure".into()));
        }
        let mut remaining = bytes;
        while !remaining.is_empty() {
            match self.stream.write(remaining) {
                Ok(0) => return Err(transport_error("peer closed".into())),
                Ok(n) => remaining = &remaining[n..],
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => return Err(transport_error(e.to_string())),
            }
        }
        Ok(())
    }

    fn parse_response(&mut self, _command_name: &'static str) -> Result<Value> {
        let line = self.read_line().map_err(|e| transport_error(e.to_string()))?;
        self.parse_value(&line)
    }

    fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    fn retry_on_timeout(&self) -> bool {
        self.retry_on_timeout
    }

    fn source(&mut self) -> &mut dyn mio::event::Source {
        &mut self.stream
    }
}

/// Spawns a blocking thread that replies to exactly `script.len()` request
/// lines with the corresponding scripted reply, one for one. Each scripted
/// reply is the raw protocol line, e.g. `"+OK"`, `":3"`, `"*2\n$a\n$b"` for a
/// nested array (embedded newlines are split automatically).
pub fn spawn_fake_server(peer: StdUnixStream, script: Vec<&'static str>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(peer.try_clone().expect("clone for reading"));
        let mut writer = peer;
        for reply in script {
            let mut request = String::new();
            if reader.read_line(&mut request).unwrap_or(0) == 0 {
                break;
            }
            for line in reply.split('\n') {
                writer
                    .write_all(format!("{line}\n").as_bytes())
                    .expect("write reply");
            }
        }
    })
}

/// Builds one connected `(FakeConnection, server join handle)` pair.
pub fn host_connection(
    script: Vec<&'static str>,
    retry_on_timeout: bool,
) -> (FakeConnection, JoinHandle<()>) {
    let (client, server) = StdUnixStream::pair().expect("socketpair");
    client.set_nonblocking(true).expect("nonblocking");
    let mio_stream = MioUnixStream::from_std(client);
    let handle = spawn_fake_server(server, script);
    (
        FakeConnection {
            stream: mio_stream,
            leftover: Vec::new(),
            retry_on_timeout,
            fail_writes: false,
        },
        handle,
    )
}

pub struct FakePool {
    connections: RefCell<Vec<FakeConnection>>,
}

impl FakePool {
    pub fn new(connections: Vec<FakeConnection>) -> Self {
        Self {
            connections: RefCell::new(connections),
        }
    }
}

impl Pool for FakePool {
    type Connection = FakeConnection;

    fn acquire(&self, _command_name: &'static str) -> Result<FakeConnection> {
        self.connections
            .borrow_mut()
            .pop()
            .ok_or_else(|| transport_error("fake pool exhausted".into()))
    }

    fn release(&self, connection: FakeConnection) {
        self.connections.borrow_mut().push(connection);
    }
}

pub struct FakeCluster {
    pools: IndexMap<HostId, FakePool>,
}

impl FakeCluster {
    pub fn new(pools: IndexMap<HostId, FakePool>) -> Self {
        Self { pools }
    }
}

impl Cluster for FakeCluster {
    type Pool = FakePool;

    fn pool_for_host(&self, host_id: HostId) -> Result<&FakePool> {
        self.pools
            .get(&host_id)
            .ok_or(Error::NoRoute("unknown host"))
    }

    fn hosts(&self) -> Vec<HostId> {
        self.pools.keys().copied().collect()
    }
}

/// Routes by hashing the first argument (the key) modulo the host count.
pub struct ModRouter {
    pub num_hosts: u64,
}

impl Router for ModRouter {
    fn host_for(&self, _command_name: &'static str, args: &[Bytes]) -> Result<HostId> {
        let key = args.first().ok_or(Error::NoRoute("missing key argument"))?;
        let hash = key.iter().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u64));
        Ok(HostId(hash % self.num_hosts))
    }
}
