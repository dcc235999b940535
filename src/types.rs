use bytes::Bytes;
use std::fmt;

/// Opaque identifier of a backend server in the cluster.
///
/// Totally comparable and hashable, as required by the poll registry's
/// ordered map. Construction is left to the router/cluster implementation;
/// this crate never invents host ids of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(pub u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

impl From<u64> for HostId {
    fn from(value: u64) -> Self {
        HostId(value)
    }
}

/// A single command: an upper-cased name plus its ordered, opaque arguments.
///
/// The wire codec that turns a `Command` into bytes on a socket is a
/// collaborator concern (see [`crate::Connection::pack`]); this type only
/// carries the logical request.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: &'static str,
    pub args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<Bytes>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Build a [`Command`] with a fluent `.arg()` chain.
pub fn cmd(name: &'static str) -> Command {
    Command::new(name)
}

/// A response value as parsed by the collaborator [`crate::Connection`].
///
/// This is deliberately small: the real wire format (RESP or otherwise) is
/// out of scope, so this enum only needs to be rich enough to carry the
/// shapes the coalescer and the routing clients reason about (scalars and
/// the list shape that `MGET`-style batching scatters element-wise).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Ok,
    Int(i64),
    Bulk(Bytes),
    Array(Vec<Value>),
}
