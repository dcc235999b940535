//! Client-side command router and pipelining layer in front of a sharded,
//! Redis-compatible cluster.
//!
//! A [`RoutingClient`] sends one command at a time to whichever host its
//! [`Router`] picks, with a single retry on a transport error. Its scoped
//! sessions, [`RoutingClient::map`] and [`RoutingClient::fanout`], queue
//! many commands across many hosts and flush/drain them together over a
//! [`PollRegistry`], optionally coalescing runs of single-key commands
//! (`GET` into `MGET`, `SET` into `MSET`) into one wire round trip.
//!
//! The cluster topology, the connection pool, and the wire codec itself are
//! collaborator concerns represented by the [`Cluster`], [`Pool`] and
//! [`Connection`] traits; this crate only implements the routing and
//! pipelining layer on top of them.

mod buffer;
mod coalesce;
mod collaborators;
mod config;
mod error;
mod fanout_client;
mod local_client;
mod map_manager;
mod mapping_client;
mod promise;
mod registry;
mod routing_client;
mod routing_pool;
mod session;
mod types;

pub use coalesce::CoalesceTable;
pub use collaborators::{ClusterConnection, Cluster, Connection, Pool, Router};
pub use config::RouterConfig;
pub use error::{Error, Result};
pub use fanout_client::{FanoutClient, FanoutTargets};
pub use local_client::LocalClient;
pub use map_manager::{Joinable, MapManager};
pub use mapping_client::MappingClient;
pub use promise::Promise;
pub use registry::PollRegistry;
pub use routing_client::RoutingClient;
pub use routing_pool::RoutingPool;
pub use types::{cmd, Command, HostId, Value};
