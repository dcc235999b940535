use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;
use log::warn;

use crate::collaborators::{Cluster, Connection, Pool, Router};
use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::fanout_client::{FanoutClient, FanoutTargets};
use crate::local_client::LocalClient;
use crate::map_manager::MapManager;
use crate::mapping_client::MappingClient;
use crate::session::Session;
use crate::types::{Command, HostId, Value};

/// Entry point: executes one command at a time against whichever host the
/// router picks, with a single one-shot retry on a transport error, and
/// hands out scoped sessions ([`map`], [`fanout`]) for pipelined batches.
///
/// Pub/sub, manual pipelines and distributed locks are explicitly out of
/// scope for every routing client in this crate; see [`RoutingClient::subscribe`],
/// [`RoutingClient::pipeline`] and [`RoutingClient::lock`].
///
/// [`map`]: RoutingClient::map
/// [`fanout`]: RoutingClient::fanout
pub struct RoutingClient<'c, CL: Cluster> {
    cluster: &'c CL,
    router: &'c dyn Router,
    config: RouterConfig,
}

impl<'c, CL: Cluster> RoutingClient<'c, CL> {
    pub fn new(cluster: &'c CL, router: &'c dyn Router, config: RouterConfig) -> Self {
        Self {
            cluster,
            router,
            config,
        }
    }

    /// Execute one command and block for its reply, retrying once on a
    /// transport error unless it was a timeout and the connection has
    /// `retry_on_timeout()` disabled.
    pub fn execute(&self, name: &'static str, args: Vec<Bytes>) -> Result<Value> {
        let host_id = self.router.host_for(name, &args)?;
        let pool = self.cluster.pool_for_host(host_id)?;
        let mut connection = pool.acquire(name)?;
        let command = Command {
            name,
            args: args.clone(),
        };

        let mut result = send_once(&mut connection, &command);
        if let Err(Error::Transport { timeout, .. }) = &result {
            let retry_blocked = *timeout && !connection.retry_on_timeout();
            let _ = connection.disconnect();
            if retry_blocked {
                warn!("[{host_id}] not retrying timed-out {name}: retry_on_timeout disabled");
            } else {
                result = connection
                    .connect()
                    .and_then(|()| send_once(&mut connection, &command));
            }
        }

        pool.release(connection);
        result
    }

    pub fn get_mapping_client(
        &self,
        max_concurrency: usize,
        auto_batch: Option<bool>,
    ) -> Result<MappingClient<'c, CL>> {
        let session = self.new_session(max_concurrency, auto_batch)?;
        Ok(MappingClient {
            session,
            router: self.router,
        })
    }

    pub fn get_fanout_client(
        &self,
        targets: FanoutTargets,
        max_concurrency: usize,
        auto_batch: Option<bool>,
    ) -> Result<FanoutClient<'c, CL>> {
        let session = self.new_session(max_concurrency, auto_batch)?;
        Ok(FanoutClient {
            session,
            targets: Some(targets),
            retargeted: false,
        })
    }

    pub fn get_local_client(&self, host_id: HostId) -> Result<LocalClient<'c, CL>> {
        let session = self.new_session(1, Some(self.config.auto_batch))?;
        Ok(LocalClient { session, host_id })
    }

    /// Open a scoped mapping session: queued commands across many hosts are
    /// flushed and joined together when `body` returns `Ok`, or cancelled
    /// if it returns `Err` (or panics).
    pub fn map(
        &self,
        timeout: Option<Duration>,
        max_concurrency: usize,
        auto_batch: Option<bool>,
    ) -> Result<MapManager<MappingClient<'c, CL>>> {
        let client = self.get_mapping_client(max_concurrency, auto_batch)?;
        Ok(MapManager::new(client, timeout))
    }

    /// Open a scoped fanout session targeting `targets`.
    pub fn fanout(
        &self,
        targets: FanoutTargets,
        timeout: Option<Duration>,
        max_concurrency: usize,
        auto_batch: Option<bool>,
    ) -> Result<MapManager<FanoutClient<'c, CL>>> {
        let client = self.get_fanout_client(targets, max_concurrency, auto_batch)?;
        Ok(MapManager::new(client, timeout))
    }

    fn new_session(
        &self,
        max_concurrency: usize,
        auto_batch: Option<bool>,
    ) -> Result<Rc<RefCell<Session<'c, CL>>>> {
        let session = Session::new(
            self.cluster,
            max_concurrency,
            auto_batch.unwrap_or(self.config.auto_batch),
            self.config.coalesce_table.clone(),
            self.config.back_pressure_timeout,
        )?;
        Ok(Rc::new(RefCell::new(session)))
    }

    pub fn subscribe(&self, _channel: &str) -> Result<()> {
        Err(Error::Unsupported("pub/sub"))
    }

    pub fn pipeline(&self) -> Result<()> {
        Err(Error::Unsupported("manual pipelines"))
    }

    pub fn lock(&self, _name: &str) -> Result<()> {
        Err(Error::Unsupported("distributed locks"))
    }
}

fn send_once<C: Connection>(connection: &mut C, command: &Command) -> Result<Value> {
    let packed = connection.pack(std::slice::from_ref(command))?;
    connection.write(&packed)?;
    connection.parse_response(command.name)
}
