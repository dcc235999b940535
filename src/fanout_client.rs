use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;
use indexmap::IndexMap;

use crate::collaborators::Cluster;
use crate::error::{Error, Result};
use crate::map_manager::Joinable;
use crate::promise::Promise;
use crate::session::Session;
use crate::types::{HostId, Value};

/// Which hosts a [`FanoutClient`] sends to.
#[derive(Debug, Clone)]
pub enum FanoutTargets {
    Hosts(Vec<HostId>),
    All,
}

/// Sends every command to a fixed set of hosts at once and resolves one
/// combined promise keyed by host id.
///
/// [`retarget`](FanoutClient::retarget) produces a shallow alias sharing
/// the same underlying session (same registry, same buffers) but pointed
/// at a different target set; an alias cannot itself be retargeted.
///
/// [`retarget`]: FanoutClient::retarget
pub struct FanoutClient<'c, CL: Cluster> {
    pub(crate) session: Rc<RefCell<Session<'c, CL>>>,
    pub(crate) targets: Option<FanoutTargets>,
    pub(crate) retargeted: bool,
}

impl<'c, CL: Cluster> FanoutClient<'c, CL> {
    pub fn retarget(&self, targets: FanoutTargets) -> Result<FanoutClient<'c, CL>> {
        if self.retargeted {
            return Err(Error::AlreadyRetargeted);
        }
        Ok(FanoutClient {
            session: Rc::clone(&self.session),
            targets: Some(targets),
            retargeted: true,
        })
    }

    fn resolve_targets(&self) -> Result<Vec<HostId>> {
        match &self.targets {
            None => Err(Error::Untargeted),
            Some(FanoutTargets::Hosts(hosts)) => Ok(hosts.clone()),
            Some(FanoutTargets::All) => Ok(self.session.borrow().cluster_hosts()),
        }
    }

    pub fn execute(
        &mut self,
        name: &'static str,
        args: Vec<Bytes>,
    ) -> Result<Promise<IndexMap<HostId, Value>>> {
        let hosts = self.resolve_targets()?;
        let mut promises = IndexMap::new();
        {
            let mut session = self.session.borrow_mut();
            for host_id in hosts {
                let buffer = session.get_or_create_buffer(host_id, name)?;
                let promise = buffer.enqueue(name, args.clone())?;
                promises.insert(host_id, promise);
            }
        }
        Ok(Promise::all(promises))
    }

    pub fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.session.borrow_mut().join(timeout)
    }

    pub fn cancel(&mut self) {
        self.session.borrow_mut().cancel()
    }
}

impl<'c, CL: Cluster> Joinable for FanoutClient<'c, CL> {
    fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        FanoutClient::join(self, timeout)
    }

    fn cancel(&mut self) {
        FanoutClient::cancel(self)
    }
}
