use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;

use crate::collaborators::{Cluster, Router};
use crate::error::Result;
use crate::map_manager::Joinable;
use crate::promise::Promise;
use crate::session::Session;
use crate::types::Value;

/// Routes each command to its host via a [`Router`] and queues it on that
/// host's buffer, deferring the actual write until enough commands have
/// piled up to hit the concurrency cap or the caller calls [`join`].
///
/// Not `Send`: it is reached only through [`crate::MapManager::run`], which
/// ties its lifetime to one call stack.
///
/// [`join`]: MappingClient::join
pub struct MappingClient<'c, CL: Cluster> {
    pub(crate) session: Rc<RefCell<Session<'c, CL>>>,
    pub(crate) router: &'c dyn Router,
}

impl<'c, CL: Cluster> MappingClient<'c, CL> {
    pub fn execute(&mut self, name: &'static str, args: Vec<Bytes>) -> Result<Promise<Value>> {
        let host_id = self.router.host_for(name, &args)?;
        let mut session = self.session.borrow_mut();
        let buffer = session.get_or_create_buffer(host_id, name)?;
        buffer.enqueue(name, args)
    }

    pub fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.session.borrow_mut().join(timeout)
    }

    pub fn cancel(&mut self) {
        self.session.borrow_mut().cancel()
    }
}

impl<'c, CL: Cluster> Joinable for MappingClient<'c, CL> {
    fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        MappingClient::join(self, timeout)
    }

    fn cancel(&mut self) {
        MappingClient::cancel(self)
    }
}
