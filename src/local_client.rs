use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;

use crate::collaborators::Cluster;
use crate::error::Result;
use crate::map_manager::Joinable;
use crate::promise::Promise;
use crate::session::Session;
use crate::types::{HostId, Value};

/// A [`MappingClient`](crate::MappingClient) pinned to one host, with no
/// router in the loop. Convenient when the caller already knows which host
/// a batch of commands belongs to.
pub struct LocalClient<'c, CL: Cluster> {
    pub(crate) session: Rc<RefCell<Session<'c, CL>>>,
    pub(crate) host_id: HostId,
}

impl<'c, CL: Cluster> LocalClient<'c, CL> {
    pub fn execute(&mut self, name: &'static str, args: Vec<Bytes>) -> Result<Promise<Value>> {
        let mut session = self.session.borrow_mut();
        let buffer = session.get_or_create_buffer(self.host_id, name)?;
        buffer.enqueue(name, args)
    }

    pub fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.session.borrow_mut().join(timeout)
    }

    pub fn cancel(&mut self) {
        self.session.borrow_mut().cancel()
    }
}

impl<'c, CL: Cluster> Joinable for LocalClient<'c, CL> {
    fn join(&mut self, timeout: Option<Duration>) -> Result<()> {
        LocalClient::join(self, timeout)
    }

    fn cancel(&mut self) {
        LocalClient::cancel(self)
    }
}
