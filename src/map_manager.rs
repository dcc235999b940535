use std::time::{Duration, Instant};

use log::debug;

use crate::error::Result;

/// Common surface [`MapManager`] needs from the client it wraps.
pub trait Joinable {
    fn join(&mut self, timeout: Option<Duration>) -> Result<()>;
    fn cancel(&mut self);
}

/// Rust stand-in for the scoped session a context manager gives the
/// original API: instead of `with cluster.map() as client: ...`, callers
/// pass a closure to [`run`](MapManager::run). On success the wrapped
/// client is joined with whatever timeout budget is left; on failure (the
/// closure returning `Err`, or a panic unwinding through it) it is
/// cancelled instead.
pub struct MapManager<T: Joinable> {
    client: Option<T>,
    timeout: Option<Duration>,
    entered: Instant,
    settled: bool,
}

impl<T: Joinable> MapManager<T> {
    pub(crate) fn new(client: T, timeout: Option<Duration>) -> Self {
        Self {
            client: Some(client),
            timeout,
            entered: Instant::now(),
            settled: false,
        }
    }

    /// Run `body` against the wrapped client, then join or cancel depending
    /// on whether it succeeded. Consumes the manager: a [`MapManager`] is
    /// good for exactly one scoped session.
    pub fn run<F, R>(mut self, body: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let outcome = body(self.client.as_mut().expect("MapManager.client set until run()"));
        self.settled = true;
        let mut client = self.client.take().expect("MapManager.client set until run()");
        match outcome {
            Ok(value) => {
                let remaining = self.timeout.map(|configured| {
                    configured
                        .saturating_sub(self.entered.elapsed())
                        .max(Duration::from_secs(1))
                });
                client.join(remaining)?;
                Ok(value)
            }
            Err(error) => {
                client.cancel();
                Err(error)
            }
        }
    }
}

impl<T: Joinable> Drop for MapManager<T> {
    fn drop(&mut self) {
        if !self.settled {
            if let Some(mut client) = self.client.take() {
                debug!("MapManager dropped without settling; cancelling outstanding requests");
                client.cancel();
            }
        }
    }
}
