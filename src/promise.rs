use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::types::HostId;

type SuccessCallback<T> = Box<dyn FnOnce(&T)>;
type FailureCallback = Box<dyn FnOnce(&Error)>;

enum State<T> {
    Pending {
        on_success: Vec<SuccessCallback<T>>,
        on_failure: Vec<FailureCallback>,
    },
    Resolved(T),
    Rejected(Error),
}

/// A single-assignment future with callback-based registration.
///
/// Deliberately not `Send`: sessions that own promises are single-owner by
/// design (see [`crate::MappingClient`]), so there is never a reason to hand
/// one across a thread boundary, and `Rc<RefCell<_>>` makes that a compile
/// error instead of a runtime assumption.
pub struct Promise<T> {
    inner: Rc<RefCell<State<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(State::Pending {
                on_success: Vec::new(),
                on_failure: Vec::new(),
            })),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.inner.borrow(), State::Pending { .. })
    }

    /// Resolve with a success value. Fails if the promise was already settled.
    pub fn resolve(&self, value: T) -> Result<()> {
        let on_success = {
            let mut state = self.inner.borrow_mut();
            if !matches!(&*state, State::Pending { .. }) {
                return Err(Error::AlreadySettled);
            }
            let previous = std::mem::replace(&mut *state, State::Resolved(value));
            match previous {
                State::Pending { on_success, .. } => on_success,
                _ => unreachable!(),
            }
        };
        let state = self.inner.borrow();
        if let State::Resolved(value) = &*state {
            for callback in on_success {
                callback(value);
            }
        }
        Ok(())
    }

    /// Reject with a failure. Fails if the promise was already settled.
    pub fn reject(&self, error: Error) -> Result<()> {
        let on_failure = {
            let mut state = self.inner.borrow_mut();
            if !matches!(&*state, State::Pending { .. }) {
                return Err(Error::AlreadySettled);
            }
            let previous = std::mem::replace(&mut *state, State::Rejected(error));
            match previous {
                State::Pending { on_failure, .. } => on_failure,
                _ => unreachable!(),
            }
        };
        let state = self.inner.borrow();
        if let State::Rejected(error) = &*state {
            for callback in on_failure {
                callback(error);
            }
        }
        Ok(())
    }

    /// Register a success callback. Invoked immediately if already resolved.
    pub fn on_success(&self, callback: impl FnOnce(&T) + 'static) {
        let mut state = self.inner.borrow_mut();
        match &mut *state {
            State::Pending { on_success, .. } => on_success.push(Box::new(callback)),
            State::Resolved(value) => callback(value),
            State::Rejected(_) => {}
        }
    }

    /// Register a failure callback. Invoked immediately if already rejected.
    pub fn on_failure(&self, callback: impl FnOnce(&Error) + 'static) {
        let mut state = self.inner.borrow_mut();
        match &mut *state {
            State::Pending { on_failure, .. } => on_failure.push(Box::new(callback)),
            State::Rejected(error) => callback(error),
            State::Resolved(_) => {}
        }
    }
}

impl<T: Clone> Promise<T> {
    /// Read the resolved value. Returns `NotReady` while pending and the
    /// original error (cloned) if rejected.
    pub fn value(&self) -> Result<T> {
        match &*self.inner.borrow() {
            State::Pending { .. } => Err(Error::NotReady),
            State::Resolved(value) => Ok(value.clone()),
            State::Rejected(error) => Err(error.clone()),
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Combine a host-keyed map of promises into one promise of the
    /// assembled map, preserving the original key order. Rejects with the
    /// first failure observed; later failures are ignored rather than
    /// overwriting it.
    pub fn all(promises: IndexMap<HostId, Promise<T>>) -> Promise<IndexMap<HostId, T>> {
        let combined = Promise::new();
        if promises.is_empty() {
            let _ = combined.resolve(IndexMap::new());
            return combined;
        }

        let order: Vec<HostId> = promises.keys().copied().collect();
        let remaining = Rc::new(RefCell::new(promises.len()));
        let collected: Rc<RefCell<IndexMap<HostId, T>>> = Rc::new(RefCell::new(IndexMap::new()));

        for (host_id, promise) in promises {
            let combined_ok = combined.clone();
            let remaining_ok = Rc::clone(&remaining);
            let collected_ok = Rc::clone(&collected);
            let order_ok = order.clone();
            promise.on_success(move |value| {
                collected_ok.borrow_mut().insert(host_id, value.clone());
                *remaining_ok.borrow_mut() -= 1;
                if *remaining_ok.borrow() == 0 {
                    let values = collected_ok.borrow();
                    let ordered: IndexMap<HostId, T> = order_ok
                        .iter()
                        .filter_map(|id| values.get(id).map(|v| (*id, v.clone())))
                        .collect();
                    let _ = combined_ok.resolve(ordered);
                }
            });

            let combined_err = combined.clone();
            promise.on_failure(move |error| {
                let _ = combined_err.reject(error.clone());
            });
        }

        combined
    }
}
