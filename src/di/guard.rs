use crate::error::{Result, WireError};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

thread_local! {
    // Descriptors currently being built on this thread, outermost first.
    static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// RAII marker for a descriptor under construction.
///
/// Entering a descriptor that is already on this thread's stack fails with
/// [`WireError::CircularDependency`] instead of recursing forever or
/// deadlocking on the descriptor's instance cell.
pub(crate) struct ResolutionGuard {
    key: usize,
}

impl ResolutionGuard {
    pub(crate) fn enter(key: usize, identifier: &str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack.iter().position(|(known, _)| *known == key) {
                let mut chain: Vec<&str> = stack[start..].iter().map(|(_, id)| id.as_str()).collect();
                chain.push(identifier);
                return Err(WireError::CircularDependency {
                    chain: chain.join(" -> "),
                });
            }
            stack.push((key, identifier.to_string()));
            Ok(Self { key })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(index) = stack.iter().rposition(|(known, _)| *known == self.key) {
                stack.remove(index);
            }
        });
    }
}

/// Builds in progress on every thread: who builds each descriptor, and which
/// descriptor each blocked thread waits for.
#[derive(Default)]
struct InFlight {
    builders: HashMap<usize, (ThreadId, String)>,
    waiting: HashMap<ThreadId, (usize, String)>,
}

static IN_FLIGHT: Lazy<Mutex<InFlight>> = Lazy::new(Mutex::default);

fn in_flight() -> MutexGuard<'static, InFlight> {
    IN_FLIGHT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The current thread is about to block on a descriptor's instance cell.
///
/// Fails with [`WireError::CircularDependency`] when the thread building that
/// descriptor waits, directly or through other threads, for a descriptor this
/// thread is building.
pub(crate) struct BuildWait {
    key: usize,
}

impl BuildWait {
    pub(crate) fn enter(key: usize, identifier: &str) -> Result<Self> {
        let current = thread::current().id();
        let mut state = in_flight();

        let mut chain = vec![identifier.to_string()];
        let mut next = key;
        for _ in 0..=state.builders.len() {
            let Some(&(builder, _)) = state.builders.get(&next) else {
                break;
            };
            if builder == current {
                let mut cycle = Vec::with_capacity(chain.len() + 1);
                cycle.extend(chain.last().cloned());
                cycle.extend(chain);
                return Err(WireError::CircularDependency {
                    chain: cycle.join(" -> "),
                });
            }
            let Some((waited, waited_id)) = state.waiting.get(&builder) else {
                break;
            };
            chain.push(waited_id.clone());
            next = *waited;
        }

        state.waiting.insert(current, (key, identifier.to_string()));
        Ok(Self { key })
    }
}

impl Drop for BuildWait {
    fn drop(&mut self) {
        let current = thread::current().id();
        let mut state = in_flight();
        if state.waiting.get(&current).is_some_and(|(key, _)| *key == self.key) {
            state.waiting.remove(&current);
        }
    }
}

/// The current thread runs the initializer of a descriptor.
pub(crate) struct BuildClaim {
    key: usize,
}

impl BuildClaim {
    pub(crate) fn enter(key: usize, identifier: &str) -> Self {
        let current = thread::current().id();
        let mut state = in_flight();
        state.waiting.remove(&current);
        state.builders.insert(key, (current, identifier.to_string()));
        Self { key }
    }
}

impl Drop for BuildClaim {
    fn drop(&mut self) {
        let current = thread::current().id();
        let mut state = in_flight();
        if state.builders.get(&self.key).is_some_and(|(builder, _)| *builder == current) {
            state.builders.remove(&self.key);
        }
    }
}
