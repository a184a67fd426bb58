//! Unit-of-Work Lifecycle
//!
//! Hosts (HTTP servers, job workers, CLIs) tell the core when a unit of
//! work ends. The core resets that unit's stack and notifies the callbacks
//! registered with [`LifecycleHooks::on_unit_end`]. No event system is
//! assumed.
//!
//! ```rust
//! use tenantry_core::{context, LifecycleHooks, UnitOfWorkKind};
//!
//! # tokio_test::block_on(async {
//! let hooks = LifecycleHooks::new();
//! hooks.on_unit_end(|event| println!("{} finished: {}", event.kind, event.outcome));
//!
//! let result: Result<(), std::io::Error> = hooks
//!     .run_unit(UnitOfWorkKind::Job, async {
//!         context::start("tenant_db");
//!         // forgot to end(): cleared when the unit ends
//!         Ok(())
//!     })
//!     .await;
//!
//! assert!(result.is_ok());
//! assert_eq!(context::current(), None);
//! # });
//! ```

use crate::context::{self, Slot, with_slot};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tenantry_log::{debug, error, warn};
use uuid::Uuid;

/// What kind of work a unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfWorkKind {
    /// One inbound request.
    Request,
    /// One dequeued background job.
    Job,
    /// One script or CLI invocation.
    Script,
}

impl fmt::Display for UnitOfWorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOfWorkKind::Request => write!(f, "request"),
            UnitOfWorkKind::Job => write!(f, "job"),
            UnitOfWorkKind::Script => write!(f, "script"),
        }
    }
}

/// How a unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOutcome {
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Panicked or was dropped before finishing.
    Aborted,
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOutcome::Completed => write!(f, "completed"),
            UnitOutcome::Failed => write!(f, "failed"),
            UnitOutcome::Aborted => write!(f, "aborted"),
        }
    }
}

/// Passed to every unit-end callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfWorkEnded {
    pub id: Uuid,
    pub kind: UnitOfWorkKind,
    pub outcome: UnitOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Entries still on the stack when the unit ended, i.e. unmatched
    /// `start()` calls. Zero for balanced code.
    pub leaked_depth: usize,
}

type UnitEndCallback = Arc<dyn Fn(&UnitOfWorkEnded) + Send + Sync>;

/// Registry of unit-end callbacks.
///
/// Clones share the registry.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    callbacks: Arc<RwLock<Vec<UnitEndCallback>>>,
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("callbacks", &self.len())
            .finish()
    }
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback run after every unit of work, whatever its
    /// outcome. Callbacks run in registration order, after the stack has
    /// been reset.
    pub fn on_unit_end<F>(&self, callback: F)
    where
        F: Fn(&UnitOfWorkEnded) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark the start of a unit of work on the caller's current slot.
    ///
    /// The returned handle ends the unit when [`UnitOfWork::finish`] is
    /// called, or as `Aborted` when it is dropped unfinished.
    pub fn begin_unit(&self, kind: UnitOfWorkKind) -> UnitOfWork {
        UnitOfWork {
            hooks: self.clone(),
            id: Uuid::new_v4(),
            kind,
            slot: context::active_slot(),
            started_at: Utc::now(),
            finished: false,
        }
    }

    /// End a unit of work the host tracked itself: reset the caller's stack
    /// and notify callbacks.
    pub fn end_unit(&self, kind: UnitOfWorkKind, outcome: UnitOutcome) -> UnitOfWorkEnded {
        self.begin_unit(kind).finish(outcome)
    }

    /// Run `future` as one unit of work with a fresh stack.
    ///
    /// The stack is reset and callbacks fire on every exit path: `Ok`,
    /// `Err`, panic, and cancellation.
    pub async fn run_unit<F, T, E>(&self, kind: UnitOfWorkKind, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let hooks = self.clone();

        context::scope(async move {
            let unit = hooks.begin_unit(kind);
            let result = future.await;
            unit.finish(outcome_of(&result));
            result
        })
        .await
    }

    /// Synchronous counterpart of [`LifecycleHooks::run_unit`].
    pub fn run_unit_sync<F, T, E>(&self, kind: UnitOfWorkKind, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        context::sync_scope(|| {
            let unit = self.begin_unit(kind);
            let result = f();
            unit.finish(outcome_of(&result));
            result
        })
    }

    fn notify(&self, event: &UnitOfWorkEnded) {
        let callbacks = self.callbacks.read().clone();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(
                    target: "tenantry::lifecycle",
                    "Unit-end callback panicked for {} {}", event.kind, event.id
                );
            }
        }
    }
}

fn outcome_of<T, E>(result: &Result<T, E>) -> UnitOutcome {
    if result.is_ok() {
        UnitOutcome::Completed
    } else {
        UnitOutcome::Failed
    }
}

/// An in-flight unit of work. Created by [`LifecycleHooks::begin_unit`].
#[must_use = "dropping the handle ends the unit as aborted"]
pub struct UnitOfWork {
    hooks: LifecycleHooks,
    id: Uuid,
    kind: UnitOfWorkKind,
    slot: Slot,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl UnitOfWork {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> UnitOfWorkKind {
        self.kind
    }

    /// End the unit with `outcome`.
    pub fn finish(mut self, outcome: UnitOutcome) -> UnitOfWorkEnded {
        self.finished = true;
        self.complete(outcome)
    }

    fn complete(&self, outcome: UnitOutcome) -> UnitOfWorkEnded {
        let leaked_depth = with_slot(self.slot, |stack| {
            let depth = stack.depth();
            stack.reset();
            depth
        })
        .unwrap_or(0);

        let event = UnitOfWorkEnded {
            id: self.id,
            kind: self.kind,
            outcome,
            started_at: self.started_at,
            ended_at: Utc::now(),
            leaked_depth,
        };

        if leaked_depth > 0 {
            warn!(
                target: "tenantry::lifecycle",
                "{} {} ended with {} unmatched start() call(s)", event.kind, event.id, leaked_depth
            );
        }
        debug!(
            target: "tenantry::lifecycle",
            "{} {} {}", event.kind, event.id, event.outcome
        );

        self.hooks.notify(&event);
        event
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.complete(UnitOutcome::Aborted);
        }
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("started_at", &self.started_at)
            .finish()
    }
}
