//! Tenant Context
//!
//! Unit-of-work scoped storage for the [`ConnectionStack`] and the free
//! functions that operate on it.
//!
//! Each unit of work (request, job, script) owns its own stack. Async hosts
//! get one through [`scope`] (or [`crate::LifecycleHooks::run_unit`]), which
//! installs a task-local slot for the lifetime of the wrapped future.
//! Outside any such scope, and outside the async runtime, the functions fall
//! back to a slot local to the current thread, which suits synchronous
//! scripts and CLIs.
//!
//! Inside the runtime but outside a scope there is no stack at all: runtime
//! worker threads are shared by every task scheduled on them. `start()` logs
//! an error and does nothing, and `current()` returns `None`.
//!
//! ```rust
//! use tenantry_core::context;
//!
//! context::start("tenant_db");
//! assert_eq!(context::current().as_deref(), Some("tenant_db"));
//!
//! context::start("other_tenant");
//! assert_eq!(context::current().as_deref(), Some("other_tenant"));
//!
//! context::end();
//! assert_eq!(context::current().as_deref(), Some("tenant_db"));
//!
//! context::end();
//! assert_eq!(context::current(), None);
//! ```

use crate::error::TenancyError;
use crate::stack::ConnectionStack;
use std::cell::RefCell;
use std::future::Future;
use tenantry_log::{debug, error, trace, warn};

tokio::task_local! {
    static TASK_STACK: RefCell<ConnectionStack>;
}

thread_local! {
    static THREAD_STACK: RefCell<ConnectionStack> = RefCell::new(ConnectionStack::new());
}

/// Which storage cell backs the stack for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Task-local cell installed by [`scope`].
    Task,
    /// Per-thread fallback cell, used outside the async runtime.
    Thread,
    /// Inside the async runtime with no scope installed. No stack.
    Unscoped,
}

/// The slot that `start`/`end`/`current` would use right now.
pub fn active_slot() -> Slot {
    if TASK_STACK.try_with(|_| ()).is_ok() {
        Slot::Task
    } else if tokio::runtime::Handle::try_current().is_ok() {
        Slot::Unscoped
    } else {
        Slot::Thread
    }
}

/// Run `f` against the stack in `slot`. `None` if that slot is not
/// reachable from here (outside its task, or during thread teardown).
pub(crate) fn with_slot<R>(slot: Slot, f: impl FnOnce(&mut ConnectionStack) -> R) -> Option<R> {
    match slot {
        Slot::Task => TASK_STACK.try_with(|cell| f(&mut cell.borrow_mut())).ok(),
        Slot::Thread => THREAD_STACK.try_with(|cell| f(&mut cell.borrow_mut())).ok(),
        Slot::Unscoped => None,
    }
}

pub(crate) fn report_unscoped(operation: &str, connection: &str) {
    error!(
        target: "tenantry::context",
        "{}({}) ignored: called inside the async runtime without a unit-of-work scope; \
         wrap the work in context::scope or run_unit",
        operation, connection
    );
}

fn with_stack<R>(f: impl FnOnce(&mut ConnectionStack) -> R) -> Option<R> {
    with_slot(active_slot(), f)
}

/// Push `connection` onto the current unit's stack.
///
/// The identifier is not validated; an unknown name surfaces later, when it
/// is used for I/O.
pub fn start(connection: impl Into<String>) {
    let connection = connection.into();
    match active_slot() {
        Slot::Unscoped => report_unscoped("start", &connection),
        slot => {
            trace!(target: "tenantry::context", "start({})", connection);
            with_slot(slot, |stack| stack.push(connection));
        }
    }
}

/// Pop the current tenant.
///
/// Returns the identifier that was removed. Calling `end()` on an empty
/// stack is tolerated: it returns `None` and logs a warning.
pub fn end() -> Option<String> {
    let popped = with_stack(ConnectionStack::pop).flatten();
    match popped {
        Some(ref connection) => trace!(target: "tenantry::context", "end({})", connection),
        None => warn!(target: "tenantry::context", "end() called without a matching start()"),
    }
    popped
}

/// The active tenant connection, or `None` when no tenant is active.
pub fn current() -> Option<String> {
    with_stack(|stack| stack.peek().map(str::to_string)).flatten()
}

/// Like [`current`], but an empty stack is an error.
pub fn require_current() -> Result<String, TenancyError> {
    current().ok_or(TenancyError::NoActiveTenant)
}

/// Whether a tenant is active.
pub fn is_active() -> bool {
    depth() > 0
}

/// Number of unmatched `start()` calls.
pub fn depth() -> usize {
    with_stack(|stack| stack.depth()).unwrap_or(0)
}

/// Clear the stack unconditionally. Idempotent.
pub fn reset() {
    let cleared = with_stack(|stack| {
        let depth = stack.depth();
        stack.reset();
        depth
    })
    .unwrap_or(0);

    if cleared > 0 {
        debug!(target: "tenantry::context", "Reset tenant stack ({} entries)", cleared);
    }
}

/// Copy of the current stack, bottom to top.
pub fn snapshot() -> ConnectionStack {
    with_stack(|stack| stack.clone()).unwrap_or_default()
}

/// Run `future` with a fresh, empty stack of its own.
pub fn scope<F: Future>(future: F) -> impl Future<Output = F::Output> {
    TASK_STACK.scope(RefCell::new(ConnectionStack::new()), future)
}

/// Run `future` with its own copy of `stack`.
pub fn scope_with<F: Future>(stack: ConnectionStack, future: F) -> impl Future<Output = F::Output> {
    TASK_STACK.scope(RefCell::new(stack), future)
}

/// Run `future` with a copy of the caller's current stack.
///
/// Use this when spawning work that should keep targeting the tenant active
/// at spawn time:
///
/// ```rust,ignore
/// tokio::spawn(context::inherit(async move { /* ... */ }));
/// ```
///
/// Later changes on either side stay invisible to the other.
pub fn inherit<F: Future>(future: F) -> impl Future<Output = F::Output> {
    scope_with(snapshot(), future)
}

/// Synchronous counterpart of [`scope`].
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    TASK_STACK.sync_scope(RefCell::new(ConnectionStack::new()), f)
}

/// Fields attached to every log record: the active connection, if any.
///
/// Uses a non-panicking borrow so logging from inside a stack mutation can
/// never fail.
pub(crate) fn log_fields() -> Vec<(&'static str, String)> {
    let read = |cell: &RefCell<ConnectionStack>| {
        cell.try_borrow()
            .ok()
            .and_then(|stack| stack.peek().map(str::to_string))
    };

    let connection = match active_slot() {
        Slot::Task => TASK_STACK.try_with(read).ok().flatten(),
        Slot::Thread => THREAD_STACK.try_with(read).ok().flatten(),
        Slot::Unscoped => None,
    };

    connection
        .map(|connection| vec![("connection", connection)])
        .unwrap_or_default()
}
