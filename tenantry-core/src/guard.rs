//! Scoped tenant acquisition.
//!
//! `start`/`end` pairs are easy to unbalance on early returns. The guard
//! and [`with_tenant`] tie the pop to a lexical scope instead.

use crate::context::{self, Slot, with_slot};
use crate::stack::ConnectionStack;
use std::future::Future;
use std::marker::PhantomData;
use tenantry_log::trace;

/// Keeps a tenant active until dropped.
///
/// On drop the stack is cut back to the depth it had when the guard was
/// created, which also discards any unmatched `start()` made inside the
/// scope. Only the slot the guard pushed to is touched.
///
/// The guard is `!Send`: it must be dropped on the thread that created it,
/// otherwise it would cut another thread's stack.
///
/// ```compile_fail
/// let guard = tenantry_core::enter("tenant_db");
/// std::thread::spawn(move || drop(guard));
/// ```
#[must_use = "the tenant scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TenantGuard {
    slot: Slot,
    depth: usize,
    connection: String,
    _not_send: PhantomData<*const ()>,
}

impl TenantGuard {
    /// The connection this guard activated.
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// End the scope now.
    pub fn end(self) {}
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        let depth = self.depth;
        with_slot(self.slot, |stack| stack.truncate(depth));
        trace!(target: "tenantry::context", "left tenant scope {}", self.connection);
    }
}

/// Activate `connection` until the returned guard is dropped.
///
/// ```rust
/// use tenantry_core::{context, enter};
///
/// {
///     let _tenant = enter("tenant_db");
///     assert_eq!(context::current().as_deref(), Some("tenant_db"));
/// }
/// assert_eq!(context::current(), None);
/// ```
pub fn enter(connection: impl Into<String>) -> TenantGuard {
    let connection = connection.into();
    let slot = context::active_slot();
    if slot == Slot::Unscoped {
        context::report_unscoped("enter", &connection);
    }
    let pushed = connection.clone();
    let depth = with_slot(slot, move |stack| {
        let depth = stack.depth();
        stack.push(pushed);
        depth
    })
    .unwrap_or(0);

    trace!(target: "tenantry::context", "entered tenant scope {}", connection);

    TenantGuard {
        slot,
        depth,
        connection,
        _not_send: PhantomData,
    }
}

/// Run `future` with `connection` active.
///
/// The future runs in its own scope, seeded with a copy of the caller's
/// stack plus `connection`. Nothing it pushes or pops is visible to the
/// caller, whether it completes or is dropped, and the returned future stays
/// `Send` when `future` is.
pub fn with_tenant<F: Future>(
    connection: impl Into<String>,
    future: F,
) -> impl Future<Output = F::Output> {
    let mut stack: ConnectionStack = context::snapshot();
    stack.push(connection.into());
    context::scope_with(stack, future)
}
