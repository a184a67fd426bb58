//! Error types for the tenancy core.

/// Errors raised by the tenancy core itself.
///
/// Resolution never fails; these cover the few operations that insist on
/// an active tenant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenancyError {
    #[error("No tenant connection is active")]
    NoActiveTenant,
}
