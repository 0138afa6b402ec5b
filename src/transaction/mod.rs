// ============================================================================
// Transaction Scoping
// ============================================================================
//
// Active-record operations run inside a scope that begins a backend
// transaction only when none is active, and otherwise joins the caller's.
//
// ============================================================================

pub mod scope;

pub use scope::{ScopeState, TransactionScope};

use crate::core::Result;

/// Transaction bookkeeping exposed by a persistence backend.
pub trait TransactionHandle: Send + Sync {
    fn is_active(&self) -> bool;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}
