//! Sign-in gate for Screen Solver.
//!
//! Wraps bearer-token decoding (`AuthToken`) and the mutable gate the rest of
//! the app consults before doing anything user-scoped (`AuthGate`).  The gate
//! re-checks expiry against the wall clock on every query.

pub mod token;

pub use token::{AuthError, AuthGate, AuthToken};

#[cfg(test)]
pub use token::{test_token, unix_now_plus};
