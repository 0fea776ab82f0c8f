//! Shared database repository test infrastructure
//!
//! Each repository has a test module containing shared test functions that
//! take `&dyn XxxRepo` plus an in-memory SQLite setup running the real
//! migrations.
//!
//! ```bash
//! cargo test                       # Fast SQLite tests
//! cargo test -- --ignored          # Redis integration tests (requires Docker)
//! ```

mod archival_jobs;
pub mod harness;
