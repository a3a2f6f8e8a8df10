/// In-process state-store backend.
pub mod memory;
/// Persisted entity definitions.
pub mod models;
/// Storage error types shared by all backends.
pub mod storage;
/// State-store abstraction.
pub mod store;
