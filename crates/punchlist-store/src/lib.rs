// ABOUTME: Persistence core for punchlist, wrapping an embedded SQLite engine.
// ABOUTME: Provides capability probing, bootstrap with volatile fallback, the durable write protocol, and shutdown.

pub mod bootstrap;
pub mod lifecycle;
pub mod probe;
pub mod store;

pub use bootstrap::{BootstrapError, ConnectionState, DurabilityMode, InitOptions, initialize};
pub use lifecycle::shutdown;
pub use probe::probe_durable_storage_support;
pub use store::{Record, StoreError};
