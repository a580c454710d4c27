//! Keel State Management
//!
//! Persists what the dispatcher read back for every managed resource so the
//! next run can compute changes against it.
//!
//! - **StateFile**: serial-numbered document of [`keel_core::ResourceState`]s
//! - **StateBackend**: storage for the state file and its lock
//! - **StateLock**: who holds the state lock and until when
//!
//! # Example
//!
//! ```ignore
//! use keel_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::new("local"))?;
//! let lock = backend.acquire_lock("apply").await?;
//!
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! let mut data = state.restore("clb", "web", declared);
//! dispatcher.update(&service, &mut data).await?;
//! state.record("clb", "web", &data);
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend, StateLock};
pub use backends::{LocalBackend, create_backend};
pub use state::{StateFile, StoredResource};
