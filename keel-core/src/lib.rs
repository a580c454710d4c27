//! Keel Core
//!
//! Engine for reconciling declared cloud resources with a vendor control
//! plane. A [`ResourceService`] describes one resource type as ordered
//! vendor calls; the [`Dispatcher`] runs them with parameter conversion,
//! per-parent locking and state polling, then reads the result back.

pub mod call;
pub mod case;
pub mod config;
pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod lock;
pub mod paginate;
pub mod refresh;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod service;
pub mod transport;
pub mod value;

#[cfg(test)]
mod testing;

pub use call::{CallHooks, CallOutcome, Callback, SdkCall, TransportCall};
pub use config::DispatcherConfig;
pub use dispatcher::{DataSourceResult, Dispatcher};
pub use error::{Phase, ReconcileError, ReconcileResult};
pub use lock::LockRegistry;
pub use refresh::{RefreshOutcome, StateRefresh, TRANSIENT_FAILURE_TOLERANCE};
pub use resource::{ResourceData, ResourceState};
pub use service::{DataSourceInfo, ResourceService, ResponseHandler};
pub use transport::{CallRequest, ContentType, ServiceInfo, Transport};
pub use value::{Value, ValueMap};
