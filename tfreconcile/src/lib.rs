//! tfreconcile - CRUD reconciliation for Terraform-style providers
//!
//! A provider describes each resource type with a [`Schema`] and implements
//! the vendor-specific [`Resource`] hooks. [`Reconciler`] runs create, read,
//! update, delete and import around those hooks, polling asynchronous remote
//! transitions with the [`Poller`].

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;
pub mod value;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Reconciliation
pub mod clock;
pub mod diff;
pub mod import;
pub mod poller;
pub mod reconciler;

// Helper modules
pub mod config;
pub mod logging;
pub mod validator;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::ProviderConfig;
pub use context::Context;
pub use data_source::{read_data_source, DataSource};
pub use diff::{BlockDelta, ChangeSet, Diff, TagDelta};
pub use error::{ApiError, ApiResult, ErrorKind, ReconcileError, Result};
pub use import::{ImportFormat, ParsedImport};
pub use logging::{init_logging, level_from_env, try_init_logging, LogLevel};
pub use poller::{Interval, Observation, PollTarget, Poller};
pub use provider::{Provider, ProviderRegistry};
pub use reconciler::{Plan, PlanAction, Reconciler};
pub use resource::{Resource, ResourceInstance, Timeouts};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Diagnostics};
pub use value::{AttributeBag, Setting, Value};
