//! tfplug: the provider side of a Terraform plugin
//!
//! Providers describe themselves with [`Schema`]s and hand out resources and
//! data sources through factories. [`plan`] turns a schema plus prior state
//! and configuration into a planned state; the remaining modules are the
//! helpers resource implementations lean on: deadlines, polling, timeouts,
//! import and logging.

pub mod context;
pub mod data_source;
pub mod defaults;
pub mod error;
pub mod import;
pub mod logging;
pub mod plan;
pub mod plan_modifier;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod timeouts;
pub mod types;
pub mod validator;

pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::{import_as_exists_error, import_state_passthrough_id};
pub use logging::LogLevel;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use retry::{StateChangeConf, WaitError};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use timeouts::Timeouts;
pub use types::{Diagnostic, Dynamic, DynamicValue};
