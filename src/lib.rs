//! Batched, cached GraphQL lookups for simulated activity data.
//!
//! The [data_loader] module is a generic coalescing loader: keys requested
//! within one dispatch window are deduplicated and resolved by a single
//! [Loader::load](data_loader::Loader::load) call, with per-loader caching.
//! The [batch] module builds the domain loaders on top of it, partitioning
//! keys by simulation dataset (or mission model) and issuing one bulk
//! GraphQL read per partition. Failures are per-slot values, never
//! batch-wide rejections.

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod graphql;
pub mod tracing;

pub use batch::{
  load_simulated_activities, load_simulated_activity_instances, ActivitySchema,
  ActivitySchemaKey, ActivitySchemaLoader, SimulatedActivity, SimulatedActivityInstanceLoader,
  SimulatedActivityKey, SimulatedActivityLoader, SimulationDatasetKey,
};
pub use config::{Batch, Config, Endpoint};
pub use error::{LoadError, LoadResult};
