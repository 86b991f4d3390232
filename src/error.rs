use std::sync::Arc;

use crate::batch::{MissionModelId, SimulatedActivityId, SimulationDatasetId};

/// Per-key load failure.
///
/// Loaders report these as values inside the result sequence, never as a
/// batch-wide rejection: one failing key leaves its sibling slots intact.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
  /// The bulk query for a partition of keys failed. Every key routed to that
  /// partition carries the same shared cause.
  #[error("upstream query failed: {0}")]
  Fetch(Arc<anyhow::Error>),

  #[error("no simulation dataset with id {0}")]
  DatasetNotFound(SimulationDatasetId),

  #[error("no simulated activity {simulated_activity_id} in simulation dataset {simulation_dataset_id}")]
  ActivityNotFound {
    simulation_dataset_id: SimulationDatasetId,
    simulated_activity_id: SimulatedActivityId,
  },

  #[error("no activity type {name:?} in mission model {mission_model_id}")]
  SchemaNotFound {
    mission_model_id: MissionModelId,
    name: String,
  },

  /// The query succeeded but its payload did not have the expected shape.
  #[error("malformed response: {0}")]
  Decode(String),
}

impl LoadError {
  pub fn fetch(err: anyhow::Error) -> Self {
    LoadError::Fetch(Arc::new(err))
  }
}

/// One slot of a batch result.
pub type LoadResult<V> = Result<V, LoadError>;
