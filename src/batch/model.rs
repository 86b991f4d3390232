use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type SimulationDatasetId = i64;
pub type SimulatedActivityId = i64;
pub type MissionModelId = i64;

/// Key: all simulated activity instances of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationDatasetKey {
  pub simulation_dataset_id: SimulationDatasetId,
}

/// Key: one simulated activity instance within one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedActivityKey {
  pub simulation_dataset_id: SimulationDatasetId,
  pub simulated_activity_id: SimulatedActivityId,
}

/// Key: one activity type's schema within one mission model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySchemaKey {
  pub mission_model_id: MissionModelId,
  pub activity_type_name: String,
}

/// A simulated activity row as returned by the upstream query, before its
/// activity type has been resolved against the mission model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulatedActivityRow {
  pub id: SimulatedActivityId,
  pub activity_type_name: String,
  #[serde(default)]
  pub attributes: ActivityAttributes,
  #[serde(default)]
  pub duration: Option<String>,
  pub start_offset: String,
  #[serde(default)]
  pub parent_id: Option<SimulatedActivityId>,
}

/// The `attributes` JSON blob attached to each simulated activity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAttributes {
  #[serde(default)]
  pub arguments: serde_json::Map<String, Value>,
  #[serde(default)]
  pub directive_id: Option<i64>,
  #[serde(default)]
  pub computed_attributes: Option<Value>,
}

/// One scheduled/executed activity within a simulation run, with its type
/// name resolved against the mission model's activity schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedActivity {
  pub id: SimulatedActivityId,
  pub simulation_dataset_id: SimulationDatasetId,
  pub activity_type_name: String,
  pub attributes: ActivityAttributes,
  pub duration: Option<String>,
  pub start_offset: String,
  pub parent_id: Option<SimulatedActivityId>,
}

/// An activity type's schema as defined by its mission model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActivitySchema {
  #[serde(rename = "model_id")]
  pub mission_model_id: MissionModelId,
  pub name: String,
  #[serde(default)]
  pub parameters: Value,
  #[serde(default)]
  pub required_parameters: Vec<String>,
  #[serde(default)]
  pub computed_attributes_value_schema: Option<Value>,
}
