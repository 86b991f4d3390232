use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::batch::{
  load_activity_schema, ActivitySchemaDataLoader, ActivitySchemaKey, MissionModelId,
  SimulatedActivity, SimulatedActivityId, SimulatedActivityKey, SimulatedActivityRow,
  SimulationDatasetId, SimulationDatasetKey,
};
use crate::config::Batch;
use crate::data_loader::{DataLoader, HashMapCache, Loader};
use crate::error::{LoadError, LoadResult};
use crate::graphql::{query, GraphqlClient, GraphqlRequest};

pub type SimulatedActivityDataLoader =
  DataLoader<SimulationDatasetKey, SimulatedActivityLoader, HashMapCache>;

pub type SimulatedActivityInstanceDataLoader =
  DataLoader<SimulatedActivityKey, SimulatedActivityInstanceLoader, HashMapCache>;

#[derive(Debug, Deserialize)]
struct DatasetPayload {
  simulation: SimulationRef,
  simulated_activities: Vec<SimulatedActivityRow>,
}

#[derive(Debug, Deserialize)]
struct SimulationRef {
  plan: PlanRef,
}

#[derive(Debug, Deserialize)]
struct PlanRef {
  model_id: MissionModelId,
}

/// Unwraps the `simulation_dataset_by_pk` node; `Ok(None)` means the dataset
/// does not exist.
fn parse_dataset(data: &Value) -> LoadResult<Option<DatasetPayload>> {
  let node = data.get("simulation_dataset_by_pk").cloned().unwrap_or(Value::Null);
  if node.is_null() {
    return Ok(None);
  }
  serde_json::from_value(node)
    .map(Some)
    .map_err(|err| LoadError::Decode(err.to_string()))
}

/// Resolves the row's activity type against the mission model and attaches
/// the schema's display name.
async fn attach_type_name(
  schemas: &ActivitySchemaDataLoader,
  mission_model_id: MissionModelId,
  simulation_dataset_id: SimulationDatasetId,
  row: SimulatedActivityRow,
) -> LoadResult<SimulatedActivity> {
  let schema = load_activity_schema(
    schemas,
    ActivitySchemaKey { mission_model_id, activity_type_name: row.activity_type_name.clone() },
  )
  .await?;

  Ok(SimulatedActivity {
    id: row.id,
    simulation_dataset_id,
    activity_type_name: schema.name,
    attributes: row.attributes,
    duration: row.duration,
    start_offset: row.start_offset,
    parent_id: row.parent_id,
  })
}

async fn attach_type_names(
  schemas: &ActivitySchemaDataLoader,
  mission_model_id: MissionModelId,
  simulation_dataset_id: SimulationDatasetId,
  rows: Vec<SimulatedActivityRow>,
) -> LoadResult<Vec<SimulatedActivity>> {
  let lookups = rows
    .into_iter()
    .map(|row| attach_type_name(schemas, mission_model_id, simulation_dataset_id, row));
  join_all(lookups).await.into_iter().collect()
}

/// Batch loader for all simulated activity instances of a simulation run,
/// keyed by simulation dataset id. Each dataset is one bulk read.
pub struct SimulatedActivityLoader {
  client: Arc<dyn GraphqlClient>,
  schemas: Arc<ActivitySchemaDataLoader>,
}

impl SimulatedActivityLoader {
  pub fn new(client: Arc<dyn GraphqlClient>, schemas: Arc<ActivitySchemaDataLoader>) -> Self {
    SimulatedActivityLoader { client, schemas }
  }

  pub fn into_data_loader(self, batch: Batch) -> SimulatedActivityDataLoader {
    DataLoader::with_cache(self, tokio::spawn, HashMapCache::new())
      .delay(Duration::from_millis(batch.delay as u64))
      .max_batch_size(batch.max_size)
  }
}

#[async_trait::async_trait]
impl Loader<SimulationDatasetKey> for SimulatedActivityLoader {
  type Value = LoadResult<Vec<SimulatedActivity>>;
  type Error = LoadError;

  async fn load(
    &self,
    keys: &[SimulationDatasetKey],
  ) -> Result<HashMap<SimulationDatasetKey, Self::Value>, Self::Error> {
    tracing::debug!(datasets = keys.len(), "loading simulated activities");

    let fetches = keys.iter().map(|key| async move {
      let request = GraphqlRequest {
        query: query::SIMULATED_ACTIVITIES_BY_DATASET,
        variables: json!({ "datasetId": key.simulation_dataset_id }),
      };
      (key.clone(), self.client.execute(request).await)
    });

    let mut slots = HashMap::new();
    for (key, result) in join_all(fetches).await {
      let slot = match result {
        Ok(data) => match parse_dataset(&data) {
          Ok(Some(payload)) => {
            attach_type_names(
              &self.schemas,
              payload.simulation.plan.model_id,
              key.simulation_dataset_id,
              payload.simulated_activities,
            )
            .await
          }
          Ok(None) => Err(LoadError::DatasetNotFound(key.simulation_dataset_id)),
          Err(err) => Err(err),
        },
        Err(err) => {
          tracing::warn!(
            dataset = key.simulation_dataset_id,
            error = %err,
            "simulated activity query failed"
          );
          Err(LoadError::fetch(err))
        }
      };
      slots.insert(key, slot);
    }
    Ok(slots)
  }
}

/// Batch loader for single simulated activity instances, keyed by
/// (simulation dataset id, simulated activity id). Keys are partitioned by
/// dataset id and each partition is one bulk read.
pub struct SimulatedActivityInstanceLoader {
  client: Arc<dyn GraphqlClient>,
  schemas: Arc<ActivitySchemaDataLoader>,
}

impl SimulatedActivityInstanceLoader {
  pub fn new(client: Arc<dyn GraphqlClient>, schemas: Arc<ActivitySchemaDataLoader>) -> Self {
    SimulatedActivityInstanceLoader { client, schemas }
  }

  pub fn into_data_loader(self, batch: Batch) -> SimulatedActivityInstanceDataLoader {
    DataLoader::with_cache(self, tokio::spawn, HashMapCache::new())
      .delay(Duration::from_millis(batch.delay as u64))
      .max_batch_size(batch.max_size)
  }
}

#[async_trait::async_trait]
impl Loader<SimulatedActivityKey> for SimulatedActivityInstanceLoader {
  type Value = LoadResult<SimulatedActivity>;
  type Error = LoadError;

  async fn load(
    &self,
    keys: &[SimulatedActivityKey],
  ) -> Result<HashMap<SimulatedActivityKey, Self::Value>, Self::Error> {
    let mut ids_by_dataset: HashMap<SimulationDatasetId, Vec<SimulatedActivityId>> = HashMap::new();
    for key in keys {
      ids_by_dataset
        .entry(key.simulation_dataset_id)
        .or_default()
        .push(key.simulated_activity_id);
    }
    tracing::debug!(
      activities = keys.len(),
      datasets = ids_by_dataset.len(),
      "loading simulated activity instances"
    );

    let fetches = ids_by_dataset.iter().map(|(dataset_id, activity_ids)| async move {
      let request = GraphqlRequest {
        query: query::SIMULATED_ACTIVITIES_BY_IDS,
        variables: json!({ "datasetId": dataset_id, "activityIds": activity_ids }),
      };
      (*dataset_id, self.client.execute(request).await)
    });

    let mut slots = HashMap::new();
    for (dataset_id, result) in join_all(fetches).await {
      let group = keys.iter().filter(|key| key.simulation_dataset_id == dataset_id);
      match result {
        Ok(data) => match parse_dataset(&data) {
          Ok(Some(payload)) => {
            let model_id = payload.simulation.plan.model_id;
            let rows: HashMap<SimulatedActivityId, SimulatedActivityRow> = payload
              .simulated_activities
              .into_iter()
              .map(|row| (row.id, row))
              .collect();

            for key in group {
              let slot = match rows.get(&key.simulated_activity_id) {
                Some(row) => {
                  attach_type_name(&self.schemas, model_id, dataset_id, row.clone()).await
                }
                None => Err(LoadError::ActivityNotFound {
                  simulation_dataset_id: dataset_id,
                  simulated_activity_id: key.simulated_activity_id,
                }),
              };
              slots.insert(key.clone(), slot);
            }
          }
          Ok(None) => {
            for key in group {
              slots.insert(key.clone(), Err(LoadError::DatasetNotFound(dataset_id)));
            }
          }
          Err(err) => {
            for key in group {
              slots.insert(key.clone(), Err(err.clone()));
            }
          }
        },
        Err(err) => {
          tracing::warn!(
            dataset = dataset_id,
            error = %err,
            "simulated activity instance query failed"
          );
          let shared = LoadError::fetch(err);
          for key in group {
            slots.insert(key.clone(), Err(shared.clone()));
          }
        }
      }
    }
    Ok(slots)
  }
}

/// Loads one slot per key, positionally aligned with `keys`. Duplicate keys
/// coalesce into one underlying read.
pub async fn load_simulated_activities(
  loader: &SimulatedActivityDataLoader,
  keys: &[SimulationDatasetKey],
) -> Vec<LoadResult<Vec<SimulatedActivity>>> {
  join_all(keys.iter().map(|key| async move {
    match loader.load_one(key.clone()).await {
      Ok(Some(slot)) => slot,
      Ok(None) => Err(LoadError::DatasetNotFound(key.simulation_dataset_id)),
      Err(err) => Err(err),
    }
  }))
  .await
}

/// Loads one slot per (dataset, activity) key, positionally aligned with
/// `keys`. Duplicate keys coalesce into one underlying read.
pub async fn load_simulated_activity_instances(
  loader: &SimulatedActivityInstanceDataLoader,
  keys: &[SimulatedActivityKey],
) -> Vec<LoadResult<SimulatedActivity>> {
  join_all(keys.iter().map(|key| async move {
    match loader.load_one(key.clone()).await {
      Ok(Some(slot)) => slot,
      Ok(None) => Err(LoadError::ActivityNotFound {
        simulation_dataset_id: key.simulation_dataset_id,
        simulated_activity_id: key.simulated_activity_id,
      }),
      Err(err) => Err(err),
    }
  }))
  .await
}
