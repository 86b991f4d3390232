use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{json, Value};

use crate::batch::{ActivitySchema, ActivitySchemaKey, MissionModelId};
use crate::config::Batch;
use crate::data_loader::{DataLoader, HashMapCache, Loader};
use crate::error::{LoadError, LoadResult};
use crate::graphql::{query, GraphqlClient, GraphqlRequest};

pub type ActivitySchemaDataLoader = DataLoader<ActivitySchemaKey, ActivitySchemaLoader, HashMapCache>;

/// Batch loader for activity type schemas, keyed by mission model id and
/// activity type name. One bulk query is issued per mission model.
pub struct ActivitySchemaLoader {
  client: Arc<dyn GraphqlClient>,
}

impl ActivitySchemaLoader {
  pub fn new(client: Arc<dyn GraphqlClient>) -> Self {
    ActivitySchemaLoader { client }
  }

  pub fn into_data_loader(self, batch: Batch) -> ActivitySchemaDataLoader {
    DataLoader::with_cache(self, tokio::spawn, HashMapCache::new())
      .delay(Duration::from_millis(batch.delay as u64))
      .max_batch_size(batch.max_size)
  }
}

#[async_trait::async_trait]
impl Loader<ActivitySchemaKey> for ActivitySchemaLoader {
  type Value = LoadResult<ActivitySchema>;
  type Error = LoadError;

  async fn load(
    &self,
    keys: &[ActivitySchemaKey],
  ) -> Result<HashMap<ActivitySchemaKey, Self::Value>, Self::Error> {
    let mut names_by_model: HashMap<MissionModelId, Vec<&str>> = HashMap::new();
    for key in keys {
      names_by_model
        .entry(key.mission_model_id)
        .or_default()
        .push(&key.activity_type_name);
    }
    tracing::debug!(
      schemas = keys.len(),
      models = names_by_model.len(),
      "loading activity schemas"
    );

    let fetches = names_by_model.iter().map(|(model_id, names)| async move {
      let request = GraphqlRequest {
        query: query::ACTIVITY_TYPES_BY_NAMES,
        variables: json!({ "modelId": model_id, "names": names }),
      };
      (*model_id, self.client.execute(request).await)
    });

    let mut slots = HashMap::new();
    for (model_id, result) in join_all(fetches).await {
      let group = keys.iter().filter(|key| key.mission_model_id == model_id);
      match result.map_err(LoadError::fetch).and_then(|data| parse_schemas(&data)) {
        Ok(schemas) => {
          for key in group {
            let slot = schemas
              .get(key.activity_type_name.as_str())
              .cloned()
              .ok_or_else(|| LoadError::SchemaNotFound {
                mission_model_id: model_id,
                name: key.activity_type_name.clone(),
              });
            slots.insert(key.clone(), slot);
          }
        }
        Err(err) => {
          tracing::warn!(model_id, error = %err, "activity schema query failed");
          for key in group {
            slots.insert(key.clone(), Err(err.clone()));
          }
        }
      }
    }
    Ok(slots)
  }
}

fn parse_schemas(data: &Value) -> LoadResult<HashMap<String, ActivitySchema>> {
  let rows = data.get("activity_type").cloned().unwrap_or(Value::Array(Vec::new()));
  let schemas: Vec<ActivitySchema> =
    serde_json::from_value(rows).map_err(|err| LoadError::Decode(err.to_string()))?;
  Ok(schemas.into_iter().map(|schema| (schema.name.clone(), schema)).collect())
}

/// Resolves one schema through the loader, flattening the cache-miss and
/// per-slot layers into a single result.
pub async fn load_activity_schema(
  loader: &ActivitySchemaDataLoader,
  key: ActivitySchemaKey,
) -> LoadResult<ActivitySchema> {
  match loader.load_one(key.clone()).await {
    Ok(Some(slot)) => slot,
    Ok(None) => Err(LoadError::SchemaNotFound {
      mission_model_id: key.mission_model_id,
      name: key.activity_type_name,
    }),
    Err(err) => Err(err),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  use pretty_assertions::assert_eq;

  use super::*;

  struct MockGraphqlClient {
    request_count: Arc<AtomicUsize>,
    variables: Arc<Mutex<Vec<Value>>>,
    response: Value,
  }

  #[async_trait::async_trait]
  impl GraphqlClient for MockGraphqlClient {
    async fn execute(&self, request: GraphqlRequest) -> anyhow::Result<Value> {
      self.request_count.fetch_add(1, Ordering::SeqCst);
      self.variables.lock().unwrap().push(request.variables);
      Ok(self.response.clone())
    }
  }

  fn schema_row(model_id: i64, name: &str) -> Value {
    json!({
      "model_id": model_id,
      "name": name,
      "parameters": {},
      "required_parameters": [],
      "computed_attributes_value_schema": null
    })
  }

  #[tokio::test]
  async fn groups_one_query_per_mission_model() {
    let request_count = Arc::new(AtomicUsize::new(0));
    let client = Arc::new(MockGraphqlClient {
      request_count: request_count.clone(),
      variables: Arc::new(Mutex::new(Vec::new())),
      response: json!({
        "activity_type": [schema_row(1, "BiteBanana"), schema_row(1, "PeelBanana")]
      }),
    });
    let loader = ActivitySchemaLoader::new(client);

    let keys = vec![
      ActivitySchemaKey { mission_model_id: 1, activity_type_name: "BiteBanana".to_string() },
      ActivitySchemaKey { mission_model_id: 1, activity_type_name: "PeelBanana".to_string() },
    ];
    let slots = loader.load(&keys).await.unwrap();

    assert_eq!(request_count.load(Ordering::SeqCst), 1);
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[&keys[0]].as_ref().unwrap().name, "BiteBanana");
    assert_eq!(slots[&keys[1]].as_ref().unwrap().name, "PeelBanana");
  }

  #[tokio::test]
  async fn unknown_type_name_yields_schema_not_found() {
    let client = Arc::new(MockGraphqlClient {
      request_count: Arc::new(AtomicUsize::new(0)),
      variables: Arc::new(Mutex::new(Vec::new())),
      response: json!({ "activity_type": [] }),
    });
    let loader = ActivitySchemaLoader::new(client);

    let key = ActivitySchemaKey { mission_model_id: 3, activity_type_name: "Missing".to_string() };
    let slots = loader.load(std::slice::from_ref(&key)).await.unwrap();

    assert!(matches!(
      slots[&key],
      Err(LoadError::SchemaNotFound { mission_model_id: 3, ref name }) if name == "Missing"
    ));
  }

  #[tokio::test]
  async fn malformed_rows_yield_decode_errors() {
    let client = Arc::new(MockGraphqlClient {
      request_count: Arc::new(AtomicUsize::new(0)),
      variables: Arc::new(Mutex::new(Vec::new())),
      response: json!({ "activity_type": [{ "name": 42 }] }),
    });
    let loader = ActivitySchemaLoader::new(client);

    let key = ActivitySchemaKey { mission_model_id: 1, activity_type_name: "BiteBanana".to_string() };
    let slots = loader.load(std::slice::from_ref(&key)).await.unwrap();

    assert!(matches!(slots[&key], Err(LoadError::Decode(_))));
  }
}
