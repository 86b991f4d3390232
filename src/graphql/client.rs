use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;

use crate::config::Endpoint;

/// One GraphQL operation: a fixed query document plus its variables.
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
  pub query: &'static str,
  pub variables: Value,
}

/// Executes GraphQL operations against the upstream service.
///
/// Returns the envelope's `data` field; transport failures and GraphQL-level
/// errors both surface as `Err`.
#[async_trait::async_trait]
pub trait GraphqlClient: Send + Sync {
  async fn execute(&self, request: GraphqlRequest) -> Result<Value>;
}

/// [GraphqlClient] backed by a reqwest connection pool.
pub struct ReqwestGraphqlClient {
  client: reqwest::Client,
  url: url::Url,
}

impl ReqwestGraphqlClient {
  pub fn new(endpoint: &Endpoint) -> Result<Self> {
    let url = url::Url::parse(&endpoint.base_url)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &endpoint.headers {
      headers.insert(name.parse::<HeaderName>()?, value.parse::<HeaderValue>()?);
    }

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(endpoint.timeout))
      .connect_timeout(Duration::from_secs(endpoint.connect_timeout))
      .user_agent("simload/1.0")
      .build()?;

    Ok(Self { client, url })
  }
}

#[async_trait::async_trait]
impl GraphqlClient for ReqwestGraphqlClient {
  async fn execute(&self, request: GraphqlRequest) -> Result<Value> {
    let response = self
      .client
      .post(self.url.clone())
      .json(&request)
      .send()
      .await?
      .error_for_status()?;

    let envelope: Value = response.json().await?;
    unwrap_envelope(envelope)
  }
}

fn unwrap_envelope(envelope: Value) -> Result<Value> {
  if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
    if !errors.is_empty() {
      bail!("graphql errors: {}", Value::Array(errors.clone()));
    }
  }
  envelope
    .get("data")
    .filter(|data| !data.is_null())
    .cloned()
    .ok_or_else(|| anyhow!("graphql response has no data"))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn request_serializes_to_the_wire_shape() {
    let request = GraphqlRequest {
      query: "query { simulation_dataset_by_pk(id: 1) { id } }",
      variables: json!({ "datasetId": 1 }),
    };

    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(
      body,
      json!({
        "query": "query { simulation_dataset_by_pk(id: 1) { id } }",
        "variables": { "datasetId": 1 }
      })
    );
  }

  #[test]
  fn unwrap_envelope_returns_data() {
    let data = unwrap_envelope(json!({ "data": { "id": 7 } })).unwrap();
    assert_eq!(data, json!({ "id": 7 }));
  }

  #[test]
  fn unwrap_envelope_rejects_graphql_errors() {
    let err = unwrap_envelope(json!({
      "data": null,
      "errors": [{ "message": "field not found" }]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("field not found"));
  }

  #[test]
  fn unwrap_envelope_rejects_missing_data() {
    let err = unwrap_envelope(json!({})).unwrap_err();
    assert!(err.to_string().contains("no data"));
  }

  #[test]
  fn builds_client_from_endpoint() {
    let mut endpoint = Endpoint::from_env();
    endpoint
      .headers
      .insert("x-hasura-role".to_string(), "viewer".to_string());
    assert!(ReqwestGraphqlClient::new(&endpoint).is_ok());
  }

  #[test]
  fn rejects_unparseable_base_url() {
    let endpoint = Endpoint::default().base_url("not a url".to_string());
    assert!(ReqwestGraphqlClient::new(&endpoint).is_err());
  }
}
