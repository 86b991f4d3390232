use std::collections::BTreeMap;
use std::env;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

const GRAPHQL_URL_ENV: &str = "MERLIN_GRAPHQL_URL";
const DEFAULT_GRAPHQL_URL: &str = "http://localhost:8080/v1/graphql";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
  pub endpoint: Endpoint,
  pub batch: Batch,
}

impl Config {
  pub fn from_json(json: &str) -> anyhow::Result<Config> {
    Ok(serde_json::from_str(json)?)
  }
}

/// Dispatch-window settings for the batch loaders.
#[derive(Serialize, Deserialize, Clone, Debug, Setters, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Batch {
  pub max_size: usize,
  /// Dispatch window in milliseconds.
  pub delay: usize,
}

impl Default for Batch {
  fn default() -> Self {
    Batch { max_size: 1000, delay: 1 }
  }
}

/// Location of the upstream GraphQL service.
#[derive(Serialize, Deserialize, Clone, Debug, Setters, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoint {
  #[serde(rename = "baseURL")]
  pub base_url: String,
  pub headers: BTreeMap<String, String>,
  /// Request timeout in seconds.
  pub timeout: u64,
  /// Connect timeout in seconds.
  pub connect_timeout: u64,
}

impl Default for Endpoint {
  fn default() -> Self {
    Endpoint {
      base_url: DEFAULT_GRAPHQL_URL.to_string(),
      headers: BTreeMap::new(),
      timeout: 60,
      connect_timeout: 10,
    }
  }
}

impl Endpoint {
  /// Reads the upstream URL from `MERLIN_GRAPHQL_URL`, falling back to the
  /// default local endpoint.
  pub fn from_env() -> Self {
    let base_url = env::var(GRAPHQL_URL_ENV).unwrap_or_else(|_| DEFAULT_GRAPHQL_URL.to_string());
    Endpoint { base_url, ..Endpoint::default() }
  }
}
