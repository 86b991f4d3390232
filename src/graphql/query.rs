//! Fixed query documents issued against the Merlin GraphQL API.

/// All simulated activity instances recorded for one simulation dataset,
/// together with the owning mission model id resolved through the
/// dataset's simulation and plan.
pub const SIMULATED_ACTIVITIES_BY_DATASET: &str = r#"
query ($datasetId: Int!) {
  simulation_dataset_by_pk(id: $datasetId) {
    id
    simulation {
      plan {
        model_id
      }
    }
    simulated_activities {
      id
      activity_type_name
      attributes
      duration
      start_offset
      parent_id
    }
  }
}"#;

/// A subset of one dataset's simulated activity instances, selected by id.
pub const SIMULATED_ACTIVITIES_BY_IDS: &str = r#"
query ($datasetId: Int!, $activityIds: [Int!]!) {
  simulation_dataset_by_pk(id: $datasetId) {
    id
    simulation {
      plan {
        model_id
      }
    }
    simulated_activities(where: { id: { _in: $activityIds } }) {
      id
      activity_type_name
      attributes
      duration
      start_offset
      parent_id
    }
  }
}"#;

/// Activity type schemas for one mission model, selected by type name.
pub const ACTIVITY_TYPES_BY_NAMES: &str = r#"
query ($modelId: Int!, $names: [String!]!) {
  activity_type(where: { model_id: { _eq: $modelId }, name: { _in: $names } }) {
    model_id
    name
    parameters
    required_parameters
    computed_attributes_value_schema
  }
}"#;
