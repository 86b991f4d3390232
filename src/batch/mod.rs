mod activity_schema;
mod model;
mod simulated_activity;

pub use activity_schema::*;
pub use model::*;
pub use simulated_activity::*;
