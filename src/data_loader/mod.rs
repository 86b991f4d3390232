mod cache;
mod data_loader;
mod loader;

pub use cache::*;
pub use data_loader::*;
pub use loader::*;
