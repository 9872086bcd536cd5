//! Population data model and storage.
//!
//! - [`Population`]: a weight matrix with per-row fitness
//! - [`PopulationStore`]: the engine's id-keyed registry of populations

mod store;
mod types;

pub use store::PopulationStore;
pub use types::Population;
