//! Runtime shell for the advisory core: flight store, ingestion boundary
//! and the periodic detection cycle.

pub mod config;
pub mod cycle;
pub mod state;
pub mod store;

pub use config::EngineConfig;
pub use cycle::{run_cycle, run_detection_loop};
pub use state::{EngineState, RankedConflict};
pub use store::{FlightStore, IngestError};
