//! Core business logic services.

mod poller;

pub use poller::{CycleOutcome, Poller, PollerConfig};
