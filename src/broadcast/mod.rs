//! Broadcasting assembled transactions

pub mod sequencer;

pub use sequencer::{BroadcastError, BroadcastOutcome, BroadcastSequencer};
