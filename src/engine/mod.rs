// src/engine/mod.rs
//
// The timed assessment session engine: loading and resuming attempts,
// wall-clock countdown, the in-memory answer ledger, debounced
// autosave, and scoring. UI-free; everything here is driven through
// the session registry by whatever surface hosts it.

pub mod autosave;
pub mod clock;
pub mod ledger;
pub mod loader;
pub mod registry;
pub mod scorer;
pub mod session;
pub mod timer;
