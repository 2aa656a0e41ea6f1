mod reconcile;

pub use reconcile::{run_once, RunOptions, RunOutcome};
