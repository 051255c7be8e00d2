pub mod generator;

pub use generator::{crossed_above, crossed_below, Signal, SignalGenerator};
