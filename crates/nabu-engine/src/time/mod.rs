//! Tick timing for window loops.
//!
//! One `TickClock` per window; `tick()` once per host tick.

mod tick;

pub use tick::{TickClock, TickTime};
