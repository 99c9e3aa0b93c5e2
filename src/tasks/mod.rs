//! Background tasks module
//!
//! This module contains the tick task that drives a running countdown.

pub mod section_ticker;

// Re-export main types
pub use section_ticker::{TimerDriver, TICK_INTERVAL};
