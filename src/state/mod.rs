//! State management module
//!
//! This module contains the countdown state machine and the shared editor state.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, ShareLink};
pub use timer_state::{format_clock, TickOutcome, TimerMachine, TimerPhase, TimerSnapshot};
