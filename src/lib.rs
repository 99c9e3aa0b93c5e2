//! Stream Timer - A countdown over an ordered list of stream sections
//!
//! This library provides the section list store, the countdown state machine
//! and its tick driver, the signed share-token codec, and the read-only
//! display that plays a shared schedule.

pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod schedule;
pub mod state;
pub mod tasks;
pub mod token;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use display::DisplayRenderer;
pub use schedule::{Section, SectionListStore};
pub use state::{AppState, TimerMachine};
pub use token::TokenCodec;
pub use utils::signals::shutdown_signal;
