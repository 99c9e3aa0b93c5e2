//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    display::DisplayRenderer,
    error::EncodeError,
    schedule::{ListChange, MoveDirection, Section, SectionListStore},
    tasks::TimerDriver,
    token::TokenCodec,
};
use super::{TimerMachine, TimerSnapshot};

/// A signed token and the display link that carries it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    pub token: String,
    pub url: String,
}

/// Editor state: the persisted section list, its interactive countdown, and the
/// codec used for share links
#[derive(Debug)]
pub struct AppState {
    /// Section list edited through the API
    pub store: Arc<Mutex<SectionListStore>>,
    /// Interactive countdown over the store's list
    pub timer: TimerDriver,
    /// Share token codec with the configured secret
    pub codec: TokenCodec,
    /// Base URL used to build display links
    pub public_url: String,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Create the editor state around an already-loaded store
    pub fn new(
        port: u16,
        host: String,
        public_url: String,
        store: SectionListStore,
        codec: TokenCodec,
    ) -> Self {
        let timer = TimerDriver::new(TimerMachine::with_sections(store.sections().to_vec()));

        Self {
            store: Arc::new(Mutex::new(store)),
            timer,
            codec,
            public_url,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Apply a list mutation and carry the new list over to the timer.
    ///
    /// Returns the list after the call and whether it changed. Deleting or
    /// moving sections, or editing the one being counted or one before it,
    /// resets the timer; other changes keep the run going.
    ///
    /// The store stays locked until the timer holds the new list, so
    /// concurrent mutations reach the timer in the order they were applied.
    /// Lock order is store, then timer; ticks never take the store lock.
    pub fn update_sections<F>(&self, action: &str, updater: F) -> Result<(Vec<Section>, bool), String>
    where
        F: FnOnce(&mut SectionListStore) -> Option<ListChange>,
    {
        let mut store = self.store.lock()
            .map_err(|e| format!("Failed to lock section list: {}", e))?;

        let Some(change) = updater(&mut *store) else {
            return Ok((store.sections().to_vec(), false));
        };
        let sections = store.sections().to_vec();

        let current = self.timer.snapshot()?.current_index;
        let resets_run = match change {
            ListChange::Edited { index } => current.is_some_and(|current| index <= current),
            other => other.is_structural(),
        };

        if resets_run {
            if current.is_some() {
                info!("Section list changed during a run ({:?}), resetting timer", change);
            }
            self.timer.load(sections.clone())?;
        } else {
            self.timer.sync_sections(sections.clone())?;
        }
        drop(store);

        self.record_action(action);
        Ok((sections, true))
    }

    pub fn add_section(&self, name: &str, duration_minutes: i64) -> Result<(Vec<Section>, bool), String> {
        self.update_sections("add", |store| store.add(name, duration_minutes))
    }

    pub fn edit_section(
        &self,
        index: usize,
        name: &str,
        duration_minutes: i64,
    ) -> Result<(Vec<Section>, bool), String> {
        self.update_sections("edit", |store| store.edit(index, name, duration_minutes))
    }

    pub fn delete_section(&self, index: usize) -> Result<(Vec<Section>, bool), String> {
        self.update_sections("delete", |store| store.delete(index))
    }

    pub fn move_section(&self, index: usize, direction: MoveDirection) -> Result<(Vec<Section>, bool), String> {
        self.update_sections("move", |store| store.move_section(index, direction))
    }

    pub fn reorder_sections(&self, from: usize, to: usize) -> Result<(Vec<Section>, bool), String> {
        self.update_sections("reorder", |store| store.reorder(from, to))
    }

    /// Get the current section list
    pub fn get_sections(&self) -> Result<Vec<Section>, String> {
        self.store.lock()
            .map(|store| store.sections().to_vec())
            .map_err(|e| format!("Failed to lock section list: {}", e))
    }

    pub fn start_timer(&self) -> Result<TimerSnapshot, String> {
        self.record_action("start");
        self.timer.start()
    }

    pub fn pause_timer(&self) -> Result<TimerSnapshot, String> {
        self.record_action("pause");
        self.timer.pause()
    }

    pub fn reset_timer(&self) -> Result<TimerSnapshot, String> {
        self.record_action("reset");
        self.timer.reset()
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerSnapshot, String> {
        self.timer.snapshot()
    }

    /// Sign a section list and build its display link
    pub fn create_share_link(&self, sections: &[Section]) -> Result<ShareLink, EncodeError> {
        let token = self.codec.encode(sections)?;
        let url = self.display_url(&token);
        info!("Generated share link for {} sections", sections.len());
        Ok(ShareLink { token, url })
    }

    /// Open a read-only display for a token received from a link
    pub fn open_display(&self, token: Option<&str>) -> DisplayRenderer {
        DisplayRenderer::open(token, &self.codec)
    }

    /// Display link for a token. Tokens only contain URL-safe characters.
    pub fn display_url(&self, token: &str) -> String {
        format!("{}/display?token={}", self.public_url.trim_end_matches('/'), token)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn record_action(&self, action: &str) {
        match self.last_action.lock() {
            Ok(mut last_action) => *last_action = Some(action.to_string()),
            Err(e) => warn!("Failed to record last action: {}", e),
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }
}
