//! Read-only countdown display fed by a share token

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info};

use crate::{
    schedule::Section,
    state::{TimerMachine, TimerPhase, TimerSnapshot},
    tasks::TimerDriver,
    token::TokenCodec,
};

/// Shown whenever a token is missing, invalid, or holds no sections
pub const EMPTY_MESSAGE: &str = "No sections found. Please use a valid share link.";

/// One rendered state of the display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayFrame {
    NoSchedule {
        message: String,
    },
    Countdown {
        section: String,
        elapsed_clock: String,
        total_clock: String,
        /// Progress through the current section, `0.0..=100.0`
        progress_percent: f64,
        upcoming: Vec<Section>,
        finished: bool,
    },
}

impl DisplayFrame {
    pub fn empty() -> Self {
        DisplayFrame::NoSchedule {
            message: EMPTY_MESSAGE.to_string(),
        }
    }

    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        let Some(section) = snapshot.current_section.clone() else {
            return Self::empty();
        };

        DisplayFrame::Countdown {
            section,
            elapsed_clock: snapshot.elapsed_clock.clone(),
            total_clock: snapshot.total_clock.clone(),
            progress_percent: snapshot.progress * 100.0,
            upcoming: snapshot.upcoming.clone(),
            finished: snapshot.phase == TimerPhase::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, DisplayFrame::Countdown { finished: true, .. })
    }

    /// Plain-text rendering for terminals
    pub fn to_text(&self) -> String {
        match self {
            DisplayFrame::NoSchedule { message } => message.clone(),
            DisplayFrame::Countdown {
                section,
                elapsed_clock,
                total_clock,
                progress_percent,
                upcoming,
                finished,
            } => {
                const BAR_WIDTH: usize = 30;
                let filled = ((progress_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
                let filled = filled.min(BAR_WIDTH);

                let mut text = format!(
                    "{}  {} / {}  [{}{}]",
                    section,
                    elapsed_clock,
                    total_clock,
                    "#".repeat(filled),
                    "-".repeat(BAR_WIDTH - filled),
                );
                if *finished {
                    text.push_str("  done");
                } else if let Some(next) = upcoming.first() {
                    text.push_str(&format!("  next: {} ({} min)", next.name, next.duration_minutes));
                }
                text
            }
        }
    }
}

/// Autoplaying, read-only countdown over a decoded token.
///
/// Owns its own timer; nothing is shared with the editor and no pause or
/// reset is exposed.
#[derive(Debug)]
pub struct DisplayRenderer {
    driver: Option<TimerDriver>,
}

impl DisplayRenderer {
    /// Decode the token and start counting immediately.
    ///
    /// Any problem with the token yields an empty display. Must be called
    /// from within a tokio runtime.
    pub fn open(token: Option<&str>, codec: &TokenCodec) -> Self {
        let sections = match token.and_then(|t| codec.decode(t)) {
            Some(sections) if !sections.is_empty() => sections,
            _ => {
                info!("Display opened without a valid schedule");
                return Self::empty();
            }
        };

        info!("Display opened with {} sections", sections.len());
        let driver = TimerDriver::new(TimerMachine::new());
        if let Err(e) = driver.load(sections).and_then(|_| driver.start()) {
            error!("Failed to start display countdown: {}", e);
            return Self::empty();
        }

        Self {
            driver: Some(driver),
        }
    }

    pub fn empty() -> Self {
        Self { driver: None }
    }

    pub fn is_empty(&self) -> bool {
        self.driver.is_none()
    }

    /// The decoded schedule, empty for an empty display
    pub fn sections(&self) -> Vec<Section> {
        let Some(driver) = self.driver.as_ref() else {
            return Vec::new();
        };
        driver.sections().unwrap_or_else(|e| {
            error!("Failed to read display schedule: {}", e);
            Vec::new()
        })
    }

    pub fn snapshot(&self) -> Option<TimerSnapshot> {
        let driver = self.driver.as_ref()?;
        match driver.snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("Failed to read display countdown: {}", e);
                None
            }
        }
    }

    /// Current frame
    pub fn frame(&self) -> DisplayFrame {
        self.snapshot()
            .map(|s| DisplayFrame::from_snapshot(&s))
            .unwrap_or_else(DisplayFrame::empty)
    }

    /// Updates after every tick; `None` for an empty display
    pub fn subscribe(&self) -> Option<watch::Receiver<TimerSnapshot>> {
        self.driver.as_ref().map(TimerDriver::subscribe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn codec() -> TokenCodec {
        TokenCodec::new(Some("display-secret".to_string()))
    }

    fn schedule() -> Vec<Section> {
        vec![Section::new("Intro", 1).unwrap(), Section::new("Main", 2).unwrap()]
    }

    #[tokio::test]
    async fn missing_token_shows_empty_state() {
        let display = DisplayRenderer::open(None, &codec());
        assert!(display.is_empty());
        assert_eq!(display.frame(), DisplayFrame::empty());
        assert!(display.subscribe().is_none());
    }

    #[tokio::test]
    async fn tampered_token_shows_empty_state() {
        let mut token = codec().encode(&schedule()).unwrap();
        token.push('x');
        let display = DisplayRenderer::open(Some(&token), &codec());
        assert_eq!(display.frame(), DisplayFrame::empty());
    }

    #[tokio::test]
    async fn token_from_other_secret_shows_empty_state() {
        let token = TokenCodec::new(Some("other".to_string())).encode(&schedule()).unwrap();
        assert!(DisplayRenderer::open(Some(&token), &codec()).is_empty());
    }

    #[tokio::test]
    async fn empty_schedule_shows_empty_state() {
        let token = codec().encode(&[]).unwrap();
        let display = DisplayRenderer::open(Some(&token), &codec());
        assert!(display.is_empty());
        assert_eq!(display.frame().to_text(), EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn valid_token_autoplays_from_first_section() {
        let token = codec().encode(&schedule()).unwrap();
        let display = DisplayRenderer::open(Some(&token), &codec());

        assert_eq!(display.sections(), schedule());
        let snapshot = display.snapshot().unwrap();
        assert!(snapshot.running);
        assert_eq!(snapshot.current_index, Some(0));

        match display.frame() {
            DisplayFrame::Countdown { section, elapsed_clock, total_clock, upcoming, finished, .. } => {
                assert_eq!(section, "Intro");
                assert_eq!(elapsed_clock, "00:00");
                assert_eq!(total_clock, "01:00");
                assert_eq!(upcoming, vec![Section::new("Main", 2).unwrap()]);
                assert!(!finished);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn display_ticks_to_completion() {
        let token = codec().encode(&schedule()).unwrap();
        let display = DisplayRenderer::open(Some(&token), &codec());

        sleep(Duration::from_millis(180_500)).await;
        let frame = display.frame();
        assert!(frame.is_finished());
        assert_eq!(frame.to_text(), format!("Main  02:00 / 02:00  [{}]  done", "#".repeat(30)));
    }

    #[test]
    fn frame_serializes_with_state_tag() {
        let json = serde_json::to_value(DisplayFrame::empty()).unwrap();
        assert_eq!(json["state"], "no_schedule");
        assert_eq!(json["message"], EMPTY_MESSAGE);
    }

    #[test]
    fn text_rendering_shows_next_section() {
        let frame = DisplayFrame::Countdown {
            section: "Intro".to_string(),
            elapsed_clock: "00:30".to_string(),
            total_clock: "01:00".to_string(),
            progress_percent: 50.0,
            upcoming: vec![Section::new("Main", 2).unwrap()],
            finished: false,
        };
        assert_eq!(
            frame.to_text(),
            format!("Intro  00:30 / 01:00  [{}{}]  next: Main (2 min)", "#".repeat(15), "-".repeat(15))
        );
    }
}
