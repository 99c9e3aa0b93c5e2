//! Section countdown state machine
//!
//! Counts through an ordered section list one second at a time. The machine
//! itself has no notion of wall-clock time: something else calls [`TimerMachine::tick`]
//! once per second while it is running.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::schedule::Section;

/// Lifecycle of a countdown run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    /// No sections loaded
    #[default]
    Idle,
    /// Sections loaded, countdown not started
    Ready,
    Running,
    Paused,
    /// Ran past the last section
    Finished,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, nothing happened
    Ignored,
    /// Elapsed time grew by one second
    Counted,
    /// Current section completed, moved on to the given index
    Advanced { to: usize },
    /// Last section completed
    Finished,
}

/// Countdown over an ordered section list
#[derive(Debug, Clone, Default)]
pub struct TimerMachine {
    sections: Vec<Section>,
    current_index: Option<usize>,
    elapsed_seconds: u64,
    phase: TimerPhase,
}

impl TimerMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sections(sections: Vec<Section>) -> Self {
        let mut machine = Self::new();
        machine.load(sections);
        machine
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.current_index.and_then(|i| self.sections.get(i))
    }

    /// Length of the current section in seconds, 0 when none is selected
    pub fn current_duration_seconds(&self) -> u64 {
        self.current_section().map(Section::duration_seconds).unwrap_or(0)
    }

    /// Replace the list and reset the run
    pub fn load(&mut self, sections: Vec<Section>) {
        info!("Loading {} sections into timer", sections.len());
        self.sections = sections;
        self.reset();
    }

    /// Replace the list while keeping the run position where possible.
    ///
    /// Used for edits that leave earlier entries where they were. Falls back to
    /// a reset when the current position no longer exists.
    pub fn sync_sections(&mut self, sections: Vec<Section>) {
        self.sections = sections;

        if self.sections.is_empty() {
            self.reset();
            return;
        }
        match self.current_index {
            Some(index) if index >= self.sections.len() => self.reset(),
            Some(_) => {
                let limit = self.current_duration_seconds();
                self.elapsed_seconds = self.elapsed_seconds.min(limit);
            }
            None => {
                if self.phase == TimerPhase::Idle {
                    self.phase = TimerPhase::Ready;
                }
            }
        }
    }

    /// Begin from the first section, or resume when paused.
    ///
    /// Returns whether the machine is now running because of this call.
    pub fn start(&mut self) -> bool {
        match self.phase {
            TimerPhase::Ready => {
                self.current_index = Some(0);
                self.elapsed_seconds = 0;
                self.phase = TimerPhase::Running;
                info!("Timer started at section 0");
                true
            }
            TimerPhase::Paused => {
                self.phase = TimerPhase::Running;
                info!(
                    "Timer resumed at section {:?}, {}s elapsed",
                    self.current_index, self.elapsed_seconds
                );
                true
            }
            TimerPhase::Idle | TimerPhase::Running | TimerPhase::Finished => false,
        }
    }

    /// Stop ticking, keeping position and elapsed time
    pub fn pause(&mut self) -> bool {
        if self.phase != TimerPhase::Running {
            return false;
        }
        self.phase = TimerPhase::Paused;
        info!(
            "Timer paused at section {:?}, {}s elapsed",
            self.current_index, self.elapsed_seconds
        );
        true
    }

    /// Return to the not-started state
    pub fn reset(&mut self) {
        self.current_index = None;
        self.elapsed_seconds = 0;
        self.phase = if self.sections.is_empty() {
            TimerPhase::Idle
        } else {
            TimerPhase::Ready
        };
        debug!("Timer reset to {:?}", self.phase);
    }

    /// Advance by one second.
    ///
    /// A section completes on the tick where elapsed time would reach its
    /// duration. The next section starts at zero; after the last one, elapsed
    /// time is clamped to the duration and the run finishes.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Ignored;
        }
        let Some(index) = self.current_index else {
            return TickOutcome::Ignored;
        };

        let duration = self.current_duration_seconds();
        if self.elapsed_seconds + 1 < duration {
            self.elapsed_seconds += 1;
            return TickOutcome::Counted;
        }

        if index + 1 < self.sections.len() {
            self.current_index = Some(index + 1);
            self.elapsed_seconds = 0;
            debug!("Section {} complete, advancing to {}", index, index + 1);
            TickOutcome::Advanced { to: index + 1 }
        } else {
            self.elapsed_seconds = duration;
            self.phase = TimerPhase::Finished;
            info!("Final section complete, timer finished");
            TickOutcome::Finished
        }
    }

    /// Fraction of the current section that has elapsed, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        let duration = self.current_duration_seconds();
        if duration == 0 {
            return 0.0;
        }
        self.elapsed_seconds as f64 / duration as f64
    }

    /// Sections after the current one, or all of them before the run starts
    pub fn upcoming(&self) -> &[Section] {
        match self.current_index {
            Some(index) => self.sections.get(index + 1..).unwrap_or(&[]),
            None => &self.sections,
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let total_seconds = self.current_duration_seconds();
        TimerSnapshot {
            phase: self.phase,
            running: self.is_running(),
            current_index: self.current_index,
            current_section: self.current_section().map(|s| s.name.clone()),
            elapsed_seconds: self.elapsed_seconds,
            total_seconds,
            progress: self.progress(),
            elapsed_clock: format_clock(self.elapsed_seconds),
            total_clock: format_clock(total_seconds),
            upcoming: self.upcoming().to_vec(),
            section_count: self.sections.len(),
        }
    }
}

/// Externally visible view of the timer after a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub running: bool,
    pub current_index: Option<usize>,
    pub current_section: Option<String>,
    pub elapsed_seconds: u64,
    pub total_seconds: u64,
    pub progress: f64,
    pub elapsed_clock: String,
    pub total_clock: String,
    pub upcoming: Vec<Section>,
    pub section_count: usize,
}

/// Format seconds as zero-padded `mm:ss`; minutes are not wrapped into hours
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
