//! One-second tick driver for a section countdown

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::{
    schedule::Section,
    state::{TimerMachine, TimerSnapshot},
};

/// Wall-clock interval between ticks
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns a countdown and the single background task that ticks it.
///
/// Every control operation bumps the run generation while holding the machine
/// lock, and every tick re-checks the generation under the same lock, so a
/// tick scheduled for a superseded run never touches the machine.
#[derive(Debug)]
pub struct TimerDriver {
    machine: Arc<Mutex<TimerMachine>>,
    generation: Arc<AtomicU64>,
    updates: watch::Sender<TimerSnapshot>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerDriver {
    pub fn new(machine: TimerMachine) -> Self {
        let (updates, _) = watch::channel(machine.snapshot());
        Self {
            machine: Arc::new(Mutex::new(machine)),
            generation: Arc::new(AtomicU64::new(0)),
            updates,
            tick_task: Mutex::new(None),
        }
    }

    /// Receive a snapshot after every change, including each tick
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> Result<TimerSnapshot, String> {
        Ok(self.lock_machine()?.snapshot())
    }

    /// Copy of the list being counted
    pub fn sections(&self) -> Result<Vec<Section>, String> {
        Ok(self.lock_machine()?.sections().to_vec())
    }

    /// Start or resume, replacing any tick task that is still scheduled
    pub fn start(&self) -> Result<TimerSnapshot, String> {
        let mut machine = self.lock_machine()?;
        if !machine.start() {
            debug!("Start ignored in phase {:?}", machine.phase());
            return Ok(machine.snapshot());
        }

        let run = self.cancel_ticks();
        let task = tokio::spawn(run_ticks(
            Arc::clone(&self.machine),
            Arc::clone(&self.generation),
            self.updates.clone(),
            run,
        ));
        self.install_task(Some(task));

        Ok(self.publish(&machine))
    }

    pub fn pause(&self) -> Result<TimerSnapshot, String> {
        let mut machine = self.lock_machine()?;
        if machine.pause() {
            self.cancel_ticks();
            self.install_task(None);
        }
        Ok(self.publish(&machine))
    }

    pub fn reset(&self) -> Result<TimerSnapshot, String> {
        self.apply(TimerMachine::reset)
    }

    /// Install a new list and reset
    pub fn load(&self, sections: Vec<Section>) -> Result<TimerSnapshot, String> {
        self.apply(move |machine| machine.load(sections))
    }

    /// Install a new list without disturbing a run whose position survives
    pub fn sync_sections(&self, sections: Vec<Section>) -> Result<TimerSnapshot, String> {
        let mut machine = self.lock_machine()?;
        machine.sync_sections(sections);
        if !machine.is_running() {
            self.cancel_ticks();
            self.install_task(None);
        }
        Ok(self.publish(&machine))
    }

    /// Run a control operation that always stops ticking
    fn apply<F>(&self, op: F) -> Result<TimerSnapshot, String>
    where
        F: FnOnce(&mut TimerMachine),
    {
        let mut machine = self.lock_machine()?;
        self.cancel_ticks();
        self.install_task(None);
        op(&mut machine);
        Ok(self.publish(&machine))
    }

    fn lock_machine(&self) -> Result<MutexGuard<'_, TimerMachine>, String> {
        self.machine
            .lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    /// Invalidate the current run; returns the new generation
    fn cancel_ticks(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install_task(&self, task: Option<JoinHandle<()>>) {
        match self.tick_task.lock() {
            Ok(mut slot) => {
                if let Some(previous) = slot.take() {
                    previous.abort();
                }
                *slot = task;
            }
            Err(e) => error!("Failed to lock tick task slot: {}", e),
        }
    }

    fn publish(&self, machine: &TimerMachine) -> TimerSnapshot {
        let snapshot = machine.snapshot();
        self.updates.send_replace(snapshot.clone());
        snapshot
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.tick_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

/// Tick loop for one run; exits when the run is superseded or stops running
async fn run_ticks(
    machine: Arc<Mutex<TimerMachine>>,
    generation: Arc<AtomicU64>,
    updates: watch::Sender<TimerSnapshot>,
    run: u64,
) {
    debug!("Tick task started for run {}", run);

    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let snapshot = {
            let mut machine = match machine.lock() {
                Ok(machine) => machine,
                Err(e) => {
                    error!("Failed to lock timer state during tick: {}", e);
                    break;
                }
            };
            if generation.load(Ordering::SeqCst) != run {
                debug!("Dropping stale tick for run {}", run);
                break;
            }
            machine.tick();
            machine.snapshot()
        };

        let running = snapshot.running;
        updates.send_replace(snapshot);
        if !running {
            info!("Countdown stopped ticking");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    use crate::state::TimerPhase;

    fn driver(spec: &[(&str, i64)]) -> TimerDriver {
        let sections = spec
            .iter()
            .map(|(name, minutes)| Section::new(*name, *minutes).unwrap())
            .collect();
        TimerDriver::new(TimerMachine::with_sections(sections))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_and_advances() {
        let driver = driver(&[("Intro", 1), ("Main", 2)]);
        driver.start().unwrap();

        sleep(Duration::from_millis(10_500)).await;
        let snapshot = driver.snapshot().unwrap();
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.elapsed_seconds, 10);

        sleep(Duration::from_secs(50)).await;
        let snapshot = driver.snapshot().unwrap();
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.elapsed_seconds, 0);
        assert!(snapshot.running);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_finished_and_stops_ticking() {
        let driver = driver(&[("Intro", 1), ("Main", 2)]);
        driver.start().unwrap();

        sleep(Duration::from_millis(180_500)).await;
        let snapshot = driver.snapshot().unwrap();
        assert_eq!(snapshot.phase, TimerPhase::Finished);
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.elapsed_seconds, 120);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(driver.snapshot().unwrap().elapsed_seconds, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_never_double_tick() {
        let driver = driver(&[("Long", 10)]);
        driver.start().unwrap();
        sleep(Duration::from_millis(5_500)).await;

        driver.pause().unwrap();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(driver.snapshot().unwrap().elapsed_seconds, 5);

        driver.start().unwrap();
        driver.start().unwrap();
        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(driver.snapshot().unwrap().elapsed_seconds, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_and_load_cancel_pending_ticks() {
        let driver = driver(&[("Intro", 1)]);
        driver.start().unwrap();
        sleep(Duration::from_millis(3_500)).await;

        driver.reset().unwrap();
        sleep(Duration::from_secs(5)).await;
        let snapshot = driver.snapshot().unwrap();
        assert_eq!(snapshot.phase, TimerPhase::Ready);
        assert_eq!(snapshot.elapsed_seconds, 0);

        driver.start().unwrap();
        sleep(Duration::from_millis(2_500)).await;
        driver
            .load(vec![Section::new("Fresh", 2).unwrap()])
            .unwrap();
        sleep(Duration::from_secs(5)).await;
        let snapshot = driver.snapshot().unwrap();
        assert_eq!(snapshot.phase, TimerPhase::Ready);
        assert_eq!(snapshot.current_index, None);
        assert_eq!(snapshot.upcoming.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_every_tick() {
        let driver = driver(&[("Intro", 1)]);
        let mut updates = driver.subscribe();
        driver.start().unwrap();

        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().running);

        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().elapsed_seconds, 1);
    }

    #[tokio::test]
    async fn start_on_empty_list_does_nothing() {
        let driver = TimerDriver::new(TimerMachine::new());
        let snapshot = driver.start().unwrap();
        assert_eq!(snapshot.phase, TimerPhase::Idle);
        assert!(!snapshot.running);
    }
}
