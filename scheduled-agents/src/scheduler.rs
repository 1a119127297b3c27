//! Background scheduler loop
//!
//! Scans the store on a fixed tick and pushes every due agent through
//! the execution gate. On startup, stale next-run times (the process was
//! down when they fired) are recomputed forward; missed windows are not
//! replayed.

use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::executor::{AgentRunner, ExecutionGate, RunOutcome};
use crate::schedule;
use crate::store::AgentStore;

pub struct Scheduler {
    store: Arc<AgentStore>,
    runner: Arc<AgentRunner>,
    gate: ExecutionGate,
    offset: FixedOffset,
    tick: Duration,
}

impl Scheduler {
    pub fn new(
        store: Arc<AgentStore>,
        runner: Arc<AgentRunner>,
        gate: ExecutionGate,
        utc_offset_hours: i32,
        tick_interval_secs: u64,
    ) -> Self {
        Self {
            store,
            runner,
            gate,
            offset: schedule::zone_offset(utc_offset_hours),
            tick: Duration::from_secs(tick_interval_secs),
        }
    }

    /// Run the scheduler until the shutdown channel yields.
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        self.recover();
        info!(
            "Scheduler started (tick: {}s, offset: {})",
            self.tick.as_secs(),
            self.offset
        );

        let mut ticker = tokio::time::interval(self.tick);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.fire_due();
                }
                _ = shutdown.recv() => {
                    info!("Scheduler stopped");
                    break;
                }
            }
        }
    }

    /// Recompute stale next-run times after a restart.
    pub fn recover(&self) {
        let now = schedule::now_in(self.offset);
        let mut recovered = 0usize;

        for agent in self.store.load() {
            if !agent.is_active() {
                continue;
            }
            let stale = agent.next_run.map(|t| t <= now).unwrap_or(true);
            if !stale {
                continue;
            }

            match agent.schedule.next_run(now) {
                Ok(next) => {
                    if let Err(e) = self.store.mark_ran(agent.id, None, Some(next)) {
                        error!("Failed to reschedule agent '{}': {}", agent.name, e);
                    } else {
                        info!(
                            "Rescheduled agent '{}' ({}) for {}",
                            agent.name, agent.id, next
                        );
                        recovered += 1;
                    }
                }
                Err(e) => error!("Error scheduling agent '{}': {}", agent.name, e),
            }
        }

        if recovered > 0 {
            info!("Recovered {} agent schedule(s) on startup", recovered);
        }
    }

    fn fire_due(&self) {
        let now = schedule::now_in(self.offset);
        for agent in self.store.load() {
            if !agent.is_due(now) {
                continue;
            }
            let name = agent.name.clone();
            match self.gate.submit(agent, self.runner.clone()) {
                RunOutcome::Started => info!("Agent '{}' execution started", name),
                RunOutcome::Queued => info!("Agent '{}' queued for execution", name),
                RunOutcome::AlreadyRunning => {}
            }
        }
    }
}
