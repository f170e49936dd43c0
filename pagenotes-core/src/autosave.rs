//! Autosave Scheduler: debounces mutation bursts into single writes.
//!
//! A pure state machine over `Idle -> Pending -> Flushing -> Idle`. It does
//! no I/O and takes the clock as an argument, so the driving view (and the
//! tests) stay fully deterministic. Writes never overlap: a mutation that
//! arrives while a flush is in flight re-arms a fresh Pending cycle that
//! starts only once the flush completes.

use std::time::{Duration, Instant};

/// Default quiet period before a pending mutation is flushed.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushState {
    Idle,
    Pending { deadline: Instant },
    Flushing { rearm: bool },
}

#[derive(Debug)]
pub struct AutosaveScheduler {
    delay: Duration,
    state: FlushState,
}

impl AutosaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: FlushState::Idle,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Records a mutation. Arms the debounce deadline, pushes an already
    /// armed deadline out (only the trailing edit of a burst flushes), or
    /// queues a re-arm when a flush is currently in flight.
    pub fn record_mutation(&mut self, now: Instant) {
        self.state = match self.state {
            FlushState::Idle | FlushState::Pending { .. } => FlushState::Pending {
                deadline: now + self.delay,
            },
            FlushState::Flushing { .. } => FlushState::Flushing { rearm: true },
        };
    }

    /// The instant the pending flush becomes due, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            FlushState::Pending { deadline } => Some(deadline),
            FlushState::Idle | FlushState::Flushing { .. } => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == FlushState::Idle
    }

    /// True while a mutation awaits persistence (armed or queued behind an
    /// in-flight flush).
    pub fn has_pending_work(&self) -> bool {
        match self.state {
            FlushState::Idle => false,
            FlushState::Pending { .. } => true,
            FlushState::Flushing { rearm } => rearm,
        }
    }

    /// Starts a flush when the armed deadline has passed. Returns whether
    /// the caller should perform the write.
    pub fn begin_flush_if_due(&mut self, now: Instant) -> bool {
        match self.state {
            FlushState::Pending { deadline } if now >= deadline => {
                self.state = FlushState::Flushing { rearm: false };
                true
            }
            _ => false,
        }
    }

    /// Starts an unconditional flush of any armed mutation, bypassing the
    /// debounce delay. From Idle this is a no-op; during an in-flight flush
    /// it queues a re-arm so the latest state is persisted afterwards.
    pub fn begin_force_flush(&mut self) -> bool {
        match self.state {
            FlushState::Pending { .. } => {
                self.state = FlushState::Flushing { rearm: false };
                true
            }
            FlushState::Idle => false,
            FlushState::Flushing { .. } => {
                self.state = FlushState::Flushing { rearm: true };
                false
            }
        }
    }

    /// Completes the in-flight flush, whether it succeeded or failed.
    /// Returns true when a mutation arrived mid-flush and a new Pending
    /// cycle was armed. After a failure the machine lands in Idle the same
    /// way, so the next mutation retries naturally.
    pub fn finish_flush(&mut self, now: Instant) -> bool {
        match self.state {
            FlushState::Flushing { rearm: true } => {
                self.state = FlushState::Pending {
                    deadline: now + self.delay,
                };
                true
            }
            FlushState::Flushing { rearm: false } => {
                self.state = FlushState::Idle;
                false
            }
            _ => false,
        }
    }
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (AutosaveScheduler, Instant) {
        (
            AutosaveScheduler::new(Duration::from_millis(100)),
            Instant::now(),
        )
    }

    #[test]
    fn mutation_arms_the_debounce_deadline() {
        let (mut sched, t0) = scheduler();
        assert!(sched.is_idle());
        sched.record_mutation(t0);
        assert_eq!(sched.deadline(), Some(t0 + Duration::from_millis(100)));
        assert!(sched.has_pending_work());
    }

    #[test]
    fn rapid_mutations_coalesce_into_one_flush() {
        let (mut sched, t0) = scheduler();
        for i in 0u64..5 {
            sched.record_mutation(t0 + Duration::from_millis(i * 30));
        }
        // Last mutation at t0+120ms pushed the deadline to t0+220ms.
        assert!(!sched.begin_flush_if_due(t0 + Duration::from_millis(200)));
        assert!(sched.begin_flush_if_due(t0 + Duration::from_millis(220)));
        assert!(!sched.finish_flush(t0 + Duration::from_millis(221)));
        assert!(sched.is_idle());
    }

    #[test]
    fn flush_is_not_due_before_the_quiet_period() {
        let (mut sched, t0) = scheduler();
        sched.record_mutation(t0);
        assert!(!sched.begin_flush_if_due(t0 + Duration::from_millis(99)));
        assert!(sched.begin_flush_if_due(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn force_flush_bypasses_the_delay() {
        let (mut sched, t0) = scheduler();
        sched.record_mutation(t0);
        assert!(sched.begin_force_flush());
        assert!(!sched.finish_flush(t0));
        assert!(sched.is_idle());
    }

    #[test]
    fn force_flush_from_idle_is_a_no_op() {
        let (mut sched, _) = scheduler();
        assert!(!sched.begin_force_flush());
        assert!(sched.is_idle());
    }

    #[test]
    fn mutation_during_flight_rearms_a_new_cycle() {
        let (mut sched, t0) = scheduler();
        sched.record_mutation(t0);
        assert!(sched.begin_flush_if_due(t0 + Duration::from_millis(100)));

        // Keystroke lands while the write is still in flight.
        let mid_flight = t0 + Duration::from_millis(110);
        sched.record_mutation(mid_flight);
        assert!(sched.has_pending_work());
        assert!(sched.deadline().is_none());

        let done = t0 + Duration::from_millis(130);
        assert!(sched.finish_flush(done));
        assert_eq!(sched.deadline(), Some(done + Duration::from_millis(100)));
    }

    #[test]
    fn force_flush_during_flight_queues_a_rearm() {
        let (mut sched, t0) = scheduler();
        sched.record_mutation(t0);
        assert!(sched.begin_force_flush());
        assert!(!sched.begin_force_flush());
        assert!(sched.finish_flush(t0));
        assert!(sched.has_pending_work());
    }

    #[test]
    fn failed_flush_leaves_the_machine_retryable() {
        let (mut sched, t0) = scheduler();
        sched.record_mutation(t0);
        assert!(sched.begin_flush_if_due(t0 + Duration::from_millis(100)));
        // The write failed; completion handling is identical.
        assert!(!sched.finish_flush(t0 + Duration::from_millis(101)));
        assert!(sched.is_idle());

        sched.record_mutation(t0 + Duration::from_millis(200));
        assert!(sched.begin_flush_if_due(t0 + Duration::from_millis(300)));
    }
}
