//! Cosmetic timers owned by the spin state machine.
//!
//! Each timer is a tokio task held in a named slot. Re-arming a slot aborts the task it
//! replaces, disarming aborts it, and dropping the set aborts everything, so no tick can fire
//! against an attempt that has already moved on.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Countdown,
    TipRotation,
}

#[derive(Debug, Default)]
pub struct ScopedTimerSet {
    slots: HashMap<TimerSlot, JoinHandle<()>>,
}

impl ScopedTimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `tick` every `period`, first after one full period. The timer disarms itself
    /// once `tick` returns `false`.
    pub fn every<F>(&mut self, slot: TimerSlot, period: Duration, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !tick() {
                    break;
                }
            }
        });
        self.install(slot, handle);
    }

    fn install(&mut self, slot: TimerSlot, handle: JoinHandle<()>) {
        if let Some(previous) = self.slots.insert(slot, handle) {
            previous.abort();
        }
    }

    pub fn disarm(&mut self, slot: TimerSlot) {
        if let Some(handle) = self.slots.remove(&slot) {
            handle.abort();
        }
    }

    pub fn disarm_all(&mut self) {
        for (_, handle) in self.slots.drain() {
            handle.abort();
        }
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.slots
            .get(&slot)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Number of timers still able to fire.
    pub fn armed(&self) -> usize {
        self.slots.values().filter(|handle| !handle.is_finished()).count()
    }
}

impl Drop for ScopedTimerSet {
    fn drop(&mut self) {
        self.disarm_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicU32>, impl FnMut() -> bool + Send + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let ticks = count.clone();
        (count, move || {
            ticks.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_disarmed() {
        let mut timers = ScopedTimerSet::new();
        let (count, tick) = counter();
        timers.every(TimerSlot::Countdown, Duration::from_secs(1), tick);

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(timers.is_armed(TimerSlot::Countdown));

        timers.disarm(TimerSlot::Countdown);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(timers.armed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stops_itself() {
        let mut timers = ScopedTimerSet::new();
        let remaining = Arc::new(AtomicU32::new(3));
        let left = remaining.clone();
        timers.every(TimerSlot::Countdown, Duration::from_secs(1), move || {
            left.fetch_sub(1, Ordering::SeqCst) > 1
        });

        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(remaining.load(Ordering::SeqCst), 0);
        assert!(!timers.is_armed(TimerSlot::Countdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_previous_timer() {
        let mut timers = ScopedTimerSet::new();
        let (first, tick) = counter();
        timers.every(TimerSlot::TipRotation, Duration::from_secs(2), tick);
        let (second, tick) = counter();
        timers.every(TimerSlot::TipRotation, Duration::from_secs(2), tick);

        sleep(Duration::from_millis(4_500)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(timers.armed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disarms_everything() {
        let (count, tick) = counter();
        {
            let mut timers = ScopedTimerSet::new();
            timers.every(TimerSlot::Countdown, Duration::from_secs(1), tick);
        }
        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
