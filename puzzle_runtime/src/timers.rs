use std::collections::BTreeMap;

use puzzle_scene::SceneEngine;

use crate::runtime::{Callback, Runtime};

/// Shortest interval a timer may use.
pub const MIN_INTERVAL_SECONDS: f64 = 0.004;

struct Timer<S> {
    interval: f64,
    next_fire: f64,
    /// Ticks left to deliver; `None` repeats until removed.
    remaining: Option<u32>,
    callback: Callback<S>,
}

/// Interval timers keyed by id, driven by the runtime clock.
pub(crate) struct TimerRegistry<S> {
    clock: f64,
    timers: BTreeMap<String, Timer<S>>,
}

impl<S> Default for TimerRegistry<S> {
    fn default() -> Self {
        TimerRegistry {
            clock: 0.0,
            timers: BTreeMap::new(),
        }
    }
}

impl<S> TimerRegistry<S> {
    fn insert(&mut self, id: &str, interval: f64, callback: Callback<S>, repeat: Option<u32>) {
        let interval = interval.max(MIN_INTERVAL_SECONDS);
        self.timers.insert(
            id.to_string(),
            Timer {
                interval,
                next_fire: self.clock + interval,
                remaining: repeat,
                callback,
            },
        );
    }

    fn remove(&mut self, id: &str) -> bool {
        self.timers.remove(id).is_some()
    }

    /// Pops the earliest tick due at or before `until` that should deliver its
    /// callback. Exhausted timers are dropped as their last tick passes.
    fn next_due(&mut self, until: f64) -> Option<(String, Callback<S>)> {
        loop {
            let (id, due) = self
                .timers
                .iter()
                .map(|(id, timer)| (id.clone(), timer.next_fire))
                .filter(|(_, due)| *due <= until)
                .min_by(|a, b| a.1.total_cmp(&b.1))?;
            self.clock = due;
            let timer = self.timers.get_mut(&id)?;
            timer.next_fire += timer.interval;
            let fires = match timer.remaining.as_mut() {
                None => true,
                Some(remaining) => {
                    let positive = *remaining > 0;
                    *remaining = remaining.saturating_sub(1);
                    positive
                }
            };
            let callback = timer.callback.clone();
            if timer.remaining == Some(0) {
                self.timers.remove(&id);
            }
            if fires {
                return Some((id, callback));
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.timers.clear();
    }

    fn len(&self) -> usize {
        self.timers.len()
    }
}

impl<S: SceneEngine + 'static> Runtime<S> {
    /// Starts an interval timer under `id`, replacing any timer already
    /// registered there. `repeat` bounds the number of callbacks; `None`
    /// keeps firing until removed.
    pub fn set_timer(
        &mut self,
        id: &str,
        interval_seconds: f64,
        callback: Callback<S>,
        repeat: Option<u32>,
    ) {
        self.timers.insert(id, interval_seconds, callback, repeat);
    }

    pub fn remove_timer(&mut self, id: &str) {
        if self.timers.remove(id) {
            log::trace!(target: "puzzle_runtime", "timer {id} removed");
        }
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Seconds elapsed on the runtime clock.
    pub fn clock(&self) -> f64 {
        self.timers.clock
    }

    pub(crate) fn tick_timers(&mut self, delta: f64) {
        let until = self.timers.clock + delta;
        while let Some((id, callback)) = self.timers.next_due(until) {
            self.log_event(format!("timer.fire {id}"));
            callback.call(self);
        }
        self.timers.clock = until;
    }
}
