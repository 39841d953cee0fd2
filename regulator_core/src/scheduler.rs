//! Single-threaded timer queue.
//!
//! Timers live in a min-heap keyed by `(fire_at, sequence)`. Cancelling or
//! re-arming only touches the `armed` table; heap entries whose deadline no
//! longer matches are discarded when they surface.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ControlTick,
    DisplayRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub kind: TimerKind,
    /// Deadline the timer was due at (not when it was popped).
    pub due: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    kind: TimerKind,
    period: Option<Duration>,
    fire_at: Instant,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<(Instant, u64, TimerId)>>,
    armed: HashMap<TimerId, Armed>,
    next_id: u64,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, id: TimerId, fire_at: Instant) {
        self.seq = self.seq.wrapping_add(1);
        self.queue.push(Reverse((fire_at, self.seq, id)));
    }

    fn insert(&mut self, kind: TimerKind, fire_at: Instant, period: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.armed.insert(
            id,
            Armed {
                kind,
                period,
                fire_at,
            },
        );
        self.push(id, fire_at);
        id
    }

    /// One-shot timer.
    pub fn schedule(&mut self, kind: TimerKind, fire_at: Instant) -> TimerId {
        self.insert(kind, fire_at, None)
    }

    /// Periodic timer; first fires at `first`, then every `period`.
    pub fn schedule_every(&mut self, kind: TimerKind, first: Instant, period: Duration) -> TimerId {
        self.insert(kind, first, Some(period.max(Duration::from_millis(1))))
    }

    /// Returns false if the timer was not armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.armed.remove(&id).is_some()
    }

    /// Move an armed timer to a new deadline. Returns false if not armed.
    pub fn rearm(&mut self, id: TimerId, fire_at: Instant) -> bool {
        match self.armed.get_mut(&id) {
            Some(a) => {
                a.fire_at = fire_at;
                self.push(id, fire_at);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.drop_stale();
        self.queue.peek().map(|Reverse((at, _, _))| *at)
    }

    /// Pop the earliest timer due at or before `now`.
    ///
    /// Periodic timers are re-armed one period after their deadline; if that is
    /// already in the past they skip ahead to `now + period` instead of
    /// firing in a burst.
    pub fn pop_due(&mut self, now: Instant) -> Option<Fired> {
        self.drop_stale();
        let &Reverse((at, _, id)) = self.queue.peek()?;
        if at > now {
            return None;
        }
        self.queue.pop();
        let armed = *self.armed.get(&id)?;
        match armed.period {
            Some(period) => {
                let mut next = at + period;
                if next <= now {
                    next = now + period;
                }
                self.rearm(id, next);
            }
            None => {
                self.armed.remove(&id);
            }
        }
        Some(Fired {
            id,
            kind: armed.kind,
            due: at,
        })
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.armed.clear();
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    fn drop_stale(&mut self) {
        while let Some(&Reverse((at, _, id))) = self.queue.peek() {
            match self.armed.get(&id) {
                Some(a) if a.fire_at == at => break,
                _ => {
                    self.queue.pop();
                }
            }
        }
    }
}
