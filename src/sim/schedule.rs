//! Tick-based deferred actions
//!
//! Delayed effects (enemy explosion and cleanup, terminal completion) are
//! queued with the tick they become due and applied at the start of that tick
//! on the simulation thread. A restart cancels everything still queued.

use crate::secs_to_ticks;

use super::actor::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Explosion at a dead enemy's position
    EnemyExplosion { enemy: ActorId },
    /// Remove a dead enemy's body and stop drawing it
    ReleaseEnemy { enemy: ActorId },
    /// Intro prompt finished: reveal guidance and trigger the terminal
    CompleteIntro { terminal: ActorId },
    /// Gate prompt finished: grant a life and lift the gate
    OpenGate { terminal: ActorId },
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due_tick: u64,
    seq: u64,
    action: DeferredAction,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: Vec<Scheduled>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action for an absolute tick
    pub fn schedule_at(&mut self, due_tick: u64, action: DeferredAction) {
        self.queue.push(Scheduled {
            due_tick,
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    /// Queue an action `delay_secs` after `now`; returns the due tick
    pub fn schedule_after(&mut self, now: u64, delay_secs: f64, action: DeferredAction) -> u64 {
        let due = now + secs_to_ticks(delay_secs);
        self.schedule_at(due, action);
        due
    }

    /// Remove and return every action due at or before `now`, oldest first
    pub fn drain_due(&mut self, now: u64) -> Vec<DeferredAction> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.queue.retain(|s| {
            if s.due_tick <= now {
                due.push(*s);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|s| (s.due_tick, s.seq));
        due.into_iter().map(|s| s.action).collect()
    }

    /// Drop everything; returns how many actions were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(10, DeferredAction::ReleaseEnemy { enemy: 1 });
        scheduler.schedule_at(5, DeferredAction::EnemyExplosion { enemy: 1 });
        scheduler.schedule_at(5, DeferredAction::OpenGate { terminal: 2 });

        assert!(scheduler.drain_due(4).is_empty());
        assert_eq!(
            scheduler.drain_due(5),
            vec![
                DeferredAction::EnemyExplosion { enemy: 1 },
                DeferredAction::OpenGate { terminal: 2 },
            ]
        );
        assert_eq!(scheduler.len(), 1);
        assert_eq!(
            scheduler.drain_due(100),
            vec![DeferredAction::ReleaseEnemy { enemy: 1 }]
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_schedule_after_uses_ticks() {
        let mut scheduler = Scheduler::new();
        let due = scheduler.schedule_after(30, 2.0, DeferredAction::CompleteIntro { terminal: 0 });
        assert_eq!(due, 150);
        assert!(scheduler.drain_due(149).is_empty());
        assert_eq!(scheduler.drain_due(150).len(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(1, DeferredAction::ReleaseEnemy { enemy: 0 });
        scheduler.schedule_at(2, DeferredAction::ReleaseEnemy { enemy: 1 });
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.drain_due(u64::MAX).is_empty());
    }
}
