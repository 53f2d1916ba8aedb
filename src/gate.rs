//! The fairness gate: strict arrival-order admission to the window's
//! critical section.
//!
//! Without it, a thread that has waited longest on a full window could
//! be passed over indefinitely by newly arriving threads that get lucky
//! with scheduling. The gate hands out tickets in arrival order and
//! only lets the head-of-line ticket attempt admission; a thread that
//! must sleep for window expiry keeps its place in line while releasing
//! the lock condvar-style.
//!
//! This is plain bookkeeping data. The owning limiter guards it with
//! its own mutex and performs the actual blocking.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub(crate) struct FairGate {
    next: u64,
    serving: u64,
    abandoned: HashSet<u64>,
}

impl FairGate {
    /// Joins the back of the line, returning this caller's ticket.
    pub(crate) fn ticket(&mut self) -> u64 {
        let ticket = self.next;
        self.next += 1;
        ticket
    }

    /// Whether the given ticket is at the head of the line.
    pub(crate) fn is_turn(&self, ticket: u64) -> bool {
        self.serving == ticket
    }

    /// Whether nobody holds or waits for the gate.
    pub(crate) fn idle(&self) -> bool {
        self.serving == self.next
    }

    /// Retires a ticket, either because its admission attempt finished
    /// or because its owner gave up while still queued.
    ///
    /// Retiring the head advances the line, skipping over any tickets
    /// whose owners abandoned them in the meantime. Retiring a queued
    /// ticket marks it to be skipped once the line reaches it.
    pub(crate) fn retire(&mut self, ticket: u64) {
        if self.serving == ticket {
            self.serving += 1;
            while self.abandoned.remove(&self.serving) {
                self.serving += 1;
            }
        } else {
            self.abandoned.insert(ticket);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn serves_in_arrival_order() {
        let mut gate = FairGate::default();
        assert!(gate.idle());
        let a = gate.ticket();
        let b = gate.ticket();
        let c = gate.ticket();
        assert!(gate.is_turn(a));
        assert!(!gate.is_turn(b));
        gate.retire(a);
        assert!(gate.is_turn(b));
        gate.retire(b);
        assert!(gate.is_turn(c));
        gate.retire(c);
        assert!(gate.idle());
    }

    #[test]
    fn skips_abandoned_tickets() {
        let mut gate = FairGate::default();
        let a = gate.ticket();
        let b = gate.ticket();
        let c = gate.ticket();
        let d = gate.ticket();

        // b and c give up while still queued behind a.
        gate.retire(c);
        gate.retire(b);
        assert!(gate.is_turn(a));
        gate.retire(a);
        assert!(gate.is_turn(d));
        gate.retire(d);
        assert!(gate.idle());
    }

    #[test]
    fn head_retirement_is_immediate() {
        let mut gate = FairGate::default();
        let a = gate.ticket();
        gate.retire(a);
        assert!(gate.idle());
        let b = gate.ticket();
        assert!(gate.is_turn(b));
    }
}
