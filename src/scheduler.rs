//! Virtual-time timer queue with cancellable tickets.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::engine::events::{Ticket, Timestamp};

/// Wrapper for priority queue ordering (earliest first)
#[derive(Debug)]
struct Due {
    at: Timestamp,
    ticket: Ticket,
}

impl PartialEq for Due {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.ticket == other.ticket
    }
}

impl Eq for Due {}

impl PartialOrd for Due {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Due {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; ties fire in ticket order
        match other.at.cmp(&self.at) {
            Ordering::Equal => other.ticket.cmp(&self.ticket),
            ord => ord,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Due>,
    cancelled: HashSet<Ticket>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, ticket: Ticket, at: Timestamp) {
        self.cancelled.remove(&ticket);
        self.queue.push(Due { at, ticket });
    }

    /// Returns false if the ticket was not armed.
    pub fn cancel(&mut self, ticket: Ticket) -> bool {
        if self.queue.iter().any(|d| d.ticket == ticket) {
            self.cancelled.insert(ticket)
        } else {
            false
        }
    }

    /// Earliest live due time.
    pub fn next_due(&mut self) -> Option<Timestamp> {
        self.skip_cancelled();
        self.queue.peek().map(|d| d.at)
    }

    /// Pop the next timer due at or before `until`.
    pub fn pop_due(&mut self, until: Timestamp) -> Option<(Timestamp, Ticket)> {
        self.skip_cancelled();
        match self.queue.peek() {
            Some(d) if d.at <= until => self.queue.pop().map(|d| (d.at, d.ticket)),
            _ => None,
        }
    }

    /// Live timers
    pub fn len(&self) -> usize {
        self.queue
            .iter()
            .filter(|d| !self.cancelled.contains(&d.ticket))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn skip_cancelled(&mut self) {
        while let Some(d) = self.queue.peek() {
            if self.cancelled.contains(&d.ticket) {
                let ticket = d.ticket;
                self.queue.pop();
                self.cancelled.remove(&ticket);
            } else {
                break;
            }
        }
    }
}
