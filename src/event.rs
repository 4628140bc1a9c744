//! Discrete-event queue: a min-heap ordered by simulation time, with a
//! stable insertion-sequence tie-break and lazy-tombstone cancellation.
//!
//! Grounded in the `Queued<T>` pattern used for fault-tolerance-simulator
//! event scheduling: `std::collections::BinaryHeap` is a max-heap, so `Ord`
//! is implemented in reverse to make it behave as a min-heap over time.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use ordered_float::OrderedFloat;

use crate::failure::{DisasterEventId, FailureId};
use crate::service::ServiceId;

pub type EventId = u64;

#[derive(Debug, Clone)]
pub enum Event {
    /// A new service request arrives; no payload, the service is minted
    /// when the event is processed.
    Arrival,
    Departure(ServiceId),
    LinkFailureArrival(FailureId),
    LinkFailureDeparture(FailureId),
    DisasterArrival(DisasterEventId),
    DisasterDeparture(DisasterEventId),
    /// Resets `current_failure_probability` to zero on every link armed by
    /// one zone activation, once that zone is fully consumed (spec §4.7).
    ZoneClear(DisasterEventId),
}

struct Queued {
    time: OrderedFloat<f64>,
    seq: u64,
    id: EventId,
    event: Event,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for Queued {}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on both fields: BinaryHeap pops the greatest element, we
        // want the earliest time, and on a tie the one inserted first.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Queued>,
    next_id: EventId,
    next_seq: u64,
    cancelled: HashSet<EventId>,
    pending: HashSet<EventId>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, time: f64, event: Event) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(id);
        self.heap.push(Queued {
            time: OrderedFloat(time),
            seq,
            id,
            event,
        });
        id
    }

    /// Marks `id` as cancelled; it is skipped, not removed, the next time it
    /// would be popped. Returns `true` if `id` was still pending (i.e. this
    /// cancellation actually landed on a live event), `false` if it was
    /// already popped, already cancelled, or never existed — callers that
    /// treat cancellation of a dead id as a fatal invariant must check this.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if self.pending.remove(&id) {
            self.cancelled.insert(id);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<(f64, Event)> {
        while let Some(q) = self.heap.pop() {
            if self.cancelled.remove(&q.id) {
                continue;
            }
            self.pending.remove(&q.id);
            return Some((q.time.into_inner(), q.event));
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule(5.0, Event::Arrival);
        q.schedule(1.0, Event::Arrival);
        q.schedule(3.0, Event::Arrival);
        let times: Vec<f64> = std::iter::from_fn(|| q.pop().map(|(t, _)| t)).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn equal_times_break_ties_by_insertion_order() {
        let mut q = EventQueue::new();
        let first = q.schedule(1.0, Event::Departure(1));
        let second = q.schedule(1.0, Event::Departure(2));
        let _ = first;
        let _ = second;
        let (t1, e1) = q.pop().unwrap();
        let (t2, e2) = q.pop().unwrap();
        assert_eq!(t1, t2);
        assert!(matches!(e1, Event::Departure(1)));
        assert!(matches!(e2, Event::Departure(2)));
    }

    #[test]
    fn cancelled_event_is_skipped_on_pop() {
        let mut q = EventQueue::new();
        let id = q.schedule(1.0, Event::Departure(42));
        q.schedule(2.0, Event::Departure(43));
        assert!(q.cancel(id));
        let (_, event) = q.pop().unwrap();
        assert!(matches!(event, Event::Departure(43)));
        assert!(q.pop().is_none());
    }

    #[test]
    fn cancelling_an_unknown_id_reports_false_and_is_a_no_op() {
        let mut q = EventQueue::new();
        q.schedule(1.0, Event::Arrival);
        assert!(!q.cancel(999));
        assert!(q.pop().is_some());
    }

    #[test]
    fn cancelling_an_already_popped_id_reports_false() {
        let mut q = EventQueue::new();
        let id = q.schedule(1.0, Event::Arrival);
        q.pop();
        assert!(!q.cancel(id));
    }

    #[test]
    fn cancelling_an_already_cancelled_id_reports_false_the_second_time() {
        let mut q = EventQueue::new();
        let id = q.schedule(1.0, Event::Arrival);
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
    }
}
