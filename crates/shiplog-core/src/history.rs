use crate::model::Snapshot;
use std::collections::VecDeque;
use tracing::debug;

/// Linear undo/redo history over snapshots.
///
/// Recording discards any redo path. `max_past`, when set, evicts the oldest
/// entries so the first states of a long session can no longer be reached.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    past: Vec<Snapshot>,
    present: Snapshot,
    future: VecDeque<Snapshot>,
    max_past: Option<usize>,
    gesture_origin: Option<Snapshot>,
}

impl History {
    pub fn new(present: Snapshot) -> Self {
        History {
            past: Vec::new(),
            present,
            future: VecDeque::new(),
            max_past: None,
            gesture_origin: None,
        }
    }

    pub fn with_limit(present: Snapshot, max_past: Option<usize>) -> Self {
        History {
            max_past,
            ..History::new(present)
        }
    }

    pub fn present(&self) -> &Snapshot {
        &self.present
    }

    pub fn past(&self) -> &[Snapshot] {
        &self.past
    }

    /// Redo entries, next-to-redo first.
    pub fn future(&self) -> impl ExactSizeIterator<Item = &Snapshot> {
        self.future.iter()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty() || self.gesture_changed()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture_origin.is_some()
    }

    pub fn record(&mut self, next: Snapshot) {
        self.end_gesture();
        let previous = std::mem::replace(&mut self.present, next);
        self.push_past(previous);
        self.future.clear();
        debug!(past = self.past.len(), "history record");
    }

    /// Replace the present without creating an undo step. Only meant for
    /// restoring a session at startup.
    pub fn set_without_recording(&mut self, snapshot: Snapshot) {
        self.present = snapshot;
    }

    pub fn undo(&mut self) -> bool {
        self.end_gesture();
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        debug!(past = self.past.len(), future = self.future.len(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        self.end_gesture();
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.push_past(current);
        debug!(past = self.past.len(), future = self.future.len(), "redo");
        true
    }

    /// Show an intermediate state of a continuous gesture (a drag).
    /// The state before the first preview is kept until `end_gesture`.
    pub fn preview(&mut self, next: Snapshot) {
        if self.gesture_origin.is_none() {
            self.gesture_origin = Some(self.present.clone());
        }
        self.present = next;
    }

    /// Fold an open gesture into a single history entry. A gesture that
    /// ended where it started records nothing.
    pub fn end_gesture(&mut self) -> bool {
        let Some(origin) = self.gesture_origin.take() else {
            return false;
        };
        if origin == self.present {
            return false;
        }
        self.push_past(origin);
        self.future.clear();
        debug!(past = self.past.len(), "gesture recorded");
        true
    }

    fn gesture_changed(&self) -> bool {
        self.gesture_origin
            .as_ref()
            .is_some_and(|origin| origin != &self.present)
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push(snapshot);
        if let Some(max) = self.max_past {
            if self.past.len() > max {
                let overflow = self.past.len() - max;
                self.past.drain(..overflow);
            }
        }
    }
}
