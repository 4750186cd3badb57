//! Bounded event window with task corrections.

use std::collections::VecDeque;

use crate::completion::{CompletionEvent, SourceKind};

/// Keeps the last `capacity` counted events in arrival order.
///
/// A negative task event removes the most recent positive event for the same
/// task instead of being appended, and the most recently evicted event moves
/// back into the window. Completing then un-completing a task therefore
/// leaves the window exactly as it was. Habit events are never cancelled.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    events: VecDeque<CompletionEvent>,
    /// Evicted events, newest last. Bounded by `capacity`.
    evicted: VecDeque<CompletionEvent>,
}

impl RollingWindow {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
            evicted: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: CompletionEvent) {
        if self.cancel(&event) {
            return;
        }
        if self.events.len() == self.capacity {
            if let Some(oldest) = self.events.pop_front() {
                if self.evicted.len() == self.capacity {
                    self.evicted.pop_front();
                }
                self.evicted.push_back(oldest);
            }
        }
        self.events.push_back(event);
    }

    /// Remove the positive event a task correction refers to.
    fn cancel(&mut self, event: &CompletionEvent) -> bool {
        if event.positive() || event.source_kind() != SourceKind::Task {
            return false;
        }
        let Some(index) = self
            .events
            .iter()
            .rposition(|e| e.positive() && e.same_source(event))
        else {
            return false;
        };
        self.events.remove(index);
        if let Some(restored) = self.evicted.pop_back() {
            self.events.push_front(restored);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Contiguous view, oldest first.
    pub fn as_slice(&mut self) -> &[CompletionEvent] {
        self.events.make_contiguous()
    }
}
