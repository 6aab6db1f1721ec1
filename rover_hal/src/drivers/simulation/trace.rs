//! Bounded log of simulated line writes.

use rover_common::hal::types::Level;
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of events retained before the oldest are dropped.
pub const DEFAULT_TRACE_CAPACITY: usize = 100_000;

/// One recorded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    /// Line offset
    pub line: u32,
    /// Level written
    pub level: Level,
    /// Time since the driver was created
    pub at: Duration,
}

/// Ring buffer of [`LineEvent`]s.
#[derive(Debug)]
pub struct LineTrace {
    events: VecDeque<LineEvent>,
    capacity: usize,
    dropped: u64,
}

impl LineTrace {
    /// Trace holding at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Append an event, evicting the oldest when full.
    pub fn push(&mut self, event: LineEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Events evicted so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Iterate retained events oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LineEvent> {
        self.events.iter()
    }

    /// Timestamps of writes that changed `line` to `level`.
    ///
    /// Repeated writes of the same level are not edges.
    pub fn edges(&self, line: u32, level: Level, initial: Option<Level>) -> Vec<Duration> {
        let mut current = initial;
        let mut edges = Vec::new();
        for event in self.events.iter().filter(|e| e.line == line) {
            if event.level == level && current != Some(level) {
                edges.push(event.at);
            }
            current = Some(event.level);
        }
        edges
    }

    /// Forget all events.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}

impl Default for LineTrace {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRACE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(line: u32, level: Level, ms: u64) -> LineEvent {
        LineEvent {
            line,
            level,
            at: Duration::from_millis(ms),
        }
    }

    #[test]
    fn oldest_events_are_evicted() {
        let mut trace = LineTrace::with_capacity(2);
        trace.push(event(1, Level::High, 0));
        trace.push(event(1, Level::Low, 1));
        trace.push(event(1, Level::High, 2));
        assert_eq!(trace.dropped(), 1);
        assert_eq!(trace.iter().count(), 2);
    }

    #[test]
    fn edges_ignore_repeated_levels_and_other_lines() {
        let mut trace = LineTrace::default();
        trace.push(event(13, Level::High, 0));
        trace.push(event(13, Level::High, 1));
        trace.push(event(5, Level::High, 2));
        trace.push(event(13, Level::Low, 3));
        trace.push(event(13, Level::High, 4));

        let edges = trace.edges(13, Level::High, Some(Level::Low));
        assert_eq!(edges, vec![Duration::from_millis(0), Duration::from_millis(4)]);
    }
}
