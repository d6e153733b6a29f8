// src/utils/ids.rs

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Creation-time ids: current Unix milliseconds, bumped past the last id
/// handed out so a batch generated within one millisecond never collides.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never hands out an id at or below `floor` (e.g. the highest stored id).
    pub fn observe(&self, floor: i64) {
        self.last.fetch_max(floor, Ordering::SeqCst);
    }

    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let ids = IdGenerator::new();
        let mut prev = ids.next();
        for _ in 0..1000 {
            let id = ids.next();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn observed_floor_is_respected() {
        let ids = IdGenerator::new();
        let floor = Utc::now().timestamp_millis() + 10_000;
        ids.observe(floor);
        assert!(ids.next() > floor);
    }
}
