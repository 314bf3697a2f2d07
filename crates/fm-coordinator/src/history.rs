//! Fixed-capacity per-metric time series

use std::collections::VecDeque;

use fm_protocol::HistoryPoint;

/// Ring of `(time-label, value)` points with FIFO eviction.
///
/// Length never exceeds the capacity; appending to a full buffer drops the
/// oldest point first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full.
    pub fn push(&mut self, point: HistoryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Snapshot the points oldest-first.
    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64) -> HistoryPoint {
        HistoryPoint::new("00:00:00", value)
    }

    #[test]
    fn test_push_within_capacity() {
        let mut buffer = HistoryBuffer::new(3);
        buffer.push(point(1.0));
        buffer.push(point(2.0));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        let mut buffer = HistoryBuffer::new(50);
        for i in 0..51 {
            buffer.push(point(i as f64));
        }
        assert_eq!(buffer.len(), 50);

        let points = buffer.to_vec();
        // The first point (value 0) was evicted
        assert_eq!(points.first().unwrap().value, 1.0);
        assert_eq!(points.last().unwrap().value, 50.0);
    }

    #[test]
    fn test_order_is_oldest_first() {
        let mut buffer = HistoryBuffer::new(4);
        for i in 0..4 {
            buffer.push(point(i as f64));
        }
        let values: Vec<f64> = buffer.to_vec().into_iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
