use crate::core::price::PricePoint;
use std::collections::VecDeque;

/// A FIFO of price observations holding at most `capacity` points.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl PriceHistory {
    /// Creates an empty history. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `point`, evicting the oldest observation when full.
    pub fn push(&mut self, point: PricePoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.front()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn average_eth_usd(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let total: f64 = self.points.iter().map(|p| p.eth_usd).sum();
        Some(total / self.points.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn point(i: i64) -> PricePoint {
        PricePoint {
            eth_usd: 2000.0 + i as f64,
            eth_change_24h: 0.0,
            btc_usd: 60000.0,
            btc_change_24h: 0.0,
            observed_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(i * 15),
        }
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut history = PriceHistory::new(3);
        for i in 0..4 {
            history.push(point(i));
        }

        assert_eq!(history.len(), 3);
        let prices: Vec<f64> = history.iter().map(|p| p.eth_usd).collect();
        assert_eq!(prices, vec![2001.0, 2002.0, 2003.0]);
        assert_eq!(history.first().unwrap().eth_usd, 2001.0);
        assert_eq!(history.latest().unwrap().eth_usd, 2003.0);
    }

    #[test]
    fn test_keeps_everything_below_capacity() {
        let mut history = PriceHistory::new(50);
        history.push(point(0));
        history.push(point(1));
        assert_eq!(history.len(), 2);
        assert_eq!(history.capacity(), 50);
        assert_eq!(history.average_eth_usd(), Some(2000.5));
    }

    #[test]
    fn test_zero_capacity_holds_one_point() {
        let mut history = PriceHistory::new(0);
        assert!(history.is_empty());
        assert!(history.average_eth_usd().is_none());
        history.push(point(0));
        history.push(point(1));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().eth_usd, 2001.0);
    }
}
