//! Fixed-depth ring buffer of normalized bundle offers

use std::collections::VecDeque;

/// The `lag` most recent normalized offers, most recent first.
///
/// Slots start zeroed; each push shifts every slot back by one and drops
/// the oldest.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceHistory {
    num_items: usize,
    slots: VecDeque<Vec<f64>>,
}

impl PriceHistory {
    pub fn new(lag: usize, num_items: usize) -> Self {
        Self {
            num_items,
            slots: (0..lag).map(|_| vec![0.0; num_items]).collect(),
        }
    }

    pub fn lag(&self) -> usize {
        self.slots.len()
    }

    /// Record a new normalized offer at slot 0
    pub fn push(&mut self, normalized: Vec<f64>) {
        debug_assert_eq!(normalized.len(), self.num_items);
        if self.slots.is_empty() {
            return;
        }
        self.slots.pop_back();
        self.slots.push_front(normalized);
    }

    /// Slot `index`, where 0 is the most recent offer
    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.slots.get(index).map(Vec::as_slice)
    }

    /// All slots flattened, most recent first
    pub fn flatten(&self) -> Vec<f64> {
        self.slots.iter().flatten().copied().collect()
    }
}
