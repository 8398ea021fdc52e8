use std::collections::VecDeque;
/// Majority vote over the last `capacity` labels to suppress jitter.
pub struct TemporalSmoother<T> {
    history: VecDeque<T>,
    capacity: usize,
}
impl<T: Copy + PartialEq> TemporalSmoother<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    /// Records `raw` (evicting the oldest label when full) and returns the
    /// most frequent label in the history.
    pub fn push(&mut self, raw: T) -> T {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(raw);
        self.majority().unwrap_or(raw)
    }
    /// Most frequent label; ties go to the label that occurs first in the
    /// history (oldest first).
    pub fn majority(&self) -> Option<T> {
        let mut best: Option<(T, usize)> = None;
        for (i, &label) in self.history.iter().enumerate() {
            if self.history.iter().take(i).any(|&seen| seen == label) {
                continue;
            }
            let count = self.history.iter().filter(|&&other| other == label).count();
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((label, count)),
            }
        }
        best.map(|(label, _)| label)
    }
    pub fn history(&self) -> impl Iterator<Item = &T> {
        self.history.iter()
    }
    pub fn len(&self) -> usize {
        self.history.len()
    }
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
