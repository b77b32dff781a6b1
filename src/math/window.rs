//! Rolling Window
//!
//! Fixed-capacity circular buffer holding the most recent samples of a channel.
//! Pushing into a full window overwrites the oldest entry in O(1).

/// `RollingWindow` structure.
///
/// Stores at most `capacity` values. Iteration always yields the oldest value first.
#[derive(Clone, Debug)]
pub struct RollingWindow<T: Copy + Default> {
    data: Vec<T>,
    /// Index of the oldest element.
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RollingWindow<T> {
    /// Creates an empty window. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Appends a value, evicting the oldest one if the window is full.
    ///
    /// # Returns
    /// The evicted value, if any.
    pub fn push(&mut self, value: T) -> Option<T> {
        let capacity = self.data.len();
        if self.len < capacity {
            let tail = (self.head + self.len) % capacity;
            self.data[tail] = value;
            self.len += 1;
            None
        } else {
            let evicted = std::mem::replace(&mut self.data[self.head], value);
            self.head = (self.head + 1) % capacity;
            Some(evicted)
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// Returns the value at `index`, counted from the oldest element.
    pub fn get(&self, index: usize) -> Option<T> {
        (index < self.len).then(|| self.data[(self.head + index) % self.data.len()])
    }

    /// Returns the most recently pushed value.
    pub fn last(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|idx| self.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |idx| self.data[(self.head + idx) % self.data.len()])
    }

    /// Copies the window into a vector, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Drops all values. The capacity is kept.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.push(1.0), None);
        assert_eq!(window.push(2.0), None);
        assert!(!window.is_full());
        assert_eq!(window.push(3.0), None);
        assert!(window.is_full());
        assert_eq!(window.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for value in 0..10 {
            window.push(value);
            assert!(window.len() <= window.capacity());
        }
        assert_eq!(window.to_vec(), vec![7, 8, 9]);
        assert_eq!(window.get(0), Some(7));
        assert_eq!(window.last(), Some(9));
        assert_eq!(window.get(3), None);
    }

    #[test]
    fn test_push_returns_evicted() {
        let mut window = RollingWindow::new(2);
        window.push('a');
        window.push('b');
        assert_eq!(window.push('c'), Some('a'));
        assert_eq!(window.push('d'), Some('b'));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut window = RollingWindow::new(4);
        window.push(1u8);
        window.push(2u8);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 4);
        assert_eq!(window.last(), None);
        window.push(5u8);
        assert_eq!(window.to_vec(), vec![5]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut window = RollingWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(1);
        window.push(2);
        assert_eq!(window.to_vec(), vec![2]);
    }
}
