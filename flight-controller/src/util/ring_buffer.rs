/// Fixed-capacity circular buffer, overwrites the oldest entry once full.
#[derive(Debug, Clone)]
pub struct RingBuffer<T: Copy + Default, const N: usize> {
    buffer: [T; N],
    head: usize,
    len: usize,
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        Self {
            buffer: [T::default(); N],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        self.buffer[self.head] = value;
        self.head = (self.head + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Valid entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let start = (self.head + N - self.len) % N.max(1);
        (0..self.len).map(move |offset| self.buffer[(start + offset) % N])
    }

    pub fn latest(&self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            Some(self.buffer[(self.head + N - 1) % N])
        }
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f32, N> {
    /// Middle-ranked valid entry after a full sort (upper middle while the window is still filling with an even count).
    pub fn median(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let mut sorted = [0.0_f32; N];
        for (slot, value) in sorted.iter_mut().zip(self.iter()) {
            *slot = value;
        }
        let valid = &mut sorted[..self.len];
        valid.sort_unstable_by(f32::total_cmp);
        Some(valid[self.len / 2])
    }

    pub fn average(&self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        Some(self.iter().sum::<f32>() / self.len as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_entries() {
        let mut buffer = RingBuffer::<u8, 3>::new();
        assert!(buffer.is_empty());
        for value in 1..=5 {
            buffer.push(value);
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(buffer.latest(), Some(5));
        buffer.clear();
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn median_and_average_over_partial_window() {
        let mut buffer = RingBuffer::<f32, 5>::new();
        assert_eq!(buffer.median(), None);
        buffer.push(4.0);
        buffer.push(100.0);
        buffer.push(1.0);
        assert_eq!(buffer.median(), Some(4.0));
        assert_eq!(buffer.average(), Some(35.0));
    }

    #[test]
    fn zero_capacity_is_inert() {
        let mut buffer = RingBuffer::<f32, 0>::new();
        buffer.push(1.0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.median(), None);
        assert_eq!(buffer.iter().count(), 0);
    }
}
