//! Fixed-capacity slot storage with round-robin reuse.

/// Fixed-capacity arena addressed by index.
///
/// Never grows. Free slots are found by a round-robin scan that starts at the
/// most recently allocated index and wraps once, so a full arena fails an
/// insert after at most `capacity` probes.
pub(crate) struct Arena<T> {
    items: Vec<Option<T>>,
    cursor: usize,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let items = (0..capacity).map(|_| None).collect();

        Self {
            items,
            cursor: 0,
            len: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Stores `item` in the next free slot, or hands it back if the arena is full.
    pub(crate) fn insert(&mut self, item: T) -> Result<usize, T> {
        let capacity = self.items.len();
        if self.len == capacity {
            return Err(item);
        }

        let mut index = self.cursor;
        for _ in 0..capacity {
            if self.items[index].is_none() {
                self.items[index] = Some(item);
                self.cursor = index;
                self.len += 1;

                return Ok(index);
            }

            index = (index + 1) % capacity;
        }

        Err(item)
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take();
        if item.is_some() {
            self.len -= 1;
        }

        item
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)?.as_ref()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.as_ref().map(|item| (index, item)))
    }

    pub(crate) fn clear(&mut self) {
        self.items.iter_mut().for_each(|item| *item = None);
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_fails_once_full() {
        let mut arena = Arena::new(3);

        assert_eq!(arena.insert('a'), Ok(0));
        assert_eq!(arena.insert('b'), Ok(1));
        assert_eq!(arena.insert('c'), Ok(2));
        assert_eq!(arena.insert('d'), Err('d'));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn scan_resumes_from_last_allocation() {
        let mut arena = Arena::new(4);
        for value in 0..4 {
            arena.insert(value).unwrap();
        }

        assert_eq!(arena.remove(0), Some(0));
        assert_eq!(arena.remove(2), Some(2));

        // cursor sits on 3, so the scan wraps to 0 before it reaches 2
        assert_eq!(arena.insert(10), Ok(0));
        assert_eq!(arena.insert(11), Ok(2));
    }

    #[test]
    fn remove_of_empty_slot_is_a_no_op() {
        let mut arena: Arena<u8> = Arena::new(2);

        assert_eq!(arena.remove(1), None);
        assert_eq!(arena.remove(7), None);
        assert_eq!(arena.len(), 0);
    }
}
