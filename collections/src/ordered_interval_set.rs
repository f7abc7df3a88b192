use core::slice;

use crate::interval::Interval;

/// Non-overlapping intervals kept in ascending `start` order.
///
/// Elements are identified by their `start`: two elements never share one.
/// Lookups and insertion scan from the front, so every operation is O(n),
/// which is what the simulator's sets (a handful of regions) need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderedIntervalSet<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedIntervalSet<T> {
    fn default() -> Self {
        OrderedIntervalSet { items: Vec::new() }
    }
}

impl<T: Interval> OrderedIntervalSet<T> {
    pub fn new() -> Self {
        OrderedIntervalSet { items: Vec::new() }
    }

    /// Wraps items already in strictly ascending `start` order without
    /// scanning for insertion points.
    pub fn from_sorted(items: Vec<T>) -> Self {
        debug_assert!(
            items.windows(2).all(|pair| pair[0].start() < pair[1].start()),
            "items are not in strictly ascending start order"
        );
        OrderedIntervalSet { items }
    }

    /// Inserts before the first element whose `start` is greater than the
    /// item's. An element with the same `start` is replaced and returned.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let mut position = self.items.len();
        for (index, current) in self.items.iter().enumerate() {
            if current.start() >= item.start() {
                position = index;
                break;
            }
        }

        let same_start = self
            .items
            .get(position)
            .is_some_and(|current| current.start() == item.start());
        if same_start {
            return Some(core::mem::replace(&mut self.items[position], item));
        }

        self.items.insert(position, item);
        None
    }

    /// Removes the element starting at `start`.
    pub fn remove(&mut self, start: usize) -> Option<T> {
        let index = self.position(start)?;
        Some(self.items.remove(index))
    }

    /// Removes the first element, in ascending order, accepted by `predicate`.
    pub fn remove_first<P>(&mut self, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let index = self.items.iter().position(|item| predicate(item))?;
        Some(self.items.remove(index))
    }

    pub fn position(&self, start: usize) -> Option<usize> {
        for (index, item) in self.items.iter().enumerate() {
            if item.start() == start {
                return Some(index);
            }
            if item.start() > start {
                break;
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Sum of the lengths of all elements.
    pub fn total_len(&self) -> usize {
        self.items.iter().map(Interval::len).sum()
    }

    /// Takes every element out, in ascending order, leaving the set empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.items.drain(..)
    }

    /// Merges two ascending sets into a new one whose elements are converted
    /// into `R`. Both inputs are left untouched.
    pub fn concat<U, R>(&self, other: &OrderedIntervalSet<U>) -> OrderedIntervalSet<R>
    where
        T: Clone + Into<R>,
        U: Interval + Clone + Into<R>,
        R: Interval,
    {
        let mut merged = Vec::with_capacity(self.len() + other.len());
        let mut left = self.iter().peekable();
        let mut right = other.iter().peekable();

        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => l.start() <= r.start(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if take_left {
                if let Some(item) = left.next() {
                    merged.push(item.clone().into());
                }
            } else if let Some(item) = right.next() {
                merged.push(item.clone().into());
            }
        }

        OrderedIntervalSet::from_sorted(merged)
    }
}

impl<T: Interval> FromIterator<T> for OrderedIntervalSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = OrderedIntervalSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<'a, T: Interval> IntoIterator for &'a OrderedIntervalSet<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Interval> IntoIterator for OrderedIntervalSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
