/// A half-open range `[start, end)` of abstract addresses.
pub trait Interval {
    fn start(&self) -> usize;
    fn end(&self) -> usize;

    fn len(&self) -> usize {
        self.end().saturating_sub(self.start())
    }

    fn is_empty(&self) -> bool {
        self.end() <= self.start()
    }

    fn overlaps<I: Interval + ?Sized>(&self, other: &I) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// Overlapping or sharing a boundary.
    fn touches<I: Interval + ?Sized>(&self, other: &I) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }
}

impl Interval for core::ops::Range<usize> {
    fn start(&self) -> usize {
        self.start
    }

    fn end(&self) -> usize {
        self.end
    }
}
