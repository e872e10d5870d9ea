//! Derives the four comparison queries from a single "is less" predicate

/// Extension of an "is less" predicate, which is assumed to be a strict weak ordering.
///
/// Elements for which neither `less(a, b)` nor `less(b, a)` holds are considered equal, which
/// the sorts rely on for stability. Every query only calls the predicate, so a panicking
/// predicate simply unwinds through it.
pub trait StrictWeakOrder<T>: FnMut(&T, &T) -> bool {
    /// `a < b`
    #[inline]
    fn less(&mut self, a: &T, b: &T) -> bool {
        self(a, b)
    }

    /// `a <= b`
    #[inline]
    fn less_eq(&mut self, a: &T, b: &T) -> bool {
        self(a, b) || !self(b, a)
    }

    /// `a > b`
    #[inline]
    fn greater(&mut self, a: &T, b: &T) -> bool {
        !self(a, b) && self(b, a)
    }

    /// `a >= b`
    #[inline]
    fn greater_eq(&mut self, a: &T, b: &T) -> bool {
        !self(a, b)
    }
}

impl<T, F: FnMut(&T, &T) -> bool> StrictWeakOrder<T> for F {}
