//! Fixed-capacity stack used by traversal and the iterative integrator.
//!
//! Storage lives inline so traversal never touches the heap.

/// A stack of at most `N` elements.
pub struct FixedStack<T: Copy + Default, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> FixedStack<T, N> {
    pub fn new() -> Self {
        Self {
            items: [T::default(); N],
            len: 0,
        }
    }

    /// Push an element. Returns `false` and leaves the stack unchanged when full.
    #[inline]
    #[must_use]
    pub fn push(&mut self, item: T) -> bool {
        if self.len == N {
            return false;
        }
        self.items[self.len] = item;
        self.len += 1;
        true
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    #[inline]
    pub fn last_mut(&mut self) -> Option<&mut T> {
        if self.len == 0 {
            None
        } else {
            Some(&mut self.items[self.len - 1])
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Elements from bottom to top.
    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }
}

impl<T: Copy + Default, const N: usize> Default for FixedStack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a traversal stack overflow. Silent in release builds.
#[inline]
pub(crate) fn report_overflow(structure: &str, capacity: usize) {
    if cfg!(debug_assertions) {
        log::warn!(
            "{} traversal stack exceeded {} entries, ray truncated",
            structure,
            capacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack: FixedStack<u32, 4> = FixedStack::new();
        assert!(stack.push(1));
        assert!(stack.push(2));
        assert!(stack.push(3));

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.as_slice(), &[1, 2, 3]);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_push_when_full() {
        let mut stack: FixedStack<u8, 2> = FixedStack::new();
        assert!(stack.push(7));
        assert!(stack.push(8));
        assert!(!stack.push(9));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), Some(8));
    }

    #[test]
    fn test_last_mut() {
        let mut stack: FixedStack<u32, 2> = FixedStack::new();
        assert!(stack.last_mut().is_none());
        assert!(stack.push(5));
        if let Some(top) = stack.last_mut() {
            *top = 6;
        }
        assert_eq!(stack.pop(), Some(6));
        assert!(stack.is_empty());
    }
}
