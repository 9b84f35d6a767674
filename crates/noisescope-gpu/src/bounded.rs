//! Fixed-capacity lists used by the pass and pipeline builders.

use crate::error::{GpuError, Result};
use std::ops::Deref;

/// A `Vec` that refuses to grow past `N` elements.
///
/// Pushing into a full list returns [`GpuError::CapacityExceeded`] naming the
/// list, so builder overflows are distinguishable from other failures.
#[derive(Debug, Clone)]
pub struct BoundedVec<T, const N: usize> {
    what: &'static str,
    items: Vec<T>,
}

impl<T, const N: usize> BoundedVec<T, N> {
    /// Create an empty list. `what` names the list in overflow errors.
    pub fn new(what: &'static str) -> Self {
        Self {
            what,
            items: Vec::with_capacity(N),
        }
    }

    /// Append an item and return its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, item: T) -> Result<u32> {
        if self.items.len() >= N {
            return Err(GpuError::CapacityExceeded {
                what: self.what,
                capacity: N,
            });
        }
        self.items.push(item);
        Ok((self.items.len() - 1) as u32)
    }

    /// Maximum number of items.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Mutable access to the stored items.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T, const N: usize> Deref for BoundedVec<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_insertion_index() {
        let mut list = BoundedVec::<u32, 3>::new("test list");
        assert_eq!(list.push(10).unwrap(), 0);
        assert_eq!(list.push(20).unwrap(), 1);
        assert_eq!(&*list, &[10, 20]);
    }

    #[test]
    fn push_past_capacity_fails() {
        let mut list = BoundedVec::<u8, 2>::new("shader stages");
        list.push(1).unwrap();
        list.push(2).unwrap();

        let err = list.push(3).unwrap_err();
        assert!(matches!(
            err,
            GpuError::CapacityExceeded {
                what: "shader stages",
                capacity: 2
            }
        ));
        assert_eq!(list.len(), 2);
    }
}
