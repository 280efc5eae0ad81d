use crate::core::{Result, StoreError};
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

/// Allocator of unique image numbers in `1..=capacity`, used to give uploaded
/// images collision-free object names.
#[derive(Debug)]
pub struct ImageNumberPool {
    capacity: u32,
    taken: Mutex<BTreeSet<u32>>,
}

impl ImageNumberPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            taken: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Takes the lowest free number.
    pub fn acquire(&self) -> Result<u32> {
        let mut taken = self.taken.lock().unwrap_or_else(PoisonError::into_inner);
        let free = (1..=self.capacity).find(|n| !taken.contains(n));
        match free {
            Some(n) => {
                taken.insert(n);
                Ok(n)
            }
            None => Err(StoreError::Validation(format!(
                "image number pool exhausted ({} numbers in use)",
                self.capacity
            ))),
        }
    }

    /// Returns `number` to the pool. Returns `false` if it was not taken.
    pub fn release(&self, number: u32) -> bool {
        self.taken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&number)
    }

    pub fn in_use(&self) -> usize {
        self.taken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_lowest_free_number() {
        let pool = ImageNumberPool::new(3);
        assert_eq!(pool.acquire().unwrap(), 1);
        assert_eq!(pool.acquire().unwrap(), 2);
        assert!(pool.release(1));
        assert_eq!(pool.acquire().unwrap(), 1);
        assert_eq!(pool.acquire().unwrap(), 3);
        assert!(pool.acquire().is_err());
        assert!(!pool.release(42));
    }
}
