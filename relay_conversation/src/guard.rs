//! Per-chat in-flight flags with drop-on-contention semantics.

use dashmap::DashMap;
use relay_core::{Error, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct BusyGuard {
    flags: Arc<DashMap<i64, bool>>,
}

impl BusyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` busy without waiting. Fails with [`Error::Busy`] when another
    /// exchange already holds it. The flag clears when the permit is dropped.
    pub fn try_acquire(&self, id: i64) -> Result<BusyPermit> {
        let mut flag = self.flags.entry(id).or_insert(false);
        if *flag {
            return Err(Error::Busy(id));
        }
        *flag = true;
        drop(flag);

        Ok(BusyPermit {
            guard: self.clone(),
            id,
        })
    }

    pub fn release(&self, id: i64) {
        if let Some(mut flag) = self.flags.get_mut(&id) {
            *flag = false;
        }
    }

    #[must_use]
    pub fn is_busy(&self, id: i64) -> bool {
        self.flags.get(&id).is_some_and(|flag| *flag)
    }
}

/// Holds a chat's busy flag; releases it on drop.
///
/// Every returning path drops the permit. The workspace builds with
/// `panic = "abort"`, so a panic ends the process instead of unwinding here.
#[derive(Debug)]
pub struct BusyPermit {
    guard: BusyGuard,
    id: i64,
}

impl BusyPermit {
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }
}

impl Drop for BusyPermit {
    fn drop(&mut self) {
        self.guard.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn second_acquire_is_denied_until_release() {
        let guard = BusyGuard::new();
        let permit = guard.try_acquire(5).unwrap();
        assert!(guard.is_busy(5));
        assert!(matches!(guard.try_acquire(5), Err(Error::Busy(5))));

        drop(permit);
        assert!(!guard.is_busy(5));
        assert!(guard.try_acquire(5).is_ok());
    }

    #[test]
    fn different_chats_do_not_contend() {
        let guard = BusyGuard::new();
        let _a = guard.try_acquire(1).unwrap();
        let _b = guard.try_acquire(2).unwrap();
        assert!(guard.is_busy(1) && guard.is_busy(2));
    }

    #[test]
    fn release_on_early_return() {
        fn failing_exchange(guard: &BusyGuard) -> Result<()> {
            let _permit = guard.try_acquire(9)?;
            Err(Error::Upstream {
                index: 0,
                message: "boom".to_string(),
            })
        }

        let guard = BusyGuard::new();
        assert!(failing_exchange(&guard).is_err());
        assert!(!guard.is_busy(9));
    }

    #[test]
    fn concurrent_acquires_admit_exactly_one() {
        for _ in 0..50 {
            let guard = BusyGuard::new();
            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let guard = guard.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        // Keep the permit alive so late threads cannot re-acquire.
                        guard.try_acquire(77).ok().map(std::mem::forget).is_some()
                    })
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }
}
