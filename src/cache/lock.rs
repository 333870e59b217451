use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Acquires a read guard, recovering the data if a writer panicked.
pub(crate) fn read_guard<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(
            op,
            owner,
            lock_kind = "rwlock.read",
            result = "poisoned_recovered",
            "recovered from poisoned lock"
        );
        poisoned.into_inner()
    })
}

/// Acquires a write guard, recovering the data if a writer panicked.
pub(crate) fn write_guard<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(
            op,
            owner,
            lock_kind = "rwlock.write",
            result = "poisoned_recovered",
            "recovered from poisoned lock"
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn poisoned_lock_is_recovered() {
        let lock = Arc::new(RwLock::new(7));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.write().expect("first writer");
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        *write_guard(&lock, "tests", "write") += 1;
        assert_eq!(*read_guard(&lock, "tests", "read"), 8);
    }
}
