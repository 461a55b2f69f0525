#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// Mutual-exclusion lock used for state whose read-compare-write sequences
/// must happen as one unit.
#[repr(transparent)]
pub(crate) struct ExclusiveLock<T>(impl_::Mutex<T>);

/// Reader-writer lock used for state that is written rarely and read on
/// every lookup.
#[repr(transparent)]
pub(crate) struct SharedLock<T>(impl_::RwLock<T>);

impl<T> ExclusiveLock<T> {
    #[must_use]
    pub(crate) const fn new(value: T) -> Self {
        Self(impl_::Mutex::new(value))
    }

    #[inline]
    pub(crate) fn lock(&self) -> impl_::MutexGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.lock();

        #[cfg(feature = "std")]
        let guard = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        guard
    }
}

impl<T: Default> Default for ExclusiveLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> SharedLock<T> {
    #[must_use]
    pub(crate) const fn new(value: T) -> Self {
        Self(impl_::RwLock::new(value))
    }

    #[inline]
    pub(crate) fn read(&self) -> impl_::RwLockReadGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        #[cfg(feature = "std")]
        let guard = self.0.read().unwrap_or_else(std::sync::PoisonError::into_inner);

        guard
    }

    #[inline]
    pub(crate) fn write(&self) -> impl_::RwLockWriteGuard<'_, T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.write();

        #[cfg(feature = "std")]
        let guard = self.0.write().unwrap_or_else(std::sync::PoisonError::into_inner);

        guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_lock_is_built_explicitly() {
        static_assertions::assert_not_impl_any!(SharedLock<u32>: Default);
        static_assertions::assert_impl_all!(ExclusiveLock<u32>: Default);

        let lock = SharedLock::new(1);
        *lock.write() += 1;
        assert_eq!(*lock.read(), 2);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_poisoned_locks_recover() {
        let lock = std::sync::Arc::new(SharedLock::new(0_u32));
        let poisoner = lock.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.write();
            panic!("poison the lock");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(*lock.read(), 0);
    }
}
