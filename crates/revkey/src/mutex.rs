#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::{Mutex, MutexGuard, RwLock};
#[cfg(not(feature = "parking-lot"))]
pub(crate) use std::sync::{Mutex, MutexGuard, RwLock};

use crate::Result;

// parking_lot never poisons; std locks convert poisoning into
// `Error::LockPoisoned`.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(mutex.lock())
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        Ok(mutex.lock()?)
    }
}

#[inline]
pub(crate) fn read<T, R>(lock: &RwLock<T>, f: impl FnOnce(&T) -> R) -> Result<R> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(f(&lock.read()))
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        let guard = lock.read()?;
        Ok(f(&guard))
    }
}

#[inline]
pub(crate) fn write<T, R>(lock: &RwLock<T>, f: impl FnOnce(&mut T) -> R) -> Result<R> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(f(&mut lock.write()))
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        let mut guard = lock.write()?;
        Ok(f(&mut guard))
    }
}
