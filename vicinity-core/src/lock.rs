//! Lock acquisition helpers shared by both index kinds.
//!
//! Readers recover a poisoned guard: they only observe state that a writer
//! finished publishing, and search signatures are infallible. Writers refuse
//! to proceed on a poisoned lock and report [`IndexError::LockPoisoned`].

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{IndexError, Result};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<'a, T>(
    lock: &'a RwLock<T>,
    resource: &'static str,
) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| IndexError::LockPoisoned { resource })
}

pub(crate) fn scratch<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn scratch_mut<T>(lock: &mut Mutex<T>) -> &mut T {
    lock.get_mut().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn exclusive<T>(lock: &mut RwLock<T>) -> &mut T {
    lock.get_mut().unwrap_or_else(PoisonError::into_inner)
}
