// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ownership wrapper for a held system-global named mutex.
//!
//! `named_lock::NamedLockGuard` borrows from the `NamedLock` that produced
//! it, so it cannot be stored alongside that lock in an ordinary struct
//! field without self-referencing. Instead we park the lock and its guard
//! on a dedicated thread for as long as the mutex should be held, and
//! signal that thread to release on drop.

use std::sync::mpsc;
use std::thread::JoinHandle;

/// A held system-global named mutex. Releases on drop.
pub struct MutexHandle {
    release_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl MutexHandle {
    /// Attempts to acquire the named mutex `name`, returning `None` if it
    /// is already held elsewhere (or cannot be created at all).
    ///
    /// Blocks the calling thread briefly; callers on an async runtime
    /// should run this via `spawn_blocking`.
    #[must_use]
    pub fn try_acquire(name: &str) -> Option<Self> {
        let name = name.to_string();
        let (ack_tx, ack_rx) = mpsc::channel::<bool>();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let worker = std::thread::spawn(move || {
            let lock = match named_lock::NamedLock::create(&name) {
                Ok(lock) => lock,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to create named mutex");
                    let _ = ack_tx.send(false);
                    return;
                }
            };
            let guard = match lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    let _ = ack_tx.send(false);
                    return;
                }
            };
            let _ = ack_tx.send(true);
            let _ = release_rx.recv();
            drop(guard);
        });

        match ack_rx.recv() {
            Ok(true) => Some(Self {
                release_tx: Some(release_tx),
                worker: Some(worker),
            }),
            _ => None,
        }
    }
}

impl Drop for MutexHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.release_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_of_same_name_fails_while_first_is_held() {
        let name = format!("ng-router-test-{}", std::process::id());
        let first = MutexHandle::try_acquire(&name);
        assert!(first.is_some());

        let second = MutexHandle::try_acquire(&name);
        assert!(second.is_none());

        drop(first);
        let third = MutexHandle::try_acquire(&name);
        assert!(third.is_some());
    }
}
