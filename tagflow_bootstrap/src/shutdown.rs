// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Manages graceful shutdown across application components.
//!
//! The coordinator hands out clone-able [`CancellationToken`]s; workers
//! observe them between units of work (the file-queue daemon checks between
//! files, never mid-file) and the owner waits for workers to drain within a
//! grace period.
//!
//! ## Usage
//!
//! ```rust
//! use tagflow_bootstrap::shutdown::ShutdownCoordinator;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
//! let token = coordinator.token();
//!
//! tokio::spawn(async move {
//!     loop {
//!         tokio::select! {
//!             _ = token.cancelled() => break,
//!             _ = tokio::time::sleep(Duration::from_secs(1)) => { /* work */ }
//!         }
//!     }
//! });
//!
//! coordinator.initiate_shutdown();
//! coordinator.wait_for_shutdown().await;
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Default grace period for graceful shutdown (in seconds)
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// Cancellation token for signaling shutdown.
///
/// Lightweight clone-able token that can be passed to async tasks and to
/// blocking workers (which poll [`CancellationToken::is_cancelled`]).
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Cancel this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check if cancelled (non-blocking). Safe to call from blocking
    /// threads.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation (async).
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Coordinates graceful shutdown with grace-period enforcement.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    shutdown_initiated: Arc<AtomicBool>,
    shutdown_complete: Arc<Notify>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    ///
    /// # Arguments
    ///
    /// * `grace_period` - Maximum time to wait for workers to drain
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(Notify::new()),
        }
    }

    /// Get a cancellation token to hand to a worker.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Check if shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Initiate graceful shutdown: sets the flag and cancels all tokens.
    /// Idempotent.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("Initiating graceful shutdown (grace period: {:?})", self.grace_period);
            self.token.cancel();
        }
    }

    /// Signal that all workers have drained.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.notify_waiters();
    }

    /// Wait for [`ShutdownCoordinator::complete_shutdown`] or the grace
    /// period, whichever comes first.
    ///
    /// Returns `true` when shutdown completed within the grace period,
    /// `false` on timeout.
    pub async fn wait_for_shutdown(&self) -> bool {
        let notified = self.shutdown_complete.notified();
        tokio::select! {
            _ = notified => true,
            _ = tokio::time::sleep(self.grace_period) => {
                tracing::warn!("Graceful shutdown timed out after {:?}", self.grace_period);
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_starts_uncancelled() {
        let coordinator = ShutdownCoordinator::default();
        assert!(!coordinator.token().is_cancelled());
        assert!(!coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn test_initiate_shutdown_cancels_all_tokens() {
        let coordinator = ShutdownCoordinator::default();
        let a = coordinator.token();
        let b = coordinator.token();

        coordinator.initiate_shutdown();

        assert!(coordinator.is_shutting_down());
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        // Await resolves immediately once cancelled
        a.cancelled().await;
    }

    #[tokio::test]
    async fn test_wait_times_out_without_completion() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(20));
        coordinator.initiate_shutdown();
        assert!(!coordinator.wait_for_shutdown().await);
    }

    #[tokio::test]
    async fn test_wait_observes_completion() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();

        let waiter = coordinator.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_shutdown().await });

        // Give the waiter a moment to register
        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.complete_shutdown();

        assert!(handle.await.unwrap());
    }
}
