// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort background writes.
//!
//! Work that must not delay the caller (profile self-healing, name backfill)
//! is spawned here. Failures are logged and kept for inspection instead of
//! being dropped silently.

use crate::error::Result;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;

/// A background write that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundFailure {
    pub label: &'static str,
    pub error: String,
}

#[derive(Default)]
struct Inner {
    tasks: Mutex<JoinSet<()>>,
    failures: Mutex<Vec<BackgroundFailure>>,
}

/// Spawner for fire-and-forget writes whose failures stay observable.
#[derive(Clone, Default)]
pub struct BestEffort {
    inner: Arc<Inner>,
}

impl BestEffort {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failures_guard(&self) -> MutexGuard<'_, Vec<BackgroundFailure>> {
        self.inner.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `work` in the background. Must be called inside a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let recorder = self.clone();
        let mut tasks = self.tasks();
        // Reap finished tasks so the set stays small between flushes
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = work.await {
                tracing::warn!(task = label, error = %e, "Background write failed");
                recorder.failures_guard().push(BackgroundFailure {
                    label,
                    error: e.to_string(),
                });
            } else {
                tracing::debug!(task = label, "Background write completed");
            }
        });
    }

    /// Wait for every spawned write to finish.
    pub async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Background task panicked or was cancelled");
            }
        }
    }

    pub fn failures(&self) -> Vec<BackgroundFailure> {
        self.failures_guard().clone()
    }

    pub fn failure_count(&self) -> usize {
        self.failures_guard().len()
    }
}
