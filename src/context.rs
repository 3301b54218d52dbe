// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context passed to all pipeline components.
//!
//! The context carries the deserialized settings, one shared HTTP client
//! and the running-flag guard that enforces the single-cycle execution
//! model. It is an explicit object handed to every constructor; nothing
//! in the crate keeps process-wide singletons, so independent contexts
//! (e.g. in tests) never cross-contaminate.

use crate::config::Settings;
use crate::constants::API_REQUEST_TIMEOUT_SECS;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared context for one zonesync instance.
#[derive(Clone)]
pub struct Context {
    /// Deserialized settings tree
    pub settings: Arc<Settings>,

    /// HTTP client shared by the directory and zone API clients
    pub http: reqwest::Client,

    /// True while a reconciliation cycle is in flight
    running: Arc<AtomicBool>,
}

impl Context {
    /// Build a context around loaded settings.
    ///
    /// The HTTP client is constructed once and reused for every REST call
    /// of every cycle.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            settings: Arc::new(settings),
            http,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Try to begin a reconciliation cycle.
    ///
    /// Returns a guard that releases the running flag on drop, or `None`
    /// when a cycle is already in flight. Callers must reject the request
    /// in that case, not queue it.
    #[must_use]
    pub fn try_begin_cycle(&self) -> Option<CycleGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(CycleGuard {
                running: Arc::clone(&self.running),
            })
        } else {
            None
        }
    }

    /// Whether a cycle is currently in flight.
    #[must_use]
    pub fn cycle_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// RAII guard marking a cycle as in flight.
///
/// Dropping the guard clears the running flag, including on early return
/// from a failed cycle.
pub struct CycleGuard {
    running: Arc<AtomicBool>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
