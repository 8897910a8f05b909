//! Pacing policy for a shared, rate-limited upstream API.
//!
//! The provider's free tier is shared by every caller using the same key, so the
//! fetcher waits in two places: once after a throttling response before its
//! single retry, and after every successful response. Both waits go through a
//! [`Pacer`], which tests replace with a [`RecordingPacer`] that never sleeps.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::StatusCode;

/// Default wait before retrying a throttled request.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);
/// Default politeness delay after every successful response.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(1);

/// Why a pacer was asked to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Upstream throttled us; wait before the one retry.
    Backoff,
    /// Politeness delay after a successful response.
    CoolDown,
}

/// Fixed backoff/cool-down contract with the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Status code that signals "too many requests".
    pub throttle_status: StatusCode,
    /// Wait before the single retry of a throttled request.
    pub backoff: Duration,
    /// Wait after every successful response.
    pub cool_down: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            throttle_status: StatusCode::TOO_MANY_REQUESTS,
            backoff: DEFAULT_BACKOFF,
            cool_down: DEFAULT_COOL_DOWN,
        }
    }
}

impl ThrottlePolicy {
    pub fn is_throttled(&self, status: StatusCode) -> bool {
        status == self.throttle_status
    }
}

/// Something that can wait.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, reason: PauseReason, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, _reason: PauseReason, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Records every requested pause without sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(PauseReason, Duration)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All pauses requested so far, in order.
    pub fn pauses(&self) -> Vec<(PauseReason, Duration)> {
        self.pauses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of pauses requested for `reason`.
    pub fn count(&self, reason: PauseReason) -> usize {
        self.pauses().iter().filter(|(r, _)| *r == reason).count()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, reason: PauseReason, duration: Duration) {
        self.pauses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((reason, duration));
    }
}
