//! Deadlines for outbound network operations.
//!
//! A [`Deadline`] is created when a request starts an operation (resolution or
//! media fetch). Everything awaited through [`Deadline::run`] is cancelled when
//! it expires and reported as [`Error::Timeout`], never as an upstream error.
//! The timer lives inside the awaited future, so it is released on every exit
//! path, including the caller dropping the request.

use std::future::Future;
use std::time::Duration;

use reelgate_common::{Error, Result};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// The error reported when this deadline elapses.
    pub fn timeout_error(&self) -> Error {
        Error::Timeout {
            after_secs: self.budget.as_millis().div_ceil(1000) as u64,
        }
    }

    /// Await `op`, cancelling it when the deadline passes.
    pub async fn run<F, T>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.expires_at, op).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(budget = ?self.budget, "Deadline elapsed, cancelling upstream call");
                Err(self.timeout_error())
            }
        }
    }

    /// Translate a transport error, keeping client-side timeouts distinct.
    pub fn classify(&self, err: reqwest::Error, otherwise: impl FnOnce(reqwest::Error) -> Error) -> Error {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            otherwise(err)
        }
    }
}
