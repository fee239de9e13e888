// Wall-clock budget for one request.
//
// The platform drops modifier replies after 1000 ms. The budget starts when
// the request arrives; `race` bounds any future by whatever is left, and
// a future still pending at the limit is dropped.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("time budget of {}ms exceeded", .limit.as_millis())]
pub struct BudgetExceeded {
    pub limit: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    limit: Duration,
}

impl TimeBudget {
    /// Start a budget of `limit` measured from now.
    pub fn start(limit: Duration) -> Self {
        Self::starting_at(Instant::now(), limit)
    }

    /// Start a budget from an earlier arrival instant.
    pub fn starting_at(started: Instant, limit: Duration) -> Self {
        Self { started, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn exceeded(&self) -> bool {
        self.elapsed() > self.limit
    }

    /// Check the budget without waiting.
    pub fn check(&self) -> Result<(), BudgetExceeded> {
        if self.exceeded() {
            Err(BudgetExceeded { limit: self.limit })
        } else {
            Ok(())
        }
    }

    /// Run `fut` until it completes or the remaining budget runs out.
    /// The future is dropped (cancelled) on timeout.
    pub async fn race<F: Future>(&self, fut: F) -> Result<F::Output, BudgetExceeded> {
        self.check()?;
        tokio::time::timeout(self.remaining(), fut)
            .await
            .map_err(|_| BudgetExceeded { limit: self.limit })
    }
}
