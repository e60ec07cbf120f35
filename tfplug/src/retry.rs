//! Polling until a remote object reaches a target state
//!
//! [`StateChangeConf`] drives an asynchronous remote transition to completion.
//! Each poll classifies the observed state:
//!
//! - in `target`: done
//! - in `pending`: sleep one poll interval (never past the deadline), poll again
//! - anything else: fail at once, the state cannot resolve itself
//!
//! Refresh errors are fatal and running out of time is reported as
//! [`WaitError::Timeout`], never as a refresh error.

use crate::context::Context;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StateChangeConf<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub poll_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError<S: Debug, E> {
    #[error("{0}")]
    Refresh(E),

    #[error("unexpected state {state:?}, wanted one of {target:?}")]
    UnexpectedState { state: S, target: Vec<S> },

    #[error("timeout while waiting for state to become {target:?} (last state: {last_state:?})")]
    Timeout { last_state: Option<S>, target: Vec<S> },
}

impl<S: Debug, E> WaitError<S, E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

impl<S> StateChangeConf<S>
where
    S: PartialEq + Clone + Debug,
{
    pub fn new(pending: Vec<S>, target: Vec<S>, poll_interval: Duration) -> Self {
        Self {
            pending,
            target,
            poll_interval,
        }
    }

    /// Polls `refresh` until the state is in `target`. The first poll happens
    /// immediately; later polls are at least `poll_interval` apart.
    pub async fn wait_for_state<E, F, Fut>(
        &self,
        ctx: &Context,
        mut refresh: F,
    ) -> Result<S, WaitError<S, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, E>>,
    {
        let mut last_state: Option<S> = None;
        let mut polls = 0u32;

        loop {
            if ctx.is_expired() {
                return Err(self.timeout(last_state));
            }

            let state = refresh().await.map_err(WaitError::Refresh)?;
            polls += 1;
            tracing::debug!("Poll {} observed state {:?}", polls, state);

            if self.target.contains(&state) {
                return Ok(state);
            }

            if !self.pending.contains(&state) {
                return Err(WaitError::UnexpectedState {
                    state,
                    target: self.target.clone(),
                });
            }

            last_state = Some(state);

            let wait = ctx.bounded(self.poll_interval);
            if wait.is_zero() && ctx.deadline().is_some() {
                return Err(self.timeout(last_state));
            }
            tokio::time::sleep(wait).await;
        }
    }

    fn timeout<E>(&self, last_state: Option<S>) -> WaitError<S, E> {
        tracing::warn!(
            "Timed out waiting for {:?}, last state {:?}",
            self.target,
            last_state
        );
        WaitError::Timeout {
            last_state,
            target: self.target.clone(),
        }
    }
}
