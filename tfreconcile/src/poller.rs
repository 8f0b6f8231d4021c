//! Waiting for asynchronous remote transitions
//!
//! A [`PollTarget`] names the pending, target and failed states of one
//! transition. [`Poller::wait`] refreshes the remote object until it reaches a
//! target state, enters a failed state, or the deadline passes. All time goes
//! through the injected [`Clock`].

use crate::clock::{Clock, TokioClock};
use crate::context::Context;
use crate::error::{ReconcileError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Spacing between observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Fixed(Duration),
    /// Doubles after every observation, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl Interval {
    /// Wait after the `n`th observation (zero-based)
    pub fn nth(&self, n: u32) -> Duration {
        match *self {
            Interval::Fixed(d) => d,
            Interval::Exponential { initial, max } => {
                let factor = 1u32.checked_shl(n).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// What one refresh saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    State {
        name: String,
        /// Diagnostic text from the API, reported when the state is a failure
        detail: Option<String>,
    },
    Absent,
}

impl Observation {
    pub fn state(name: impl Into<String>) -> Self {
        Observation::State {
            name: name.into(),
            detail: None,
        }
    }

    pub fn with_detail(self, detail: Option<String>) -> Self {
        match self {
            Observation::State { name, .. } => Observation::State { name, detail },
            Observation::Absent => Observation::Absent,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Observation::State { name, .. } => name,
            Observation::Absent => "absent",
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of a single observation against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Target,
    Failed,
    Unexpected,
    /// Object not found while a present state is wanted
    Missing,
}

/// Pending, target and failed state sets of one transition plus polling
/// parameters
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub pending: BTreeSet<String>,
    pub target: BTreeSet<String>,
    pub failed: BTreeSet<String>,
    /// Wait before the first observation
    pub delay: Duration,
    pub interval: Interval,
    /// Consecutive not-found observations tolerated before giving up
    pub not_found_checks: u32,
    /// Absence of the object is the target (deletion)
    pub absent_is_target: bool,
}

fn to_set(states: &[&str]) -> BTreeSet<String> {
    states.iter().map(|s| s.to_string()).collect()
}

impl PollTarget {
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        Self {
            pending: to_set(pending),
            target: to_set(target),
            failed: BTreeSet::new(),
            delay: Duration::ZERO,
            interval: Interval::Exponential {
                initial: Duration::from_secs(1),
                max: Duration::from_secs(10),
            },
            not_found_checks: 20,
            absent_is_target: false,
        }
    }

    /// Wait until the object is gone
    pub fn absent(pending: &[&str]) -> Self {
        Self {
            absent_is_target: true,
            ..Self::new(pending, &[])
        }
    }

    pub fn failed(mut self, failed: &[&str]) -> Self {
        self.failed = to_set(failed);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// The three state sets must be pairwise disjoint and something must
    /// count as success
    pub fn check(&self) -> Result<()> {
        let overlap = |a: &BTreeSet<String>, b: &BTreeSet<String>, what: &str| {
            match a.intersection(b).next() {
                Some(state) => Err(ReconcileError::InvalidPollTarget(format!(
                    "state '{}' is both {}",
                    state, what
                ))),
                None => Ok(()),
            }
        };
        overlap(&self.pending, &self.target, "pending and target")?;
        overlap(&self.failed, &self.target, "failed and target")?;
        overlap(&self.pending, &self.failed, "pending and failed")?;

        if self.target.is_empty() && !self.absent_is_target {
            return Err(ReconcileError::InvalidPollTarget(
                "no target state".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classify(&self, observation: &Observation) -> Phase {
        match observation {
            Observation::Absent if self.absent_is_target => Phase::Target,
            Observation::Absent => Phase::Missing,
            Observation::State { name, .. } if self.target.contains(name) => Phase::Target,
            Observation::State { name, .. } if self.failed.contains(name) => Phase::Failed,
            Observation::State { name, .. } if self.pending.contains(name) => Phase::Pending,
            Observation::State { .. } => Phase::Unexpected,
        }
    }

    fn expected(&self) -> Vec<String> {
        let mut expected: Vec<String> = self
            .pending
            .iter()
            .chain(self.target.iter())
            .cloned()
            .collect();
        if self.absent_is_target {
            expected.push("absent".to_string());
        }
        expected
    }
}

/// Drives refresh calls until a [`PollTarget`] is met
#[derive(Clone)]
pub struct Poller {
    clock: Arc<dyn Clock>,
}

impl Poller {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Polls `refresh` until the target is reached.
    ///
    /// The deadline is the earlier of `timeout` and the context deadline.
    /// Refresh errors are returned as-is, a failed call is not retried.
    pub async fn wait<F, Fut>(
        &self,
        ctx: &Context,
        label: &str,
        target: &PollTarget,
        timeout: Duration,
        mut refresh: F,
    ) -> Result<Observation>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation>>,
    {
        target.check()?;

        let budget = match ctx.remaining() {
            Some(remaining) => timeout.min(remaining),
            None => timeout,
        };
        let deadline = self.clock.now() + budget;
        let mut last_state: Option<String> = None;
        let mut missing = 0u32;
        let mut observations = 0u32;

        if !target.delay.is_zero() {
            let wait = target.delay.min(self.until(deadline));
            self.pause(ctx, wait, &last_state).await?;
        }

        loop {
            if ctx.is_cancelled() {
                return Err(ReconcileError::Cancelled { last_state });
            }
            if self.clock.now() >= deadline {
                return Err(ReconcileError::PollTimeout {
                    timeout: budget,
                    last_state,
                });
            }

            let observation = refresh().await?;
            observations += 1;
            let phase = target.classify(&observation);
            debug!(
                resource = label,
                state = %observation,
                attempt = observations,
                phase = ?phase,
                "Poll observation"
            );

            match phase {
                Phase::Target => return Ok(observation),
                Phase::Failed => {
                    return Err(match observation {
                        Observation::State { name, detail } => ReconcileError::PollFailed {
                            state: name,
                            detail,
                        },
                        Observation::Absent => ReconcileError::PollFailed {
                            state: "absent".to_string(),
                            detail: None,
                        },
                    })
                }
                Phase::Unexpected => {
                    return Err(ReconcileError::UnexpectedState {
                        state: observation.name().to_string(),
                        expected: target.expected(),
                    })
                }
                Phase::Missing => {
                    missing += 1;
                    if missing > target.not_found_checks {
                        return Err(ReconcileError::Vanished {
                            resource: label.to_string(),
                            checks: missing,
                        });
                    }
                }
                Phase::Pending => missing = 0,
            }

            last_state = Some(observation.name().to_string());

            let remaining = self.until(deadline);
            if remaining.is_zero() {
                return Err(ReconcileError::PollTimeout {
                    timeout: budget,
                    last_state,
                });
            }
            let wait = target.interval.nth(observations - 1).min(remaining);
            self.pause(ctx, wait, &last_state).await?;
        }
    }

    fn until(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(self.clock.now())
    }

    async fn pause(&self, ctx: &Context, wait: Duration, last_state: &Option<String>) -> Result<()> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(ReconcileError::Cancelled {
                last_state: last_state.clone(),
            }),
            _ = self.clock.sleep(wait) => Ok(()),
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Arc::new(TokioClock))
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller").finish_non_exhaustive()
    }
}
