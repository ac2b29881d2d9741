//! Protocol parameters.
//!
//! `l1` is the view size budget, split into a push part (α), a pull part (β)
//! and a part refilled from the sampler (γ). `l2` is the number of sampler
//! slots and `vn` the number of sampled nodes probed per validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted view size.
pub const MIN_L1: usize = 2;

/// Smallest accepted sampler size.
pub const MIN_L2: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("α, β, γ don't add together to 1.0")]
    FractionsNotOne,
    #[error("l1 must be at least {}", MIN_L1)]
    L1TooSmall,
    #[error("l2 must be at least {}", MIN_L2)]
    L2TooSmall,
}

/// When a round is allowed to replace the view.
///
/// The push cap is always enforced on top of this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacePolicy {
    /// Replace when pushes or pulls yielded anything.
    #[default]
    EitherNonEmpty,
    /// Replace only when both pushes and pulls yielded something.
    BothNonEmpty,
}

impl ReplacePolicy {
    pub fn accepts(self, pushed: usize, pulled: usize) -> bool {
        match self {
            ReplacePolicy::EitherNonEmpty => pushed > 0 || pulled > 0,
            ReplacePolicy::BothNonEmpty => pushed > 0 && pulled > 0,
        }
    }
}

/// Derived protocol constants. Only constructed through [`Params::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    push_count: usize,
    pull_count: usize,
    fill_count: usize,
    reservoir_size: usize,
    probe_count: usize,
    policy: ReplacePolicy,
}

impl Params {
    /// Validate the inputs and derive the protocol constants.
    ///
    /// # Examples
    /// ```
    /// use brahms::Params;
    ///
    /// let p = Params::new(0.1, 0.7, 0.2, 100, 10, 2).unwrap();
    /// assert_eq!((p.push_count(), p.pull_count(), p.fill_count()), (10, 70, 20));
    /// ```
    pub fn new(
        alpha: f64,
        beta: f64,
        gamma: f64,
        l1: usize,
        l2: usize,
        vn: usize,
    ) -> Result<Self, ParamsError> {
        if alpha + beta + gamma != 1.0 {
            return Err(ParamsError::FractionsNotOne);
        }

        if l1 < MIN_L1 {
            return Err(ParamsError::L1TooSmall);
        }

        if l2 < MIN_L2 {
            return Err(ParamsError::L2TooSmall);
        }

        let l1 = l1 as f64;
        Ok(Self {
            push_count: (l1 * alpha).round() as usize,
            pull_count: (l1 * beta).round() as usize,
            fill_count: (l1 * gamma).round() as usize,
            reservoir_size: l2,
            probe_count: vn,
            policy: ReplacePolicy::default(),
        })
    }

    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Nodes we push ourselves to per round, also the cap on accepted pushes.
    pub fn push_count(&self) -> usize {
        self.push_count
    }

    /// Nodes we pull views from per round.
    pub fn pull_count(&self) -> usize {
        self.pull_count
    }

    /// View entries refilled from the sampler.
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    pub fn reservoir_size(&self) -> usize {
        self.reservoir_size
    }

    /// Sampled nodes probed per validation, zero probes the whole sample.
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    pub fn replace_policy(&self) -> ReplacePolicy {
        self.policy
    }
}
