//! Batch size ladders.
//!
//! A ladder turns a requested maximum batch size `n` into the descending list of
//! sizes for which a statement is compiled. Every ladder starts at `n` and ends
//! at 1, so any number of pending keys can be served without padding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::BatchConfigError;

pub trait BatchLadder: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Descending sizes, starting at `requested` and ending at 1.
    fn sizes(&self, requested: usize) -> Vec<usize>;
}

/// `n`, then halving while the result stays at or above 10, then 10, 9, …, 1.
///
/// `25` → `[25, 12, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]`
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLadder;

impl LegacyLadder {
    fn next_size(size: usize) -> usize {
        if size <= 10 {
            size - 1
        } else if size / 2 < 10 {
            10
        } else {
            size / 2
        }
    }
}

impl BatchLadder for LegacyLadder {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn sizes(&self, requested: usize) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut size = requested;
        loop {
            sizes.push(size);
            if size <= 1 {
                break;
            }
            size = Self::next_size(size);
        }
        sizes
    }
}

/// `n`, then every power of two below it.
///
/// `10` → `[10, 8, 4, 2, 1]`
#[derive(Debug, Clone, Copy, Default)]
pub struct DoublingLadder;

impl BatchLadder for DoublingLadder {
    fn name(&self) -> &'static str {
        "doubling"
    }

    fn sizes(&self, requested: usize) -> Vec<usize> {
        let mut sizes = vec![requested];
        if requested > 1 {
            let mut power: usize = 1;
            while power.checked_mul(2).is_some_and(|next| next < requested) {
                power *= 2;
            }
            while power >= 1 {
                sizes.push(power);
                power /= 2;
            }
        }
        sizes
    }
}

/// `n`, `n - step`, … down to 1.
///
/// `10` with step 3 → `[10, 7, 4, 1]`
#[derive(Debug, Clone, Copy)]
pub struct LinearLadder {
    pub step: usize,
}

impl LinearLadder {
    pub fn new(step: usize) -> Self {
        LinearLadder { step }
    }
}

impl BatchLadder for LinearLadder {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn sizes(&self, requested: usize) -> Vec<usize> {
        // A zero step cannot descend; validation reports the ladder as malformed
        if self.step == 0 {
            return vec![requested];
        }
        let mut sizes = Vec::new();
        let mut size = requested;
        loop {
            sizes.push(size);
            if size <= 1 {
                break;
            }
            size = if size > self.step { size - self.step } else { 1 };
        }
        sizes
    }
}

/// An explicit set of sizes; the requested size is always included.
#[derive(Debug, Clone, Default)]
pub struct FixedLadder {
    sizes: Vec<usize>,
}

impl FixedLadder {
    pub fn new(sizes: impl IntoIterator<Item = usize>) -> Self {
        FixedLadder {
            sizes: sizes.into_iter().collect(),
        }
    }
}

impl BatchLadder for FixedLadder {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn sizes(&self, requested: usize) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .sizes
            .iter()
            .copied()
            .filter(|&s| s <= requested)
            .collect();
        sizes.push(requested);
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes.dedup();
        sizes
    }
}

/// Check that `sizes` is a usable ladder for `requested`.
pub fn validate_sizes(ladder: &str, requested: usize, sizes: &[usize]) -> Result<(), BatchConfigError> {
    if sizes.first() != Some(&requested) {
        return Err(BatchConfigError::malformed(
            ladder,
            sizes,
            format!("must start at the requested size {}", requested),
        ));
    }
    if sizes.last() != Some(&1) {
        return Err(BatchConfigError::malformed(ladder, sizes, "must end at 1"));
    }
    if sizes.windows(2).any(|w| w[0] <= w[1]) {
        return Err(BatchConfigError::malformed(
            ladder,
            sizes,
            "must be strictly descending",
        ));
    }
    Ok(())
}

/// Ladder selection as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchLadderKind {
    #[default]
    Legacy,
    Doubling,
    Linear,
}

impl BatchLadderKind {
    pub fn build(&self, linear_step: usize) -> Box<dyn BatchLadder> {
        match self {
            BatchLadderKind::Legacy => Box::new(LegacyLadder),
            BatchLadderKind::Doubling => Box::new(DoublingLadder),
            BatchLadderKind::Linear => Box::new(LinearLadder::new(linear_step)),
        }
    }
}

impl FromStr for BatchLadderKind {
    type Err = BatchConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(BatchLadderKind::Legacy),
            "doubling" => Ok(BatchLadderKind::Doubling),
            "linear" => Ok(BatchLadderKind::Linear),
            _ => Err(BatchConfigError::UnknownLadder {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for BatchLadderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchLadderKind::Legacy => write!(f, "legacy"),
            BatchLadderKind::Doubling => write!(f, "doubling"),
            BatchLadderKind::Linear => write!(f, "linear"),
        }
    }
}
