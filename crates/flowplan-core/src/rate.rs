//! Shared inputs for per-node rate math.
//!
//! Node rate functions never read global state: the catalog and rounding
//! precision arrive through a [`RateContext`], and the node's `ActualRate`
//! is passed as an explicit argument.

use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};

/// Read-only context for rate computation.
#[derive(Debug, Clone, Copy)]
pub struct RateContext<'a> {
    pub catalog: &'a Catalog,
    pub rounding_dp: u32,
}

impl<'a> RateContext<'a> {
    pub fn new(catalog: &'a Catalog, rounding_dp: u32) -> Self {
        Self {
            catalog,
            rounding_dp,
        }
    }

    pub fn round(&self, value: f64) -> f64 {
        round_dp(value, self.rounding_dp)
    }
}

/// Precision beyond this is noise for `f64`; larger settings are clamped.
pub const MAX_ROUNDING_DP: u32 = 15;

/// Round to `dp` decimal places, ties to even. `dp` is clamped to
/// [`MAX_ROUNDING_DP`].
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let scale = 10f64.powi(dp.min(MAX_ROUNDING_DP) as i32);
    (value * scale).round_ties_even() / scale
}

/// How the external solver treats a node's rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RateMode {
    /// The solver picks the rate.
    Automatic,
    /// The user fixed the rate.
    Manual { desired: f64 },
}

/// The externally-assigned throughput of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRate {
    pub mode: RateMode,
    pub actual: f64,
}

impl Default for NodeRate {
    fn default() -> Self {
        Self {
            mode: RateMode::Automatic,
            actual: 0.0,
        }
    }
}
