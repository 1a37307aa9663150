//! Choosing an attenuation coefficient for a target success probability.

use tracing::debug;

use crate::error::{ExecutionError, SimResult, ValidationError};
use crate::topology::{Topology, TopologyConfig};

/// Relative tolerance on the mean link success probability.
pub const CALIBRATION_TOLERANCE: f64 = 0.001;

const INITIAL_STEP: f64 = 0.1;
const MAX_ITERATIONS: usize = 10_000;

/// Finds `alpha` such that the mean of `exp(-alpha * length)` over all links
/// of `config` is within [`CALIBRATION_TOLERANCE`] (relative) of
/// `expected_avg_p`.
///
/// Walks `alpha` up while the mean is too high and down while it is too low,
/// halving the step every time the direction flips.
///
/// # Errors
/// - `InvalidExperimentConfig` if `expected_avg_p` is not in `(0, 1]`.
/// - `InvalidTopologyDescription` if the description has no links.
/// - `CalibrationDiverged` if no coefficient is found, e.g. when every link
///   has length zero and the target is below 1.
pub fn calibrate_alpha(config: &TopologyConfig, expected_avg_p: f64) -> SimResult<f64> {
    if !(expected_avg_p > 0.0 && expected_avg_p <= 1.0) {
        return Err(ValidationError::InvalidExperimentConfig {
            reason: format!("expected average probability {expected_avg_p} must be in (0, 1]"),
        }
        .into());
    }
    let lengths: Vec<f64> = Topology::from_config(config)?
        .links()
        .iter()
        .map(|l| l.length())
        .collect();
    if lengths.is_empty() {
        return Err(ValidationError::InvalidTopologyDescription {
            reason: "cannot calibrate a topology without links".to_string(),
        }
        .into());
    }

    let mean_p = |alpha: f64| lengths.iter().map(|len| (-alpha * len).exp()).sum::<f64>() / lengths.len() as f64;

    let mut alpha = INITIAL_STEP;
    let mut step = INITIAL_STEP;
    let mut last_add = true;
    for iteration in 0..MAX_ITERATIONS {
        let avg_p = mean_p(alpha);
        if (avg_p - expected_avg_p).abs() / expected_avg_p < CALIBRATION_TOLERANCE {
            debug!(alpha, avg_p, iteration, "calibrated attenuation coefficient");
            return Ok(alpha);
        }
        if avg_p > expected_avg_p {
            if !last_add {
                step /= 2.0;
            }
            alpha += step;
            last_add = true;
        } else {
            if last_add {
                step /= 2.0;
            }
            alpha = (alpha - step).max(0.0);
            last_add = false;
        }
    }

    Err(ExecutionError::CalibrationDiverged {
        target: expected_avg_p,
        iterations: MAX_ITERATIONS,
    }
    .into())
}
