//! Tempo filter planning
//!
//! ffmpeg's `atempo` filter accepts factors in [0.5, 2.0] only. Speeds
//! outside that range are folded into an ordered chain of stages whose
//! product equals the requested speed, e.g. 4.0 → [2.0, 2.0] and
//! 0.25 → [0.5, 0.5].

use thiserror::Error;

/// Smallest factor a single atempo stage accepts
pub const MIN_STAGE: f64 = 0.5;
/// Largest factor a single atempo stage accepts
pub const MAX_STAGE: f64 = 2.0;

// Treat speeds this close to 1.0 as "no change requested".
const UNITY_EPSILON: f64 = 1e-9;

/// Tempo planning errors
#[derive(Debug, Error)]
pub enum TempoError {
    /// Speed factor outside the usable domain
    #[error("speed must be a positive, finite number (got {0})")]
    InvalidSpeed(f64),
}

/// Ordered atempo stages for one speed factor
///
/// An empty plan means no processing is needed; callers skip the
/// transcode step entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoPlan {
    stages: Vec<f64>,
}

impl TempoPlan {
    /// Build the stage plan for a requested speed factor
    ///
    /// Factors above 2.0 are peeled off as 2.0 stages, factors below 0.5
    /// as 0.5 stages; the remainder lands in [0.5, 2.0] and is emitted
    /// unless it is (within epsilon) 1.0.
    pub fn for_speed(speed: f64) -> Result<Self, TempoError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(TempoError::InvalidSpeed(speed));
        }

        let mut stages = Vec::new();
        let mut remaining = speed;

        while remaining > MAX_STAGE {
            stages.push(MAX_STAGE);
            remaining /= MAX_STAGE;
        }
        while remaining < MIN_STAGE {
            stages.push(MIN_STAGE);
            remaining /= MIN_STAGE;
        }
        if (remaining - 1.0).abs() > UNITY_EPSILON {
            stages.push(remaining);
        }

        Ok(Self { stages })
    }

    /// The ordered stage factors
    pub fn stages(&self) -> &[f64] {
        &self.stages
    }

    /// True when no processing is required (speed ≈ 1.0)
    pub fn is_identity(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render the plan as an ffmpeg audio filter chain
    ///
    /// e.g. `atempo=2.0000,atempo=1.5000`
    pub fn filter_chain(&self) -> String {
        self.stages
            .iter()
            .map(|stage| format!("atempo={:.4}", stage))
            .collect::<Vec<_>>()
            .join(",")
    }
}
