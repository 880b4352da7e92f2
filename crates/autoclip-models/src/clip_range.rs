//! Requested clip ranges for the render pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A requested `[start, end]` range, in seconds, for the render pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct ClipRange {
    pub start: f64,
    pub end: f64,
}

impl ClipRange {
    /// Mirrors the RPC boundary's validation rule (§6): rejects non-finite
    /// bounds and ranges where `end <= start`.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.end > self.start
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    #[default]
    Medium,
    High,
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_before_start_is_invalid() {
        assert!(!ClipRange { start: 10.0, end: 5.0 }.is_valid());
    }

    #[test]
    fn non_finite_is_invalid() {
        assert!(!ClipRange { start: 0.0, end: f64::NAN }.is_valid());
        assert!(!ClipRange { start: 0.0, end: f64::INFINITY }.is_valid());
    }

    #[test]
    fn well_formed_range_is_valid() {
        assert!(ClipRange { start: 0.0, end: 10.0 }.is_valid());
    }
}
