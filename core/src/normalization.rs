//! Per-feature standard-score normalization.

use crate::error::{NanoError, NanoResult};
use crate::math::normalize_f32;
use crate::NUM_FEATURES;

/// Validated mean/std pairs, one per input feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    means: [f32; NUM_FEATURES],
    stds: [f32; NUM_FEATURES],
}

impl Normalizer {
    /// Rejects a zero, negative or non-finite std and a non-finite mean.
    pub fn new(means: [f32; NUM_FEATURES], stds: [f32; NUM_FEATURES]) -> NanoResult<Self> {
        for (feature, (&mean, &std)) in means.iter().zip(&stds).enumerate() {
            if !mean.is_finite() || !std.is_finite() || std <= 0.0 {
                return Err(NanoError::InvalidNormalization { feature });
            }
        }
        Ok(Self { means, stds })
    }

    pub fn means(&self) -> &[f32; NUM_FEATURES] {
        &self.means
    }

    pub fn stds(&self) -> &[f32; NUM_FEATURES] {
        &self.stds
    }

    /// `(raw[i] - mean[i]) / std[i]` for each feature.
    pub fn normalize(&self, raw: &[f32]) -> NanoResult<[f32; NUM_FEATURES]> {
        let mut out = [0.0f32; NUM_FEATURES];
        normalize_f32(raw, &self.means, &self.stds, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn zero_std_is_an_initialization_error() {
        let err = Normalizer::new([0.0; 4], [1.0, 0.0, 1.0, 1.0]).unwrap_err();
        assert_eq!(err, NanoError::InvalidNormalization { feature: 1 });
        assert_eq!(err.kind(), ErrorKind::Initialization);
    }

    #[test]
    fn wrong_length_is_a_precondition_violation() {
        let norm = Normalizer::new([0.0; 4], [1.0; 4]).unwrap();
        let err = norm.normalize(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn scales_each_feature() {
        let norm = Normalizer::new([1.0, 2.0, 3.0, 4.0], [2.0, 2.0, 0.5, 1.0]).unwrap();
        assert_eq!(norm.normalize(&[3.0, 2.0, 4.0, 0.0]).unwrap(), [1.0, 0.0, 2.0, -4.0]);
    }
}
