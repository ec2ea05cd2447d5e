//! Classification and the evaluation loop.
//!
//! `evaluate` walks a labelled dataset once, in order: normalize, infer,
//! argmax, tally. Execution errors mark a sample as failed and the loop moves
//! on; precondition violations abort the run since every later sample would
//! hit the same wrong-length buffer.

use core::fmt;

use log::{debug, warn};

use crate::error::{ErrorKind, NanoError, NanoResult};
use crate::interpreter::InferenceEngine;
use crate::math::argmax_f32;
use crate::normalization::Normalizer;
use crate::{NUM_CLASSES, NUM_FEATURES};

/// Labelled feature rows, checked once up front.
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'d> {
    features: &'d [[f32; NUM_FEATURES]],
    labels: &'d [u8],
}

impl<'d> Dataset<'d> {
    pub fn new(features: &'d [[f32; NUM_FEATURES]], labels: &'d [u8]) -> NanoResult<Self> {
        if features.len() != labels.len() {
            return Err(NanoError::DatasetMismatch { features: features.len(), labels: labels.len() });
        }
        if let Some(index) = labels.iter().position(|&l| l as usize >= NUM_CLASSES) {
            return Err(NanoError::InvalidLabel { index, label: labels[index] });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw features and class of sample `index`.
    pub fn get(&self, index: usize) -> Option<(&'d [f32; NUM_FEATURES], usize)> {
        Some((self.features.get(index)?, *self.labels.get(index)? as usize))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'d [f32; NUM_FEATURES], usize)> + 'd {
        self.features.iter().zip(self.labels.iter().map(|&l| l as usize))
    }
}

/// Counts indexed by `[actual][predicted]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[u32; NUM_CLASSES]; NUM_CLASSES],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Out-of-range classes are rejected rather than silently dropped.
    pub fn record(&mut self, actual: usize, predicted: usize) -> NanoResult<()> {
        let cell = self
            .counts
            .get_mut(actual)
            .and_then(|row| row.get_mut(predicted))
            .ok_or(NanoError::DimensionMismatch { expected: NUM_CLASSES, actual: actual.max(predicted) })?;
        *cell += 1;
        Ok(())
    }

    pub fn get(&self, actual: usize, predicted: usize) -> u32 {
        self.counts.get(actual).and_then(|row| row.get(predicted)).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &[[u32; NUM_CLASSES]; NUM_CLASSES] {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    /// Correctly classified samples.
    pub fn diagonal(&self) -> u32 {
        (0..NUM_CLASSES).map(|c| self.counts[c][c]).sum()
    }

    pub fn row_total(&self, actual: usize) -> u32 {
        self.counts.get(actual).map_or(0, |row| row.iter().sum())
    }

    /// Fraction of class `actual` predicted correctly; `None` if the class never occurred.
    pub fn recall(&self, actual: usize) -> Option<f32> {
        match self.row_total(actual) {
            0 => None,
            n => Some(self.get(actual, actual) as f32 / n as f32),
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "      ")?;
        for c in 0..NUM_CLASSES {
            write!(f, "    Pred{c}")?;
        }
        for (r, row) in self.counts.iter().enumerate() {
            write!(f, "\nReal {r}")?;
            for count in row {
                write!(f, " {count:>8}")?;
            }
        }
        Ok(())
    }
}

/// What happened to one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Scored { predicted: usize, scores: [f32; NUM_CLASSES] },
    Failed(NanoError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResult {
    pub index: usize,
    pub actual: usize,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub correct: u32,
    /// Samples that produced scores.
    pub evaluated: u32,
    /// Samples whose inference failed with an execution error.
    pub failed: u32,
    /// Dataset size.
    pub samples: u32,
}

impl Evaluation {
    /// `correct / samples`; failed samples count against it.
    pub fn accuracy(&self) -> f32 {
        if self.samples == 0 {
            return 0.0;
        }
        self.correct as f32 / self.samples as f32
    }

    pub fn per_class_accuracy(&self) -> [Option<f32>; NUM_CLASSES] {
        core::array::from_fn(|c| self.confusion.recall(c))
    }
}

/// Run every sample through `engine` and tally the results.
pub fn evaluate<E: InferenceEngine + ?Sized>(
    engine: &mut E,
    dataset: &Dataset<'_>,
    normalizer: &Normalizer,
) -> NanoResult<Evaluation> {
    evaluate_with(engine, dataset, normalizer, |_| {})
}

/// Like `evaluate`, handing each sample's result to `observe` as it completes.
pub fn evaluate_with<E, F>(
    engine: &mut E,
    dataset: &Dataset<'_>,
    normalizer: &Normalizer,
    mut observe: F,
) -> NanoResult<Evaluation>
where
    E: InferenceEngine + ?Sized,
    F: FnMut(&SampleResult),
{
    let mut confusion = ConfusionMatrix::new();
    let mut correct = 0;
    let mut evaluated = 0;
    let mut failed = 0;

    for (index, (raw, actual)) in dataset.iter().enumerate() {
        let features = normalizer.normalize(raw)?;
        let outcome = match engine.infer(&features) {
            Ok(scores) => {
                let predicted = argmax_f32(&scores)?;
                confusion.record(actual, predicted)?;
                evaluated += 1;
                if predicted == actual {
                    correct += 1;
                }
                debug!("sample {index}: actual {actual} predicted {predicted} {scores:?}");
                Outcome::Scored { predicted, scores }
            }
            Err(e) if e.kind() == ErrorKind::Execution => {
                warn!("sample {index}: inference failed: {e}");
                failed += 1;
                Outcome::Failed(e)
            }
            Err(e) => return Err(e),
        };
        observe(&SampleResult { index, actual, outcome });
    }

    Ok(Evaluation { confusion, correct, evaluated, failed, samples: dataset.len() as u32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_totals_track_records() {
        let mut m = ConfusionMatrix::new();
        m.record(0, 0).unwrap();
        m.record(1, 2).unwrap();
        m.record(2, 2).unwrap();
        assert_eq!(m.total(), 3);
        assert_eq!(m.diagonal(), 2);
        assert_eq!(m.row_total(1), 1);
        assert_eq!(m.recall(1), Some(0.0));
        assert!(m.record(3, 0).is_err());
        assert_eq!(m.total(), 3);
    }

    #[test]
    fn dataset_rejects_bad_labels() {
        let features = [[0.0f32; NUM_FEATURES]; 2];
        assert_eq!(
            Dataset::new(&features, &[0, 3]).unwrap_err(),
            NanoError::InvalidLabel { index: 1, label: 3 }
        );
        assert!(Dataset::new(&features, &[0]).is_err());
    }
}
