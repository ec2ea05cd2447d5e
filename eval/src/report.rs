//! Text rendering of evaluation results.

use std::fmt;

use nano_iris_core::{Evaluation, Outcome, SampleResult};

/// One line per previewed sample, with the class probabilities.
pub fn sample_line(sample: &SampleResult) -> String {
    match sample.outcome {
        Outcome::Scored { predicted, scores } => format!(
            "sample {:>3}  actual: {}  predicted: {}  [{:.3} {:.3} {:.3}]",
            sample.index, sample.actual, predicted, scores[0], scores[1], scores[2]
        ),
        Outcome::Failed(err) => format!("sample {:>3}  actual: {}  failed: {}", sample.index, sample.actual, err),
    }
}

/// `accuracy: 0.9867 (148 / 150)`
pub fn accuracy_line(evaluation: &Evaluation) -> String {
    format!("accuracy: {:.4} ({} / {})", evaluation.accuracy(), evaluation.correct, evaluation.samples)
}

/// Confusion matrix, per-class recall and the accuracy line.
pub struct Report<'e>(pub &'e Evaluation);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let evaluation = self.0;
        writeln!(f, "Confusion matrix (actual vs predicted)")?;
        writeln!(f, "{}", evaluation.confusion)?;
        writeln!(f)?;
        for (class, recall) in evaluation.per_class_accuracy().iter().enumerate() {
            match recall {
                Some(r) => writeln!(f, "class {class} recall: {r:.4}")?,
                None => writeln!(f, "class {class} recall: n/a")?,
            }
        }
        if evaluation.failed > 0 {
            writeln!(f, "failed samples: {}", evaluation.failed)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", accuracy_line(evaluation))
    }
}

pub fn render(evaluation: &Evaluation) -> String {
    Report(evaluation).to_string()
}
