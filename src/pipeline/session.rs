//! Multi-part evaluation session.
//!
//! An IELTS Speaking test has three parts recorded separately.
//! [`EvaluationSession`] evaluates them in order, keeps going when one part
//! fails, writes each part's feedback plus the combined feedback, and
//! optionally scores the combined feedback against a human reference.
//!
//! # Output layout
//!
//! ```text
//! <output_dir>/
//!   part1_feedback.txt        one per successful part
//!   combined_feedback.txt     "Part N:\n…" blocks joined by "---"
//!   evaluation_results.json   only when a reference and scorer are present
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::llm::{AggregatedResult, IeltsEvaluator};
use crate::scoring::{FeedbackScorer, ScoreReport};

use super::output::save_text;

const PART_SEPARATOR: &str = "\n\n---\n\n";

pub const COMBINED_FEEDBACK_FILE: &str = "combined_feedback.txt";
pub const SCORE_REPORT_FILE: &str = "evaluation_results.json";

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no parts to evaluate")]
    NoParts,

    /// Every part failed; carries `(label, reason)` per part.
    #[error("all parts failed: {}", format_failures(.0))]
    AllPartsFailed(Vec<(String, String)>),

    #[error("failed to write session output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to write score report: {0}")]
    Report(String),
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(label, reason)| format!("{label}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Parts and results
// ---------------------------------------------------------------------------

/// One recorded part of the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPart {
    /// 1-based part number.
    pub number: usize,
    pub locator: String,
}

impl SessionPart {
    /// Number locators 1, 2, 3… in the given order.
    pub fn numbered<I, S>(locators: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        locators
            .into_iter()
            .enumerate()
            .map(|(i, locator)| Self {
                number: i + 1,
                locator: locator.into(),
            })
            .collect()
    }

    /// `part1`, `part2`, …
    pub fn label(&self) -> String {
        format!("part{}", self.number)
    }

    pub fn feedback_file(&self) -> String {
        format!("{}_feedback.txt", self.label())
    }
}

#[derive(Debug)]
pub struct PartResult {
    pub part: SessionPart,
    /// Feedback, or the failure reason.
    pub outcome: Result<AggregatedResult, String>,
}

impl PartResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Everything a session produced.
#[derive(Debug)]
pub struct SessionSummary {
    pub parts: Vec<PartResult>,
    pub combined_feedback: String,
    pub score_report: Option<ScoreReport>,
    pub output_dir: PathBuf,
}

impl SessionSummary {
    pub fn successful(&self) -> impl Iterator<Item = &PartResult> {
        self.parts.iter().filter(|p| p.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PartResult> {
        self.parts.iter().filter(|p| !p.is_success())
    }

    /// Log the execution summary.
    pub fn log(&self) {
        let total = self.parts.len();
        log::info!("Successful parts: {}/{}", self.successful().count(), total);
        for part in self.failed() {
            if let Err(reason) = &part.outcome {
                log::warn!("Failed {}: {reason}", part.part.label());
            }
        }
        match &self.score_report {
            Some(report) if report.is_success() => {
                log::info!("Evaluation scores:\n{}", report.render_metrics());
            }
            Some(report) => log::warn!(
                "Scoring failed: {}",
                report.error.as_deref().unwrap_or("unknown error")
            ),
            None => log::info!("Scoring skipped"),
        }
    }
}

/// Render successful, non-empty parts as `Part N:\n<text>` blocks.
pub fn combine_feedback(parts: &[PartResult]) -> String {
    parts
        .iter()
        .filter_map(|p| match &p.outcome {
            Ok(result) if !result.text.is_empty() => {
                Some(format!("Part {}:\n{}", p.part.number, result.text))
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(PART_SEPARATOR)
}

// ---------------------------------------------------------------------------
// EvaluationSession
// ---------------------------------------------------------------------------

pub struct EvaluationSession {
    evaluator: IeltsEvaluator,
    scorer: Option<Arc<dyn FeedbackScorer>>,
    output_dir: PathBuf,
}

impl EvaluationSession {
    pub fn new(evaluator: IeltsEvaluator, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            evaluator,
            scorer: None,
            output_dir: output_dir.into(),
        }
    }

    /// Score combined feedback when a reference is supplied to [`run`](Self::run).
    pub fn with_scorer(mut self, scorer: Arc<dyn FeedbackScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Evaluate `parts` sequentially, then combine and optionally score.
    pub async fn run(
        &self,
        parts: &[SessionPart],
        reference: Option<&str>,
    ) -> Result<SessionSummary, SessionError> {
        if parts.is_empty() {
            return Err(SessionError::NoParts);
        }

        let mut results = Vec::with_capacity(parts.len());
        for part in parts {
            log::info!("Evaluating Part {}...", part.number);
            let outcome = match self.evaluator.evaluate(&part.locator).await {
                Ok(result) => {
                    save_text(&result.text, &self.output_dir.join(part.feedback_file()))?;
                    Ok(result)
                }
                Err(e) => Err(e.to_string()),
            };
            results.push(PartResult {
                part: part.clone(),
                outcome,
            });
        }

        if results.iter().all(|r| !r.is_success()) {
            let failures = results
                .iter()
                .filter_map(|r| match &r.outcome {
                    Err(reason) => Some((r.part.label(), reason.clone())),
                    Ok(_) => None,
                })
                .collect();
            return Err(SessionError::AllPartsFailed(failures));
        }

        let combined_feedback = combine_feedback(&results);
        save_text(
            &combined_feedback,
            &self.output_dir.join(COMBINED_FEEDBACK_FILE),
        )?;

        let score_report = match (&self.scorer, reference) {
            (Some(scorer), Some(reference)) => {
                log::info!("Scoring combined feedback with {}", scorer.name());
                let report =
                    ScoreReport::evaluate(scorer.as_ref(), &combined_feedback, reference).await;
                report
                    .save(&self.output_dir.join(SCORE_REPORT_FILE))
                    .map_err(|e| SessionError::Report(e.to_string()))?;
                Some(report)
            }
            _ => None,
        };

        Ok(SessionSummary {
            parts: results,
            combined_feedback,
            score_report,
            output_dir: self.output_dir.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
