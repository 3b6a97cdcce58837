//! Result-shaped score reports.
//!
//! [`ScoreReport::evaluate`] never fails: a scorer error is captured in the
//! report's `error` field with `status = failed`, so a session can report
//! partial success and still persist what it has.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::scoring::scorer::{normalize, FeedbackScorer, ScoreMap};

/// The question every sample is scored against.
pub const EVALUATION_QUESTION: &str =
    "Evaluate the IELTS Speaking performance based on the official band descriptors.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Failed,
}

/// One scored row: generated answer, human ground truth, and context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSample {
    pub question: String,
    pub answer: String,
    pub ground_truth: String,
    pub contexts: Vec<String>,
}

impl ScoredSample {
    /// The reference doubles as the only retrieval context.
    pub fn new(candidate: &str, reference: &str) -> Self {
        Self {
            question: EVALUATION_QUESTION.to_string(),
            answer: candidate.to_string(),
            ground_truth: reference.to_string(),
            contexts: vec![reference.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub status: ReportStatus,
    pub scorer: String,
    pub overall_metrics: ScoreMap,
    pub detailed_results: Vec<ScoredSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScoreReport {
    /// Score `candidate` against `reference`, capturing failure as data.
    pub async fn evaluate(scorer: &dyn FeedbackScorer, candidate: &str, reference: &str) -> Self {
        let sample = ScoredSample::new(candidate, reference);
        match scorer.score(candidate, reference).await {
            Ok(scores) => Self {
                status: ReportStatus::Completed,
                scorer: scorer.name().to_string(),
                overall_metrics: normalize(scores),
                detailed_results: vec![sample],
                error: None,
            },
            Err(e) => {
                log::error!("Scorer {} failed: {e}", scorer.name());
                Self {
                    status: ReportStatus::Failed,
                    scorer: scorer.name().to_string(),
                    overall_metrics: ScoreMap::new(),
                    detailed_results: vec![sample],
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Completed
    }

    /// Human-readable metric table, one line per metric.
    pub fn render_metrics(&self) -> String {
        self.overall_metrics
            .iter()
            .map(|(name, score)| match score {
                Some(v) => format!("{name:25}: {v:.3}"),
                None => format!("{name:25}: N/A"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved: {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::scorer::ScoringError;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct FixedScorer(ScoreMap);

    #[async_trait]
    impl FeedbackScorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _c: &str, _r: &str) -> Result<ScoreMap, ScoringError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenScorer;

    #[async_trait]
    impl FeedbackScorer for BrokenScorer {
        fn name(&self) -> &str {
            "broken"
        }

        async fn score(&self, _c: &str, _r: &str) -> Result<ScoreMap, ScoringError> {
            Err(ScoringError::Request("connection refused".into()))
        }
    }

    fn metrics() -> ScoreMap {
        let mut m = ScoreMap::new();
        m.insert("faithfulness".into(), Some(0.75));
        m.insert("answer_relevancy".into(), Some(f64::NAN));
        m
    }

    #[tokio::test]
    async fn success_records_normalized_metrics_and_sample() {
        let report = ScoreReport::evaluate(&FixedScorer(metrics()), "generated", "human").await;

        assert!(report.is_success());
        assert_eq!(report.scorer, "fixed");
        assert_eq!(report.overall_metrics["faithfulness"], Some(0.75));
        assert_eq!(report.overall_metrics["answer_relevancy"], None);
        assert!(report.error.is_none());

        let sample = &report.detailed_results[0];
        assert_eq!(sample.question, EVALUATION_QUESTION);
        assert_eq!(sample.answer, "generated");
        assert_eq!(sample.ground_truth, "human");
        assert_eq!(sample.contexts, vec!["human".to_string()]);
    }

    #[tokio::test]
    async fn failure_is_captured_not_raised() {
        let report = ScoreReport::evaluate(&BrokenScorer, "generated", "human").await;

        assert!(!report.is_success());
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.overall_metrics.is_empty());
        assert!(report
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused")));
    }

    #[tokio::test]
    async fn save_writes_json_with_null_for_undefined() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("evaluation_results.json");

        let report = ScoreReport::evaluate(&FixedScorer(metrics()), "g", "h").await;
        report.save(&path).expect("save");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["status"], "completed");
        assert_eq!(raw["overall_metrics"]["faithfulness"], 0.75);
        assert!(raw["overall_metrics"]["answer_relevancy"].is_null());
        assert!(raw.get("error").is_none());

        let loaded = ScoreReport::load(&path).expect("load");
        assert_eq!(loaded.overall_metrics, report.overall_metrics);
    }

    #[tokio::test]
    async fn render_metrics_marks_missing_values() {
        let report = ScoreReport::evaluate(&FixedScorer(metrics()), "g", "h").await;
        let rendered = report.render_metrics();
        assert!(rendered.contains("faithfulness"));
        assert!(rendered.contains("0.750"));
        assert!(rendered.contains("N/A"));
    }
}
