//! Persisted phase state and the in-memory analysis view.

use serde::{Deserialize, Serialize};
use slant_extract::ArticleData;
use slant_store::keys;

use crate::api::{Article, JournalistBias, PublicationAnalysis, QuickParseRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    QuickParse,
    DetailedAnalysis,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::QuickParse => "quick_parse",
            Phase::DetailedAnalysis => "detailed_analysis",
        }
    }

    /// Key of this phase's persisted [`PhaseState`].
    pub fn state_key(self, url: &str) -> String {
        match self {
            Phase::QuickParse => keys::quick_state_key(url),
            Phase::DetailedAnalysis => keys::detailed_state_key(url),
        }
    }

    /// Key of this phase's cached output.
    pub fn record_key(self, url: &str) -> String {
        match self {
            Phase::QuickParse => keys::url_key(url),
            Phase::DetailedAnalysis => keys::detailed_key(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    InProgress,
    Completed,
    Error,
}

/// One phase's persisted status, overwritten on each attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PhaseState {
    pub fn in_progress() -> Self {
        Self {
            status: PhaseStatus::InProgress,
            message: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            status: PhaseStatus::Completed,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PhaseStatus::Error,
            message: Some(message.into()),
        }
    }
}

/// Phase-2 output cached at `<url>_detailed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedRecord {
    #[serde(default)]
    pub journalists_analysis: Vec<JournalistBias>,
    #[serde(default)]
    pub publication_analysis: Option<PublicationAnalysis>,
}

/// Progress of one stage as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Error,
    /// Not run: the caller lacks the required subscription.
    Skipped,
    /// Polling budget spent without a result; nothing shown.
    Abandoned,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StageStatus::Pending | StageStatus::InProgress)
    }
}

impl From<PhaseStatus> for StageStatus {
    fn from(status: PhaseStatus) -> Self {
        match status {
            PhaseStatus::InProgress => StageStatus::InProgress,
            PhaseStatus::Completed => StageStatus::Completed,
            PhaseStatus::Error => StageStatus::Error,
        }
    }
}

/// In-memory application state for one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisView {
    pub url: String,
    pub extracted: Option<ArticleData>,
    pub article: Option<Article>,
    pub summary: Option<String>,
    pub political_bias_score: Option<f64>,
    pub objectivity_score: Option<f64>,
    pub journalists_analysis: Option<Vec<JournalistBias>>,
    pub publication_analysis: Option<PublicationAnalysis>,
    pub quick_parse: StageStatus,
    pub detailed_analysis: StageStatus,
    pub error: Option<String>,
    pub premium: bool,
}

impl AnalysisView {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Both phases have reached an end state, or phase 1 failed.
    pub fn is_settled(&self) -> bool {
        self.quick_parse == StageStatus::Error
            || (self.quick_parse.is_terminal() && self.detailed_analysis.is_terminal())
    }

    pub fn merge_quick(&mut self, record: &QuickParseRecord) {
        self.article = Some(record.article.clone());
        if record.summary.is_some() {
            self.summary = record.summary.clone();
        }
        if record.political_bias_score.is_some() {
            self.political_bias_score = record.political_bias_score;
        }
        if record.objectivity_score.is_some() {
            self.objectivity_score = record.objectivity_score;
        }
        self.quick_parse = StageStatus::Completed;
        self.error = None;
    }

    /// Additive: phase-1 fields are never touched and absent phase-2 parts
    /// never replace present ones.
    pub fn merge_detailed(&mut self, record: &DetailedRecord) {
        if !record.journalists_analysis.is_empty() || self.journalists_analysis.is_none() {
            self.journalists_analysis = Some(record.journalists_analysis.clone());
        }
        if record.publication_analysis.is_some() {
            self.publication_analysis = record.publication_analysis.clone();
        }
        self.detailed_analysis = StageStatus::Completed;
    }
}

/// Progress notifications broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    PhaseStarted { url: String, phase: Phase },
    PhaseCompleted { url: String, phase: Phase },
    PhaseFailed { url: String, phase: Phase, message: String },
    Restarted { url: String, restarts: u32 },
    DetailedSkipped { url: String },
    DetailedAbandoned { url: String },
}

impl AnalysisEvent {
    pub fn url(&self) -> &str {
        match self {
            AnalysisEvent::PhaseStarted { url, .. }
            | AnalysisEvent::PhaseCompleted { url, .. }
            | AnalysisEvent::PhaseFailed { url, .. }
            | AnalysisEvent::Restarted { url, .. }
            | AnalysisEvent::DetailedSkipped { url }
            | AnalysisEvent::DetailedAbandoned { url } => url,
        }
    }
}
