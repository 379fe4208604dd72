//! Two-phase article analysis.
//!
//! Phase 1 (quick parse) submits the normalized page and extracted fields to
//! the remote service; phase 2 (detailed analysis) asks for journalist and
//! publication bias once phase 1 is complete. Progress is persisted through a
//! [`slant_store::KvStore`] and observed by timer-driven polling, so an
//! analysis started by one process can be resumed by the next.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use slant_analysis::{HttpAnalysisApi, NoCredentials, Orchestrator, OrchestratorConfig};
//! use slant_extract::PageContent;
//! use slant_store::MemoryStore;
//!
//! # async fn run() -> Result<(), slant_analysis::AnalysisError> {
//! let creds = Arc::new(NoCredentials);
//! let api = HttpAnalysisApi::new("http://localhost:8000/", Duration::from_secs(15), 2, creds.clone())?;
//! let orchestrator = Orchestrator::new(
//!     Arc::new(api),
//!     Arc::new(MemoryStore::new()),
//!     creds,
//!     OrchestratorConfig::default(),
//! );
//! let view = orchestrator
//!     .start_analysis(PageContent::new("https://example.com/a", "<html>...</html>"))
//!     .await?;
//! println!("{:?}", view.quick_parse);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod credentials;
pub mod orchestrator;
pub mod state;

use slant_http::HttpError;
use slant_store::StoreError;
use thiserror::Error;

pub use api::{AnalysisApi, HttpAnalysisApi};
pub use credentials::{CredentialProvider, NoCredentials, StaticCredentials};
pub use orchestrator::{
    MAX_POLL_ATTEMPTS, Orchestrator, OrchestratorConfig, POLL_INTERVAL, PersistedAnalysis,
    PollTask,
};
pub use state::{AnalysisEvent, AnalysisView, Phase, PhaseState, PhaseStatus, StageStatus};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("remote: {0}")]
    Remote(#[from] HttpError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("no article record for {0}")]
    MissingArticle(String),
    #[error("invalid page url: {0:?}")]
    InvalidUrl(String),
    #[error("no page content known for {0}")]
    UnknownPage(String),
}
