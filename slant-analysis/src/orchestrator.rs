//! Per-URL two-phase state machine driven by timer-scheduled poll tasks.
//!
//! Each phase moves `absent → in_progress → {completed | error}` in the
//! store. Submissions run as background tasks that write the phase output and
//! state; a separate chain of [`PollTask`]s reads the persisted state back and
//! advances the in-memory [`AnalysisView`].
//!
//! Each URL carries two counters. The chain id changes on every start, restart
//! or clear, and a poll task from an older chain does nothing, so at most one
//! chain per URL is live. The epoch changes only when the URL's persisted keys
//! are reset; a background submission writes its result only while its epoch
//! is current. Starting again over an in-flight submission therefore replaces
//! the poll chain but still lets the submission land.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Serialize;
use slant_common::{SUPPORT_CONTACT, user_facing_message};
use slant_extract::{NormalizedDocument, PageContent, normalize, registry};
use slant_store::{KvStore, StoreError, get_as, keys, set_as};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::AnalysisError;
use crate::api::{
    AnalysisApi, Article, CheckDateUpdatedRequest, JournalistBias, QuickParseRecord,
    QuickParseRequest,
};
use crate::credentials::CredentialProvider;
use crate::state::{
    AnalysisEvent, AnalysisView, DetailedRecord, Phase, PhaseState, PhaseStatus, StageStatus,
};

/// Polls per chain before a stalled phase is restarted (phase 1) or dropped (phase 2).
pub const MAX_POLL_ATTEMPTS: u32 = 5;
pub const POLL_INTERVAL: Duration = Duration::from_millis(3000);
/// Automatic phase-1 restarts before the analysis is reported as failed.
pub const MAX_RESTARTS: u32 = 3;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_poll_attempts: u32,
    pub poll_interval: Duration,
    pub max_restarts: u32,
    pub detailed_requires_premium: bool,
    pub support_contact: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            poll_interval: POLL_INTERVAL,
            max_restarts: MAX_RESTARTS,
            detailed_requires_premium: false,
            support_contact: SUPPORT_CONTACT.to_string(),
        }
    }
}

/// One scheduled re-check of a phase. `generation` is the poll chain id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTask {
    pub url: String,
    pub phase: Phase,
    pub attempt: u32,
    pub generation: u64,
}

type FreshCopy = (QuickParseRecord, Option<Vec<JournalistBias>>);

/// Everything the store holds for one URL.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistedAnalysis {
    pub quick_parse_state: Option<PhaseState>,
    pub detailed_analysis_state: Option<PhaseState>,
    pub quick_parse: Option<QuickParseRecord>,
    pub detailed: Option<DetailedRecord>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Generation {
    chain: u64,
    epoch: u64,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AnalysisApi>,
    store: Arc<dyn KvStore>,
    credentials: Arc<dyn CredentialProvider>,
    config: OrchestratorConfig,
    views: DashMap<String, AnalysisView>,
    generations: DashMap<String, Generation>,
    // Retained until the analysis settles without an error.
    pages: DashMap<String, PageContent>,
    restarts: DashMap<String, u32>,
    // Generation for which phase 2 was already re-triggered after a torn write.
    detailed_retriggers: DashMap<String, u64>,
    events: broadcast::Sender<AnalysisEvent>,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn AnalysisApi>,
        store: Arc<dyn KvStore>,
        credentials: Arc<dyn CredentialProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                credentials,
                config,
                views: DashMap::new(),
                generations: DashMap::new(),
                pages: DashMap::new(),
                restarts: DashMap::new(),
                detailed_retriggers: DashMap::new(),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.inner.events.subscribe()
    }

    /// Current in-memory view for `url`, if an analysis was started.
    pub fn snapshot(&self, url: &str) -> Option<AnalysisView> {
        self.inner
            .views
            .get(&keys::normalize_url(url))
            .map(|v| v.clone())
    }

    /// Begin (or resume) the analysis of `page`.
    ///
    /// A persisted phase that is still `in_progress` is resumed by polling
    /// without resubmitting. When the service reports that its copy of the
    /// article is fresh, phase 1 is skipped and phase 2 starts right away.
    pub async fn start_analysis(&self, page: PageContent) -> Result<AnalysisView, AnalysisError> {
        let url = canonical_url(&page.url)?;
        let chain = self.bump_chain(&url);
        self.inner.restarts.insert(url.clone(), 0);
        self.inner.pages.insert(url.clone(), page.clone());
        let premium = self.inner.credentials.is_premium().await;
        self.inner.views.insert(
            url.clone(),
            AnalysisView {
                premium,
                ..AnalysisView::new(&url)
            },
        );
        info!(url = %url, chain, premium, "analysis.start");

        if self.resume(&url, chain).await? {
            return Ok(self.view(&url));
        }

        let doc = normalize(&page.raw_html);
        if let Some((record, journalists)) = self.fresh_record(&url, &doc).await? {
            info!(url = %url, article_id = record.article.id, "analysis.quick_parse.skipped");
            self.bump_epoch(&url);
            let store = self.store();
            set_as(store, &Phase::QuickParse.record_key(&url), &record).await?;
            set_as(store, &Phase::QuickParse.state_key(&url), &PhaseState::completed()).await?;
            self.update_view(&url, |v| {
                v.merge_quick(&record);
                if journalists.is_some() {
                    v.journalists_analysis = journalists;
                }
            });
            self.emit(AnalysisEvent::PhaseCompleted {
                url: url.clone(),
                phase: Phase::QuickParse,
            });
            self.start_detailed(&url, chain).await?;
            return Ok(self.view(&url));
        }

        self.submit_quick(&url, &page, doc, false, chain).await?;
        Ok(self.view(&url))
    }

    /// Supersede the current chain, drop everything persisted for the page
    /// and resubmit phase 1 with `restart = true`. The page must have been
    /// seen by [`start_analysis`](Self::start_analysis) or
    /// [`restart_page`](Self::restart_page) in this process, and the analysis
    /// must not have settled cleanly since; otherwise this returns
    /// [`AnalysisError::UnknownPage`].
    pub async fn restart_analysis(&self, url: &str) -> Result<AnalysisView, AnalysisError> {
        let url = canonical_url(url)?;
        if !self.inner.pages.contains_key(&url) {
            return Err(AnalysisError::UnknownPage(url));
        }
        self.inner.restarts.insert(url.clone(), 0);
        self.restart(&url).await?;
        Ok(self.view(&url))
    }

    /// [`restart_analysis`](Self::restart_analysis) for a page this process
    /// has not seen yet.
    pub async fn restart_page(&self, page: PageContent) -> Result<AnalysisView, AnalysisError> {
        let url = canonical_url(&page.url)?;
        self.inner.pages.insert(url.clone(), page);
        self.restart_analysis(&url).await
    }

    /// Forget the URL: stale chains stop and every persisted key is removed.
    pub async fn clear(&self, url: &str) -> Result<(), AnalysisError> {
        let url = canonical_url(url)?;
        self.bump_chain(&url);
        self.bump_epoch(&url);
        self.inner.views.remove(&url);
        self.inner.pages.remove(&url);
        self.inner.restarts.remove(&url);
        self.inner.detailed_retriggers.remove(&url);
        self.store().remove(&keys::all_keys(&url)).await?;
        info!(url = %url, "analysis.clear");
        Ok(())
    }

    /// Read the persisted states and records for `url`.
    pub async fn persisted(&self, url: &str) -> Result<PersistedAnalysis, AnalysisError> {
        let url = canonical_url(url)?;
        let store = self.store();
        Ok(PersistedAnalysis {
            quick_parse_state: get_as(store, &Phase::QuickParse.state_key(&url)).await?,
            detailed_analysis_state: get_as(store, &Phase::DetailedAnalysis.state_key(&url))
                .await?,
            quick_parse: get_as(store, &Phase::QuickParse.record_key(&url)).await?,
            detailed: get_as(store, &Phase::DetailedAnalysis.record_key(&url)).await?,
        })
    }

    /// One poll tick: read the phase's persisted state and advance.
    pub async fn poll_phase(&self, task: PollTask) {
        if !self.is_current(&task.url, task.generation) {
            debug!(url = %task.url, phase = task.phase.name(), attempt = task.attempt, "analysis.poll.stale");
            return;
        }
        debug!(url = %task.url, phase = task.phase.name(), attempt = task.attempt, "analysis.poll.tick");

        let state = match get_as::<PhaseState>(self.store(), &task.phase.state_key(&task.url)).await
        {
            Ok(state) => state,
            Err(err) => {
                warn!(url = %task.url, phase = task.phase.name(), error = %err, "analysis.poll.read_failed");
                None
            }
        };
        if !self.is_current(&task.url, task.generation) {
            return;
        }

        match state {
            Some(PhaseState {
                status: PhaseStatus::Completed,
                ..
            }) => self.on_completed(task).await,
            Some(PhaseState {
                status: PhaseStatus::Error,
                message,
            }) => self.on_error(&task.url, task.phase, message.as_deref()),
            _ => self.on_pending(task).await,
        }
    }

    /// Run `task` after `delay` on the runtime.
    pub fn schedule(&self, task: PollTask, delay: Duration) {
        let this = self.clone();
        let tick: BoxFuture<'static, ()> = Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            this.poll_phase(task).await;
        });
        tokio::spawn(tick);
    }

    /// Poll a phase left `in_progress` by an earlier chain or process. The
    /// epoch is kept so a submission still in flight can land.
    async fn resume(&self, url: &str, chain: u64) -> Result<bool, AnalysisError> {
        let store = self.store();
        let quick: Option<PhaseState> = get_as(store, &Phase::QuickParse.state_key(url)).await?;
        match quick.map(|s| s.status) {
            Some(PhaseStatus::InProgress) => {
                info!(url, phase = Phase::QuickParse.name(), "analysis.resume");
                self.update_view(url, |v| v.quick_parse = StageStatus::InProgress);
                self.schedule(self.first_poll(url, Phase::QuickParse, chain), Duration::ZERO);
                Ok(true)
            }
            Some(PhaseStatus::Completed) => {
                let detailed: Option<PhaseState> =
                    get_as(store, &Phase::DetailedAnalysis.state_key(url)).await?;
                if detailed.map(|s| s.status) != Some(PhaseStatus::InProgress) {
                    return Ok(false);
                }
                let Some(record) =
                    get_as::<QuickParseRecord>(store, &Phase::QuickParse.record_key(url)).await?
                else {
                    return Ok(false);
                };
                info!(url, phase = Phase::DetailedAnalysis.name(), "analysis.resume");
                self.update_view(url, |v| {
                    v.merge_quick(&record);
                    v.detailed_analysis = StageStatus::InProgress;
                });
                self.schedule(
                    self.first_poll(url, Phase::DetailedAnalysis, chain),
                    Duration::ZERO,
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Quick-parse data that is still current according to the service, with
    /// any journalist analysis the service already holds.
    async fn fresh_record(
        &self,
        url: &str,
        doc: &NormalizedDocument,
    ) -> Result<Option<FreshCopy>, AnalysisError> {
        let req = CheckDateUpdatedRequest {
            url: url.to_string(),
            head: doc.head.clone(),
            body: doc.body.clone(),
        };
        let answer = match self.inner.api.check_date_updated(&req).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(url, error = %err, "analysis.freshness.failed");
                return Ok(None);
            }
        };
        if answer.needs_update {
            return Ok(None);
        }
        if let Some(fresh) = answer.into_parts() {
            return Ok(Some(fresh));
        }
        let cached: Option<QuickParseRecord> =
            get_as(self.store(), &Phase::QuickParse.record_key(url)).await?;
        Ok(cached.map(|record| (record, None)))
    }

    async fn submit_quick(
        &self,
        url: &str,
        page: &PageContent,
        doc: NormalizedDocument,
        restart: bool,
        chain: u64,
    ) -> Result<(), AnalysisError> {
        let epoch = self.bump_epoch(url);
        let store = self.store();
        store.remove(&keys::all_keys(url)).await?;

        let kind = registry::select(url);
        let extracted = kind.parse(url, &page.raw_html);
        let request = QuickParseRequest {
            url: url.to_string(),
            hostname: registry::hostname(url).unwrap_or_default(),
            head: doc.head,
            body: doc.body,
            restart,
            title: Some(extracted.title.clone()),
            author: extracted.author.clone(),
            date: extracted.date,
            content: extracted.content.clone(),
        };

        set_as(store, &Phase::QuickParse.state_key(url), &PhaseState::in_progress()).await?;
        self.update_view(url, |v| {
            v.extracted = Some(extracted);
            v.quick_parse = StageStatus::InProgress;
            v.error = None;
        });
        self.emit(AnalysisEvent::PhaseStarted {
            url: url.to_string(),
            phase: Phase::QuickParse,
        });
        info!(url, extractor = kind.name(), restart, chain, epoch, "analysis.quick_parse.submit");

        let this = self.clone();
        let owned = url.to_string();
        tokio::spawn(async move { this.run_quick_parse(owned, request, epoch).await });
        self.schedule(self.first_poll(url, Phase::QuickParse, chain), Duration::ZERO);
        Ok(())
    }

    async fn run_quick_parse(self, url: String, request: QuickParseRequest, epoch: u64) {
        let result = self.inner.api.quick_parse(&request).await;
        let state_key = Phase::QuickParse.state_key(&url);
        let persisted = match result {
            Ok(record) => {
                match self
                    .write_current(&url, epoch, &Phase::QuickParse.record_key(&url), &record)
                    .await
                {
                    Ok(true) => {
                        self.write_current(&url, epoch, &state_key, &PhaseState::completed())
                            .await
                    }
                    other => other,
                }
            }
            Err(err) => {
                warn!(url = %url, error = %err, "analysis.quick_parse.failed");
                self.write_current(&url, epoch, &state_key, &PhaseState::error(err.user_message()))
                    .await
            }
        };
        match persisted {
            Ok(true) => {}
            Ok(false) => debug!(url = %url, epoch, "analysis.quick_parse.stale_result"),
            Err(err) => warn!(url = %url, error = %err, "analysis.quick_parse.persist_failed"),
        }
    }

    async fn start_detailed(&self, url: &str, chain: u64) -> Result<(), AnalysisError> {
        if self.inner.config.detailed_requires_premium && !self.inner.credentials.is_premium().await
        {
            info!(url, "analysis.detailed.skipped");
            self.update_view(url, |v| v.detailed_analysis = StageStatus::Skipped);
            self.emit(AnalysisEvent::DetailedSkipped {
                url: url.to_string(),
            });
            self.release_settled(url);
            return Ok(());
        }

        let article = self
            .inner
            .views
            .get(url)
            .and_then(|v| v.article.clone())
            .ok_or_else(|| AnalysisError::MissingArticle(url.to_string()))?;

        set_as(
            self.store(),
            &Phase::DetailedAnalysis.state_key(url),
            &PhaseState::in_progress(),
        )
        .await?;
        self.update_view(url, |v| v.detailed_analysis = StageStatus::InProgress);
        self.emit(AnalysisEvent::PhaseStarted {
            url: url.to_string(),
            phase: Phase::DetailedAnalysis,
        });
        info!(
            url,
            article_id = article.id,
            publication_id = ?article.publication,
            "analysis.detailed.submit"
        );

        let epoch = self.epoch(url);
        let this = self.clone();
        let owned = url.to_string();
        tokio::spawn(async move { this.run_detailed(owned, article, epoch).await });
        self.schedule(
            self.first_poll(url, Phase::DetailedAnalysis, chain),
            Duration::ZERO,
        );
        Ok(())
    }

    async fn run_detailed(self, url: String, article: Article, epoch: u64) {
        let api = &self.inner.api;
        let publication = async {
            match article.publication {
                Some(id) => api.analyze_publication(id).await.map(Some),
                None => Ok(None),
            }
        };
        let (journalists, publication) =
            tokio::join!(api.analyze_journalists(article.id), publication);

        let state_key = Phase::DetailedAnalysis.state_key(&url);
        let persisted = match (journalists, publication) {
            (Ok(journalists_analysis), Ok(publication_analysis)) => {
                let record = DetailedRecord {
                    journalists_analysis,
                    publication_analysis,
                };
                match self
                    .write_current(&url, epoch, &Phase::DetailedAnalysis.record_key(&url), &record)
                    .await
                {
                    Ok(true) => {
                        self.write_current(&url, epoch, &state_key, &PhaseState::completed())
                            .await
                    }
                    other => other,
                }
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(url = %url, error = %err, "analysis.detailed.failed");
                self.write_current(&url, epoch, &state_key, &PhaseState::error(err.user_message()))
                    .await
            }
        };
        match persisted {
            Ok(true) => {}
            Ok(false) => debug!(url = %url, epoch, "analysis.detailed.stale_result"),
            Err(err) => warn!(url = %url, error = %err, "analysis.detailed.persist_failed"),
        }
    }

    /// Write a background result, but only while `epoch` is still the URL's
    /// epoch. Checked right before the write, so a reset that lands during an
    /// earlier write of the same result stops the rest.
    async fn write_current<T: Serialize + Sync + ?Sized>(
        &self,
        url: &str,
        epoch: u64,
        key: &str,
        value: &T,
    ) -> Result<bool, StoreError> {
        if self.epoch(url) != epoch {
            return Ok(false);
        }
        set_as(self.store(), key, value).await?;
        Ok(true)
    }

    async fn on_completed(&self, task: PollTask) {
        let store = self.store();
        match task.phase {
            Phase::QuickParse => {
                match get_as::<QuickParseRecord>(store, &Phase::QuickParse.record_key(&task.url))
                    .await
                {
                    Ok(Some(record)) => {
                        info!(url = %task.url, article_id = record.article.id, "analysis.quick_parse.completed");
                        self.update_view(&task.url, |v| v.merge_quick(&record));
                        self.emit(AnalysisEvent::PhaseCompleted {
                            url: task.url.clone(),
                            phase: Phase::QuickParse,
                        });
                        if let Err(err) = self.start_detailed(&task.url, task.generation).await {
                            warn!(url = %task.url, error = %err, "analysis.detailed.start_failed");
                        }
                    }
                    other => {
                        if let Err(err) = other {
                            warn!(url = %task.url, error = %err, "analysis.poll.record_unreadable");
                        }
                        // State written without its record; keep polling until
                        // the stall budget forces a restart.
                        self.on_pending(task).await;
                    }
                }
            }
            Phase::DetailedAnalysis => {
                match get_as::<DetailedRecord>(store, &Phase::DetailedAnalysis.record_key(&task.url))
                    .await
                {
                    Ok(Some(record)) => {
                        info!(
                            url = %task.url,
                            journalists = record.journalists_analysis.len(),
                            has_publication = record.publication_analysis.is_some(),
                            "analysis.detailed.completed"
                        );
                        self.update_view(&task.url, |v| v.merge_detailed(&record));
                        self.emit(AnalysisEvent::PhaseCompleted {
                            url: task.url.clone(),
                            phase: Phase::DetailedAnalysis,
                        });
                        self.release_settled(&task.url);
                    }
                    other => {
                        if let Err(err) = other {
                            warn!(url = %task.url, error = %err, "analysis.poll.record_unreadable");
                        }
                        self.retrigger_detailed(&task).await;
                    }
                }
            }
        }
    }

    /// A completed detailed state without its record counts as an error; phase 2
    /// is submitted again once per chain.
    async fn retrigger_detailed(&self, task: &PollTask) {
        let already = self
            .inner
            .detailed_retriggers
            .get(&task.url)
            .is_some_and(|g| *g == task.generation);
        if already {
            self.on_error(&task.url, task.phase, Some("Detailed analysis result is missing"));
            return;
        }
        self.inner
            .detailed_retriggers
            .insert(task.url.clone(), task.generation);
        warn!(url = %task.url, "analysis.detailed.retrigger");
        if let Err(err) = self.start_detailed(&task.url, task.generation).await {
            warn!(url = %task.url, error = %err, "analysis.detailed.start_failed");
        }
    }

    fn on_error(&self, url: &str, phase: Phase, message: Option<&str>) {
        let raw = message.unwrap_or_default();
        let shown = user_facing_message(raw, &self.inner.config.support_contact);
        warn!(url, phase = phase.name(), message = raw, "analysis.phase.error");
        self.update_view(url, |v| {
            match phase {
                Phase::QuickParse => v.quick_parse = StageStatus::Error,
                Phase::DetailedAnalysis => v.detailed_analysis = StageStatus::Error,
            }
            v.error = Some(shown.clone());
        });
        self.emit(AnalysisEvent::PhaseFailed {
            url: url.to_string(),
            phase,
            message: shown,
        });
        self.release_settled(url);
    }

    async fn on_pending(&self, task: PollTask) {
        if task.attempt < self.inner.config.max_poll_attempts {
            let next = PollTask {
                attempt: task.attempt + 1,
                ..task
            };
            self.schedule(next, self.inner.config.poll_interval);
            return;
        }
        match task.phase {
            Phase::QuickParse => self.restart_stalled(&task).await,
            Phase::DetailedAnalysis => {
                // Enrichment only: give up without surfacing an error.
                info!(url = %task.url, attempts = task.attempt, "analysis.detailed.abandoned");
                self.update_view(&task.url, |v| {
                    v.detailed_analysis = StageStatus::Abandoned;
                });
                self.emit(AnalysisEvent::DetailedAbandoned {
                    url: task.url.clone(),
                });
                self.release_settled(&task.url);
            }
        }
    }

    async fn restart_stalled(&self, task: &PollTask) {
        let restarts = {
            let mut count = self.inner.restarts.entry(task.url.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if restarts > self.inner.config.max_restarts {
            let message = "Analysis timed out";
            if let Err(err) = set_as(
                self.store(),
                &Phase::QuickParse.state_key(&task.url),
                &PhaseState::error(message),
            )
            .await
            {
                warn!(url = %task.url, error = %err, "analysis.quick_parse.persist_failed");
            }
            self.on_error(&task.url, Phase::QuickParse, Some(message));
            return;
        }

        warn!(url = %task.url, attempts = task.attempt, restarts, "analysis.quick_parse.stalled");
        self.emit(AnalysisEvent::Restarted {
            url: task.url.clone(),
            restarts,
        });
        if let Err(err) = self.restart(&task.url).await {
            warn!(url = %task.url, error = %err, "analysis.restart.failed");
        }
    }

    async fn restart(&self, url: &str) -> Result<(), AnalysisError> {
        let page = self
            .inner
            .pages
            .get(url)
            .map(|p| p.clone())
            .ok_or_else(|| AnalysisError::UnknownPage(url.to_string()))?;
        let chain = self.bump_chain(url);
        let premium = self.inner.credentials.is_premium().await;
        self.inner.views.insert(
            url.to_string(),
            AnalysisView {
                premium,
                ..AnalysisView::new(url)
            },
        );
        info!(url, chain, "analysis.restart");
        let doc = normalize(&page.raw_html);
        self.submit_quick(url, &page, doc, true, chain).await
    }

    /// Drop per-chain bookkeeping once the view has settled. The page stays
    /// after a failure so the analysis can still be restarted.
    fn release_settled(&self, url: &str) {
        let Some((settled, failed)) = self
            .inner
            .views
            .get(url)
            .map(|v| (v.is_settled(), v.error.is_some()))
        else {
            return;
        };
        if !settled {
            return;
        }
        self.inner.restarts.remove(url);
        self.inner.detailed_retriggers.remove(url);
        if !failed {
            self.inner.pages.remove(url);
        }
        debug!(url, failed, "analysis.settled");
    }

    fn first_poll(&self, url: &str, phase: Phase, chain: u64) -> PollTask {
        PollTask {
            url: url.to_string(),
            phase,
            attempt: 0,
            generation: chain,
        }
    }

    fn bump_chain(&self, url: &str) -> u64 {
        let mut generation = self.inner.generations.entry(url.to_string()).or_default();
        generation.chain += 1;
        generation.chain
    }

    fn bump_epoch(&self, url: &str) -> u64 {
        let mut generation = self.inner.generations.entry(url.to_string()).or_default();
        generation.epoch += 1;
        generation.epoch
    }

    fn epoch(&self, url: &str) -> u64 {
        self.inner
            .generations
            .get(url)
            .map(|g| g.epoch)
            .unwrap_or_default()
    }

    fn is_current(&self, url: &str, chain: u64) -> bool {
        self.inner
            .generations
            .get(url)
            .is_some_and(|g| g.chain == chain)
    }

    fn update_view(&self, url: &str, f: impl FnOnce(&mut AnalysisView)) {
        let mut view = self
            .inner
            .views
            .entry(url.to_string())
            .or_insert_with(|| AnalysisView::new(url));
        f(view.value_mut());
    }

    fn view(&self, url: &str) -> AnalysisView {
        self.inner
            .views
            .get(url)
            .map(|v| v.clone())
            .unwrap_or_else(|| AnalysisView::new(url))
    }

    fn emit(&self, event: AnalysisEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn store(&self) -> &dyn KvStore {
        self.inner.store.as_ref()
    }
}

/// Canonical form of a page URL; it must be absolute with a host.
fn canonical_url(raw: &str) -> Result<String, AnalysisError> {
    let parsed =
        url::Url::parse(raw.trim()).map_err(|_| AnalysisError::InvalidUrl(raw.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(AnalysisError::InvalidUrl(raw.to_string()));
    }
    Ok(keys::normalize_url(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_url_drops_fragment_and_rejects_relative() {
        assert_eq!(
            canonical_url("https://example.com/a#c").unwrap(),
            "https://example.com/a"
        );
        assert!(canonical_url("/relative/path").is_err());
        assert!(canonical_url("mailto:someone").is_err());
    }

    #[test]
    fn default_polling_budget() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_poll_attempts, 5);
        assert_eq!(cfg.poll_interval, Duration::from_millis(3000));
    }
}
