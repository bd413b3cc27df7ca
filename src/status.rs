use crate::azure::{Build, CicdApi, Deployment};
use crate::error::DevOpsError;
use crate::settings::{ButtonSettings, PipelineKind};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Build,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    InProgress,
    Cancelling,
    Postponed,
    Completed,
}

impl RunState {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "notStarted" => Some(Self::NotStarted),
            "inProgress" => Some(Self::InProgress),
            "cancelling" => Some(Self::Cancelling),
            "postponed" => Some(Self::Postponed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
    Canceled,
    PartiallySucceeded,
}

impl RunOutcome {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            "partiallySucceeded" => Some(Self::PartiallySucceeded),
            _ => None,
        }
    }
}

/// One run as seen at resolution time. Built fresh per call, never stored.
/// `state == None` means the service reported something this crate does not
/// chart; the display mapping turns that into Unknown rather than failing.
#[derive(Debug, Clone, Copy)]
pub struct RunSnapshot {
    pub kind: RunKind,
    pub id: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub state: Option<RunState>,
    pub outcome: Option<RunOutcome>,
}

impl RunSnapshot {
    pub fn from_build(build: &Build) -> Self {
        Self {
            kind: RunKind::Build,
            id: build.id,
            started_at: build.start_time,
            state: build.status.as_deref().and_then(RunState::parse),
            outcome: build.result.as_deref().and_then(RunOutcome::parse),
        }
    }

    /// Deployments report two status fields; fold them into one run state.
    pub fn from_deployment(deployment: &Deployment) -> Self {
        let (state, outcome) = match deployment.deployment_status.as_deref() {
            Some("succeeded") => (Some(RunState::Completed), Some(RunOutcome::Succeeded)),
            Some("partiallySucceeded") => (
                Some(RunState::Completed),
                Some(RunOutcome::PartiallySucceeded),
            ),
            Some("failed") => (Some(RunState::Completed), Some(RunOutcome::Failed)),
            other => match deployment.operation_status.as_deref() {
                Some("canceled") => (Some(RunState::Completed), Some(RunOutcome::Canceled)),
                Some("cancelling") => (Some(RunState::Cancelling), None),
                Some(
                    "pending" | "scheduled" | "queued" | "queuedForAgent" | "queuedForPipeline"
                    | "manualInterventionPending",
                ) => (Some(RunState::NotStarted), None),
                Some("phaseInProgress") => (Some(RunState::InProgress), None),
                _ if other == Some("inProgress") => (Some(RunState::InProgress), None),
                _ => (None, None),
            },
        };

        Self {
            kind: RunKind::Release,
            id: deployment.id,
            // Staleness is judged from queue time; a deployment gated on an
            // approval never gets a start time.
            started_at: deployment.queued_on,
            state,
            outcome,
        }
    }
}

/// Discrete visual state of a button. Selects one icon asset and title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Unknown,
    Updating,
    Waiting,
    InProgress,
    Success,
    PartialSuccess,
    Failed,
    Canceled,
    PullRequests(u32),
}

impl DisplayState {
    /// Total mapping from a snapshot; anything unmapped is Unknown.
    pub fn from_snapshot(snapshot: &RunSnapshot) -> Self {
        match (snapshot.state, snapshot.outcome) {
            (Some(RunState::Completed), Some(RunOutcome::Succeeded)) => Self::Success,
            (Some(RunState::Completed), Some(RunOutcome::Failed)) => Self::Failed,
            (Some(RunState::Completed), Some(RunOutcome::Canceled)) => Self::Canceled,
            (Some(RunState::Completed), Some(RunOutcome::PartiallySucceeded)) => {
                Self::PartialSuccess
            }
            (Some(RunState::Cancelling), _) => Self::Canceled,
            (Some(RunState::InProgress), _) => Self::InProgress,
            (Some(RunState::NotStarted | RunState::Postponed), _) => Self::Waiting,
            // Completed without an outcome, or an uncharted state.
            _ => Self::Unknown,
        }
    }

    pub fn icon_asset(&self) -> &'static str {
        match self {
            Self::Unknown => "images/Azure-DevOps-unknown.png",
            Self::Updating => "images/Azure-DevOps-updating.png",
            Self::Waiting => "images/Azure-DevOps-waiting.png",
            Self::InProgress => "images/Azure-DevOps-in-progress.png",
            Self::Success => "images/Azure-DevOps-success.png",
            Self::PartialSuccess => "images/Azure-DevOps-partial-success.png",
            Self::Failed => "images/Azure-DevOps-fail.png",
            Self::Canceled => "images/Azure-DevOps-cancel.png",
            Self::PullRequests(count) => match count {
                0 => "images/Azure-DevOps-0.png",
                1 => "images/Azure-DevOps-1.png",
                2 => "images/Azure-DevOps-2.png",
                3 => "images/Azure-DevOps-3.png",
                4 => "images/Azure-DevOps-4.png",
                5 => "images/Azure-DevOps-5.png",
                6 => "images/Azure-DevOps-6.png",
                7 => "images/Azure-DevOps-7.png",
                8 => "images/Azure-DevOps-8.png",
                _ => "images/Azure-DevOps-9plus.png",
            },
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Unknown => "Unknown".to_string(),
            Self::Updating => "Updating...".to_string(),
            Self::Waiting => "Waiting".to_string(),
            Self::InProgress => "In progress".to_string(),
            Self::Success => "Succeeded".to_string(),
            Self::PartialSuccess => "Partially succeeded".to_string(),
            Self::Failed => "Failed".to_string(),
            Self::Canceled => "Canceled".to_string(),
            Self::PullRequests(count) if *count >= 9 => "9+ PRs".to_string(),
            Self::PullRequests(count) => format!("{count} PRs"),
        }
    }
}

/// Resolves a button's configured pipeline to its current display state.
pub struct StatusResolver<A> {
    api: Arc<A>,
    stale_after: Duration,
}

impl<A> Clone for StatusResolver<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            stale_after: self.stale_after,
        }
    }
}

impl<A: CicdApi> StatusResolver<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            stale_after: Duration::hours(24),
        }
    }

    /// Window after which an in-progress run no longer masks the latest
    /// completed result.
    pub fn with_stale_after(mut self, window: Duration) -> Self {
        self.stale_after = window;
        self
    }

    pub async fn resolve(&self, settings: &ButtonSettings) -> Result<DisplayState, DevOpsError> {
        match settings.pipeline_kind {
            PipelineKind::Build => self.resolve_build(settings).await,
            PipelineKind::Release => self.resolve_release(settings).await,
            PipelineKind::PullRequest => self.resolve_pull_requests(settings).await,
        }
    }

    /// Polling-path variant: absorbs every failure into the unknown state so
    /// the loop survives.
    pub async fn resolve_or_unknown(&self, settings: &ButtonSettings) -> DisplayState {
        match self.resolve(settings).await {
            Ok(state) => state,
            Err(err) => {
                warn!(project = %settings.project_name, "status resolution failed: {err}");
                DisplayState::Unknown
            }
        }
    }

    async fn resolve_build(&self, settings: &ButtonSettings) -> Result<DisplayState, DevOpsError> {
        // An in-progress build is more interesting than the latest finished
        // one, unless it has been sitting for so long that it is probably
        // stuck waiting on an approval.
        let cutoff = Utc::now() - self.stale_after;
        let current = self
            .api
            .in_progress_builds(settings)
            .await?
            .into_iter()
            .find(|build| build.start_time.is_some_and(|started| started > cutoff));

        let build = match current {
            Some(build) => Some(build),
            None => self.api.latest_build(settings).await?,
        };

        Ok(build
            .map(|build| DisplayState::from_snapshot(&RunSnapshot::from_build(&build)))
            .unwrap_or(DisplayState::Unknown))
    }

    async fn resolve_release(&self, settings: &ButtonSettings) -> Result<DisplayState, DevOpsError> {
        let cutoff = Utc::now() - self.stale_after;
        let current = self
            .api
            .in_progress_deployments(settings)
            .await?
            .into_iter()
            .find(|deployment| deployment.queued_on.is_some_and(|queued| queued > cutoff));

        let deployment = match current {
            Some(deployment) => Some(deployment),
            None => self
                .api
                .latest_deployments(settings)
                .await?
                .into_iter()
                .next(),
        };

        Ok(deployment
            .map(|deployment| DisplayState::from_snapshot(&RunSnapshot::from_deployment(&deployment)))
            .unwrap_or(DisplayState::Unknown))
    }

    async fn resolve_pull_requests(
        &self,
        settings: &ButtonSettings,
    ) -> Result<DisplayState, DevOpsError> {
        let pull_requests = self.api.active_pull_requests(settings).await?;
        let count = match settings.repository() {
            Some(repo) => pull_requests
                .iter()
                .filter(|pr| {
                    pr.repository
                        .as_ref()
                        .is_some_and(|r| r.name.eq_ignore_ascii_case(&repo))
                })
                .count(),
            None => pull_requests.len(),
        };
        Ok(DisplayState::PullRequests(count as u32))
    }
}
