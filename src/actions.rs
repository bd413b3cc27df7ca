use crate::azure::CicdApi;
use crate::error::DevOpsError;
use crate::settings::{ButtonSettings, KeyPressAction, PipelineKind};
use std::sync::Arc;

/// What a dispatched key press asks the lifecycle controller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Resolve the current status and repaint.
    Refresh,
    /// New runs were queued/created.
    Started { runs: usize },
    /// Hand a URL to the host's browser.
    Open(String),
}

/// Maps a configured key-press action onto remote mutations and effects.
/// Stateless; all context comes from the button's settings.
pub struct ActionDispatcher<A> {
    api: Arc<A>,
}

impl<A: CicdApi> ActionDispatcher<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn dispatch(
        &self,
        settings: &ButtonSettings,
        action: KeyPressAction,
    ) -> Result<Effect, DevOpsError> {
        match action {
            KeyPressAction::DoNothing => Ok(Effect::None),
            KeyPressAction::UpdateStatus => Ok(Effect::Refresh),
            KeyPressAction::Run => self.run(settings).await,
            KeyPressAction::Open => Ok(Effect::Open(history_url(settings))),
        }
    }

    async fn run(&self, settings: &ButtonSettings) -> Result<Effect, DevOpsError> {
        match settings.pipeline_kind {
            PipelineKind::Build => {
                let ids = match settings.definition() {
                    Some(id) => vec![id],
                    // No definition configured: run every definition in the project.
                    None => self
                        .api
                        .build_definitions(settings)
                        .await?
                        .into_iter()
                        .map(|definition| definition.id)
                        .collect(),
                };
                if ids.is_empty() {
                    return Err(DevOpsError::ConfigurationInvalid(
                        "no build definitions found in the project".into(),
                    ));
                }
                for id in &ids {
                    self.api.queue_build(settings, *id).await?;
                }
                Ok(Effect::Started { runs: ids.len() })
            }

            PipelineKind::Release => {
                let ids = match settings.definition() {
                    Some(id) => vec![id],
                    None => self
                        .api
                        .release_definitions(settings)
                        .await?
                        .into_iter()
                        .filter(|definition| !definition.is_deleted && !definition.is_disabled)
                        .map(|definition| definition.id)
                        .collect(),
                };
                if ids.is_empty() {
                    return Err(DevOpsError::ConfigurationInvalid(
                        "no release definitions found in the project".into(),
                    ));
                }
                for id in &ids {
                    self.api.create_release(settings, *id).await?;
                }
                Ok(Effect::Started { runs: ids.len() })
            }

            // There is nothing to "run" for pull requests; open the creation page.
            PipelineKind::PullRequest => Ok(Effect::Open(create_pull_request_url(settings))),
        }
    }
}

/// Browser page showing the history of whatever the button watches.
pub fn history_url(settings: &ButtonSettings) -> String {
    let org = settings.organization();
    let project = urlencoding::encode(&settings.project_name);
    match settings.pipeline_kind {
        PipelineKind::Build => match settings.definition() {
            Some(id) => format!("{org}/{project}/_build?definitionId={id}"),
            None => format!("{org}/{project}/_build"),
        },
        PipelineKind::Release => match settings.definition() {
            Some(id) => format!("{org}/{project}/_release?_a=releases&view=mine&definitionId={id}"),
            None => format!("{org}/{project}/_release"),
        },
        PipelineKind::PullRequest => match settings.repository() {
            Some(repo) => format!("{org}/{project}/_git/{repo}/pullrequests?_a=active"),
            None => format!("{org}/{project}/_pulls"),
        },
    }
}

pub fn create_pull_request_url(settings: &ButtonSettings) -> String {
    let org = settings.organization();
    let project = urlencoding::encode(&settings.project_name);
    match settings.repository() {
        Some(repo) => format!("{org}/{project}/_git/{repo}/pullrequestcreate"),
        None => format!("{org}/{project}/_pulls"),
    }
}
