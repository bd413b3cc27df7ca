//! Hardware-button plugin core for Azure DevOps pipelines.
//!
//! Each physical button watches one build pipeline, release pipeline or
//! pull-request list and mirrors its status as an icon and title. Presses
//! refresh the status, queue new runs or open the matching browser page.
//! The host device runtime feeds [`HostEvent`]s into a [`ButtonController`]
//! and drains [`HostCommand`]s from the channel it hands over; everything
//! else (polling, resolution, dispatch) happens in here.

pub mod actions;
pub mod azure;
pub mod button;
pub mod error;
pub mod host;
pub mod poller;
pub mod settings;
pub mod status;

pub use actions::{ActionDispatcher, Effect};
pub use azure::{AzureClient, CicdApi};
pub use button::ButtonController;
pub use error::DevOpsError;
pub use host::{HostCommand, HostEvent};
pub use poller::PollTask;
pub use settings::{ButtonSettings, KeyPressAction, PipelineKind};
pub use status::{DisplayState, RunKind, RunOutcome, RunSnapshot, RunState, StatusResolver};
