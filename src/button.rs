use crate::actions::{ActionDispatcher, Effect};
use crate::azure::CicdApi;
use crate::error::DevOpsError;
use crate::host::{HostCommand, HostEvent};
use crate::poller::PollTask;
use crate::settings::{ButtonSettings, KeyPressAction, PipelineKind};
use crate::status::{DisplayState, StatusResolver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

/// Everything one button owns: its settings and the in-flight press, behind
/// one mutex so the poll loop and the key handlers never interleave partial
/// updates.
struct ButtonState {
    settings: ButtonSettings,
    pressed_at: Option<Instant>,
}

type SharedState = Arc<tokio::sync::Mutex<ButtonState>>;

/// Wires host lifecycle events to status resolution, key-press dispatch and
/// the per-button poll loops. Poll handles live in their own table here, not
/// inside the button state, so stopping a loop never contends with a tick
/// that holds the state mutex.
pub struct ButtonController<A> {
    resolver: StatusResolver<A>,
    dispatcher: ActionDispatcher<A>,
    host: UnboundedSender<HostCommand>,
    states: Mutex<HashMap<String, SharedState>>,
    polls: tokio::sync::Mutex<HashMap<String, PollTask>>,
    long_press_after: Duration,
}

impl<A: CicdApi + 'static> ButtonController<A> {
    pub fn new(api: Arc<A>, host: UnboundedSender<HostCommand>) -> Self {
        Self {
            resolver: StatusResolver::new(api.clone()),
            dispatcher: ActionDispatcher::new(api),
            host,
            states: Mutex::new(HashMap::new()),
            polls: tokio::sync::Mutex::new(HashMap::new()),
            long_press_after: Duration::from_secs(1),
        }
    }

    /// Press duration beyond which a key-up counts as a long press.
    pub fn with_long_press_after(mut self, threshold: Duration) -> Self {
        self.long_press_after = threshold;
        self
    }

    /// Staleness window for the underlying resolver.
    pub fn with_stale_after(mut self, window: chrono::Duration) -> Self {
        self.resolver = self.resolver.clone().with_stale_after(window);
        self
    }

    /// Single entry point for the host runtime's event stream.
    pub async fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::Shown { context, settings } => self.on_shown(&context, settings).await,
            HostEvent::Hidden { context } => self.on_hidden(&context).await,
            HostEvent::Removed { context } => self.on_removed(&context).await,
            HostEvent::KeyDown { context } => self.on_key_down(&context).await,
            HostEvent::KeyUp { context } => self.on_key_up(&context).await,
            HostEvent::SettingsChanged { context, settings } => {
                self.on_settings_changed(&context, settings).await
            }
        }
    }

    pub async fn on_shown(&self, context: &str, settings: ButtonSettings) {
        let valid = settings.is_valid();
        let state: SharedState = Arc::new(tokio::sync::Mutex::new(ButtonState {
            settings: settings.clone(),
            pressed_at: None,
        }));
        self.states
            .lock()
            .unwrap()
            .insert(context.to_string(), state.clone());

        if !valid {
            debug!(context, "button shown with incomplete settings");
            return;
        }

        match self.resolver.resolve(&settings).await {
            Ok(display) => self.display(context, display),
            Err(err) => self.record_failure(context, &state, err).await,
        }

        if settings.poll_interval_secs > 0 {
            self.restart_poll(context, &state).await;
        }
    }

    pub async fn on_hidden(&self, context: &str) {
        self.stop_poll(context).await;
    }

    pub async fn on_removed(&self, context: &str) {
        self.stop_poll(context).await;
        self.states.lock().unwrap().remove(context);
    }

    pub async fn on_settings_changed(&self, context: &str, settings: ButtonSettings) {
        let Some(state) = self.state(context) else {
            debug!(context, "settings change for unknown button");
            return;
        };

        let interval_changed = {
            let mut guard = state.lock().await;
            let changed = guard.settings.poll_interval_secs != settings.poll_interval_secs;
            guard.settings = settings;
            changed
        };

        if interval_changed {
            self.restart_poll(context, &state).await;
        }
    }

    pub async fn on_key_down(&self, context: &str) {
        if let Some(state) = self.state(context) {
            state.lock().await.pressed_at = Some(Instant::now());
        }
    }

    pub async fn on_key_up(&self, context: &str) {
        let Some(state) = self.state(context) else {
            return;
        };

        let (settings, action) = {
            let mut guard = state.lock().await;
            let long = guard
                .pressed_at
                .take()
                .is_some_and(|down| down.elapsed() > self.long_press_after);
            let action = if long {
                guard.settings.long_press_action
            } else {
                guard.settings.tap_action
            };
            (guard.settings.clone(), action)
        };

        match self.execute(context, &settings, action).await {
            Ok(()) => {
                let mut guard = state.lock().await;
                guard.settings.last_error = None;
                self.send(HostCommand::PersistSettings {
                    context: context.to_string(),
                    settings: guard.settings.clone(),
                });
            }
            Err(err) => self.record_failure(context, &state, err).await,
        }
    }

    /// Number of live poll loops, for host-side introspection and tests.
    pub async fn active_polls(&self) -> usize {
        let mut polls = self.polls.lock().await;
        polls.retain(|_, task| !task.is_finished());
        polls.len()
    }

    async fn execute(
        &self,
        context: &str,
        settings: &ButtonSettings,
        action: KeyPressAction,
    ) -> Result<(), DevOpsError> {
        // Starting a run repaints through the updating placeholder first.
        if action == KeyPressAction::Run && settings.pipeline_kind != PipelineKind::PullRequest {
            self.display(context, DisplayState::Updating);
        }

        let effect = self.dispatcher.dispatch(settings, action).await?;
        match effect {
            Effect::None => {}
            Effect::Refresh => {
                self.display(context, DisplayState::Updating);
                let display = self.resolver.resolve(settings).await?;
                self.display(context, display);
                self.send(HostCommand::ShowOk {
                    context: context.to_string(),
                });
            }
            Effect::Started { runs } => {
                debug!(context, runs, "started pipeline runs");
                self.send(HostCommand::ShowOk {
                    context: context.to_string(),
                });
                if settings.poll_interval_secs == 0 {
                    // No poller will come along to repaint, so resolve now.
                    let display = self.resolver.resolve(settings).await?;
                    self.display(context, display);
                } else {
                    self.display(context, DisplayState::Waiting);
                }
            }
            Effect::Open(url) => self.send(HostCommand::OpenUrl {
                context: context.to_string(),
                url,
            }),
        }
        Ok(())
    }

    /// Cancel and join any previous loop for this button, then start one for
    /// the current interval (none when polling is disabled). The poll table
    /// lock is held across the hand-over so no second loop can sneak in.
    async fn restart_poll(&self, context: &str, state: &SharedState) {
        let mut polls = self.polls.lock().await;
        if let Some(old) = polls.remove(context) {
            old.stop().await;
        }

        let interval = state.lock().await.settings.poll_interval_secs;
        if interval == 0 {
            return;
        }

        let resolver = self.resolver.clone();
        let host = self.host.clone();
        let state = state.clone();
        let ctx = context.to_string();
        let task = PollTask::spawn(Duration::from_secs(interval), move || {
            let resolver = resolver.clone();
            let host = host.clone();
            let state = state.clone();
            let ctx = ctx.clone();
            async move {
                // Snapshot the settings; the mutex is not held across the
                // network call, so key presses never wait on a slow poll.
                let settings = state.lock().await.settings.clone();
                let display = resolver.resolve_or_unknown(&settings).await;
                let _ = host.send(HostCommand::SetIcon {
                    context: ctx.clone(),
                    asset: display.icon_asset(),
                });
                let _ = host.send(HostCommand::SetTitle {
                    context: ctx,
                    title: display.title(),
                });
            }
        });
        polls.insert(context.to_string(), task);
    }

    async fn stop_poll(&self, context: &str) {
        let mut polls = self.polls.lock().await;
        if let Some(task) = polls.remove(context) {
            task.stop().await;
        }
    }

    /// Terminal failure path: remember the message, alert, show unknown,
    /// persist. Nothing in here can fail any further than a closed host
    /// channel, which is only logged.
    async fn record_failure(&self, context: &str, state: &SharedState, err: DevOpsError) {
        error!(context, "operation failed: {err}");

        let settings = {
            let mut guard = state.lock().await;
            guard.settings.last_error = Some(err.to_string());
            guard.settings.clone()
        };

        self.send(HostCommand::ShowAlert {
            context: context.to_string(),
        });
        self.display(context, DisplayState::Unknown);
        self.send(HostCommand::PersistSettings {
            context: context.to_string(),
            settings,
        });
    }

    fn display(&self, context: &str, state: DisplayState) {
        self.send(HostCommand::SetIcon {
            context: context.to_string(),
            asset: state.icon_asset(),
        });
        self.send(HostCommand::SetTitle {
            context: context.to_string(),
            title: state.title(),
        });
    }

    fn send(&self, command: HostCommand) {
        if self.host.send(command).is_err() {
            debug!("host command channel is closed");
        }
    }

    fn state(&self, context: &str) -> Option<SharedState> {
        self.states.lock().unwrap().get(context).cloned()
    }
}
