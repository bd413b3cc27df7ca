use crate::settings::ButtonSettings;

/// Lifecycle signals delivered by the host device runtime. `context` is the
/// host's opaque per-button handle; it keys the controller's instance table.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Shown {
        context: String,
        settings: ButtonSettings,
    },
    Hidden {
        context: String,
    },
    /// The instance is gone for good, not just off-screen.
    Removed {
        context: String,
    },
    KeyDown {
        context: String,
    },
    KeyUp {
        context: String,
    },
    SettingsChanged {
        context: String,
        settings: ButtonSettings,
    },
}

/// Commands the core pushes back to the host runtime. The host drains these
/// from the channel handed to the controller and talks to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    SetIcon {
        context: String,
        asset: &'static str,
    },
    SetTitle {
        context: String,
        title: String,
    },
    ShowOk {
        context: String,
    },
    ShowAlert {
        context: String,
    },
    PersistSettings {
        context: String,
        settings: ButtonSettings,
    },
    OpenUrl {
        context: String,
        url: String,
    },
}
