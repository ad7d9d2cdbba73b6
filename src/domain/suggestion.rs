use std::fmt;

use serde::Serialize;

use super::snapshot::VmSnapshot;

/// Dashboard sections a step can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Dashboard,
    Login,
    Messaging,
    Files,
}

impl Tab {
    pub fn index(self) -> i32 {
        match self {
            Tab::Dashboard => 0,
            Tab::Login => 1,
            Tab::Messaging => 2,
            Tab::Files => 3,
        }
    }

    /// The lantern command that works on this section.
    pub fn command_hint(self) -> &'static str {
        match self {
            Tab::Dashboard => "lantern status",
            Tab::Login => "lantern login <openai|anthropic>",
            Tab::Messaging => "lantern channel setup <discord|telegram> <token>",
            Tab::Files => "lantern service install",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Dashboard => write!(f, "Dashboard"),
            Tab::Login => write!(f, "Login"),
            Tab::Messaging => write!(f, "Messaging"),
            Tab::Files => write!(f, "Files"),
        }
    }
}

/// What the suggested step asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CreateVm,
    StartVm,
    Login,
    SetupMessaging,
    InstallService,
    StartService,
    AllSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedStep {
    pub kind: StepKind,
    pub message: String,
    pub detail: String,
    pub tab: Option<Tab>,
}

impl SuggestedStep {
    fn new(kind: StepKind, message: &str, detail: &str, tab: Option<Tab>) -> Self {
        Self {
            kind,
            message: message.to_string(),
            detail: detail.to_string(),
            tab,
        }
    }

    /// Tab index to jump to, or -1.
    pub fn target_index(&self) -> i32 {
        self.tab.map(Tab::index).unwrap_or(-1)
    }

    /// The command that performs this step, if there is one.
    pub fn command_hint(&self) -> Option<&'static str> {
        match self.kind {
            StepKind::CreateVm | StepKind::StartVm => Some("lantern up"),
            StepKind::StartService => Some("lantern service start"),
            StepKind::AllSet => None,
            StepKind::Login | StepKind::SetupMessaging | StepKind::InstallService => {
                self.tab.map(Tab::command_hint)
            }
        }
    }
}

/// The single most useful next action. First matching rule wins.
pub fn suggested_step(snapshot: &VmSnapshot) -> SuggestedStep {
    if snapshot.state.is_absent() {
        return SuggestedStep::new(
            StepKind::CreateVm,
            "Create and start the VM",
            "No VM with this name exists yet.",
            None,
        );
    }
    if !snapshot.state.is_running() {
        return SuggestedStep::new(
            StepKind::StartVm,
            "Start the VM",
            "The VM exists but is not running.",
            None,
        );
    }
    if !snapshot.any_provider_ready() {
        return SuggestedStep::new(
            StepKind::Login,
            "Log in to a provider",
            "Neither OpenAI nor Anthropic has credentials.",
            Some(Tab::Login),
        );
    }
    if !snapshot.any_channel_ready() {
        return SuggestedStep::new(
            StepKind::SetupMessaging,
            "Set up a messaging app",
            "Enable Discord or Telegram with a token and at least one approved user.",
            Some(Tab::Messaging),
        );
    }
    if !snapshot.service_installed {
        return SuggestedStep::new(
            StepKind::InstallService,
            "Install the agent service",
            "The agent is configured but has no system service.",
            Some(Tab::Files),
        );
    }
    if !snapshot.service_running {
        return SuggestedStep::new(
            StepKind::StartService,
            "Start the agent service",
            "The service is installed but not active.",
            Some(Tab::Files),
        );
    }
    SuggestedStep::new(
        StepKind::AllSet,
        "All set",
        "The agent is running.",
        Some(Tab::Files),
    )
}
