use serde::Serialize;

/// The control loop's current phase, serialized to the API as a lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Idle,
    Scanning,
    Planning,
    Executing,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub detail: Option<String>,
}

impl DaemonStatus {
    pub const fn idle() -> Self {
        Self { state: DaemonState::Idle, detail: None }
    }

    pub fn scanning(detail: impl Into<String>) -> Self {
        Self { state: DaemonState::Scanning, detail: Some(detail.into()) }
    }

    pub fn planning(detail: impl Into<String>) -> Self {
        Self { state: DaemonState::Planning, detail: Some(detail.into()) }
    }

    pub fn executing(detail: impl Into<String>) -> Self {
        Self { state: DaemonState::Executing, detail: Some(detail.into()) }
    }
}
