use serde::{Deserialize, Serialize};

/// Lifecycle state of one city's discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Idle,
    ScanningPincodes,
    AwaitingConfirmation,
    ScanningCenters,
    Completed,
    Stopped,
    Error,
}

impl ProcessStatus {
    /// A background query may be in flight.
    #[must_use]
    pub fn is_processing(self) -> bool {
        matches!(self, Self::ScanningPincodes | Self::ScanningCenters)
    }

    /// Resettable end states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScanningPincodes => "scanning_pincodes",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::ScanningCenters => "scanning_centers",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
