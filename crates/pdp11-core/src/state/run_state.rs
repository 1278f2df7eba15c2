//! Processor run state.

/// Execution state observed by the driver loop between instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Fetching and executing instructions.
    #[default]
    Running,
    /// Kernel executed `WAIT`; idles until an interrupt is delivered.
    Waiting,
    /// Kernel executed `HALT`; only a reset resumes execution.
    Halted,
}

impl RunState {
    /// True while instructions are being fetched.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
