//! Operator Reporting
//!
//! Progress output is a capability handed to the orchestrator and each
//! reconciler at construction. `Silent` limits output to warnings, errors
//! and prompts.

use std::fmt::Display;
use tracing::{error, info, warn};

/// How much progress the operator sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportLevel {
    Silent,
    #[default]
    Normal,
}

impl ReportLevel {
    pub fn from_silent_flag(silent: bool) -> Self {
        if silent {
            Self::Silent
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    level: ReportLevel,
}

impl Reporter {
    pub fn new(level: ReportLevel) -> Self {
        Self { level }
    }

    pub fn silent() -> Self {
        Self::new(ReportLevel::Silent)
    }

    pub fn level(&self) -> ReportLevel {
        self.level
    }

    /// Progress of a step
    pub fn step(&self, message: impl Display) {
        if self.level == ReportLevel::Normal {
            info!("{}", message);
        }
    }

    /// A step finished
    pub fn done(&self, message: impl Display) {
        if self.level == ReportLevel::Normal {
            info!("✅ {}", message);
        }
    }

    /// Shown at every level
    pub fn warn(&self, message: impl Display) {
        warn!("{}", message);
    }

    /// Shown at every level
    pub fn error(&self, message: impl Display) {
        error!("{}", message);
    }
}
