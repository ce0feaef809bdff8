//! Process exit codes. Stable contract for CI scripts.

use std::process::{ExitCode, Termination};

use xcdeps_core::{AnalysisError, ConfigError, ExitStatus};

use crate::source::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum XcdepsExit {
    Success = 0,
    /// I/O failure, missing root, internal error.
    Error = 1,
    /// Cycles found with `--fail-on-cycles`. Outputs are still written.
    CyclesFound = 2,
    /// Invalid configuration file or flags.
    Config = 3,
    /// Facts could not be extracted or parsed.
    Extraction = 4,
}

impl XcdepsExit {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Classify a failed run by the first typed error in its chain.
    #[must_use]
    pub fn classify(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<ConfigError>() {
                return Self::Config;
            }
            if let Some(analysis) = cause.downcast_ref::<AnalysisError>() {
                return if analysis.code().is_config() {
                    Self::Config
                } else {
                    Self::Error
                };
            }
            if cause.is::<SourceError>() {
                return Self::Extraction;
            }
        }
        Self::Error
    }
}

impl From<ExitStatus> for XcdepsExit {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::Success,
            ExitStatus::CyclesFound => Self::CyclesFound,
        }
    }
}

impl Termination for XcdepsExit {
    fn report(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

impl From<anyhow::Result<Self>> for XcdepsExit {
    fn from(res: anyhow::Result<Self>) -> Self {
        match res {
            Ok(exit) => exit,
            Err(err) => {
                let exit = Self::classify(&err);
                eprintln!("error: {err:#}");
                exit
            }
        }
    }
}
