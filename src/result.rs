use std::{fmt, path::PathBuf, process::ExitCode};

use thiserror::Error;

use crate::{client::ClientError, report::Report};

pub type Result<T> = std::result::Result<T, AppError>;

/// Outcome of a whole run
pub type RunResult<T> = std::result::Result<T, Failure>;

/// Point the run had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ConfigLoaded,
    UsersFetched,
    DomainsExtracted,
    ReportsWritten,
    Success,
    /// Aborted with the given exit code
    Failed(u8),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(#[source] ClientError),
    #[error("{0}")]
    Authentication(#[source] ClientError),
    #[error("{0}")]
    Connection(#[source] ClientError),
    #[error("{0}")]
    Api(#[source] ClientError),
    #[error("could not write {}: {source}", .path.display())]
    FileWrite {
        report: Report,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Unexpected(String),
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        if e.is_config() {
            AppError::Config(e)
        } else if e.is_authentication() {
            AppError::Authentication(e)
        } else if e.is_network_error() {
            AppError::Connection(e)
        } else {
            AppError::Api(e)
        }
    }
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status reported for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 1,
            AppError::Authentication(_) => 2,
            AppError::Connection(_) => 3,
            AppError::Api(_) => 4,
            AppError::FileWrite { report, .. } => report.exit_code(),
            AppError::Unexpected(_) => 7,
        }
    }
}

/// An [`AppError`] together with the stage the run had reached
#[derive(Debug)]
pub struct Failure {
    /// `None` when the run died outside the tracked stages, e.g. on a panic
    pub stage: Option<Stage>,
    pub error: AppError,
}

impl Failure {
    pub fn new(stage: Stage, error: impl Into<AppError>) -> Self {
        Self { stage: Some(stage), error: error.into() }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self { stage: None, error: AppError::unexpected(message) }
    }

    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }

    /// Label of the step that was in progress
    pub fn step(&self) -> &'static str {
        self.stage.map_or("running", Stage::step)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.step(), self.error)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<&Failure> for ExitCode {
    fn from(failure: &Failure) -> Self {
        ExitCode::from(failure.exit_code())
    }
}

impl Stage {
    /// The step a run performs after reaching this stage
    pub fn step(self) -> &'static str {
        match self {
            Stage::Start => "loading configuration",
            Stage::ConfigLoaded => "fetching users",
            Stage::UsersFetched => "extracting domains",
            Stage::DomainsExtracted => "writing reports",
            Stage::ReportsWritten | Stage::Success => "finishing",
            Stage::Failed(_) => "running",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Failed(code) => return write!(f, "failed({code})"),
            Stage::Start => "start",
            Stage::ConfigLoaded => "config-loaded",
            Stage::UsersFetched => "users-fetched",
            Stage::DomainsExtracted => "domains-extracted",
            Stage::ReportsWritten => "reports-written",
            Stage::Success => "success",
        };
        f.write_str(name)
    }
}
