//! Run configuration resolved from the command line and the environment

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    client::{error::Result, ClientConfig, ClientError},
    Args,
};

pub const GITLAB_URL_VAR: &str = "GITLAB_URL";
pub const PRIVATE_TOKEN_VAR: &str = "PRIVATE_TOKEN";
/// Dump every raw API response to disk when set
pub const DEBUG_VAR: &str = "GITLAB_DOMAINS_DEBUG";

const DOTENV_FILE: &str = ".env";

/// Source of environment values
pub trait EnvSource {
    /// Non-empty value of `key`, if any
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment, backed by the values of a `.env` file.
///
/// Variables already set in the process win over the file. The process
/// environment itself is never modified.
#[derive(Debug, Default)]
pub struct ProcessEnv {
    dotenv: HashMap<String, String>,
}

impl ProcessEnv {
    /// Read `.env` from the working directory, if there is one
    pub fn load() -> Result<Self> {
        Self::with_dotenv(Path::new(DOTENV_FILE))
    }

    pub fn with_dotenv(path: &Path) -> Result<Self> {
        let dotenv: HashMap<String, String> = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries.collect::<std::result::Result<_, _>>().map_err(|e| {
                ClientError::config(format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(ClientError::config(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            },
        };

        Ok(Self { dotenv })
    }
}

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        non_empty(std::env::var(key).ok()).or_else(|| non_empty(self.dotenv.get(key).cloned()))
    }
}

/// Everything one run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    /// Directory the reports are written to
    pub output_dir: PathBuf,
    pub show_progress: bool,
}

impl Settings {
    /// Merge command-line arguments over environment values.
    ///
    /// Precedence per field: flag, then process environment, then `.env`.
    pub fn resolve(args: &Args, env: &impl EnvSource) -> Result<Self> {
        let base_url = pick(args.gitlab_url.as_deref(), GITLAB_URL_VAR, env).ok_or_else(|| {
            ClientError::config(format!(
                "missing GitLab URL: pass --gitlab-url or set {GITLAB_URL_VAR}"
            ))
        })?;
        let token = pick(args.token.as_deref(), PRIVATE_TOKEN_VAR, env).ok_or_else(|| {
            ClientError::config(format!(
                "missing access token: pass --token or set {PRIVATE_TOKEN_VAR}"
            ))
        })?;

        let client = ClientConfig::new(base_url, token)
            .with_per_page(args.per_page)
            .with_timeout(Duration::from_secs(args.timeout))
            .with_accept_invalid_certs(args.insecure)
            .with_debug_logging(env.var(DEBUG_VAR).is_some());
        client.validate()?;

        Ok(Self {
            client,
            output_dir: args.output_dir.clone(),
            show_progress: !args.no_progress,
        })
    }
}

fn pick(flag: Option<&str>, key: &str, env: &impl EnvSource) -> Option<String> {
    non_empty(flag.map(str::to_owned)).or_else(|| env.var(key))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
impl<const N: usize> EnvSource for [(&str, &str); N] {
    fn var(&self, key: &str) -> Option<String> {
        let value = self.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string());
        non_empty(value)
    }
}
