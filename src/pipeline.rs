//! One run from start to finish: configuration, fetch, extraction, reports

use std::{future::Future, time::Duration};

use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use tokio::task::JoinError;
use tracing::{debug, info, instrument, warn};

use crate::{
    client::GitlabApi,
    domain::{extract_domains, UserRecord},
    report::{ReportWriter, WrittenReports},
    result::{AppError, Failure, Result, RunResult, Stage},
    settings::{ProcessEnv, Settings},
    Args,
};

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct Summary {
    pub users: usize,
    pub without_email: usize,
    pub malformed: usize,
    pub domains: usize,
    pub reports: WrittenReports,
}

impl Summary {
    fn log(&self) {
        if self.without_email > 0 {
            warn!("Skipped {} users without emails", self.without_email);
        }
        if self.malformed > 0 {
            warn!("Skipped {} users with malformed emails", self.malformed);
        }

        info!("Unique domains found: {}", self.domains);
        info!("All {} users saved in {}", self.users, self.reports.all_users.display());
        info!("Unique domains saved in {}", self.reports.unique_domains.display());
    }
}

/// Resolve the configuration from `args` and the environment, then run.
pub async fn run(args: Args) -> RunResult<Summary> {
    debug!(stage = %Stage::Start, "Loading configuration");
    let settings = load_settings(&args).map_err(|e| fail(Stage::Start, e))?;
    debug!(config = ?settings, "Configuration loaded");

    Pipeline::new(settings).run().await
}

fn load_settings(args: &Args) -> Result<Settings> {
    let env = ProcessEnv::load()?;
    Ok(Settings::resolve(args, &env)?)
}

fn fail(stage: Stage, error: AppError) -> Failure {
    debug!(from = %stage, to = %Stage::Failed(error.exit_code()), "Run aborted");
    Failure::new(stage, error)
}

/// Drive `task` on its own tokio task so that a panic inside it surfaces as
/// an unexpected [`Failure`] instead of tearing down the process.
pub async fn catch_unexpected<T, F>(task: F) -> RunResult<T>
where
    F: Future<Output = RunResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .unwrap_or_else(|e| Err(Failure::unexpected(describe_join_error(e))))
}

fn describe_join_error(e: JoinError) -> String {
    if !e.is_panic() {
        return format!("pipeline task failed: {e}");
    }

    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    format!("pipeline panicked: {message}")
}

/// Linear run over resolved settings, tracking the stage it has reached
#[derive(Debug)]
pub struct Pipeline {
    settings: Settings,
    stage: Stage,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self { settings, stage: Stage::ConfigLoaded }
    }

    pub async fn run(mut self) -> RunResult<Summary> {
        match self.execute().await {
            Ok(summary) => {
                summary.log();
                self.advance(Stage::Success);
                info!("Process completed successfully");
                Ok(summary)
            },
            Err(e) => {
                let failure = fail(self.stage, e);
                self.stage = Stage::Failed(failure.exit_code());
                Err(failure)
            },
        }
    }

    async fn execute(&mut self) -> Result<Summary> {
        let api = GitlabApi::new(self.settings.client.clone())?;

        let users = self.fetch_users(&api).await?;
        self.advance(Stage::UsersFetched);

        let extraction = extract_domains(&users);
        if extraction.domains.is_empty() {
            warn!("No email domains found");
        }
        self.advance(Stage::DomainsExtracted);

        let reports = ReportWriter::new(&self.settings.output_dir).write(&extraction)?;
        self.advance(Stage::ReportsWritten);

        Ok(Summary {
            users: extraction.entries.len(),
            without_email: extraction.without_email(),
            malformed: extraction.malformed(),
            domains: extraction.domains.len(),
            reports,
        })
    }

    #[instrument(skip_all, fields(url = %api.config().base_url))]
    async fn fetch_users(&self, api: &GitlabApi) -> Result<Vec<UserRecord>> {
        let current = api.validate_connection().await?;
        info!(username = %current.username, "Successfully connected to GitLab");
        if current.is_admin == Some(false) {
            warn!("Token does not belong to an administrator, other users' emails may be hidden");
        }

        info!("Fetching user list...");
        let progress = self.progress_bar();
        let mut pages = api.users();
        let mut users = Vec::new();

        while let Some(page) = pages.next_page().await? {
            users.extend(page);
            progress.set_message(format!("{} users fetched", users.len()));
        }

        progress.finish_and_clear();
        info!("Total users in GitLab: {}", users.len());
        Ok(users)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner()
            .with_style(ProgressStyle::default_spinner())
            .with_message("Fetching users")
            .with_finish(ProgressFinish::AndClear);
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }

    fn advance(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "Stage reached");
        self.stage = stage;
    }
}
