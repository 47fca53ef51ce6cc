//! Plain-text reports written at the end of a run

use std::{
    fmt::Display,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{
    domain::{DomainEntry, Extraction},
    result::{AppError, Result},
};

pub const ALL_USERS_FILE: &str = "all_users_with_domains.txt";
pub const UNIQUE_DOMAINS_FILE: &str = "unique_domains.txt";

const NO_EMAIL: &str = "<no email>";

/// The two report files, in the order they are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    AllUsers,
    UniqueDomains,
}

impl Report {
    pub fn file_name(self) -> &'static str {
        match self {
            Report::AllUsers => ALL_USERS_FILE,
            Report::UniqueDomains => UNIQUE_DOMAINS_FILE,
        }
    }

    /// Process exit status when this report cannot be written
    pub fn exit_code(self) -> u8 {
        match self {
            Report::AllUsers => 5,
            Report::UniqueDomains => 6,
        }
    }
}

/// Paths of the reports produced by a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReports {
    pub all_users: PathBuf,
    pub unique_domains: PathBuf,
}

/// Writes the reports into one directory, overwriting earlier runs
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn path_of(&self, report: Report) -> PathBuf {
        self.output_dir.join(report.file_name())
    }

    /// Write the user listing, then the domain listing.
    ///
    /// The first file is complete and flushed before the second is opened.
    #[instrument(skip_all, fields(dir = %self.output_dir.display()))]
    pub fn write(&self, extraction: &Extraction) -> Result<WrittenReports> {
        let all_users =
            self.write_report(Report::AllUsers, extraction.entries.iter().map(UserLine))?;
        let unique_domains = self.write_report(Report::UniqueDomains, &extraction.domains)?;

        Ok(WrittenReports { all_users, unique_domains })
    }

    fn write_report<I>(&self, report: Report, lines: I) -> Result<PathBuf>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let path = self.path_of(report);
        let count = write_lines(&path, lines).map_err(|source| AppError::FileWrite {
            report,
            path: path.clone(),
            source,
        })?;

        debug!(file = %path.display(), lines = count, "Report written");
        Ok(path)
    }
}

/// One line of the user listing: `username: email`
struct UserLine<'a>(&'a DomainEntry);

impl Display for UserLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entry = self.0;
        write!(f, "{}: {}", entry.username, entry.email.as_deref().unwrap_or(NO_EMAIL))
    }
}

fn write_lines<I>(path: &Path, lines: I) -> io::Result<usize>
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;

    for line in lines {
        writeln!(writer, "{line}")?;
        count += 1;
    }

    writer.flush()?;
    Ok(count)
}
