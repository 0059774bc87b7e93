//! Renders and writes per-project audit reports.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use depwatch_common::{normalize_name, Error, Result};
use depwatch_model::{CheckOutcome, Project};

/// Writes one text file per project under
/// `<directory>/<normalized host>/<normalized project>.txt`.
pub struct Reporter {
    directory: PathBuf,
    timezone: Tz,
}

impl Reporter {
    pub fn new(directory: PathBuf, timezone: Tz) -> Self {
        Self {
            directory,
            timezone,
        }
    }

    /// Drop a host directory left empty by an earlier cycle, then
    /// recreate it. A directory still holding reports stays in place.
    pub async fn prepare_host_dir(&self, host: &str) -> Result<PathBuf> {
        let dir = self.directory.join(normalize_name(host));
        match tokio::fs::remove_dir(&dir).await {
            Ok(()) => debug!("Removed stale report directory {}", dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => {}
            Err(e) => warn!("Could not remove {}: {}", dir.display(), e),
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Report(format!("cannot create {}: {e}", dir.display())))?;
        Ok(dir)
    }

    /// Render and write the report for one project, dated today in
    /// the configured timezone.
    pub async fn write_report(
        &self,
        project: &Project,
        outcomes: &BTreeMap<String, CheckOutcome>,
    ) -> Result<PathBuf> {
        let dir = self.directory.join(normalize_name(&project.host));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Report(format!("cannot create {}: {e}", dir.display())))?;

        let date = Utc::now().with_timezone(&self.timezone).date_naive();
        let content = self.render(project, outcomes, date);
        let path = dir.join(format!("{}.txt", normalize_name(project.name())));
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| Error::Report(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }

    /// The report text: a dated header, the discovery path, then the
    /// outdated and up-to-date sections split by dividers sized to the
    /// header.
    pub fn render(
        &self,
        project: &Project,
        outcomes: &BTreeMap<String, CheckOutcome>,
        date: NaiveDate,
    ) -> String {
        let header = format!(
            "{}/{} | {}",
            normalize_name(&project.host),
            normalize_name(project.name()),
            date.format("%F")
        );
        let divider = "-".repeat(header.len());

        let mut outdated = String::new();
        let mut up_to_date = Vec::new();
        for (library, outcome) in outcomes {
            if outcome.is_up_to_date() {
                up_to_date.push(library.as_str());
            } else {
                outdated.push_str(&format!("{library}: {outcome}\n"));
            }
        }

        format!(
            "{header}\n{}\n{divider}\nOutdated Libraries:\n{outdated}{divider}\nUp to Date Libraries:\n{}",
            project.path,
            up_to_date.join("\n")
        )
    }
}
