//! Turns manifest text and freeze output into dependency records.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use depwatch_common::Result;
use depwatch_model::{ConstraintOp, Dependency};

use crate::executor::Executor;
use crate::locator::shell_quote;

static REQUIREMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(.*?)(==|>=|<=|<|>)(.*)$").expect("requirement pattern"));

/// Package-name shape for lines without any constraint, with an
/// optional extras bracket (`requests[security]`).
static BARE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._-]+)(?:\[[A-Za-z0-9._,\s-]*\])?$").expect("bare name pattern")
});

/// Result of parsing one manifest. Lines that fit no known form are
/// counted, not raised; a single odd line never poisons the manifest.
#[derive(Debug, Default)]
pub struct ParsedManifest {
    pub dependencies: Vec<Dependency>,
    pub skipped_lines: usize,
}

/// Parse requirement lines. Comments and blank lines are ignored;
/// `name==version` (any of the five manifest operators) becomes a
/// pinned dependency; a bare package name becomes an unpinned sentinel.
pub fn parse_manifest_text(raw: &str) -> ParsedManifest {
    let mut parsed = ParsedManifest::default();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(caps) = REQUIREMENT_PATTERN.captures(trimmed) {
            let library = caps[1].trim();
            let version = caps[3].trim();
            let op = caps[2].parse::<ConstraintOp>();
            match op {
                Ok(op) if !library.is_empty() && !version.is_empty() => {
                    parsed.dependencies.push(Dependency::new(library, op, version));
                }
                _ => parsed.skipped_lines += 1,
            }
        } else if let Some(caps) = BARE_NAME_PATTERN.captures(trimmed) {
            parsed.dependencies.push(Dependency::unpinned(&caps[1]));
        } else {
            parsed.skipped_lines += 1;
        }
    }
    parsed
}

/// Run `<pip> freeze` on the host and parse the installed set.
pub async fn freeze(path: &str, executor: &dyn Executor) -> Result<Vec<Dependency>> {
    let command = format!("{} freeze", shell_quote(path));
    run_and_parse(&command, executor).await
}

/// Read a manifest file on the host and parse its declared set.
pub async fn read_manifest(path: &str, executor: &dyn Executor) -> Result<Vec<Dependency>> {
    let command = format!("cat {}", shell_quote(path));
    run_and_parse(&command, executor).await
}

async fn run_and_parse(command: &str, executor: &dyn Executor) -> Result<Vec<Dependency>> {
    let output = executor.execute(command).await?;
    if output.exit_code != Some(0) {
        debug!(
            "`{}` exited with {:?}: {}",
            command,
            output.exit_code,
            output.stderr_text().trim()
        );
    }
    let parsed = parse_manifest_text(&output.stdout_text());
    if parsed.skipped_lines > 0 {
        warn!(
            "`{}` produced {} unparseable lines",
            command, parsed.skipped_lines
        );
    }
    Ok(parsed.dependencies)
}
