//! Builds and post-processes the filesystem search for manifests.

/// File names that mark a dependency source: static manifests and pip
/// binaries inside virtual environments.
pub const MANIFEST_NAMES: &[&str] = &["requirements.txt", "pip"];

/// Quote a value for use inside `sh -c`. Embedded single quotes are
/// closed, escaped and reopened.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Build the `find` invocation that discovers manifest candidates.
///
/// Excluded paths are pruned, stderr is discarded so unreadable
/// subtrees never fail the search. Pruned directories still appear in
/// the output; `filter_candidates` drops them.
pub fn build_search_command(filenames: &[&str], excluded_paths: &[String]) -> String {
    let names = filenames
        .iter()
        .map(|name| format!("-name {}", shell_quote(name)))
        .collect::<Vec<_>>()
        .join(" -o ");
    let pruned = excluded_paths
        .iter()
        .map(|path| format!("-path {} -prune", shell_quote(path)))
        .collect::<Vec<_>>()
        .join(" -o ");

    if pruned.is_empty() {
        format!(r"find / \( {names} \) 2>/dev/null")
    } else {
        format!(r"find / {pruned} -o \( {names} \) 2>/dev/null")
    }
}

/// Keep only the lines naming a manifest candidate; everything else in
/// the search output (pruned directory echoes, blanks) is noise.
pub fn filter_candidates(raw: &str) -> Vec<String> {
    raw.lines()
        .filter(|line| line.ends_with("pip") || line.ends_with("requirements.txt"))
        .map(str::to_string)
        .collect()
}
