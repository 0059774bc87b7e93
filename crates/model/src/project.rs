//! Discovered projects and project-name derivation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use crate::dependency::Dependency;

/// Path segments that belong to virtual environments or interpreter
/// internals rather than to the project itself. Name derivation climbs
/// out of any run of these before picking a directory name.
pub const NAME_IGNORE_DIRS: &[&str] = &[
    ".venv",
    "bin",
    "include",
    "lib",
    "lib64",
    "pip",
    "python3.10",
    "python3.11",
    "python3.8",
    "python3.9",
    "requirements.txt",
    "site-packages",
    "src",
    "venv",
];

fn is_ignored(segment: &str) -> bool {
    NAME_IGNORE_DIRS.contains(&segment)
}

fn segment_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Derive a human-meaningful project name from a manifest path.
///
/// Starts at the discovered file and climbs while the current or the
/// parent segment is on the ignore list, then strips one trailing
/// `src` segment. The manifest file name itself is on the list, so the
/// climb always moves past it.
pub fn derive_project_name(path: &str) -> String {
    let mut current = Path::new(path);
    loop {
        let name_hit = segment_name(current).is_some_and(is_ignored);
        let parent_hit = current
            .parent()
            .and_then(segment_name)
            .is_some_and(is_ignored);
        if !name_hit && !parent_hit {
            break;
        }
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent,
            _ => break,
        }
    }
    if segment_name(current) == Some("src") {
        if let Some(parent) = current.parent() {
            current = parent;
        }
    }
    segment_name(current).unwrap_or_default().to_string()
}

/// A project found on a host: the manifest path it was discovered at
/// and the dependencies merged from every manifest sharing its name.
#[derive(Debug, Clone)]
pub struct Project {
    pub dependencies: HashSet<Dependency>,
    pub host: String,
    pub path: String,
    name: OnceLock<String>,
}

impl Project {
    pub fn new(
        dependencies: impl IntoIterator<Item = Dependency>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            dependencies: dependencies.into_iter().collect(),
            host: host.into(),
            path: path.into(),
            name: OnceLock::new(),
        }
    }

    /// The derived project name, computed once per project.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| derive_project_name(&self.path))
    }
}
