//! Name normalization for report paths.

/// Normalize a host or project name for use as a filesystem path segment:
/// trimmed, lowercased, spaces and hyphens replaced with underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}
