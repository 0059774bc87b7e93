//! Collapses duplicate project observations into one record.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use depwatch_model::Project;

/// Merge projects that share a derived name. A virtual environment is
/// typically discovered twice, once through its pip binary and once
/// through its manifest; both observations describe one project.
///
/// First-seen order is preserved. The merged record keeps the first
/// member's host and path and the union of every member's dependency
/// set. Merging an already-merged list returns it unchanged.
pub fn merge_projects(projects: Vec<Project>) -> Vec<Project> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, Project> = HashMap::new();

    for project in projects {
        let name = project.name().to_string();
        match by_name.entry(name) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().dependencies.extend(project.dependencies);
            }
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(project);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect()
}
