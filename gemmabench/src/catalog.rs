use serde_yaml::Value;
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const SUITE_SEPARATOR: char = '|';

/// Flat set of `suite|name` task identifiers known to lighteval.
///
/// An empty catalog is a valid, degraded state: every validation fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCatalog {
    tasks: BTreeSet<String>,
}

impl TaskCatalog {
    /// Never fails; a missing or malformed file yields an empty catalog.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml(&raw, path),
            Err(e) => {
                warn!("YAML task file not readable at {:?} ({}). Task validation will fail.", path, e);
                Self::default()
            }
        }
    }

    pub fn from_yaml(raw: &str, origin: &Path) -> Self {
        let doc: Value = match serde_yaml::from_str(raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Error parsing YAML file {:?}: {}. Task validation will fail.", origin, e);
                return Self::default();
            }
        };

        let suites = match doc.get("tasks").and_then(Value::as_mapping) {
            Some(suites) => suites,
            None => {
                warn!(
                    "Could not find a top-level 'tasks' mapping in {:?}. Returning empty catalog.",
                    origin
                );
                return Self::default();
            }
        };

        let mut tasks = BTreeSet::new();
        for (suite, entries) in suites {
            let suite = suite.as_str().unwrap_or("<non-string suite>");
            let Some(entries) = entries.as_sequence() else {
                warn!("Expected a list under suite '{}' in {:?}. Skipping.", suite, origin);
                continue;
            };
            for entry in entries {
                match entry.as_str() {
                    Some(task) => {
                        tasks.insert(task.to_string());
                    }
                    None => warn!("Ignoring non-string task {:?} under suite '{}'", entry, suite),
                }
            }
        }

        info!("Loaded {} tasks from {:?}", tasks.len(), origin);
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Exact, case-sensitive membership.
    pub fn validate(&self, task: &str) -> bool {
        self.tasks.contains(task)
    }

    /// Sorted distinct prefixes of identifiers that contain a separator.
    pub fn suites(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter_map(|task| task.split_once(SUITE_SEPARATOR))
            .map(|(suite, _)| suite.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn tasks_in_suite(&self, suite: &str) -> Vec<&str> {
        let prefix = format!("{}{}", suite, SUITE_SEPARATOR);
        self.tasks
            .iter()
            .filter(|task| task.starts_with(&prefix))
            .map(String::as_str)
            .collect()
    }
}

/// Loads the catalog on first use and hands out the same instance afterwards.
pub struct CatalogCache {
    path: PathBuf,
    catalog: OnceCell<TaskCatalog>,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            catalog: OnceCell::new(),
        }
    }

    pub fn get(&self) -> &TaskCatalog {
        self.catalog.get_or_init(|| {
            let catalog = TaskCatalog::load(&self.path);
            if catalog.is_empty() {
                error!("No supported tasks loaded from {:?}. Task validation will not work.", self.path);
            }
            catalog
        })
    }
}
