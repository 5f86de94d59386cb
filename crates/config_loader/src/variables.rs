//! Variable list resolution
//!
//! Precedence: explicit list in the config (or CLI) → side-channel variables
//! file → full catalog.

use std::collections::HashSet;
use std::path::Path;

use contracts::{default_variables, resolve_all, RecordingConfig, VariableSpec};
use tracing::{debug, warn};

/// Where the recorded variable list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOrigin {
    /// Explicit list in config or on the command line
    Explicit,
    /// Side-channel variables file
    File,
    /// Nothing selected: every catalog variable
    CatalogDefault,
}

impl std::fmt::Display for VariableOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableOrigin::Explicit => f.write_str("explicit list"),
            VariableOrigin::File => f.write_str("variables file"),
            VariableOrigin::CatalogDefault => f.write_str("catalog default"),
        }
    }
}

/// Resolved variable selection
#[derive(Debug, Clone)]
pub struct VariableSelection {
    pub origin: VariableOrigin,
    pub variables: Vec<VariableSpec>,
}

impl VariableSelection {
    /// Variable names in recording order
    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }
}

/// Resolve the variables to record for a recording config
pub fn resolve_variables(recording: &RecordingConfig) -> VariableSelection {
    if let Some(explicit) = &recording.variables {
        let names = normalize(explicit.iter().map(String::as_str));
        if !names.is_empty() {
            return VariableSelection {
                origin: VariableOrigin::Explicit,
                variables: resolve_all(&names),
            };
        }
    }

    let from_file = load_variables_file(&recording.variables_file);
    if !from_file.is_empty() {
        return VariableSelection {
            origin: VariableOrigin::File,
            variables: resolve_all(&from_file),
        };
    }

    VariableSelection {
        origin: VariableOrigin::CatalogDefault,
        variables: default_variables(),
    }
}

/// Load variable names from a side-channel file
///
/// A missing file yields an empty list; an unreadable one is logged and also
/// yields an empty list.
pub fn load_variables_file(path: &Path) -> Vec<String> {
    if !path.exists() {
        debug!(path = %path.display(), "No variables file");
        return Vec::new();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => parse_variable_list(&content),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read variables file");
            Vec::new()
        }
    }
}

/// Parse a variable list: one per line or comma separated, `#` comments and
/// blank lines ignored, duplicates dropped keeping the first occurrence.
pub fn parse_variable_list(content: &str) -> Vec<String> {
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split(','));
    normalize(tokens)
}

fn normalize<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
