//! Shared helpers for CLI commands.
//!
//! Project root and configuration resolution, search path assembly, and
//! diagnostic rendering.

use std::path::{Path, PathBuf};

use strata_cache::SearchPath;
use strata_config::{ProjectConfig, CONFIG_FILE};
use strata_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing
/// `strata.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves the project root and loads its configuration.
///
/// `--config` may name a configuration file (its directory becomes the
/// root) or a directory. Without it, the nearest `strata.toml` above the
/// current directory is used. With no configuration anywhere, the current
/// directory and default settings are used.
pub fn load_project(global: &GlobalArgs) -> Result<(PathBuf, ProjectConfig), Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let path = PathBuf::from(config_path);
        if path.is_file() {
            let root = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            let content = std::fs::read_to_string(&path)?;
            return Ok((root, strata_config::load_config_from_str(&content)?));
        }
        let config = strata_config::load_config(&path)?;
        return Ok((path, config));
    }

    let cwd = std::env::current_dir()?;
    match find_project_root(&cwd) {
        Some(root) => {
            let config = strata_config::load_config(&root)?;
            Ok((root, config))
        }
        None => Ok((cwd, ProjectConfig::default())),
    }
}

/// Builds the search path: the current directory, then each `-I`
/// directory in the order given, then the configured include directories.
pub fn search_path(config: &ProjectConfig, root: &Path, includes: &[PathBuf]) -> SearchPath {
    let mut search = SearchPath::from_config(&config.paths, root);
    for dir in includes.iter().rev() {
        search.prepend(dir.clone());
    }
    search.prepend(PathBuf::from("."));
    search
}

/// Prints every collected diagnostic to stderr, followed by a summary line
/// unless quiet.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs) {
    let diagnostics = sink.diagnostics();
    if diagnostics.is_empty() {
        return;
    }

    let renderer = TerminalRenderer::new(global.color);
    for diag in &diagnostics {
        eprint!("{}", renderer.render(diag));
    }

    if !global.quiet {
        eprintln!(
            "   Result: {} error(s), {} warning(s)",
            sink.error_count(),
            sink.warning_count()
        );
    }
}
