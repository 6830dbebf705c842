//! Shared helpers for CLI commands.
//!
//! Run root resolution, configuration loading and logging setup used by
//! both `specialize` and `characterize`.

use std::path::{Path, PathBuf};

use techlib_config::{TechConfig, CONFIG_FILE};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` flags pick the level and
/// `--quiet` limits output to errors.
pub fn init_logging(global: &GlobalArgs) {
    let level = log_level(global);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The default filter directive for the given flags.
pub fn log_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        return "error";
    }
    match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Walks up from `start` looking for the nearest directory containing `techlib.toml`.
pub fn find_run_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves the run directory and the configuration file inside it.
///
/// With `--config`, a file path names the configuration directly and its
/// parent is the run root; a directory path is the run root itself.
/// Without it, the nearest ancestor holding `techlib.toml` is used, falling
/// back to the current directory.
pub fn resolve_run_root(
    global: &GlobalArgs,
) -> Result<(PathBuf, Option<PathBuf>), Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            let root = p
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok((root, Some(p)));
        }
        if p.is_dir() {
            let file = p.join(CONFIG_FILE);
            let file = file.is_file().then_some(file);
            return Ok((p, file));
        }
        return Err(format!("configuration '{}' does not exist", p.display()).into());
    }
    let cwd = std::env::current_dir()?;
    match find_run_root(&cwd) {
        Some(root) => {
            let file = root.join(CONFIG_FILE);
            Ok((root, Some(file)))
        }
        None => Ok((cwd, None)),
    }
}

/// Loads the run configuration, using defaults when no file exists.
pub fn load_run_config(
    global: &GlobalArgs,
) -> Result<(PathBuf, TechConfig), Box<dyn std::error::Error>> {
    let (root, file) = resolve_run_root(global)?;
    let config = match file {
        Some(path) => techlib_config::load_config_from_path(&path)?,
        None => {
            warn!(root = %root.display(), "no {CONFIG_FILE} found, using defaults");
            TechConfig::default()
        }
    };
    Ok((root, config))
}
