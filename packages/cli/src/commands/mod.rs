pub mod eval;
pub mod replay;
pub mod state;
pub mod variants;

pub use eval::{eval, EvalArgs};
pub use replay::{replay, ReplayArgs};
pub use state::{state, StateArgs};
pub use variants::{variants, VariantsArgs};

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use doenet_core::{
    CoreError, CoreOptions, Diagnostic, DiagnosticLevel, DoenetCore, PersistedState,
    VariantRequest,
};
use std::path::{Path, PathBuf};

/// Resolve `path` against the working directory.
pub(crate) fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// A number selects a variant by index, anything else by name.
pub(crate) fn parse_variant(value: &str) -> VariantRequest {
    match value.trim().parse::<i64>() {
        Ok(index) => VariantRequest::Index(index),
        Err(_) => VariantRequest::Name(value.trim().to_string()),
    }
}

pub(crate) fn read_state(path: &Path) -> Result<PersistedState> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read state file {}", path.display()))?;
    Ok(PersistedState::from_json(&json)?)
}

/// Build a core from a DoenetML file. Parse errors are rendered against the source.
pub(crate) fn load_core(
    cwd: &Path,
    file: &Path,
    config: &Config,
    variant: Option<&str>,
    state: Option<&Path>,
) -> Result<DoenetCore> {
    let path = resolve(cwd, file);
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Cannot read {}", path.display()))?;

    let state = match state {
        Some(state) => Some(read_state(&resolve(cwd, state))?),
        None => None,
    };
    let options = CoreOptions {
        config: config.core.clone(),
        variant: variant.or(config.variant.as_deref()).map(parse_variant),
        state,
    };

    tracing::debug!(file = %path.display(), "building document");
    match DoenetCore::new(&source, options) {
        Ok(core) => Ok(core),
        Err(CoreError::Parse(error)) => {
            let filename = path.display().to_string();
            eprint!("{}", doenet_parser::format_error(&source, &filename, &error));
            Err(anyhow!("{} could not be parsed", filename))
        }
        Err(other) => Err(other.into()),
    }
}

pub(crate) fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let label = match diagnostic.level {
            DiagnosticLevel::Warning => "warning:".yellow().bold(),
            DiagnosticLevel::Error => "error:".red().bold(),
        };
        match &diagnostic.component {
            Some(component) => eprintln!("{} {} ({})", label, diagnostic.message, component.dimmed()),
            None => eprintln!("{} {}", label, diagnostic.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant() {
        assert_eq!(parse_variant("3"), VariantRequest::Index(3));
        assert_eq!(parse_variant("-1"), VariantRequest::Index(-1));
        assert_eq!(parse_variant(" c "), VariantRequest::Name("c".into()));
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let cwd = Path::new("/work");
        assert_eq!(resolve(cwd, Path::new("doc.xml")), PathBuf::from("/work/doc.xml"));
        assert_eq!(resolve(cwd, Path::new("/tmp/doc.xml")), PathBuf::from("/tmp/doc.xml"));
    }
}
