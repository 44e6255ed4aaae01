use super::{load_core, print_diagnostics};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct StateArgs {
    /// DoenetML file
    pub file: PathBuf,

    /// Persisted state to load
    pub state: PathBuf,

    /// Also print the values of these components
    #[arg(long = "show", value_name = "NAME")]
    pub show: Vec<String>,
}

/// Restore a saved state and print what it holds.
pub fn state(args: StateArgs, cwd: &Path, config: &Config) -> Result<()> {
    let mut core = load_core(cwd, &args.file, config, None, Some(&args.state))?;
    print_diagnostics(core.diagnostics());

    let persisted = core.persisted_state();
    if let Some(variant) = &persisted.variant {
        println!("{} {} ({})", "variant".bold(), variant.name, variant.index);
    }
    for (component, cells) in &persisted.cells {
        println!("{}", component.cyan());
        for (key, value) in cells {
            println!("  {} = {}", key, value.to_json());
        }
    }

    for name in &args.show {
        let value = core.read(name, "value")?;
        println!("{} {} = {}", "value".bold(), name, value.to_json());
    }
    Ok(())
}
