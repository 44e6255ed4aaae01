use super::{load_core, print_diagnostics, resolve};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use doenet_core::{snapshot, DoenetCore};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// DoenetML file
    pub file: PathBuf,

    /// JSON array of steps to run against the document
    pub script: PathBuf,

    #[arg(long)]
    pub variant: Option<String>,

    /// Persisted state to start from
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Write the final persisted state here
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Print the final snapshot as JSON
    #[arg(long)]
    pub snapshot: bool,
}

fn empty_args() -> serde_json::Value {
    serde_json::json!({})
}

/// One entry of a replay script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Action {
        component: String,
        action: String,
        #[serde(default = "empty_args")]
        args: serde_json::Value,
    },
    /// Advance the clock by this many milliseconds
    Advance { advance: u64 },
    Flush { flush: bool },
    Undo { undo: bool },
    Redo { redo: bool },
}

pub fn parse_script(json: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(json)?)
}

pub fn run_steps(core: &mut DoenetCore, steps: &[Step]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        tracing::debug!(index, ?step, "replay step");
        match step {
            Step::Action {
                component,
                action,
                args,
            } => core
                .dispatch(component, action, args.clone())
                .with_context(|| format!("step {}: {} on {}", index + 1, action, component))?,
            Step::Advance { advance } => core.advance_time(*advance)?,
            Step::Flush { flush: true } => core.flush_pending()?,
            Step::Undo { undo: true } => {
                core.undo()?;
            }
            Step::Redo { redo: true } => {
                core.redo()?;
            }
            Step::Flush { .. } | Step::Undo { .. } | Step::Redo { .. } => {}
        }
    }
    Ok(())
}

pub fn replay(args: ReplayArgs, cwd: &Path, config: &Config) -> Result<()> {
    let mut core = load_core(
        cwd,
        &args.file,
        config,
        args.variant.as_deref(),
        args.state.as_deref(),
    )?;

    let script_path = resolve(cwd, &args.script);
    let script = std::fs::read_to_string(&script_path)
        .with_context(|| format!("Cannot read script {}", script_path.display()))?;
    let steps = parse_script(&script)?;

    run_steps(&mut core, &steps)?;
    print_diagnostics(core.diagnostics());
    println!("{} {} step(s)", "✓".green(), steps.len());

    if let Some(save) = &args.save {
        let path = resolve(cwd, save);
        std::fs::write(&path, core.persisted_state().to_json()?)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        println!("{} {}", "saved".green().bold(), path.display());
    }

    if args.snapshot {
        println!("{}", serde_json::to_string_pretty(&snapshot(&mut core))?);
    }
    Ok(())
}
