use super::load_core;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct VariantsArgs {
    /// DoenetML file
    pub file: PathBuf,

    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn variants(args: VariantsArgs, cwd: &Path, config: &Config) -> Result<()> {
    let core = load_core(cwd, &args.file, config, None, None)?;
    let record = core.variant();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record.all_possible_variants)?);
        return Ok(());
    }

    println!(
        "{} {} variant(s)",
        "▸".bright_blue(),
        record.all_possible_variants.len()
    );
    for (index, name) in record.all_possible_variants.iter().enumerate() {
        println!("  {:>4}  {}", index + 1, name);
    }
    Ok(())
}
