use super::{load_core, print_diagnostics};
use crate::config::Config;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use doenet_core::{render_tree, snapshot, RenderChild, RenderNode};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented render tree
    Text,
    /// Full component snapshot
    Json,
    /// Render tree as JSON
    Render,
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// DoenetML file to evaluate
    pub file: PathBuf,

    /// Variant index (1-based) or name
    #[arg(long)]
    pub variant: Option<String>,

    /// Persisted state to restore
    #[arg(long)]
    pub state: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub fn eval(args: EvalArgs, cwd: &Path, config: &Config) -> Result<()> {
    let mut core = load_core(
        cwd,
        &args.file,
        config,
        args.variant.as_deref(),
        args.state.as_deref(),
    )?;
    print_diagnostics(core.diagnostics());

    match args.format {
        OutputFormat::Json => {
            let components = snapshot(&mut core);
            println!("{}", serde_json::to_string_pretty(&components)?);
        }
        OutputFormat::Render => {
            let tree = render_tree(&mut core);
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        OutputFormat::Text => {
            let variant = core.variant().clone();
            println!(
                "{} {} (variant {} of {})",
                "▸".bright_blue(),
                args.file.display(),
                variant.name.bold(),
                variant.all_possible_variants.len()
            );
            let tree = render_tree(&mut core);
            let mut out = String::new();
            write_node(&tree, 0, &mut out);
            print!("{out}");
        }
    }
    Ok(())
}

fn write_node(node: &RenderNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let values = node
        .state_values
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(&format!(
        "{indent}<{}> {} {}\n",
        node.component_type, node.component_name, values
    ));
    for child in &node.children {
        match child {
            RenderChild::Text(text) => {
                out.push_str(&format!("{indent}  {:?}\n", text.trim()));
            }
            RenderChild::Node(child) => write_node(child, depth + 1, out),
        }
    }
}
