// src/cli/toolset.rs

use crate::error::{Error, Result};
use crate::system::{System, Toolset};
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct ToolsetArgs {
    #[command(subcommand)]
    pub action: ToolsetAction,
}

#[derive(Subcommand, Debug)]
pub enum ToolsetAction {
    /// List configured toolsets.
    List,
    /// Register a toolset.
    Add(ToolsetFields),
    /// Remove a toolset by compiler path.
    Del { compiler: String },
}

#[derive(Args, Debug)]
pub struct ToolsetFields {
    #[arg(long)]
    pub compiler: String,
    #[arg(long)]
    pub os: Option<String>,
    #[arg(long)]
    pub arch: Option<String>,
    #[arg(long, default_value = "")]
    pub glibc: String,
    #[arg(long)]
    pub default: bool,
}

pub fn run(args: &ToolsetArgs, system: &mut System) -> Result<()> {
    match &args.action {
        ToolsetAction::List => {
            for t in &system.toolsets {
                println!(
                    "{}{} os={} arch={} glibc={}",
                    t.compiler_path,
                    if t.default { " (default)" } else { "" },
                    t.os,
                    t.arch,
                    t.glibc
                );
            }
            Ok(())
        }
        ToolsetAction::Add(fields) => {
            let toolset = Toolset::new(
                fields.compiler.clone(),
                fields.os.clone(),
                fields.arch.clone(),
                fields.glibc.clone(),
                fields.default,
            );
            system.add_toolset(toolset)
        }
        ToolsetAction::Del { compiler } => {
            if !system.toolsets.iter().any(|t| &t.compiler_path == compiler) {
                return Err(Error::validation(format!("no toolset registered for {compiler}")));
            }
            system.del_toolset(compiler)
        }
    }
}
