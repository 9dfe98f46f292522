//! Profiles command - inspect the built-in document profiles.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use docfield_core::{DocumentKind, DocumentProfile};

/// Arguments for the profiles command.
#[derive(Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    command: ProfilesCommand,
}

#[derive(Subcommand)]
enum ProfilesCommand {
    /// List built-in profiles and their fields
    List,

    /// Print a profile as JSON
    Show {
        /// Profile name
        name: String,
    },

    /// Write a profile to a JSON file, as a starting point for a custom one
    Export {
        /// Profile name
        name: String,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a profile JSON file
    Check {
        /// Profile file
        path: PathBuf,
    },
}

pub async fn run(args: ProfilesArgs) -> anyhow::Result<()> {
    match args.command {
        ProfilesCommand::List => list_profiles(),
        ProfilesCommand::Show { name } => show_profile(&name),
        ProfilesCommand::Export { name, output, force } => export_profile(&name, &output, force),
        ProfilesCommand::Check { path } => check_profile(&path),
    }
}

fn list_profiles() -> anyhow::Result<()> {
    for kind in DocumentKind::all() {
        let profile = kind.profile();
        let fields: Vec<&str> = profile.fields.iter().map(|f| f.name.as_str()).collect();
        println!("{}", style(kind.name()).bold());
        println!("  fields: {}", fields.join(", "));
        if profile.table.is_some() {
            println!("  line items: yes");
        }
    }
    Ok(())
}

fn show_profile(name: &str) -> anyhow::Result<()> {
    let profile = name.parse::<DocumentKind>()?.profile();
    println!("{}", profile.to_json_pretty()?);
    Ok(())
}

fn export_profile(name: &str, output: &PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            output.display()
        );
    }

    let profile = name.parse::<DocumentKind>()?.profile();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, profile.to_json_pretty()?)?;

    println!(
        "{} Wrote {} profile to {}",
        style("✓").green(),
        name,
        output.display()
    );
    Ok(())
}

fn check_profile(path: &PathBuf) -> anyhow::Result<()> {
    let profile = DocumentProfile::from_file(path)?;
    println!(
        "{} {}: {} fields, {} semantic groups{}",
        style("✓").green(),
        profile.name,
        profile.fields.len(),
        profile.semantic_groups.len(),
        if profile.table.is_some() { ", line items" } else { "" }
    );
    Ok(())
}
