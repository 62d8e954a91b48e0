use crate::functions::formatting;
use clap::{Parser, Subcommand};
use log::info;
use mime_assoc::{Engine, EngineConfig};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;

/// Lets you define default applications on Linux in a sane way
#[derive(Parser, Debug)]
#[command(name = "mimepick", version, about, long_about = None)]
pub struct Cli {
    /// Print verbose information about how the desktop files are parsed
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the top-level type groups (image, text, ...)
    Groups,
    /// List applications that handle at least one type
    Apps {
        /// Only applications handling types in this group
        #[arg(short, long)]
        group: Option<String>,
    },
    /// List the types an application supports, including implied ones
    Types {
        /// Application name as shown by `apps`
        app: String,
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Show the current defaults from mimeapps.list
    Defaults,
    /// Make an application the default for the types it declares
    Set {
        /// Application name as shown by `apps`
        app: String,
        /// Only touch types in this group
        #[arg(short, long)]
        group: Option<String>,
        /// Declared types to leave unselected
        #[arg(short, long = "skip", value_name = "TYPE")]
        skip: Vec<String>,
    },
}

impl Cli {
    pub fn execute(self) -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::load(&EngineConfig::from_env());
        let json = self.json;

        match self.command {
            Commands::Groups => {
                let groups = engine.groups();
                print_output(json, &groups, || groups.join("\n"))
            }
            Commands::Apps { group } => {
                let apps = engine.applications(group.as_deref());
                print_output(json, &apps, || {
                    apps.iter()
                        .map(formatting::application_row)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
            }
            Commands::Types { app, group } => {
                let types = engine.supported_types(&app, group.as_deref())?;
                print_output(json, &types, || {
                    types.iter()
                        .map(formatting::type_row)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
            }
            Commands::Defaults => {
                let defaults = engine.current_defaults();
                print_output(json, &defaults, || {
                    defaults.iter()
                        .map(formatting::default_row)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
            }
            Commands::Set { app, group, skip } => Self::cmd_set(&mut engine, &app, group.as_deref(), &skip),
        }
    }

    /// Declared types are selected, implied and skipped ones unselected,
    /// matching what a fresh selection in the list would look like.
    fn cmd_set(
        engine: &mut Engine,
        app: &str,
        group: Option<&str>,
        skip: &[String],
    ) -> Result<(), Box<dyn Error>> {
        let skip: BTreeSet<String> = skip
            .iter()
            .map(|t| mime_assoc::resolve_type(engine.resolver(), t).unwrap_or_else(|| t.trim().to_string()))
            .collect();

        let mut selected = BTreeSet::new();
        let mut unselected = skip.clone();
        for entry in engine.supported_types(app, group)? {
            if entry.implied || skip.contains(&entry.mime_type) {
                unselected.insert(entry.mime_type);
            } else {
                selected.insert(entry.mime_type);
            }
        }

        if selected.is_empty() && unselected.is_empty() {
            println!("{app} has no types to set");
            return Ok(());
        }

        engine.set_default(app, &selected, &unselected)?;
        info!("Updated {}", engine.store().path().display());
        println!(
            "{app} is now the default for {} type(s) in {}",
            selected.len(),
            engine.store().path().display()
        );
        Ok(())
    }
}

fn print_output<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let text = text();
        if !text.is_empty() {
            println!("{text}");
        }
    }
    Ok(())
}
