//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{render_tree, ImportOutcome};
use crate::application::IoResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings, LOCAL_CONFIG_FILE};
use crate::domain::ContentRef;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{ContentRepository, TypeRepository};
use crate::infrastructure::types::ConfiguredTypeRepository;
use crate::infrastructure::InfraError;

/// Run the parsed command line.
pub fn execute(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `iacreate --help`".to_string(),
        ));
    };
    match command {
        Commands::Import {
            file,
            parent,
            store,
            tree,
        } => cmd_import(cli, file.as_deref(), *parent, store.as_deref(), *tree),
        Commands::Preview { file, parent } => cmd_preview(cli, file.as_deref(), *parent),
        Commands::Tree { store } => cmd_tree(cli, store.as_deref()),
        Commands::Config { command } => cmd_config(cli, command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Resolve a command-line path against the working directory, not `app_data_dir`.
fn absolute(path: &Path) -> CliResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| InfraError::io(format!("resolve {}", path.display()), e).into())
}

fn load_settings(
    cli: &Cli,
    file: Option<&Path>,
    parent: Option<u64>,
    store: Option<&Path>,
) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(file) = file {
        settings.source_file = absolute(file)?;
    }
    if let Some(store) = store {
        settings.store_file = absolute(store)?;
    }
    if parent.is_some() {
        settings.parent_id = parent;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn print_tree<R: ContentRepository + ?Sized>(repo: &R, root: ContentRef) -> CliResult<()> {
    let tree = render_tree(repo, root)
        .ok_or_else(|| CliError::InvalidArgs(format!("content {} does not exist", root)))?;
    output::info(&tree);
    Ok(())
}

fn report(outcome: &ImportOutcome, source: &Path) {
    match outcome {
        ImportOutcome::NoFile => output::warning(&format!("{}: {}", outcome, source.display())),
        ImportOutcome::Stopped { imported } => {
            output::warning(&format!("{} ({} items imported)", outcome, imported))
        }
        ImportOutcome::Completed { field_failures, .. } => {
            output::success(outcome);
            if *field_failures > 0 {
                output::warning(&format!(
                    "{} fields skipped, run with -v for details",
                    field_failures
                ));
            }
        }
    }
}

#[instrument(skip(cli))]
fn cmd_import(
    cli: &Cli,
    file: Option<&Path>,
    parent: Option<u64>,
    store: Option<&Path>,
    tree: bool,
) -> CliResult<()> {
    let settings = load_settings(cli, file, parent, store)?;
    let container = ServiceContainer::new(settings)?;
    let source = container.settings.source_path();
    let root = container.settings.parent_ref();

    let outcome = container.import_job(&source, root).run()?;
    report(&outcome, &source);

    if outcome.imported() > 0 {
        container.save_store()?;
        output::action("Saved", &container.settings.store_path().display());
    }
    if tree {
        print_tree(&*container.store, root)?;
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_preview(cli: &Cli, file: Option<&Path>, parent: Option<u64>) -> CliResult<()> {
    let settings = load_settings(cli, file, parent, None)?;
    let container = ServiceContainer::scratch(settings);
    let source = container.settings.source_path();
    let root = container.settings.parent_ref();

    let outcome = container.import_job(&source, root).run()?;
    report(&outcome, &source);
    if outcome.imported() > 0 {
        print_tree(&*container.store, root)?;
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_tree(cli: &Cli, store: Option<&Path>) -> CliResult<()> {
    let settings = load_settings(cli, None, None, store)?;
    let path = settings.store_path();
    if !path.exists() {
        output::warning(&format!("no store file yet: {}", path.display()));
    }
    let container = ServiceContainer::new(settings)?;
    print_tree(&*container.store, ContentRef::START)
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
            output::header("Content types");
            for content_type in ConfiguredTypeRepository::new(&settings.types).list() {
                let properties = content_type
                    .properties
                    .iter()
                    .map(|(name, kind)| format!("{}:{}", name, kind))
                    .join(", ");
                output::detail(&format!(
                    "#{} {}: {}",
                    content_type.id, content_type.name, properties
                ));
            }
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                PathBuf::from(LOCAL_CONFIG_FILE)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).with_path_context("create config dir", dir)?;
            }
            std::fs::write(&path, Settings::template()).with_path_context("write config", &path)?;
            output::action("Created", &path.display());
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(global) => {
                    let state = if global.exists() { "" } else { " (not found)" };
                    output::info(&format!("global: {}{}", global.display(), state));
                }
                None => output::info("global: <unavailable>"),
            }
            let local = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
            let state = if local.exists() { "" } else { " (not found)" };
            output::info(&format!("local:  {}{}", local.display(), state));
            Ok(())
        }
    }
}
