//! Addon repository builder CLI entrypoint.
//!
//! Refreshes package sources, rebuilds the repository descriptor and then
//! builds each requested release directory. Progress is logged through
//! `env_logger`; a one-line summary per release is written to stderr.

use addon_repo::cli::Cli;
use addon_repo::config::RepositoryConfig;
use addon_repo::descriptor::build_descriptor;
use addon_repo::error::{RepoError, Result};
use addon_repo::generator::{Generator, ReleaseSettings};
use addon_repo::git::update_submodules;
use addon_repo::output::{error_chain, release_summary};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs `env_logger` at the level chosen on the command line; `RUST_LOG`
/// takes precedence when set.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = RepositoryConfig::load(&cli.root, cli.config.as_deref())?;
    let settings = ReleaseSettings::from_config(&config, cli.force)?;
    let mut failed = Vec::new();

    // Step 1: Refresh vendored package sources
    if config.update_submodules && !cli.no_update {
        refresh_sources(&cli.root);
    }

    // Step 2: Rebuild the repository descriptor
    let descriptor = (config.build_descriptor && !cli.skip_descriptor)
        .then(|| build_descriptor(&cli.root, &config.descriptor_files));
    if let Some(Err(err)) = descriptor {
        log::error!("Error creating repo zip: {}", error_chain(&err));
        failed.push("repository descriptor".to_owned());
    }

    // Step 3: Build every requested release that exists
    let releases = existing_releases(&cli.root, requested_releases(cli, &config));
    if releases.is_empty() {
        log::info!("No valid release directories found.");
    }
    for release in releases {
        match Generator::new(&release, settings.clone()).run() {
            Ok(report) => {
                if !cli.quiet {
                    write_stderr_line(stderr, release_summary(&report));
                }
            }
            Err(err) => {
                log::error!("Error building {release}: {}", error_chain(&err));
                failed.push(release.into_string());
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(RepoError::Incomplete { failed })
    }
}

/// Runs the submodule refresh; failures are logged and the build goes on.
fn refresh_sources(root: &Utf8Path) {
    if let Err(err) = update_submodules(root) {
        log::warn!("Failed to update git submodules: {}", error_chain(&err));
    }
}

/// Release names from the command line, or the configured list.
fn requested_releases<'a>(cli: &'a Cli, config: &'a RepositoryConfig) -> &'a [String] {
    if cli.releases.is_empty() {
        &config.releases
    } else {
        &cli.releases
    }
}

/// Resolves release names against `root`, keeping existing directories only.
fn existing_releases(root: &Utf8Path, names: &[String]) -> Vec<Utf8PathBuf> {
    names
        .iter()
        .map(|name| root.join(name))
        .filter(|path| {
            let exists = path.is_dir();
            if !exists {
                log::debug!("release directory {path} not found; ignoring");
            }
            exists
        })
        .collect()
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, error_chain(&err));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
