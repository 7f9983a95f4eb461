//! CLI argument definitions for the repository builder.
//!
//! Kept separate from the entrypoint so that the binary stays focused on
//! orchestration and the argument surface can be tested directly.

use camino::Utf8PathBuf;
use clap::Parser;

/// Build Kodi addon repository catalogs and archives.
#[derive(Parser, Debug)]
#[command(name = "addon-repo")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build Kodi addon repository catalogs and archives.\n\n",
    "Each release directory holds one subdirectory per addon. Addons whose ",
    "version is new or changed are zipped into <release>/zips/<id>/, their ",
    "declared assets are copied alongside, and <release>/zips/addons.xml and ",
    "its checksum are rewritten. Releases without changes are left untouched.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build the configured releases:\n",
    "    $ addon-repo\n\n",
    "  Rebuild every addon of one release:\n",
    "    $ addon-repo omega --force\n\n",
    "  Build offline, without touching the repository descriptor:\n",
    "    $ addon-repo --no-update --skip-descriptor",
))]
pub struct Cli {
    /// Release directories to build [default: from configuration].
    #[arg(value_name = "RELEASE")]
    pub releases: Vec<String>,

    /// Rebuild every addon even when its version is unchanged.
    #[arg(short, long)]
    pub force: bool,

    /// Repository root containing the release directories.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: Utf8PathBuf,

    /// Configuration file [default: <root>/addon-repo.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Do not run `git submodule update` before building.
    #[arg(long)]
    pub no_update: bool,

    /// Do not build the repository descriptor archive and index page.
    #[arg(long)]
    pub skip_descriptor: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// The log level implied by `-v`/`-q`, used when `RUST_LOG` is unset.
    #[must_use]
    pub const fn log_level(&self) -> log::LevelFilter {
        match (self.quiet, self.verbosity) {
            (true, _) => log::LevelFilter::Warn,
            (false, 0) => log::LevelFilter::Info,
            (false, 1) => log::LevelFilter::Debug,
            (false, _) => log::LevelFilter::Trace,
        }
    }
}
