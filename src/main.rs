use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use cmd_keeper_installer::{InstallOptions, InstallerError, DEFAULT_TIMEOUT};

/// Install the cmd-keeper binary for this machine.
///
/// Downloads the release artifact matching the host OS and architecture,
/// verifies its SHA-256 and places it in the install root as `cmd-keeper`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Release to install (defaults to the manifest's version)
    #[arg(long = "release", env = "CMD_KEEPER_VERSION", value_name = "VERSION")]
    release: Option<String>,

    /// Install root directory (defaults to the user's executable directory)
    #[arg(long, short = 'r', env = "CMD_KEEPER_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Release manifest TOML (defaults to the built-in manifest)
    #[arg(long, env = "CMD_KEEPER_MANIFEST", value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// sha256sum-style file overriding the manifest's hashes
    #[arg(long, env = "CMD_KEEPER_CHECKSUMS", value_name = "FILE")]
    checksums: Option<PathBuf>,

    /// Download timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECS"
    )]
    timeout: u64,

    /// Run `cmd-keeper --version` after installing
    #[arg(long)]
    check: bool,

    /// Resolve the artifact and print it without downloading
    #[arg(long)]
    dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> InstallOptions {
        InstallOptions {
            version: self.release.clone(),
            install_root: self.root.clone(),
            manifest: self.manifest.clone(),
            checksums: self.checksums.clone(),
            platform: None,
            timeout: Duration::from_secs(self.timeout),
            check: self.check,
        }
    }

    const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn run(cli: &Cli) -> Result<String, InstallerError> {
    let options = cli.options();

    if cli.dry_run {
        let spec = cmd_keeper_installer::resolve_artifact(&options)?;
        if cli.json {
            return to_json(&spec);
        }
        return Ok(format!(
            "url:    {}\nsha256: {}\ntarget: {}",
            spec.url, spec.expected_hash, spec.target_name
        ));
    }

    let result = cmd_keeper_installer::install(&options)?;
    if cli.json {
        return to_json(&result);
    }
    Ok(result.installed_path.display().to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, InstallerError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| InstallerError::Config(format!("failed to encode JSON: {e}")))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {} failed: {e}", e.stage());
            ExitCode::FAILURE
        }
    }
}
