mod check;
mod digest;
mod download;
mod install;
mod platform;
mod release;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

pub use check::{version_check, CHECK_TIMEOUT};
pub use digest::Sha256Digest;
pub use download::{Fetch, HttpFetcher, DEFAULT_TIMEOUT};
pub use install::{default_root, stage_binary, StagedBinary};
pub use platform::{Arch, HostPlatform, Os};
pub use release::{parse_checksum, resolve, ArtifactSpec, ReleaseManifest, ReleaseVersion};

#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    #[error("unsupported platform: {os}-{arch} (no release artifact is published for it)")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("invalid release configuration: {0}")]
    Config(String),

    #[error("download failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("installation failed at {}: {source}", path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("post-install check failed for {}: {reason}", path.display())]
    Check { path: PathBuf, reason: String },
}

impl InstallerError {
    /// The pipeline step that produced this error.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::UnsupportedPlatform { .. } | Self::Config(_) => Stage::Resolving,
            Self::Fetch { .. } => Stage::Fetching,
            Self::Integrity { .. } => Stage::Verifying,
            Self::Install { .. } => Stage::Installing,
            Self::Check { .. } => Stage::Checking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Fetching,
    Verifying,
    Installing,
    Checking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolving => "resolve",
            Self::Fetching => "fetch",
            Self::Verifying => "verify",
            Self::Installing => "install",
            Self::Checking => "check",
        })
    }
}

/// Where an [`Installer`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    pub installed_path: PathBuf,
    /// First line of `--version` output, when the post-install check ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_output: Option<String>,
}

/// Fetches, verifies and places one artifact.
pub struct Installer<F> {
    fetcher: F,
    install_root: PathBuf,
    check_timeout: Option<Duration>,
    state: State,
}

impl<F: Fetch> Installer<F> {
    pub fn new(fetcher: F, install_root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            install_root: install_root.into(),
            check_timeout: None,
            state: State::Idle,
        }
    }

    /// Run `<binary> --version` after installing, failing if it does not
    /// answer successfully within `timeout`.
    #[must_use]
    pub fn with_version_check(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Install `spec`. Each call is one run from `Idle`; a failure ends it.
    pub fn install(&mut self, spec: &ArtifactSpec) -> Result<InstallResult, InstallerError> {
        self.state = State::Idle;
        let result = self.run(spec);
        match &result {
            Ok(_) => self.enter(State::Done),
            Err(e) => self.enter(State::Failed(e.stage())),
        }
        result
    }

    fn run(&mut self, spec: &ArtifactSpec) -> Result<InstallResult, InstallerError> {
        self.enter(State::Running(Stage::Fetching));
        let bytes = self
            .fetcher
            .fetch(&spec.url)
            .map_err(|reason| InstallerError::Fetch {
                url: spec.url.clone(),
                reason,
            })?;

        self.enter(State::Running(Stage::Verifying));
        digest::verify(&bytes, &spec.expected_hash).map_err(|actual| {
            InstallerError::Integrity {
                url: spec.url.clone(),
                expected: spec.expected_hash.to_string(),
                actual: actual.to_string(),
            }
        })?;

        self.enter(State::Running(Stage::Installing));
        let installed_path =
            install::install_binary(&self.install_root, &spec.target_name, &bytes).map_err(
                |source| InstallerError::Install {
                    path: self.install_root.join(&spec.target_name),
                    source,
                },
            )?;

        let version_output = match self.check_timeout {
            Some(timeout) => {
                self.enter(State::Running(Stage::Checking));
                let output = check::version_check(&installed_path, timeout).map_err(|reason| {
                    InstallerError::Check {
                        path: installed_path.clone(),
                        reason,
                    }
                })?;
                Some(output)
            }
            None => None,
        };

        Ok(InstallResult {
            installed_path,
            version_output,
        })
    }

    fn enter(&mut self, next: State) {
        log::debug!("installer: {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

/// Inputs of one install, before defaults are applied.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Overrides the manifest's version.
    pub version: Option<String>,
    /// Defaults to [`default_root`].
    pub install_root: Option<PathBuf>,
    /// Defaults to the manifest embedded at build time.
    pub manifest: Option<PathBuf>,
    /// `sha256sum`-style file overriding the manifest's hashes.
    pub checksums: Option<PathBuf>,
    /// Defaults to the detected host.
    pub platform: Option<HostPlatform>,
    pub timeout: Duration,
    pub check: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            version: None,
            install_root: None,
            manifest: None,
            checksums: None,
            platform: None,
            timeout: DEFAULT_TIMEOUT,
            check: false,
        }
    }
}

/// Load the configured release and resolve the artifact for the host.
pub fn resolve_artifact(options: &InstallOptions) -> Result<ArtifactSpec, InstallerError> {
    let platform = options.platform.clone().unwrap_or_else(HostPlatform::detect);
    if platform::artifact_suffix(&platform).is_none() {
        return Err(InstallerError::UnsupportedPlatform {
            os: platform.os.as_str().to_string(),
            arch: platform.arch.as_str().to_string(),
        });
    }

    let mut manifest = match &options.manifest {
        Some(path) => ReleaseManifest::load(path)?,
        None => ReleaseManifest::embedded()?,
    };

    if let Some(version) = &options.version {
        if *version != manifest.version {
            log::warn!(
                "installing {version} with hashes configured for {}",
                manifest.version
            );
        }
        manifest.version.clone_from(version);
    }
    let version = ReleaseVersion::parse(&manifest.version)?;

    if let Some(path) = &options.checksums {
        let text = fs::read_to_string(path).map_err(|e| {
            InstallerError::Config(format!(
                "failed to read checksums file {}: {e}",
                path.display()
            ))
        })?;
        let applied = manifest.apply_checksums(&version, &text);
        log::info!("{applied} hash(es) taken from {}", path.display());
    }

    log::debug!("resolving cmd-keeper {} for {platform}", version.as_str());
    resolve(&platform, &version, &manifest)
}

/// Download, verify and install the `cmd-keeper` binary for this host.
///
/// Returns the path of the installed binary (`<install-root>/cmd-keeper`).
pub fn install(options: &InstallOptions) -> Result<InstallResult, InstallerError> {
    let spec = resolve_artifact(options)?;

    let install_root = match &options.install_root {
        Some(root) => root.clone(),
        None => default_root().map_err(InstallerError::Config)?,
    };

    let fetcher = HttpFetcher::new(options.timeout).map_err(|reason| InstallerError::Fetch {
        url: spec.url.clone(),
        reason,
    })?;

    let mut installer = Installer::new(fetcher, install_root);
    if options.check {
        installer = installer.with_version_check(CHECK_TIMEOUT);
    }

    let result = installer.install(&spec)?;
    log::info!("installed {} from {}", result.installed_path.display(), spec.url);
    Ok(result)
}
