use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::digest::Sha256Digest;
use crate::platform::{self, HostPlatform};
use crate::InstallerError;

const EMBEDDED_MANIFEST: &str = include_str!("../release.toml");
const DEFAULT_TARGET_NAME: &str = "cmd-keeper";

/// A release tag without its `v` prefix, e.g. `0.1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Parse a version, accepting `0.1.0` and `v0.1.0` alike.
    pub fn parse(value: &str) -> Result<Self, InstallerError> {
        let trimmed = value.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if bare.is_empty() {
            return Err(InstallerError::Config(format!(
                "release version '{value}' is empty"
            )));
        }
        Ok(Self(bare.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The release table: where artifacts live and what they must hash to.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseManifest {
    pub version: String,
    /// Download URL with `{version}` and `{suffix}` placeholders.
    pub url_template: String,
    #[serde(default = "default_target_name")]
    pub target_name: String,
    /// Expected SHA-256 per platform suffix.
    #[serde(default)]
    pub sha256: BTreeMap<String, String>,
}

fn default_target_name() -> String {
    DEFAULT_TARGET_NAME.to_string()
}

impl ReleaseManifest {
    /// The manifest compiled into this binary.
    pub fn embedded() -> Result<Self, InstallerError> {
        Self::from_toml(EMBEDDED_MANIFEST)
    }

    pub fn load(path: &Path) -> Result<Self, InstallerError> {
        let text = fs::read_to_string(path).map_err(|e| {
            InstallerError::Config(format!("failed to read manifest {}: {e}", path.display()))
        })?;
        Self::parse(&text).map_err(|e| InstallerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, InstallerError> {
        Self::parse(text).map_err(InstallerError::Config)
    }

    fn parse(text: &str) -> Result<Self, String> {
        let manifest: Self =
            toml::from_str(text).map_err(|e| format!("failed to parse manifest: {e}"))?;

        ReleaseVersion::parse(&manifest.version).map_err(|e| match e {
            InstallerError::Config(reason) => reason,
            other => other.to_string(),
        })?;
        if !manifest.url_template.contains("{suffix}") {
            return Err(format!(
                "url_template '{}' has no {{suffix}} placeholder",
                manifest.url_template
            ));
        }
        let name = manifest.target_name.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(format!("target_name '{name}' is not a plain file name"));
        }
        Ok(manifest)
    }

    /// Download URL of the artifact published under `suffix`.
    #[must_use]
    pub fn artifact_url(&self, version: &ReleaseVersion, suffix: &str) -> String {
        self.url_template
            .replace("{version}", version.as_str())
            .replace("{suffix}", suffix)
    }

    /// Override hashes from a `sha256sum`-style checksums file.
    ///
    /// Entries are matched by the last path segment of each artifact URL.
    /// Returns the number of hashes taken from the file.
    pub fn apply_checksums(&mut self, version: &ReleaseVersion, checksums_text: &str) -> usize {
        let mut applied = 0;
        for suffix in platform::supported_suffixes() {
            let url = self.artifact_url(version, suffix);
            let asset_name = url.rsplit('/').next().unwrap_or(&url);
            if let Ok(hash) = parse_checksum(checksums_text, asset_name) {
                log::debug!("checksums file provides sha256 for {asset_name}");
                self.sha256.insert(suffix.to_string(), hash);
                applied += 1;
            }
        }
        applied
    }
}

/// Everything needed to fetch and place one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSpec {
    pub url: String,
    pub expected_hash: Sha256Digest,
    pub target_name: String,
}

/// Pick the artifact for `platform` from `manifest`.
///
/// Hosts outside the resolution table are refused outright; there is no
/// fallback to another architecture.
pub fn resolve(
    platform: &HostPlatform,
    version: &ReleaseVersion,
    manifest: &ReleaseManifest,
) -> Result<ArtifactSpec, InstallerError> {
    let suffix =
        platform::artifact_suffix(platform).ok_or_else(|| InstallerError::UnsupportedPlatform {
            os: platform.os.as_str().to_string(),
            arch: platform.arch.as_str().to_string(),
        })?;

    let configured = manifest
        .sha256
        .get(suffix)
        .ok_or_else(|| InstallerError::Config(format!("no sha256 configured for {suffix}")))?;
    let expected_hash = Sha256Digest::parse(configured)
        .map_err(|e| InstallerError::Config(format!("{suffix}: {e}")))?;

    Ok(ArtifactSpec {
        url: manifest.artifact_url(version, suffix),
        expected_hash,
        target_name: manifest.target_name.clone(),
    })
}

/// Parse a checksums file and return the expected hash for the given asset name.
pub fn parse_checksum(checksums_text: &str, asset_name: &str) -> Result<String, String> {
    for line in checksums_text.lines() {
        // Format: "<hash>  <filename>", "<hash> <filename>" or "<hash> *<filename>"
        let parts: Vec<&str> = line.splitn(2, char::is_whitespace).collect();
        if parts.len() == 2 {
            let filename = parts[1].trim().trim_start_matches('*');
            if filename == asset_name {
                return Ok(parts[0].to_string());
            }
        }
    }
    Err(format!(
        "checksum not found for {asset_name} in checksums file"
    ))
}
