use std::env::consts::{ARCH, OS};
use std::fmt;

/// Operating system family of the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Os {
    Macos,
    Linux,
    Windows,
    Other(String),
}

/// CPU architecture of the host, named the way release artifacts name it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arch {
    Arm64,
    Amd64,
    Other(String),
}

impl Os {
    /// Map a Rust `std::env::consts::OS` identifier.
    #[must_use]
    pub fn from_consts(os: &str) -> Self {
        match os {
            "macos" => Self::Macos,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Other(name) => name,
        }
    }
}

impl Arch {
    /// Map a Rust `std::env::consts::ARCH` identifier.
    #[must_use]
    pub fn from_consts(arch: &str) -> Self {
        match arch {
            "aarch64" | "arm64" => Self::Arm64,
            "x86_64" | "amd64" => Self::Amd64,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Arm64 => "arm64",
            Self::Amd64 => "amd64",
            Self::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: Os,
    pub arch: Arch,
}

impl HostPlatform {
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this process is running on.
    #[must_use]
    pub fn detect() -> Self {
        Self::new(Os::from_consts(OS), Arch::from_consts(ARCH))
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Supported hosts and the suffix their artifact is published under.
///
/// Adding a platform is a new row here plus a hash entry in the manifest.
const RESOLUTION_TABLE: &[(Os, Arch, &str)] = &[
    (Os::Macos, Arch::Arm64, "darwin-arm64"),
    (Os::Macos, Arch::Amd64, "darwin-amd64"),
    (Os::Linux, Arch::Amd64, "linux-amd64"),
];

/// Return the artifact suffix for `platform`, or `None` when no variant is
/// published for it.
#[must_use]
pub fn artifact_suffix(platform: &HostPlatform) -> Option<&'static str> {
    RESOLUTION_TABLE
        .iter()
        .find(|(os, arch, _)| *os == platform.os && *arch == platform.arch)
        .map(|(_, _, suffix)| *suffix)
}

/// All suffixes a release is expected to publish.
pub fn supported_suffixes() -> impl Iterator<Item = &'static str> {
    RESOLUTION_TABLE.iter().map(|(_, _, suffix)| *suffix)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn detect_current_platform() {
        let platform = HostPlatform::detect();
        assert!(!platform.os.as_str().is_empty());
        assert!(!platform.arch.as_str().is_empty());
    }

    #[test]
    fn rust_arch_names_map_to_release_names() {
        assert_eq!(Arch::from_consts("aarch64"), Arch::Arm64);
        assert_eq!(Arch::from_consts("x86_64"), Arch::Amd64);
        assert_eq!(
            Arch::from_consts("riscv64"),
            Arch::Other("riscv64".to_string())
        );
    }

    #[test]
    fn suffix_for_every_supported_host() {
        let cases = [
            (Os::Macos, Arch::Arm64, "darwin-arm64"),
            (Os::Macos, Arch::Amd64, "darwin-amd64"),
            (Os::Linux, Arch::Amd64, "linux-amd64"),
        ];
        for (os, arch, expected) in cases {
            let platform = HostPlatform::new(os, arch);
            assert_eq!(artifact_suffix(&platform), Some(expected), "{platform}");
        }
    }

    #[test]
    fn linux_arm64_has_no_variant() {
        let platform = HostPlatform::new(Os::Linux, Arch::Arm64);
        assert_eq!(artifact_suffix(&platform), None);
    }

    #[test]
    fn windows_has_no_variant() {
        let platform = HostPlatform::new(Os::Windows, Arch::Amd64);
        assert_eq!(artifact_suffix(&platform), None);
    }

    #[test]
    fn display_uses_release_names() {
        let platform = HostPlatform::new(Os::Linux, Arch::Other("riscv64".to_string()));
        assert_eq!(platform.to_string(), "linux-riscv64");
    }

    #[test]
    fn supported_suffixes_are_unique() {
        let mut suffixes: Vec<_> = supported_suffixes().collect();
        let total = suffixes.len();
        suffixes.sort_unstable();
        suffixes.dedup();
        assert_eq!(suffixes.len(), total);
    }
}
