use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Verified bytes written to a temporary file next to their destination.
///
/// Dropping a `StagedBinary` without committing removes the temporary file,
/// so the destination is never touched by an abandoned install.
pub struct StagedBinary {
    file: NamedTempFile,
}

impl StagedBinary {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// Atomically rename the staged file over `destination`.
    pub fn commit(self, destination: &Path) -> io::Result<()> {
        self.file.persist(destination).map_err(|e| e.error)?;
        Ok(())
    }
}

/// The default install root: the user's executable directory.
///
/// Falls back to `~/.local/bin` on platforms without one (macOS).
pub fn default_root() -> Result<PathBuf, String> {
    if let Some(dir) = dirs::executable_dir() {
        return Ok(dir);
    }
    let home = dirs::home_dir().ok_or("could not determine home directory")?;
    Ok(home.join(".local").join("bin"))
}

/// Write `binary_bytes` into a temporary file inside `install_root` and mark
/// it executable.
pub fn stage_binary(install_root: &Path, binary_bytes: &[u8]) -> io::Result<StagedBinary> {
    fs::create_dir_all(install_root)?;

    let mut file = tempfile::Builder::new()
        .prefix(".cmd-keeper-")
        .suffix(".tmp")
        .tempfile_in(install_root)?;
    file.write_all(binary_bytes)?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o755);
        fs::set_permissions(file.path(), perms)?;
    }

    Ok(StagedBinary { file })
}

/// Install the binary bytes to `<install_root>/<target_name>` and return the path.
pub fn install_binary(
    install_root: &Path,
    target_name: &str,
    binary_bytes: &[u8],
) -> io::Result<PathBuf> {
    let binary_path = install_root.join(target_name);
    let staged = stage_binary(install_root, binary_bytes)?;
    log::debug!(
        "staged {} bytes at {}",
        binary_bytes.len(),
        staged.temp_path().display()
    );
    staged.commit(&binary_path)?;
    Ok(binary_path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn install_writes_target_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = install_binary(tmp.path(), "cmd-keeper", b"new-binary").unwrap();
        assert_eq!(path, tmp.path().join("cmd-keeper"));
        assert_eq!(fs::read(&path).unwrap(), b"new-binary");
        assert_eq!(entries(tmp.path()), vec!["cmd-keeper".to_string()]);
    }

    #[test]
    fn install_creates_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("bin");
        let path = install_binary(&root, "cmd-keeper", b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn install_replaces_existing_binary() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("cmd-keeper"), b"old").unwrap();
        let path = install_binary(tmp.path(), "cmd-keeper", b"new").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"new");
        assert_eq!(entries(tmp.path()), vec!["cmd-keeper".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn install_sets_executable_bits() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let path = install_binary(tmp.path(), "cmd-keeper", b"x").unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn abandoned_stage_leaves_destination_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("cmd-keeper");
        fs::write(&target, b"previous").unwrap();

        let staged = stage_binary(tmp.path(), b"half-installed").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        drop(staged);

        assert!(!temp_path.exists());
        assert_eq!(fs::read(&target).unwrap(), b"previous");
        assert_eq!(entries(tmp.path()), vec!["cmd-keeper".to_string()]);
    }

    #[test]
    fn root_that_is_a_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("not-a-dir");
        fs::write(&root, b"").unwrap();
        assert!(install_binary(&root, "cmd-keeper", b"x").is_err());
        assert_eq!(entries(tmp.path()), vec!["not-a-dir".to_string()]);
    }

    #[test]
    fn default_root_is_absolute() {
        if let Ok(root) = default_root() {
            assert!(root.is_absolute(), "{}", root.display());
        }
    }
}
