use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Creates a file in `dir` whose name is `base || hex || extension`, where `hex` is
/// a randomly generated string. The resulting file is only readable by the current user.
/// The function returns `ErrorKind::AlreadyExists` only after several retries.
fn create_private_file(dir: &Path, base: &str, extension: &str) -> io::Result<(PathBuf, File)> {
    const RETRIES: usize = 16;

    let mut rng = StdRng::from_entropy();

    for _ in 0..RETRIES {
        let mut suffix = [0u8; 8];

        rng.fill_bytes(&mut suffix);

        let mut filename = String::from(base);

        for b in suffix {
            // Writing into a String cannot fail
            let _ = write!(filename, "{:02x}", b);
        }

        filename.push_str(extension);

        let path = dir.join(filename);

        let open_result = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path);

        match open_result {
            Ok(file) => return Ok((path, file)),
            Err(err) => {
                if matches!(err.kind(), ErrorKind::AlreadyExists) {
                    continue;
                }

                return Err(err);
            }
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("failed to create a private file after {} retries", RETRIES),
    ))
}

/// A private scratch file which is unlinked when dropped unless it has been
/// persisted over its destination.
pub(crate) struct PrivateTempfile {
    path: PathBuf,
    file: File,
    persisted: bool,
}

impl PrivateTempfile {
    pub(crate) fn new(dir: &Path, base: &str, extension: &str) -> io::Result<PrivateTempfile> {
        let (path, file) = create_private_file(dir, base, extension)?;

        Ok(PrivateTempfile {
            path,
            file,
            persisted: false,
        })
    }

    pub(crate) fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Flushes the contents to disk and renames the file over `dest`.
    pub(crate) fn persist(mut self, dest: &Path) -> io::Result<()> {
        self.file.sync_all()?;

        std::fs::rename(&self.path, dest)?;

        self.persisted = true;

        Ok(())
    }
}

impl Drop for PrivateTempfile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Replaces the file at `path` with `contents`. Readers either observe the old
/// contents or the new contents, never a partial write. The new file is mode 0600.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    std::fs::create_dir_all(&dir)?;

    let base = match path.file_name() {
        Some(name) => format!(".{}.", name.to_string_lossy()),
        None => ".nlsql.".to_string(),
    };

    let mut tmp = PrivateTempfile::new(&dir, &base, ".tmp")?;

    tmp.file_mut().write_all(contents)?;

    tmp.persist(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_write_private_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.toml");

        write_private(&path, b"first").unwrap();
        write_private(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // No scratch files are left behind
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_unpersisted_tempfile_is_removed() {
        let dir = tempfile::tempdir().unwrap();

        {
            let _tmp = PrivateTempfile::new(dir.path(), "scratch", ".tmp").unwrap();
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
