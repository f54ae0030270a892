//! Artifact publication.
//!
//! Copies the issued certificate and key from the ACME client's store to the
//! web-server-visible target directory:
//!
//! ```text
//! {cert_home}/{primary}/{primary}.cer  ->  {target_root}/{primary}/cert.pem
//! {cert_home}/{primary}/{primary}.key  ->  {target_root}/{primary}/priv.key
//! ```
//!
//! Both sources are read before anything is written. Each destination is
//! staged as a temp file in the target directory and renamed into place, and
//! the published pair is digest-checked against the sources afterwards.
//! Publishing the same pair again is a no-op in effect, so callers may retry
//! on every pass until it succeeds.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::config::expand_tilde;
use crate::domain::ArtifactPaths;
use crate::error::{Result, WardenError};

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "priv.key";

#[derive(Debug, Clone)]
pub struct Publisher {
    cert_home: PathBuf,
    target_root: PathBuf,
}

impl Publisher {
    pub fn new(cert_home: impl AsRef<Path>, target_root: impl AsRef<Path>) -> Self {
        Self {
            cert_home: expand_tilde(cert_home.as_ref()),
            target_root: expand_tilde(target_root.as_ref()),
        }
    }

    /// Issued pair in the ACME client's store.
    ///
    /// ECC certificates live under `{primary}_ecc`; that directory is used
    /// when the plain one does not exist.
    pub fn source(&self, primary: &str) -> ArtifactPaths {
        let plain = self.cert_home.join(primary);
        let ecc = self.cert_home.join(format!("{}_ecc", primary));
        let dir = if !plain.is_dir() && ecc.is_dir() { ecc } else { plain };
        ArtifactPaths {
            cert: dir.join(format!("{}.cer", primary)),
            key: dir.join(format!("{}.key", primary)),
        }
    }

    /// Published pair in the target directory.
    pub fn destination(&self, primary: &str) -> ArtifactPaths {
        let dir = self.target_root.join(primary);
        ArtifactPaths {
            cert: dir.join(CERT_FILE),
            key: dir.join(KEY_FILE),
        }
    }

    /// Copy the issued pair for `primary` into the target directory.
    pub fn publish(&self, primary: &str) -> Result<ArtifactPaths> {
        let source = self.source(primary);
        let cert = read_source(&source.cert, "certificate")?;
        let key = read_source(&source.key, "private key")?;

        let dest = self.destination(primary);
        let dir = self.target_root.join(primary);
        fs::create_dir_all(&dir).map_err(|e| {
            WardenError::Publish(format!("cannot create {}: {}", dir.display(), e))
        })?;

        // Stage both before renaming either, so a staging failure leaves the
        // previous pair untouched.
        let staged_key = stage(&dir, &key, 0o600)?;
        let staged_cert = stage(&dir, &cert, 0o644)?;
        persist(staged_key, &dest.key)?;
        persist(staged_cert, &dest.cert)?;

        if !matches_digest(&dest.cert, &cert)? || !matches_digest(&dest.key, &key)? {
            return Err(WardenError::Publish(format!(
                "published pair for {} does not match the issued pair",
                primary
            )));
        }

        info!(
            "Published certificate for {} to {} (sha256 {})",
            primary,
            dir.display(),
            short_digest(&cert)
        );
        Ok(dest)
    }

    /// Whether the published pair matches the store.
    pub fn is_current(&self, primary: &str) -> Result<bool> {
        let source = self.source(primary);
        let dest = self.destination(primary);
        if !dest.cert.exists() || !dest.key.exists() {
            return Ok(false);
        }
        let cert = read_source(&source.cert, "certificate")?;
        let key = read_source(&source.key, "private key")?;
        Ok(matches_digest(&dest.cert, &cert)? && matches_digest(&dest.key, &key)?)
    }

    /// Publish again if the store holds a pair the target lacks.
    ///
    /// Returns `None` when nothing needed copying.
    pub fn republish_if_stale(&self, primary: &str) -> Result<Option<ArtifactPaths>> {
        let source = self.source(primary);
        if !source.cert.exists() || !source.key.exists() {
            debug!("No stored certificate for {}, nothing to republish", primary);
            return Ok(None);
        }
        if self.is_current(primary)? {
            debug!("Published certificate for {} is current", primary);
            return Ok(None);
        }
        info!("Published certificate for {} is missing or stale, republishing", primary);
        self.publish(primary).map(Some)
    }
}

fn read_source(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        WardenError::Publish(format!("cannot read {} {}: {}", what, path.display(), e))
    })
}

fn stage(dir: &Path, contents: &[u8], mode: u32) -> Result<NamedTempFile> {
    let staging_error =
        |e: std::io::Error| WardenError::Publish(format!("cannot stage in {}: {}", dir.display(), e));

    let mut temp = NamedTempFile::new_in(dir).map_err(staging_error)?;
    temp.write_all(contents).map_err(staging_error)?;
    temp.as_file().sync_all().map_err(staging_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(mode)).map_err(staging_error)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(temp)
}

fn persist(temp: NamedTempFile, dest: &Path) -> Result<()> {
    temp.persist(dest).map_err(|e| {
        WardenError::Publish(format!("cannot replace {}: {}", dest.display(), e.error))
    })?;
    Ok(())
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn short_digest(bytes: &[u8]) -> String {
    hex::encode(&digest(bytes)[..8])
}

fn matches_digest(path: &Path, expected: &[u8]) -> Result<bool> {
    let actual = fs::read(path).map_err(|e| {
        WardenError::Publish(format!("cannot read back {}: {}", path.display(), e))
    })?;
    Ok(digest(&actual) == digest(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        home: PathBuf,
        target: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("acme");
        let target = temp.path().join("ssl");
        Fixture {
            _temp: temp,
            home,
            target,
        }
    }

    fn write_store(home: &Path, dir_name: &str, primary: &str, cert: &str, key: &str) {
        let dir = home.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.cer", primary)), cert).unwrap();
        fs::write(dir.join(format!("{}.key", primary)), key).unwrap();
    }

    #[test]
    fn test_publish_copies_pair() {
        let f = fixture();
        write_store(&f.home, "example.com", "example.com", "CERT-1", "KEY-1");
        let publisher = Publisher::new(&f.home, &f.target);

        let paths = publisher.publish("example.com").unwrap();
        assert_eq!(paths.cert, f.target.join("example.com").join("cert.pem"));
        assert_eq!(paths.key, f.target.join("example.com").join("priv.key"));
        assert_eq!(fs::read_to_string(&paths.cert).unwrap(), "CERT-1");
        assert_eq!(fs::read_to_string(&paths.key).unwrap(), "KEY-1");
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_key_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let f = fixture();
        write_store(&f.home, "example.com", "example.com", "C", "K");
        let paths = Publisher::new(&f.home, &f.target).publish("example.com").unwrap();
        let key_mode = fs::metadata(&paths.key).unwrap().permissions().mode() & 0o777;
        let cert_mode = fs::metadata(&paths.cert).unwrap().permissions().mode() & 0o777;
        assert_eq!(key_mode, 0o600);
        assert_eq!(cert_mode, 0o644);
    }

    #[test]
    fn test_publish_missing_cert_writes_nothing() {
        let f = fixture();
        let dir = f.home.join("example.com");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("example.com.key"), "KEY").unwrap();

        let err = Publisher::new(&f.home, &f.target).publish("example.com").unwrap_err();
        assert!(matches!(err, WardenError::Publish(_)));
        assert!(!f.target.join("example.com").exists());
    }

    #[test]
    fn test_publish_replaces_previous_pair_without_leftovers() {
        let f = fixture();
        let publisher = Publisher::new(&f.home, &f.target);
        write_store(&f.home, "example.com", "example.com", "OLD-CERT", "OLD-KEY");
        publisher.publish("example.com").unwrap();
        write_store(&f.home, "example.com", "example.com", "NEW-CERT", "NEW-KEY");
        let paths = publisher.publish("example.com").unwrap();

        assert_eq!(fs::read_to_string(&paths.cert).unwrap(), "NEW-CERT");
        assert_eq!(fs::read_to_string(&paths.key).unwrap(), "NEW-KEY");
        let entries = fs::read_dir(f.target.join("example.com")).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn test_ecc_store_fallback() {
        let f = fixture();
        write_store(&f.home, "example.com_ecc", "example.com", "ECC-CERT", "ECC-KEY");
        let paths = Publisher::new(&f.home, &f.target).publish("example.com").unwrap();
        assert_eq!(fs::read_to_string(&paths.cert).unwrap(), "ECC-CERT");
    }

    #[test]
    fn test_is_current() {
        let f = fixture();
        let publisher = Publisher::new(&f.home, &f.target);
        write_store(&f.home, "a.com", "a.com", "C1", "K1");
        assert!(!publisher.is_current("a.com").unwrap());

        publisher.publish("a.com").unwrap();
        assert!(publisher.is_current("a.com").unwrap());

        write_store(&f.home, "a.com", "a.com", "C2", "K1");
        assert!(!publisher.is_current("a.com").unwrap());
    }

    #[test]
    fn test_republish_if_stale() {
        let f = fixture();
        let publisher = Publisher::new(&f.home, &f.target);

        // Nothing in the store: nothing to do.
        assert_eq!(publisher.republish_if_stale("a.com").unwrap(), None);

        write_store(&f.home, "a.com", "a.com", "C", "K");
        let first = publisher.republish_if_stale("a.com").unwrap();
        assert!(first.is_some());

        // Already current: no copy.
        assert_eq!(publisher.republish_if_stale("a.com").unwrap(), None);

        fs::remove_file(f.target.join("a.com").join("priv.key")).unwrap();
        assert!(publisher.republish_if_stale("a.com").unwrap().is_some());
        assert_eq!(fs::read_to_string(f.target.join("a.com").join("priv.key")).unwrap(), "K");
    }

    #[test]
    fn test_unwritable_target_fails() {
        let f = fixture();
        write_store(&f.home, "a.com", "a.com", "C", "K");
        fs::create_dir_all(f.target.parent().unwrap()).unwrap();
        fs::write(&f.target, "not a directory").unwrap();
        let err = Publisher::new(&f.home, &f.target).publish("a.com").unwrap_err();
        assert!(err.to_string().contains("cannot create"));
    }
}
