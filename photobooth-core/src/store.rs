//! Artifact Store - The Gatekeeper
//!
//! CRITICAL: every public operation validates identifier, extension, size
//! and containment BEFORE touching disk. A failed check aborts with no
//! filesystem mutation.
//!
//! Layout: one flat root directory, files named `<uuid-v4>.<ext>`.
//! Operations on the same id are serialized within one store instance.
//! Separate processes sharing a root are not coordinated.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{SecurityConfig, StoreConfig};
use crate::error::StoreError;
use crate::formats::ImageFormat;
use crate::identifier::ArtifactId;
use crate::paths;

const LOCK_STRIPES: usize = 64;
const PARTIAL_SUFFIX: &str = "partial";

/// Metadata for a stored artifact that passed every read-side check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub format: ImageFormat,
    pub size_bytes: u64,
    pub mime_type: String,
    pub absolute_path: PathBuf,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

/// A fetched artifact as a self-describing data URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
    pub mime_type: String,
    pub file_path: PathBuf,
}

pub struct ArtifactStore {
    root: PathBuf,
    max_file_size: u64,
    allowed_mime_types: Vec<String>,
    locks: IdLocks,
}

impl ArtifactStore {
    /// Open the store, creating the root directory if absent.
    pub fn open(storage: &StoreConfig, security: &SecurityConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&storage.root).map_err(|e| StoreError::io(&storage.root, e))?;
        let root = storage
            .root
            .canonicalize()
            .map_err(|e| StoreError::io(&storage.root, e))?;

        info!(root = %root.display(), max_file_size = security.max_file_size, "artifact store opened");

        Ok(Self {
            root,
            max_file_size: security.max_file_size,
            allowed_mime_types: security.allowed_image_types.clone(),
            locks: IdLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Save `bytes` as `<id>.<ext>`, replacing any earlier artifact with
    /// the same id whatever its extension. Returns the absolute path.
    pub fn save(&self, id: &str, bytes: &[u8], extension: &str) -> Result<PathBuf, StoreError> {
        let id = ArtifactId::parse(id)?;
        let format = ImageFormat::from_extension(extension)?;
        self.check_mime(format)?;
        self.check_size(bytes.len() as u64)?;

        let file_name = format!("{}.{}", id, format.extension());
        let path = paths::resolve(&self.root, &file_name)?;
        let partial = paths::resolve(&self.root, &format!("{}.{}", file_name, PARTIAL_SUFFIX))?;

        let _guard = self.locks.lock(&id);

        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        if let Err(e) = fs::write(&partial, bytes) {
            remove_partial(&partial);
            return Err(StoreError::io(&partial, e));
        }
        if let Err(e) = fs::rename(&partial, &path) {
            remove_partial(&partial);
            return Err(StoreError::io(&path, e));
        }

        self.remove_stale_siblings(&id, &file_name);

        info!(id = %id, path = %path.display(), size = bytes.len(), "artifact saved");
        Ok(path)
    }

    /// Save under a freshly generated id.
    pub fn save_new(&self, bytes: &[u8], extension: &str) -> Result<(ArtifactId, PathBuf), StoreError> {
        let id = ArtifactId::generate();
        let path = self.save(id.as_str(), bytes, extension)?;
        Ok((id, path))
    }

    /// Run every read-side check without reading content.
    pub fn locate(&self, id: &str) -> Result<Artifact, StoreError> {
        let id = ArtifactId::parse(id)?;
        let _guard = self.locks.lock(&id);
        self.locate_locked(&id)
    }

    pub fn fetch(&self, id: &str) -> Result<EncodedImage, StoreError> {
        let id = ArtifactId::parse(id)?;
        let _guard = self.locks.lock(&id);
        let artifact = self.locate_locked(&id)?;

        let contents = fs::read(&artifact.absolute_path)
            .map_err(|e| StoreError::io(&artifact.absolute_path, e))?;
        self.check_size(contents.len() as u64)?;

        let payload = base64::engine::general_purpose::STANDARD.encode(&contents);
        debug!(id = %id, size = contents.len(), "artifact fetched");

        Ok(EncodedImage {
            data_uri: format!("data:{};base64,{}", artifact.mime_type, payload),
            mime_type: artifact.mime_type,
            file_path: artifact.absolute_path,
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = ArtifactId::parse(id)?;
        let _guard = self.locks.lock(&id);
        let path = self.find(&id)?;
        ImageFormat::from_path(&path)?;

        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::FileNotFound(id.to_string()),
            _ => StoreError::io(&path, e),
        })?;

        info!(id = %id, path = %path.display(), "artifact deleted");
        Ok(())
    }

    /// Best-effort cleanup after a failed multi-step operation.
    /// Failures are logged and never returned so they cannot mask the
    /// caller's original error.
    pub fn discard(&self, id: &str) {
        match self.delete(id) {
            Ok(()) => {}
            Err(StoreError::FileNotFound(_)) => debug!(id, "nothing to discard"),
            Err(e) => warn!(id, error = %e, "failed to discard artifact"),
        }
    }

    /// Ids of all well-formed artifacts, sorted. Files with other names or
    /// extensions are skipped silently.
    pub fn list(&self) -> Result<Vec<ArtifactId>, StoreError> {
        self.check_root()?;

        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut ids = vec![];

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            if !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }
            if let Some(id) = artifact_id_of(&entry.path()) {
                ids.push(id);
            }
        }

        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn locate_locked(&self, id: &ArtifactId) -> Result<Artifact, StoreError> {
        let path = self.find(id)?;
        let format = ImageFormat::from_path(&path)?;

        let metadata = fs::metadata(&path).map_err(|e| StoreError::io(&path, e))?;
        self.check_size(metadata.len())?;
        self.check_mime(format)?;

        Ok(Artifact {
            id: id.clone(),
            format,
            size_bytes: metadata.len(),
            mime_type: format.mime_type().to_string(),
            absolute_path: path,
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// Directory check, stem scan, then containment (lexical and canonical).
    fn find(&self, id: &ArtifactId) -> Result<PathBuf, StoreError> {
        self.check_root()?;

        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut matches: Vec<String> = vec![];
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            // Follows symlinks; escapes are caught by the containment check below
            if !entry.path().is_file() {
                continue;
            }
            if Path::new(&name).file_stem().and_then(|s| s.to_str()) == Some(id.as_str()) {
                matches.push(name);
            }
        }

        // Prefer an allowlisted extension when stale siblings exist
        matches.sort();
        let name = matches
            .iter()
            .find(|n| ImageFormat::from_path(Path::new(n)).is_ok())
            .or_else(|| matches.first())
            .ok_or_else(|| StoreError::FileNotFound(id.to_string()))?;

        let lexical = paths::resolve(&self.root, name)?;
        paths::ensure_contained(&self.root, &lexical)?;
        Ok(lexical)
    }

    fn remove_stale_siblings(&self, id: &ArtifactId, keep: &str) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(id = %id, error = %e, "could not scan for stale artifacts");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == keep {
                continue;
            }
            if Path::new(name).file_stem().and_then(|s| s.to_str()) != Some(id.as_str()) {
                continue;
            }
            let Ok(path) = paths::resolve(&self.root, name) else { continue };
            match fs::remove_file(&path) {
                Ok(()) => debug!(id = %id, path = %path.display(), "removed stale artifact"),
                Err(e) => warn!(id = %id, path = %path.display(), error = %e, "failed to remove stale artifact"),
            }
        }
    }

    fn check_root(&self) -> Result<(), StoreError> {
        match fs::metadata(&self.root) {
            Ok(m) if m.is_dir() => Ok(()),
            _ => Err(StoreError::DirectoryMissing(self.root.clone())),
        }
    }

    /// Reject a payload of `size` bytes before it is read or written.
    pub fn check_size(&self, size: u64) -> Result<(), StoreError> {
        if size > self.max_file_size {
            return Err(StoreError::FileTooLarge { size, max: self.max_file_size });
        }
        Ok(())
    }

    fn check_mime(&self, format: ImageFormat) -> Result<(), StoreError> {
        let mime = format.mime_type();
        if !self.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(mime)) {
            return Err(StoreError::UnsupportedMimeType(mime.to_string()));
        }
        Ok(())
    }
}

fn remove_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %partial.display(), error = %e, "failed to remove partial write"),
    }
}

/// Id of a file that follows the naming convention, if it does.
fn artifact_id_of(path: &Path) -> Option<ArtifactId> {
    ImageFormat::from_path(path).ok()?;
    let stem = path.file_stem()?.to_str()?;
    let id = ArtifactId::parse(stem).ok()?;
    // Upper-case stems are never written and would not be found by fetch
    (id.as_str() == stem).then_some(id)
}

struct IdLocks {
    stripes: Vec<Mutex<()>>,
}

impl IdLocks {
    fn new() -> Self {
        Self {
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, id: &ArtifactId) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        let stripe = &self.stripes[(hasher.finish() as usize) % LOCK_STRIPES];
        stripe.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ID: &str = "123e4567-e89b-42d3-a456-426614174000";

    fn open_store(max: u64) -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let storage = StoreConfig { root: dir.path().join("temp") };
        let security = SecurityConfig { max_file_size: max, ..Default::default() };
        let store = ArtifactStore::open(&storage, &security).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_root() {
        let (dir, store) = open_store(1024);
        assert!(dir.path().join("temp").is_dir());
        assert!(store.root().is_absolute());
    }

    #[test]
    fn test_save_writes_expected_name() {
        let (_dir, store) = open_store(1024);
        let path = store.save(ID, b"jpegdata", ".JPG").unwrap();
        assert_eq!(path.file_name().unwrap(), format!("{ID}.jpg").as_str());
        assert_eq!(fs::read(&path).unwrap(), b"jpegdata");
    }

    #[test]
    fn test_save_lowercases_id() {
        let (_dir, store) = open_store(1024);
        let path = store.save(&ID.to_uppercase(), b"x", ".png").unwrap();
        assert_eq!(path.file_name().unwrap(), format!("{ID}.png").as_str());
        assert!(store.fetch(&ID.to_uppercase()).is_ok());
    }

    #[test]
    fn test_save_rejects_before_io() {
        let (_dir, store) = open_store(4);

        let err = store.save("nope", b"x", ".jpg").unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier { .. }));

        let err = store.save(ID, b"x", ".gif").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedExtension(_)));

        let err = store.save(ID, b"too big", ".jpg").unwrap_err();
        assert!(matches!(err, StoreError::FileTooLarge { size: 7, max: 4 }));

        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_rejects_disallowed_mime() {
        let dir = TempDir::new().unwrap();
        let storage = StoreConfig { root: dir.path().to_path_buf() };
        let security = SecurityConfig {
            allowed_image_types: vec!["image/jpeg".to_string()],
            ..Default::default()
        };
        let store = ArtifactStore::open(&storage, &security).unwrap();

        let err = store.save(ID, b"x", ".webp").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedMimeType(_)));
    }

    #[test]
    fn test_save_other_extension_replaces() {
        let (_dir, store) = open_store(1024);
        store.save(ID, b"old", ".jpg").unwrap();
        store.save(ID, b"new", ".png").unwrap();

        let names: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![format!("{ID}.png")]);
        assert_eq!(store.fetch(ID).unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_fetch_missing_root() {
        let (_dir, store) = open_store(1024);
        fs::remove_dir(store.root()).unwrap();
        let err = store.fetch(ID).unwrap_err();
        assert!(matches!(err, StoreError::DirectoryMissing(_)));
    }

    #[test]
    fn test_fetch_rejects_oversized_file_on_disk() {
        let (_dir, store) = open_store(4);
        fs::write(store.root().join(format!("{ID}.jpg")), b"0123456789").unwrap();
        let err = store.fetch(ID).unwrap_err();
        assert!(matches!(err, StoreError::FileTooLarge { size: 10, max: 4 }));
    }

    #[test]
    fn test_fetch_rejects_unknown_extension() {
        let (_dir, store) = open_store(1024);
        fs::write(store.root().join(format!("{ID}.gif")), b"GIF89a").unwrap();
        let err = store.fetch(ID).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_locate_reports_metadata() {
        let (_dir, store) = open_store(1024);
        store.save(ID, b"12345", ".webp").unwrap();
        let artifact = store.locate(ID).unwrap();
        assert_eq!(artifact.size_bytes, 5);
        assert_eq!(artifact.format, ImageFormat::Webp);
        assert_eq!(artifact.mime_type, "image/webp");
        assert!(artifact.absolute_path.starts_with(store.root()));
    }

    #[test]
    fn test_delete_and_missing() {
        let (_dir, store) = open_store(1024);
        store.save(ID, b"x", ".jpg").unwrap();
        store.delete(ID).unwrap();
        let err = store.delete(ID).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }

    #[test]
    fn test_discard_swallows_errors() {
        let (_dir, store) = open_store(1024);
        store.discard(ID);
        store.discard("not-a-uuid");
        store.save(ID, b"x", ".jpg").unwrap();
        store.discard(ID);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_foreign_files() {
        let (_dir, store) = open_store(1024);
        store.save(ID, b"x", ".jpg").unwrap();
        let other = "9f1c2b3a-0000-4abc-8def-0123456789ab";
        store.save(other, b"y", ".png").unwrap();
        fs::write(store.root().join("notes.txt"), b"n").unwrap();
        fs::write(store.root().join("holiday.jpg"), b"n").unwrap();
        fs::write(store.root().join("5b4c7a1e-1111-4222-9333-444455556666.gif"), b"n").unwrap();
        fs::create_dir(store.root().join("7d2e1f00-aaaa-4bbb-8ccc-dddddddddddd.jpg")).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(String::from).collect();
        assert_eq!(ids, vec![ID.to_string(), other.to_string()]);
    }

    #[test]
    fn test_directory_named_like_artifact_is_not_found() {
        let (_dir, store) = open_store(1024);
        fs::create_dir(store.root().join(format!("{ID}.jpg"))).unwrap();

        assert!(matches!(store.locate(ID).unwrap_err(), StoreError::FileNotFound(_)));
        assert!(matches!(store.fetch(ID).unwrap_err(), StoreError::FileNotFound(_)));
        assert!(matches!(store.delete(ID).unwrap_err(), StoreError::FileNotFound(_)));
        assert!(store.root().join(format!("{ID}.jpg")).is_dir());
    }

    #[test]
    fn test_delete_rejects_unknown_extension() {
        let (_dir, store) = open_store(1024);
        let gif = store.root().join(format!("{ID}.gif"));
        fs::write(&gif, b"GIF89a").unwrap();

        let err = store.delete(ID).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedExtension(_)));
        assert!(gif.exists());
    }

    #[test]
    fn test_failed_commit_leaves_no_partial() {
        let (_dir, store) = open_store(1024);
        // A non-empty directory at the target name makes the rename fail
        let target = store.root().join(format!("{ID}.jpg"));
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let err = store.save(ID, b"photo", ".jpg").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.root().join(format!("{ID}.jpg.{PARTIAL_SUFFIX}")).exists());
    }

    #[test]
    fn test_check_size_limit() {
        let (_dir, store) = open_store(4);
        assert!(store.check_size(4).is_ok());
        assert!(matches!(
            store.check_size(5).unwrap_err(),
            StoreError::FileTooLarge { size: 5, max: 4 }
        ));
    }

    #[test]
    fn test_concurrent_saves_same_id_keep_one_artifact() {
        let (_dir, store) = open_store(1024);
        let store = std::sync::Arc::new(store);

        for _ in 0..50 {
            let handles: Vec<_> = [".jpg", ".png"]
                .into_iter()
                .map(|ext| {
                    let store = store.clone();
                    std::thread::spawn(move || store.save(ID, b"frame", ext).unwrap())
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(fs::read_dir(store.root()).unwrap().count(), 1);
            assert!(store.fetch(ID).is_ok());
        }
    }

    #[test]
    fn test_concurrent_saves_distinct_ids() {
        let (_dir, store) = open_store(1024);
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.save_new(b"frame", ".jpg").unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.list().unwrap().len(), 8);
    }
}
