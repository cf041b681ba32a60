//! Directory-backed storage backend.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::r#trait::{check_quota, PersistentStorage, StorageError};

/// File extension for items named after their key.
const ITEM_EXTENSION: &str = "entry";

/// File extension for items named after a digest of their key.
const KEYED_EXTENSION: &str = "keyed";

/// Longest key stored under its hex encoding. Hex doubles the length and
/// most filesystems cap a filename at 255 bytes; longer keys are stored
/// under a SHA-256 name with the key in a header.
const MAX_NAMED_KEY_BYTES: usize = 120;

/// Bytes of the key length prefix in a keyed item.
const KEY_HEADER_LEN: u64 = 4;

/// Storage keeping one file per key.
///
/// Short keys map to the hex encoding of the key, so any key (including
/// ones containing `/` or `:`) gets a safe, reversible name. Long keys get
/// `<sha256>.keyed` and the file starts with the key itself:
/// a big-endian `u32` length followed by the key bytes. Writes go to a
/// temporary file first and are renamed into place.
///
/// Usage counts key bytes plus value bytes, matching [`MemoryStorage`].
///
/// [`MemoryStorage`]: super::MemoryStorage
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<u64>,
    /// Bytes in use. The lock also serializes writers.
    used: Mutex<u64>,
}

/// Where an item lives on disk.
enum ItemPath {
    /// Filename encodes the key.
    Named(PathBuf),
    /// Filename is a digest; the key is in the file header.
    Keyed(PathBuf),
}

impl ItemPath {
    fn path(&self) -> &Path {
        match self {
            ItemPath::Named(path) | ItemPath::Keyed(path) => path,
        }
    }

    /// File bytes that are not counted as key or value.
    fn overhead(&self, key: &str) -> u64 {
        match self {
            ItemPath::Named(_) => 0,
            ItemPath::Keyed(_) => KEY_HEADER_LEN + key.len() as u64,
        }
    }
}

impl FileStorage {
    /// Open storage in `dir`, creating the directory if needed.
    ///
    /// Existing items are counted toward the quota.
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut used = 0u64;
        let mut items = 0usize;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = filename_to_key(&name) {
                used += key.len() as u64 + entry.metadata()?.len();
                items += 1;
            } else if is_keyed_filename(&name) {
                // the header holds the key, so the file length already counts it
                used += entry.metadata()?.len().saturating_sub(KEY_HEADER_LEN);
                items += 1;
            }
        }

        debug!(dir = %dir.display(), items, used, "Opened file storage");

        Ok(Self {
            dir,
            quota,
            used: Mutex::new(used),
        })
    }

    /// Directory holding the items.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> Result<ItemPath, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        if key.len() > MAX_NAMED_KEY_BYTES {
            return Ok(ItemPath::Keyed(self.dir.join(keyed_filename(key))));
        }
        Ok(ItemPath::Named(self.dir.join(key_to_filename(key))))
    }

    /// Usage of the item currently stored at `item`, if any.
    fn stored_usage(item: &ItemPath, key: &str) -> io::Result<Option<u64>> {
        Ok(file_len(item.path())?
            .map(|len| key.len() as u64 + len.saturating_sub(item.overhead(key))))
    }
}

/// Encode a key as a filename.
///
/// - `"navcache:users"` -> `"6e617663616368653a7573657273.entry"`
pub fn key_to_filename(key: &str) -> String {
    format!("{}.{}", hex::encode(key), ITEM_EXTENSION)
}

/// Decode a filename produced by [`key_to_filename`].
pub fn filename_to_key(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(ITEM_EXTENSION)?.strip_suffix('.')?;
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

/// Filename for a key too long to encode: the hex SHA-256 of the key.
fn keyed_filename(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{}.{}", hex::encode(digest), KEYED_EXTENSION)
}

fn is_keyed_filename(filename: &str) -> bool {
    filename
        .strip_suffix(KEYED_EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
        .is_some_and(|stem| stem.len() == 64 && stem.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn keyed_contents(key: &str, value: &[u8]) -> Result<Vec<u8>, StorageError> {
    let len = u32::try_from(key.len()).map_err(|_| StorageError::InvalidKey(key.to_string()))?;
    let mut contents = Vec::with_capacity(KEY_HEADER_LEN as usize + key.len() + value.len());
    contents.extend_from_slice(&len.to_be_bytes());
    contents.extend_from_slice(key.as_bytes());
    contents.extend_from_slice(value);
    Ok(contents)
}

/// Split a keyed item into its key and value. `None` when the header is
/// malformed.
fn split_keyed(data: &Bytes) -> Option<(&str, Bytes)> {
    let header: [u8; 4] = data.get(..KEY_HEADER_LEN as usize)?.try_into().ok()?;
    let key_end = KEY_HEADER_LEN as usize + u32::from_be_bytes(header) as usize;
    let key = std::str::from_utf8(data.get(KEY_HEADER_LEN as usize..key_end)?).ok()?;
    Some((key, data.slice(key_end..)))
}

/// Read only the key header of a keyed item.
fn read_keyed_key(path: &Path) -> io::Result<Option<String>> {
    let mut file = fs::File::open(path)?;
    let mut header = [0u8; 4];
    if file.read_exact(&mut header).is_err() {
        return Ok(None);
    }
    let len = u64::from(u32::from_be_bytes(header));
    if KEY_HEADER_LEN + len > file.metadata()?.len() {
        return Ok(None);
    }
    let mut key = vec![0u8; len as usize];
    if file.read_exact(&mut key).is_err() {
        return Ok(None);
    }
    Ok(String::from_utf8(key).ok())
}

fn file_len(path: &Path) -> io::Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl PersistentStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let item = self.item_path(key)?;
        let data = match fs::read(item.path()) {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match item {
            ItemPath::Named(_) => Ok(Some(data)),
            ItemPath::Keyed(path) => match split_keyed(&data) {
                Some((stored, value)) if stored == key => Ok(Some(value)),
                Some(_) => Ok(None),
                None => {
                    warn!(path = %path.display(), "Ignoring item with malformed key header");
                    Ok(None)
                }
            },
        }
    }

    fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let item = self.item_path(key)?;
        let contents = match item {
            ItemPath::Named(_) => None,
            ItemPath::Keyed(_) => Some(keyed_contents(key, value)?),
        };
        let mut used = self.used.lock();

        let replaced = Self::stored_usage(&item, key)?.unwrap_or(0);
        let required = (key.len() + value.len()) as u64;
        check_quota(self.quota, *used, replaced, required)?;

        let path = item.path();
        let tmp = path.with_extension("tmp");
        let written = fs::write(&tmp, contents.as_deref().unwrap_or(value))
            .and_then(|_| fs::rename(&tmp, path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e.into());
        }

        *used = used.saturating_sub(replaced) + required;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let item = self.item_path(key)?;
        let mut used = self.used.lock();

        let Some(usage) = Self::stored_usage(&item, key)? else {
            return Ok(());
        };
        match fs::remove_file(item.path()) {
            Ok(()) => {
                *used = used.saturating_sub(usage);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = filename_to_key(&name) {
                keys.push(key);
            } else if is_keyed_filename(&name) {
                match read_keyed_key(&entry.path()) {
                    Ok(Some(key)) => keys.push(key),
                    Ok(None) => warn!(file = %name, "Ignoring item with malformed key header"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(keys)
    }

    fn used_bytes(&self) -> u64 {
        *self.used.lock()
    }

    fn quota_bytes(&self) -> Option<u64> {
        self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filename_encoding() {
        let name = key_to_filename("navcache:users/1");
        assert!(name.ends_with(".entry"));
        assert!(!name.contains('/'));
        assert_eq!(filename_to_key(&name).as_deref(), Some("navcache:users/1"));
    }

    #[test]
    fn test_filename_to_key_rejects_foreign_files() {
        assert_eq!(filename_to_key("notes.txt"), None);
        assert_eq!(filename_to_key("zz.entry"), None);
        assert_eq!(filename_to_key("61.tmp"), None);
    }

    #[test]
    fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("store");

        let storage = FileStorage::open(&dir, None).unwrap();
        assert!(dir.is_dir());
        assert_eq!(storage.dir(), dir.as_path());
        assert_eq!(storage.used_bytes(), 0);
    }

    #[test]
    fn test_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path(), None).unwrap();

        storage.set_item("k", b"value").unwrap();
        assert_eq!(storage.get_item("k").unwrap().unwrap().as_ref(), b"value");
        assert_eq!(storage.used_bytes(), 6);

        storage.remove_item("k").unwrap();
        assert!(storage.get_item("k").unwrap().is_none());
        assert_eq!(storage.used_bytes(), 0);

        // absent key
        storage.remove_item("k").unwrap();
    }

    #[test]
    fn test_reopen_counts_existing_items() {
        let temp = TempDir::new().unwrap();
        {
            let storage = FileStorage::open(temp.path(), None).unwrap();
            storage.set_item("a", b"1234").unwrap();
            storage.set_item("b", b"56").unwrap();
        }

        let storage = FileStorage::open(temp.path(), None).unwrap();
        assert_eq!(storage.used_bytes(), 8);

        let mut keys = storage.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_quota() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path(), Some(10)).unwrap();

        storage.set_item("a", b"12345").unwrap();
        let err = storage.set_item("b", b"12345").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(storage.get_item("b").unwrap().is_none());

        // overwriting within quota is fine
        storage.set_item("a", b"123456789").unwrap();
        assert_eq!(storage.used_bytes(), 10);
    }

    #[test]
    fn test_invalid_keys() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path(), None).unwrap();

        assert!(matches!(
            storage.set_item("", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.get_item(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_long_key_uses_digest_filename() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path(), None).unwrap();
        let key = format!("navcache:{}", "q".repeat(240));

        storage.set_item(&key, b"value").unwrap();
        assert_eq!(storage.get_item(&key).unwrap().unwrap().as_ref(), b"value");
        assert_eq!(storage.used_bytes(), (key.len() + 5) as u64);

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].len() < 255);
        assert!(is_keyed_filename(&names[0]));
    }

    #[test]
    fn test_long_key_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let key = format!("navcache:users:list?{}", "filter=active&".repeat(16));
        assert!(key.len() >= 200);
        {
            let storage = FileStorage::open(temp.path(), None).unwrap();
            storage.set_item(&key, b"1234").unwrap();
            storage.set_item("short", b"56").unwrap();
        }

        let storage = FileStorage::open(temp.path(), None).unwrap();
        assert_eq!(storage.used_bytes(), (key.len() + 4 + 5 + 2) as u64);
        assert_eq!(storage.get_item(&key).unwrap().unwrap().as_ref(), b"1234");

        let mut keys = storage.keys().unwrap();
        keys.sort();
        let mut expected = vec![key.clone(), "short".to_string()];
        expected.sort();
        assert_eq!(keys, expected);

        storage.remove_item(&key).unwrap();
        assert!(storage.get_item(&key).unwrap().is_none());
        assert_eq!(storage.used_bytes(), 7);
    }

    #[test]
    fn test_long_key_quota_counts_key_and_value() {
        let temp = TempDir::new().unwrap();
        let key = "k".repeat(MAX_NAMED_KEY_BYTES + 1);
        let storage = FileStorage::open(temp.path(), Some(key.len() as u64 + 4)).unwrap();

        storage.set_item(&key, b"1234").unwrap();
        // overwrite with the same size fits exactly
        storage.set_item(&key, b"5678").unwrap();
        assert!(storage.set_item(&key, b"56789").unwrap_err().is_quota_exceeded());
        assert_eq!(storage.get_item(&key).unwrap().unwrap().as_ref(), b"5678");
    }

    #[test]
    fn test_keyed_filename_shape() {
        let name = keyed_filename("anything");
        assert!(is_keyed_filename(&name));
        assert!(!is_keyed_filename("abc.keyed"));
        assert!(filename_to_key(&name).is_none());
    }
}
