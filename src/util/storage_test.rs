use super::*;

// =============================================================================
// MemoryStore
// =============================================================================

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert_eq!(store.get("lang"), None);
    store.set("lang", "en").unwrap();
    assert_eq!(store.get("lang").as_deref(), Some("en"));
    store.set("lang", "vi").unwrap();
    assert_eq!(store.get("lang").as_deref(), Some("vi"));
    store.remove("lang").unwrap();
    assert_eq!(store.get("lang"), None);
}

#[test]
fn memory_store_remove_missing_key_is_ok() {
    let store = MemoryStore::new();
    assert!(store.remove("nope").is_ok());
}

// =============================================================================
// FileStore
// =============================================================================

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::in_dir(dir.path());
        store.set("id_token", "tok-1").unwrap();
        store.set("themeMode", "dark").unwrap();
    }
    let reopened = FileStore::in_dir(dir.path());
    assert_eq!(reopened.get("id_token").as_deref(), Some("tok-1"));
    assert_eq!(reopened.get("themeMode").as_deref(), Some("dark"));
}

#[test]
fn file_store_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = FileStore::in_dir(&nested);
    store.set("lang", "en").unwrap();
    assert!(nested.join(STATE_FILE_NAME).exists());
}

#[test]
fn file_store_remove_only_drops_that_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    store.set("id_token", "tok").unwrap();
    store.set("lang", "vi").unwrap();
    store.remove("id_token").unwrap();
    assert_eq!(store.get("id_token"), None);
    assert_eq!(store.get("lang").as_deref(), Some("vi"));
}

#[test]
fn file_store_corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(STATE_FILE_NAME), "{not json").unwrap();
    let store = FileStore::in_dir(dir.path());
    assert_eq!(store.get("id_token"), None);
    store.set("id_token", "fresh").unwrap();
    assert_eq!(store.get("id_token").as_deref(), Some("fresh"));
}

#[test]
fn file_store_missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    assert_eq!(store.get("anything"), None);
    assert_eq!(store.path(), dir.path().join(STATE_FILE_NAME));
}
