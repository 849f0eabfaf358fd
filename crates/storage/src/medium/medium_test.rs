//! Contract tests shared by both media

use super::*;
use tempfile::TempDir;

fn exercise_contract(store: &dyn ByteStore) {
    assert_eq!(store.open_len("wk-0").unwrap(), None);

    store.append("wk-0", b"{\"batch\":[").unwrap();
    store.append("wk-0", b"1").unwrap();
    assert_eq!(store.open_len("wk-0").unwrap(), Some(11));

    // Open entries are never listed or readable
    assert!(store.list_finalized().unwrap().is_empty());
    assert_eq!(store.list_open().unwrap(), vec!["wk-0"]);
    assert_eq!(store.read_open("wk-0").unwrap().unwrap(), b"{\"batch\":[1".to_vec());
    assert!(!store.is_finalized("wk-0").unwrap());

    let id = store.finalize("wk-0", "wk-0").unwrap();
    assert_eq!(store.open_len("wk-0").unwrap(), None);
    assert!(store.read_open("wk-0").unwrap().is_none());
    assert!(store.list_open().unwrap().is_empty());
    assert!(store.is_finalized("wk-0").unwrap());
    assert_eq!(store.entry_name(&id).as_deref(), Some("wk-0"));
    assert_eq!(store.list_finalized().unwrap(), vec![id.clone()]);
    assert_eq!(store.read(&id).unwrap().unwrap(), b"{\"batch\":[1".to_vec());

    // A finalized entry is never replaced
    store.append("wk-1", b"2").unwrap();
    let err = store.finalize("wk-1", "wk-0").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    assert_eq!(store.read(&id).unwrap().unwrap(), b"{\"batch\":[1".to_vec());
    assert_eq!(store.open_len("wk-1").unwrap(), Some(1));

    // Finalizing under another name moves the entry
    let moved = store.finalize("wk-1", "wk-2").unwrap();
    assert_eq!(store.entry_name(&moved).as_deref(), Some("wk-2"));
    assert_eq!(store.read(&moved).unwrap().unwrap(), b"2".to_vec());
    assert_eq!(store.list_finalized().unwrap(), vec![id.clone(), moved.clone()]);
    assert!(store.remove(&moved).unwrap());

    assert!(store.remove(&id).unwrap());
    assert!(!store.remove(&id).unwrap());
    assert!(store.read(&id).unwrap().is_none());
}

#[test]
fn test_memory_contract() {
    exercise_contract(&MemoryByteStore::new());
}

#[test]
fn test_file_contract() {
    let dir = TempDir::new().unwrap();
    exercise_contract(&FileByteStore::new(dir.path().join("events")).unwrap());
}

#[test]
fn test_file_listing_orders_by_index() {
    let dir = TempDir::new().unwrap();
    let store = FileByteStore::new(dir.path()).unwrap();
    for idx in [10, 2, 1] {
        let name = format!("wk-{}", idx);
        store.append(&name, b"x").unwrap();
        store.finalize(&name, &name).unwrap();
    }

    let listed = store.list_finalized().unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed[0].ends_with("wk-1.json"));
    assert!(listed[1].ends_with("wk-2.json"));
    assert!(listed[2].ends_with("wk-10.json"));
}

#[test]
fn test_file_open_entry_uses_tmp_marker() {
    let dir = TempDir::new().unwrap();
    let store = FileByteStore::new(dir.path()).unwrap();
    store.append("wk-3", b"x").unwrap();
    assert!(dir.path().join("wk-3.tmp").exists());

    store.finalize("wk-3", "wk-3").unwrap();
    assert!(!dir.path().join("wk-3.tmp").exists());
    assert!(dir.path().join("wk-3.json").exists());
}

#[test]
fn test_memory_listing_in_finalize_order() {
    let store = MemoryByteStore::new();
    for name in ["wk-10", "wk-2"] {
        store.append(name, b"x").unwrap();
        store.finalize(name, name).unwrap();
    }
    assert_eq!(store.list_finalized().unwrap(), vec!["wk-10", "wk-2"]);
}

#[test]
fn test_memory_rejects_append_after_finalize() {
    let store = MemoryByteStore::new();
    store.append("wk-0", b"x").unwrap();
    store.finalize("wk-0", "wk-0").unwrap();
    assert!(store.append("wk-0", b"y").is_err());
    assert!(store.finalize("wk-0", "wk-0").is_err());
}

#[test]
fn test_batch_index() {
    assert_eq!(batch_index("wk-12"), Some(12));
    assert_eq!(batch_index("my-key-3"), Some(3));
    assert_eq!(batch_index("nodash"), None);
}
