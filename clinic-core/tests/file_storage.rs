use std::sync::Arc;

use clinic_core::{ClientStorage, FileStorage, MemoryStorage, StorageArea, StorageKey, StorageKind};

fn temp_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("clinic-storage-{}", uuid::Uuid::new_v4()))
        .join("long-term.json")
}

#[test]
fn values_survive_reopen() {
    let path = temp_path();
    {
        let storage = FileStorage::open(&path).unwrap();
        storage.set("token", "abc").unwrap();
        storage.set("isAdmin", "true").unwrap();
        storage.remove("isAdmin").unwrap();
    }

    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
    assert_eq!(reopened.get("isAdmin").unwrap(), None);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn unreadable_file_is_an_error() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"[1, 2").unwrap();

    assert!(FileStorage::open(&path).is_err());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_backed_long_term_area_wins_over_memory() {
    let path = temp_path();
    let storage = ClientStorage::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(FileStorage::open(&path).unwrap()),
    );

    storage
        .write(StorageKind::ShortTerm, StorageKey::Department, "\"ortho\"")
        .unwrap();
    storage
        .write(StorageKind::LongTerm, StorageKey::Department, "\"spine\"")
        .unwrap();

    let department: Option<String> = storage.read_json(StorageKey::Department).unwrap();
    assert_eq!(department.as_deref(), Some("spine"));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
