//! Tests for the local media areas.

use craftpost::storage::MediaStore;
use tempfile::tempdir;

#[test]
fn test_received_uploads_land_in_received_area() {
    let root = tempdir().unwrap();
    let store = MediaStore::new(root.path());

    let path = store.save_received(b"jpeg bytes", "jpg").unwrap();
    assert!(path.exists());
    assert!(path.starts_with(root.path().join("received")));
    assert_eq!(path.extension().unwrap(), "jpg");
    assert_eq!(std::fs::read(&path).unwrap(), b"jpeg bytes");
}

#[test]
fn test_generated_images_land_in_generated_area() {
    let root = tempdir().unwrap();
    let store = MediaStore::new(root.path());

    let (file_name, path) = store.save_generated(b"png bytes", "png").unwrap();
    assert!(path.exists());
    assert!(path.starts_with(root.path().join("generated")));
    assert_eq!(path.file_name().unwrap().to_string_lossy(), file_name);
}

#[test]
fn test_paths_never_collide() {
    let root = tempdir().unwrap();
    let store = MediaStore::new(root.path());

    let mut paths = std::collections::HashSet::new();
    for _ in 0..20 {
        let (_, path) = store.save_generated(b"bytes", "png").unwrap();
        assert!(paths.insert(path), "duplicate media path generated");
    }
}
