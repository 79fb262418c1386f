use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use homedrive_core::config::StorageConfig;
use homedrive_core::storage::UploadRequest;
use homedrive_core::{ErrorKind, Services, StorageError};
use tempfile::TempDir;

// Helper to build all services over a fresh root
fn setup_services() -> (TempDir, Services) {
    let temp = TempDir::new().unwrap();
    let config = StorageConfig {
        min_free_space_bytes: 0,
        ..StorageConfig::with_root(temp.path().join("root"))
    };
    let services = Services::new(Arc::new(config)).unwrap();
    (temp, services)
}

// Helper to upload an in-memory file
fn upload(services: &Services, dest: &str, name: &str, bytes: &[u8]) -> String {
    let request = UploadRequest::new(dest, name).with_expected_size(bytes.len() as u64);
    services
        .store
        .save_upload(&mut Cursor::new(bytes.to_vec()), &request)
        .unwrap()
}

#[test]
fn test_create_upload_trash_restore() {
    let (_temp, services) = setup_services();

    assert_eq!(services.store.create_folder("", "Docs").unwrap(), "Docs");
    let bytes = vec![42u8; 10 * 1024];
    assert_eq!(upload(&services, "Docs", "report.pdf", &bytes), "Docs/report.pdf");

    let listing = services.store.list("Docs").unwrap();
    assert!(listing.folders.is_empty());
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].name, "report.pdf");
    assert_eq!(listing.files[0].size, 10_240);

    let trash_name = services.trash.move_to_trash("Docs/report.pdf").unwrap();
    assert!(services.store.list("Docs").unwrap().is_empty());

    let info = services.trash.info();
    assert_eq!(info.count, 1);
    assert_eq!(info.total_size, 10_240);
    assert_eq!(info.items[0].original_path, "Docs/report.pdf");

    assert_eq!(services.trash.restore(&trash_name).unwrap(), "Docs/report.pdf");
    let restored = fs::read(services.guard.root().join("Docs/report.pdf")).unwrap();
    assert_eq!(restored, bytes);
    assert_eq!(services.trash.info().count, 0);
}

#[test]
fn test_root_listing_hides_trash() {
    let (_temp, services) = setup_services();
    upload(&services, "", "a.txt", b"a");
    services.trash.move_to_trash("a.txt").unwrap();
    upload(&services, "", "b.txt", b"b");

    let listing = services.store.list("").unwrap();
    assert!(listing.folders.is_empty());
    let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["b.txt"]);
    assert!(services.store.list(".trash").is_err());
}

#[test]
fn test_traversal_is_rejected_everywhere() {
    let (temp, services) = setup_services();
    fs::write(temp.path().join("secret.txt"), b"outside").unwrap();

    for path in ["../secret.txt", "/etc/passwd", "a/../../secret.txt"] {
        assert!(matches!(
            services.store.list(path),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            services.trash.move_to_trash(path),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            services.store.open_file(path),
            Err(StorageError::InvalidPath(_))
        ));
    }

    let request = UploadRequest::new("..", "evil.txt");
    let err = services
        .store
        .save_upload(&mut Cursor::new(b"x".to_vec()), &request)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
    assert!(!temp.path().join("evil.txt").exists());
    assert_eq!(fs::read(temp.path().join("secret.txt")).unwrap(), b"outside");
}

#[test]
fn test_collisions_never_overwrite() {
    let (_temp, services) = setup_services();

    services.store.create_folder("", "Photos").unwrap();
    assert!(matches!(
        services.store.create_folder("", "Photos"),
        Err(StorageError::AlreadyExists(_))
    ));

    assert_eq!(upload(&services, "", "a.txt", b"one"), "a.txt");
    assert_eq!(upload(&services, "", "a.txt", b"two"), "a_1.txt");
    let root = services.guard.root();
    assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"one");
    assert_eq!(fs::read(root.join("a_1.txt")).unwrap(), b"two");

    let trash_name = services.trash.move_to_trash("a.txt").unwrap();
    upload(&services, "", "a.txt", b"three");
    assert_eq!(
        services.trash.restore(&trash_name).unwrap(),
        "a (restored 1).txt"
    );
    assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"three");
}

#[test]
fn test_duplicate_scan_then_confirmed_delete() {
    let (_temp, services) = setup_services();
    upload(&services, "", "one.bin", b"identical");
    upload(&services, "Backup", "copy.bin", b"identical");
    upload(&services, "", "other1.bin", b"different");
    upload(&services, "", "other2.bin", b"distinct!");

    let report = services.duplicates.scan().unwrap();
    assert_eq!(report.groups.len(), 1);
    let members: Vec<_> = report.groups[0]
        .members
        .iter()
        .map(|m| m.path.clone())
        .collect();
    assert_eq!(members, vec!["Backup/copy.bin".to_string(), "one.bin".to_string()]);

    // Scanning alone deletes nothing
    let root = services.guard.root();
    assert!(root.join("one.bin").exists());
    assert!(root.join("Backup/copy.bin").exists());

    let outcome = services.duplicates.delete_files(&["Backup/copy.bin".into()]);
    assert!(outcome.is_complete());
    assert!(!root.join("Backup/copy.bin").exists());
    assert!(root.join("one.bin").exists());

    let rescan = services.duplicates.scan().unwrap();
    assert!(rescan.groups.is_empty());
}

#[test]
fn test_empty_trash_and_storage_usage() {
    let (_temp, services) = setup_services();
    upload(&services, "", "keep.txt", b"12345");
    upload(&services, "", "drop.txt", b"123");

    let usage = services.store.storage_usage();
    assert_eq!(usage.file_count, 2);
    assert_eq!(usage.total_bytes, 8);

    let outcome = services.trash.trash_many(&["drop.txt".into()]);
    assert!(outcome.is_complete());

    let report = services.trash.empty().unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(services.trash.info().count, 0);
    assert!(services.guard.root().join("keep.txt").exists());
}

#[test]
fn test_sort_then_favorite_category() {
    let (_temp, services) = setup_services();
    upload(&services, "", "holiday.png", b"img");

    let outcome = services.sorter.sort_root().unwrap();
    assert_eq!(outcome.succeeded, vec!["holiday.png → Images/".to_string()]);

    assert!(services.favorites.toggle("Images").unwrap());
    let favorites = services.favorites.load();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].path, "Images");
}

#[test]
fn test_thumbnail_falls_back_to_default_size() {
    let (_temp, services) = setup_services();
    let picture = image::RgbImage::from_pixel(800, 400, image::Rgb([30, 90, 150]));
    picture.save(services.guard.root().join("wide.png")).unwrap();

    let bytes = services.store.thumbnail("wide.png", Some(100)).unwrap().unwrap();
    let thumb = image::load_from_memory(&bytes).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (100, 50));

    let bytes = services.store.thumbnail("wide.png", Some(5000)).unwrap().unwrap();
    let thumb = image::load_from_memory(&bytes).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (200, 100));

    upload(&services, "", "readme.txt", b"hi");
    let err = services.store.thumbnail("readme.txt", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAnImage);
}
