//! Integration tests for catalog scanning over in-memory and on-disk volumes.
//!
//! The in-memory volume lists entries in insertion order, like FAT lists them
//! in creation order. The on-disk volume (tempfile) lists them sorted by name.

use std::fs;

use library::{CatalogError, CatalogIndex, Scanner};
use platform::config::PlayerConfig;
use platform::mocks::MemStorage;
use platform::storage_local::LocalFileStorage;
use tempfile::TempDir;

#[test]
fn test_scanner_rejects_non_audio() {
    assert!(!Scanner::is_supported_extension("jpg"));
    assert!(!Scanner::is_supported_extension("m3u"));
    assert!(!Scanner::is_supported_extension("lst"));
    assert!(!Scanner::is_supported_extension(""));
}

#[test]
fn test_three_file_catalog_in_memory() {
    let fs = MemStorage::new();
    fs.add_file("/a.mp3", b"x");
    fs.add_file("/b.mp3", b"x");
    fs.add_file("/c/d.mp3", b"x");
    let mut catalog = CatalogIndex::new(fs, &PlayerConfig::DEFAULT);

    assert_eq!(catalog.scan().unwrap(), 3);
    assert_eq!(catalog.get_name(0).unwrap().as_str(), "a");
    assert_eq!(catalog.get_name(2).unwrap().as_str(), "d");
    assert_eq!(catalog.get_path(2).unwrap().as_str(), "/c/d.mp3");
    assert!(catalog.get_name(3).is_none());
}

#[test]
fn test_three_file_catalog_on_disk() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.mp3"), b"x").unwrap();
    fs::write(tmp.path().join("b.mp3"), b"x").unwrap();
    fs::create_dir(tmp.path().join("c")).unwrap();
    fs::write(tmp.path().join("c").join("d.mp3"), b"x").unwrap();
    fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

    let storage = LocalFileStorage::new(tmp.path().to_str().unwrap());
    let mut catalog = CatalogIndex::new(storage, &PlayerConfig::DEFAULT);
    assert_eq!(catalog.scan().unwrap(), 3);
    assert_eq!(catalog.get_name(0).unwrap().as_str(), "a");
    assert_eq!(catalog.get_name(2).unwrap().as_str(), "d");

    let index = fs::read_to_string(tmp.path().join(".playlist").join("00000.lst")).unwrap();
    assert_eq!(index, "/a.mp3\n/b.mp3\n/c/d.mp3\n");
}

#[test]
fn test_reload_from_disk_matches_scan() {
    let tmp = TempDir::new().unwrap();
    for i in 0..25 {
        fs::write(tmp.path().join(format!("song{i:02}.MP3")), b"x").unwrap();
    }
    let root = tmp.path().to_str().unwrap();

    let mut first = CatalogIndex::new(LocalFileStorage::new(root), &PlayerConfig::DEFAULT);
    assert_eq!(first.scan().unwrap(), 25);

    // Remove the audio: a second scan would find nothing, so 25 proves load()
    // read the existing segments.
    for i in 0..25 {
        fs::remove_file(tmp.path().join(format!("song{i:02}.MP3"))).unwrap();
    }
    let mut second = CatalogIndex::new(LocalFileStorage::new(root), &PlayerConfig::DEFAULT);
    assert_eq!(second.load().unwrap(), 25);
    assert_eq!(second.get_name(24).unwrap().as_str(), "song24");
}

#[test]
fn test_crlf_segments_are_readable() {
    let fs = MemStorage::new();
    fs.add_dir("/.playlist");
    fs.add_file("/.playlist/00000.lst", b"/x/one.mp3\r\n/x/two.mp3\r\n");
    let mut catalog = CatalogIndex::new(fs, &PlayerConfig::DEFAULT);
    assert_eq!(catalog.load().unwrap(), 2);
    assert_eq!(catalog.get_path(1).unwrap().as_str(), "/x/two.mp3");
}

#[test]
fn test_failed_scan_reports_empty_catalog() {
    let tmp = TempDir::new().unwrap();
    let cfg = PlayerConfig::DEFAULT.with_music_root("/Music");
    let storage = LocalFileStorage::new(tmp.path().to_str().unwrap());
    let mut catalog = CatalogIndex::new(storage, &cfg);
    assert_eq!(catalog.scan(), Err(CatalogError::RootNotDirectory));
    assert_eq!(catalog.track_count(), 0);
    assert!(catalog.get_path(0).is_none());
}
