use std::fs;
use std::path::{Path, PathBuf};

use rust_blur_wallpaper::error::Error;
use rust_blur_wallpaper::scan::{ScanOptions, is_artwork, scan_library};
use rust_blur_wallpaper::tasks::files::ArtworkRotation;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"x").unwrap();
}

#[test]
fn scan_finds_artwork_sorted_and_skips_hidden_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("x.jpg"));
    touch(&root.join("sub/y.PNG"));
    touch(&root.join("a.webp"));
    touch(&root.join("notes.txt"));
    touch(&root.join(".git/z.jpg"));

    let found = scan_library(root, &ScanOptions::default()).unwrap();
    assert_eq!(
        found,
        vec![root.join("a.webp"), root.join("sub/y.PNG"), root.join("x.jpg")]
    );

    let flat = ScanOptions {
        recursive: false,
        ..ScanOptions::default()
    };
    let found = scan_library(root, &flat).unwrap();
    assert_eq!(found, vec![root.join("a.webp"), root.join("x.jpg")]);
}

#[test]
fn scan_reports_missing_and_empty_directories() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("readme.md"));
    assert!(matches!(
        scan_library(dir.path(), &ScanOptions::default()),
        Err(Error::EmptyScan)
    ));
    assert!(matches!(
        scan_library(&dir.path().join("missing"), &ScanOptions::default()),
        Err(Error::BadDir(_))
    ));
}

#[test]
fn artwork_extensions_ignore_case() {
    assert!(is_artwork(Path::new("a/b.JPEG")));
    assert!(is_artwork(Path::new("b.gif")));
    assert!(!is_artwork(Path::new("b.tiff")));
    assert!(!is_artwork(Path::new("jpg")));
}

#[test]
fn ordered_rotation_cycles_forever() {
    let items: Vec<PathBuf> = ["a.jpg", "b.jpg", "c.jpg"].into_iter().map(PathBuf::from).collect();
    let mut rotation = ArtworkRotation::from_vec(items.clone(), false).unwrap();
    let seen: Vec<_> = (0..7).map(|_| rotation.advance()).collect();
    let expected: Vec<_> = items.iter().cycle().take(7).cloned().collect();
    assert_eq!(seen, expected);
}

#[test]
fn shuffled_rotation_visits_everything_each_pass() {
    let items: Vec<PathBuf> = (0..8).map(|i| format!("{i}.jpg").into()).collect();
    let mut rotation = ArtworkRotation::from_vec(items.clone(), true).unwrap();
    let mut previous = None;
    for _ in 0..4 {
        let mut pass: Vec<_> = (0..items.len()).map(|_| rotation.advance()).collect();
        if let Some(prev) = previous.replace(pass[items.len() - 1].clone()) {
            assert_ne!(pass[0], prev, "repeat across a reshuffle");
        }
        pass.sort();
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(pass, sorted);
    }
}

#[test]
fn empty_rotation_is_rejected() {
    assert!(matches!(
        ArtworkRotation::from_vec(Vec::new(), true),
        Err(Error::EmptyScan)
    ));
}
