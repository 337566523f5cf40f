//! Tests for library scanning, cache reuse and cache failure handling

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::path::{Path, PathBuf};
    use truman::MosaicError;
    use truman::analysis::library::{LibraryEntries, LibraryIndex, is_photo};
    use truman::analysis::signature::{ColorSample, Signature};
    use truman::io::cache::{JsonFileStore, SignatureStore};

    fn write_photo(path: &Path, color: [u8; 3]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        RgbImage::from_pixel(16, 16, Rgb(color)).save(path).unwrap();
    }

    fn sample_library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_photo(&dir.path().join("red.jpg"), [255, 0, 0]);
        write_photo(&dir.path().join("green.JPG"), [0, 255, 0]);
        write_photo(&dir.path().join("nested/blue.jpeg"), [0, 0, 255]);
        dir
    }

    // Tests recursive discovery of photo extensions in any case
    // Verified by comparing extensions case-sensitively
    #[test]
    fn test_build_indexes_photos_recursively() {
        let dir = sample_library();
        write_photo(&dir.path().join("ignored.png"), [1, 2, 3]);
        fs::write(dir.path().join("notes.txt"), "not a photo").unwrap();

        let build = LibraryIndex::new(dir.path(), 1).build(None, None).unwrap();

        assert_eq!(build.entries.len(), 3);
        assert_eq!(build.report.extracted, 3);
        assert_eq!(build.report.cache_hits, 0);
        let names: Vec<String> = build
            .entries
            .iter()
            .filter_map(|(path, _)| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"blue.jpeg".to_string()));
        assert!(!names.contains(&"ignored.png".to_string()));
    }

    // Tests undecodable photos are skipped rather than failing the build
    // Verified by propagating the decode error
    #[test]
    fn test_corrupt_photo_is_skipped() {
        let dir = sample_library();
        fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let build = LibraryIndex::new(dir.path(), 1).build(None, None).unwrap();

        assert_eq!(build.entries.len(), 3);
        assert_eq!(build.report.skipped.len(), 1);
        assert!(build.report.skipped[0].path.ends_with("broken.jpg"));
        assert!(build.report.skipped[0].reason.starts_with("Failed to load image"));
        assert!(build.report.skipped[0].reason.contains("broken.jpg"));
    }

    // Tests photos smaller than the fidelity are skipped
    // Verified by clamping block size to one pixel
    #[test]
    fn test_photo_smaller_than_fidelity_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]))
            .save(dir.path().join("tiny.jpg"))
            .unwrap();

        let build = LibraryIndex::new(dir.path(), 4).build(None, None).unwrap();

        assert!(build.entries.is_empty());
        assert_eq!(build.report.skipped.len(), 1);
    }

    // Tests a second build with the same fidelity extracts nothing
    // Verified by ignoring the loaded cache section
    #[test]
    fn test_second_build_hits_cache() {
        let dir = sample_library();
        let store = JsonFileStore::for_library(dir.path());
        let index = LibraryIndex::new(dir.path(), 2);

        let first = index.build(Some(&store), None).unwrap();
        assert_eq!(first.report.extracted, 3);
        assert!(first.report.persist_error.is_none());
        assert!(store.location().exists());

        let second = index.build(Some(&store), None).unwrap();
        assert_eq!(second.report.cache_hits, 3);
        assert_eq!(second.report.extracted, 0);
        assert_eq!(second.entries, first.entries);
    }

    // Tests signatures from another fidelity are never reused
    // Verified by loading the first cache section regardless of key
    #[test]
    fn test_fidelity_change_misses_cache() {
        let dir = sample_library();
        let store = JsonFileStore::for_library(dir.path());

        LibraryIndex::new(dir.path(), 1)
            .build(Some(&store), None)
            .unwrap();
        let second = LibraryIndex::new(dir.path(), 2)
            .build(Some(&store), None)
            .unwrap();

        assert_eq!(second.report.cache_hits, 0);
        assert_eq!(second.report.extracted, 3);
        assert!(second.entries.iter().all(|(_, sig)| sig.len() == 4));

        let cache = store.load().unwrap().unwrap();
        let keys: Vec<&str> = cache.section_keys().collect();
        assert_eq!(keys, vec!["1", "2"]);
    }

    // Tests an unreadable cache falls back to full extraction and is rewritten
    // Verified by failing the build on cache load errors
    #[test]
    fn test_corrupt_cache_is_replaced() {
        let dir = sample_library();
        let store = JsonFileStore::for_library(dir.path());
        fs::write(store.location(), "{ not json").unwrap();

        let first = LibraryIndex::new(dir.path(), 1)
            .build(Some(&store), None)
            .unwrap();
        assert!(matches!(
            first.report.cache_load_error,
            Some(MosaicError::CacheLoad { .. })
        ));
        assert_eq!(first.report.extracted, 3);

        let second = LibraryIndex::new(dir.path(), 1)
            .build(Some(&store), None)
            .unwrap();
        assert!(second.report.cache_load_error.is_none());
        assert_eq!(second.report.cache_hits, 3);
    }

    // Tests persistence failures are reported without failing the build
    // Verified by propagating the save error
    #[test]
    fn test_persist_failure_is_reported() {
        let dir = sample_library();
        let store = JsonFileStore::new(dir.path().join("missing/dir/truman.json"));

        let build = LibraryIndex::new(dir.path(), 1)
            .build(Some(&store), None)
            .unwrap();

        assert_eq!(build.entries.len(), 3);
        assert!(matches!(
            build.report.persist_error,
            Some(MosaicError::CachePersist { .. })
        ));
    }

    // Tests cached entries for deleted photos are pruned
    // Verified by seeding entries from the whole cache section
    #[test]
    fn test_deleted_photos_are_pruned() {
        let dir = sample_library();
        let store = JsonFileStore::for_library(dir.path());
        let index = LibraryIndex::new(dir.path(), 1);

        index.build(Some(&store), None).unwrap();
        fs::remove_file(dir.path().join("red.jpg")).unwrap();
        let rebuilt = index.build(Some(&store), None).unwrap();

        assert_eq!(rebuilt.entries.len(), 2);
        assert_eq!(rebuilt.report.pruned, 1);
        assert_eq!(rebuilt.report.cache_hits, 2);
    }

    // Tests a missing library root is fatal
    // Verified by returning an empty library for missing roots
    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = LibraryIndex::new(dir.path().join("nope"), 1).build(None, None);

        assert!(matches!(result, Err(MosaicError::FileSystem { .. })));
    }

    // Tests entry sets reject duplicates and foreign fidelities
    // Verified by overwriting existing entries on insert
    #[test]
    fn test_entries_enforce_uniqueness_and_fidelity() {
        let mut entries = LibraryEntries::new(1);
        let signature = Signature::new(vec![ColorSample::new(1.0, 2.0, 3.0)]);

        entries
            .insert(PathBuf::from("a.jpg"), signature.clone())
            .unwrap();
        let duplicate = entries.insert(PathBuf::from("a.jpg"), signature.clone());
        assert!(matches!(duplicate, Err(MosaicError::DuplicateEntry { .. })));

        let wrong = Signature::new(vec![ColorSample::new(0.0, 0.0, 0.0); 4]);
        let mismatch = entries.insert(PathBuf::from("b.jpg"), wrong);
        assert!(matches!(mismatch, Err(MosaicError::InvalidParameter { .. })));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get(Path::new("a.jpg")), Some(&signature));
    }

    // Tests extension matching
    // Verified by accepting any extension containing "jp"
    #[test]
    fn test_is_photo() {
        assert!(is_photo(Path::new("a/b/c.jpg")));
        assert!(is_photo(Path::new("c.JPEG")));
        assert!(!is_photo(Path::new("c.png")));
        assert!(!is_photo(Path::new("jpg")));
        assert!(!is_photo(Path::new("c.jpg.txt")));
    }
}
