use super::*;

#[test]
fn put_then_get_round_trips_bytes() -> Result<()> {
    let (_temp, library) = new_library()?;
    let outcome = library.put("notes/today.txt", b"remember the milk")?;
    assert_eq!(
        outcome,
        PutOutcome::Inserted {
            hash: library.hash_of(b"remember the milk"),
            size: 17,
            deduplicated: false,
        }
    );
    assert_eq!(
        library.get("notes/today.txt")?.as_deref(),
        Some(&b"remember the milk"[..])
    );
    Ok(())
}

#[test]
fn shared_content_is_stored_once_and_reclaimed_with_last_name() -> Result<()> {
    let (_temp, library) = new_library()?;
    let first = library.put("a.txt", b"hello")?;
    let second = library.put("b.txt", b"hello")?;
    let hash = first.hash().to_string();

    assert_eq!(
        hash, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        "sha256 of 'hello'"
    );
    assert!(matches!(
        second,
        PutOutcome::Inserted {
            deduplicated: true,
            ..
        }
    ));
    assert_eq!(library.content().walk()?.len(), 1, "one blob for both names");
    assert_eq!(
        library.references(&hash)?,
        Some(vec!["a.txt".to_string(), "b.txt".to_string()])
    );

    let removal = library.delete("a.txt")?.expect("a.txt was present");
    assert_eq!(removal.remaining, 1);
    assert!(!removal.reclaimed, "b.txt still references the blob");
    assert_eq!(library.get("b.txt")?.as_deref(), Some(&b"hello"[..]));
    assert_eq!(library.references(&hash)?, Some(vec!["b.txt".to_string()]));

    let removal = library.delete("b.txt")?.expect("b.txt was present");
    assert_eq!(removal.remaining, 0);
    assert!(removal.reclaimed);
    assert!(!blob_path(&library, &hash)?.exists(), "blob erased");
    assert_eq!(library.references(&hash)?, None);
    Ok(())
}

#[test]
fn unknown_names_are_absent_not_errors() -> Result<()> {
    let (_temp, library) = new_library()?;
    assert_eq!(library.get("missing")?, None);
    assert_eq!(library.info("missing")?, None);
    assert_eq!(library.delete("missing")?, None);
    assert_eq!(library.references(&library.hash_of(b"never stored"))?, None);
    Ok(())
}

#[test]
fn delete_then_get_is_absent() -> Result<()> {
    let (_temp, library) = new_library()?;
    library.put("gone", b"soon")?;
    assert!(library.delete("gone")?.is_some());
    assert_eq!(library.get("gone")?, None);
    assert_eq!(library.delete("gone")?, None, "second delete finds nothing");
    Ok(())
}

#[test]
fn put_reads_file_sources() -> Result<()> {
    let (temp, library) = new_library()?;
    let source = temp.path().join("report.csv");
    fs::write(&source, "id,value\n1,2\n")?;

    let outcome = library.put("report.csv", source.as_path())?;
    assert_eq!(outcome.hash(), library.hash_of(b"id,value\n1,2\n"));
    let entry = library.info("report.csv")?.expect("entry exists");
    assert_eq!(entry.size, 13);
    assert_eq!(
        library.get("report.csv")?.as_deref(),
        Some(&b"id,value\n1,2\n"[..])
    );
    Ok(())
}

#[test]
fn missing_source_fails_without_side_effects() -> Result<()> {
    let (temp, library) = new_library()?;
    let err = library
        .put("ghost", temp.path().join("does-not-exist.bin"))
        .unwrap_err();
    assert!(matches!(
        library_error(&err),
        LibraryError::SourceNotFound { .. }
    ));
    assert_eq!(FailureKind::of(&err), FailureKind::SourceNotFound);
    assert_eq!(library.info("ghost")?, None);
    assert!(library.content().walk()?.is_empty());
    Ok(())
}

#[test]
fn get_records_access_time() -> Result<()> {
    let (_temp, library) = new_library()?;
    library.put("tracked", b"payload")?;
    let before = library.info("tracked")?.expect("entry");
    assert_eq!(before.accessed_at, None, "never read yet");

    library.get("tracked")?;
    let first = library.info("tracked")?.expect("entry").accessed_at;
    assert!(first.is_some());
    assert!(first >= Some(before.created_at));

    library.get("tracked")?;
    let second = library.info("tracked")?.expect("entry").accessed_at;
    assert!(second >= first, "access time never moves backwards");
    Ok(())
}

#[test]
fn blobs_land_in_three_level_shards() -> Result<()> {
    let (_temp, library) = new_library()?;
    let hash = library.put("sharded", b"hello")?.hash().to_string();
    let expected = library
        .root()
        .join("2")
        .join("c")
        .join("f")
        .join(format!("{hash}.dat"));
    assert_eq!(blob_path(&library, &hash)?, expected);
    assert!(expected.is_file());
    assert_eq!(fs::read(&expected)?, b"hello");
    Ok(())
}

#[test]
fn malformed_hashes_are_rejected() -> Result<()> {
    let (_temp, library) = new_library()?;
    for bad in ["", "ab", "ABCDEF", "../etc/passwd", "12g4"] {
        let err = library.content().path(bad).unwrap_err();
        assert_eq!(
            library_error(&err),
            &LibraryError::InvalidHash(bad.to_string())
        );
    }
    Ok(())
}

#[test]
fn empty_payloads_are_storable() -> Result<()> {
    let (_temp, library) = new_library()?;
    library.put("empty", Vec::<u8>::new())?;
    assert_eq!(library.get("empty")?, Some(Vec::new()));
    assert_eq!(library.info("empty")?.expect("entry").size, 0);
    Ok(())
}

#[test]
fn touch_bumps_mtime_and_ignores_unknown_blobs() -> Result<()> {
    let (_temp, library) = new_library()?;
    let hash = library.put("warm", b"recently used")?.hash().to_string();
    let path = blob_path(&library, &hash)?;
    backdate(&path)?;

    library.content().touch(&library.hash_of(b"never stored"));
    library.content().touch("not-a-hash");

    library.content().touch(&hash);
    let modified = file_modified_secs(&path).expect("blob mtime");
    assert!(modified > 0, "touch moved the mtime off the epoch");
    Ok(())
}

#[test]
fn directory_sources_are_rejected_as_missing() -> Result<()> {
    let (temp, library) = new_library()?;
    let dir = temp.path().join("a-dir");
    fs::create_dir(&dir)?;

    let err = library.put("dir", dir.as_path()).unwrap_err();
    assert!(matches!(
        library_error(&err),
        LibraryError::SourceNotFound { path } if *path == dir
    ));
    assert_eq!(library.info("dir")?, None);
    Ok(())
}
