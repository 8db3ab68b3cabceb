use super::*;

#[test]
fn repeated_put_is_idempotent() -> Result<()> {
    let (_temp, library) = new_library()?;
    let first = library.put("same", b"content")?;
    let second = library.put("same", b"content")?;
    assert_eq!(
        second,
        PutOutcome::Unchanged {
            hash: first.hash().to_string()
        }
    );
    let stats = library.stats()?;
    assert_eq!(stats.names, 1);
    assert_eq!(stats.blobs, 1);
    assert_eq!(library.content().walk()?.len(), 1);
    Ok(())
}

#[test]
fn rebinding_a_name_keeps_the_first_write() -> Result<()> {
    let (_temp, library) = new_library()?;
    let original = library.put("config.toml", b"version = 1")?;
    let offered = library.hash_of(b"version = 2");

    let outcome = library.put("config.toml", b"version = 2")?;
    assert_eq!(
        outcome,
        PutOutcome::KeptExisting {
            existing: original.hash().to_string(),
            offered: offered.clone(),
        }
    );
    assert_eq!(
        library.get("config.toml")?.as_deref(),
        Some(&b"version = 1"[..])
    );
    assert!(
        !library.content().exists(&offered)?,
        "ignored content must not leave an orphan blob"
    );
    Ok(())
}

#[test]
fn reject_policy_surfaces_conflicts() -> Result<()> {
    let (_temp, library) =
        new_library_with(|config| config.with_conflict_policy(ConflictPolicy::Reject))?;
    library.put("config.toml", b"version = 1")?;
    let err = library.put("config.toml", b"version = 2").unwrap_err();
    assert!(matches!(
        library_error(&err),
        LibraryError::PutConflict { name, .. } if name == "config.toml"
    ));
    assert_eq!(crate::core::tooling::diagnostics::code_for(&err), "DL803");
    assert_eq!(FailureKind::of(&err), FailureKind::Conflict);

    // Same content is not a conflict.
    assert!(matches!(
        library.put("config.toml", b"version = 1")?,
        PutOutcome::Unchanged { .. }
    ));
    Ok(())
}

#[test]
fn unchanged_put_restores_a_missing_blob() -> Result<()> {
    let (_temp, library) = new_library()?;
    let hash = library.put("fragile", b"bytes")?.hash().to_string();
    fs::remove_file(blob_path(&library, &hash)?)?;

    assert!(matches!(
        library.put("fragile", b"bytes")?,
        PutOutcome::Unchanged { .. }
    ));
    assert_eq!(library.get("fragile")?.as_deref(), Some(&b"bytes"[..]));
    Ok(())
}

#[test]
fn stats_separate_logical_and_physical_bytes() -> Result<()> {
    let (_temp, library) = new_library()?;
    library.put("one", b"0123456789")?;
    library.put("two", b"0123456789")?;
    library.put("three", b"abc")?;
    assert_eq!(
        library.stats()?,
        LibraryStats {
            names: 3,
            blobs: 2,
            logical_bytes: 23,
            physical_bytes: 13,
        }
    );
    Ok(())
}

#[test]
fn dedup_holds_across_reopen() -> Result<()> {
    let (temp, library) = new_library()?;
    library.put("before", b"durable")?;
    library.close()?;

    let reopened = DataLibrary::at(temp.path().join("library"))?;
    let outcome = reopened.put("after", b"durable")?;
    assert!(matches!(
        outcome,
        PutOutcome::Inserted {
            deduplicated: true,
            ..
        }
    ));
    assert_eq!(reopened.get("before")?.as_deref(), Some(&b"durable"[..]));
    Ok(())
}
