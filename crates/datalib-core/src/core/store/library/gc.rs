use super::*;

impl DataLibrary {
    /// Reclaim blobs that no name references and that have not been written
    /// or read within `grace`.
    ///
    /// `delete` already erases a blob together with its last name, so this
    /// only finds leftovers from crashes between blob write and index commit.
    /// Each candidate is re-counted under the index write lock before removal,
    /// which keeps a concurrent `put` of the same content from losing its blob.
    pub fn sweep_orphans(&self, grace: Duration) -> Result<GcSummary> {
        let _timing = TimingGuard::new("library_gc");
        let cutoff = timestamp_secs().saturating_sub(grace.as_secs());
        let live = self.index().distinct_hashes()?;
        let mut summary = GcSummary::default();

        for blob in self.content().walk()? {
            summary.scanned += 1;
            if live.contains(&blob.hash) {
                continue;
            }
            let modified = file_modified_secs(&blob.path).unwrap_or(0);
            if modified > cutoff {
                debug!(hash = %blob.hash, "orphan within grace window; keeping");
                continue;
            }
            if self.delete_if_unreferenced(&blob.hash)? {
                summary.reclaimed += 1;
                summary.reclaimed_bytes = summary.reclaimed_bytes.saturating_add(blob.len);
            }
        }

        debug!(
            scanned = summary.scanned,
            reclaimed = summary.reclaimed,
            reclaimed_bytes = summary.reclaimed_bytes,
            "library gc sweep complete"
        );
        Ok(summary)
    }

    pub(super) fn delete_if_unreferenced(&self, hash: &str) -> Result<bool> {
        self.index().with_immediate_tx(|tx| {
            if self.index().count_by_hash_with_conn(tx, hash)? > 0 {
                return Ok(false);
            }
            self.content().delete(hash)
        })
    }
}
