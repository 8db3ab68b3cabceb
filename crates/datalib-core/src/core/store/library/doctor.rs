use rand::seq::IteratorRandom;
use rand::thread_rng;

use super::*;

impl DataLibrary {
    /// Cross-check the index against the content store without changing either.
    pub fn verify(&self) -> Result<VerifyReport> {
        let _timing = TimingGuard::new("library_verify");
        let entries = self.index().entries(None)?;
        let blobs = self.content().walk()?;
        let on_disk: HashSet<&str> = blobs.iter().map(|blob| blob.hash.as_str()).collect();
        let live: HashSet<&str> = entries.iter().map(|entry| entry.hash.as_str()).collect();

        let mut report = VerifyReport {
            names_checked: entries.len(),
            blobs_checked: blobs.len(),
            partials: self.content().count_partials()?,
            ..VerifyReport::default()
        };
        for entry in &entries {
            if !on_disk.contains(entry.hash.as_str()) {
                report.dangling.push(DanglingEntry {
                    name: entry.name.clone(),
                    hash: entry.hash.clone(),
                });
            }
        }
        for blob in &blobs {
            if !live.contains(blob.hash.as_str()) {
                report.orphans.push(blob.hash.clone());
            } else if self.blob_is_corrupt(&blob.hash)? {
                report.corrupt.push(blob.hash.clone());
            }
        }
        if !report.is_clean() {
            warn!(
                dangling = report.dangling.len(),
                orphans = report.orphans.len(),
                corrupt = report.corrupt.len(),
                partials = report.partials,
                "library verification found problems"
            );
        }
        Ok(report)
    }

    /// Re-hash a random sample of referenced blobs. Returns a description of
    /// every sampled blob that is missing or no longer matches its hash.
    pub fn verify_sample(&self, sample: usize) -> Result<Vec<String>> {
        let live = self.index().distinct_hashes()?;
        let mut rng = thread_rng();
        let picked = live
            .iter()
            .choose_multiple(&mut rng, sample.min(live.len()));

        let mut failures = Vec::new();
        for hash in picked {
            match self.content().read(hash)? {
                None => failures.push(format!("{hash}: blob missing")),
                Some(bytes) => {
                    if let Err(err) = self.verify_digest(hash, &bytes) {
                        failures.push(format!("{hash}: {err}"));
                    }
                }
            }
        }
        Ok(failures)
    }

    /// Best-effort repair: drop temp leftovers and orphan blobs, remove
    /// corrupt blobs, and prune names whose content cannot be produced.
    ///
    /// Pruned names are gone for good; the store has no other copy of their
    /// content. Callers that want to inspect first should run [`Self::verify`].
    pub fn doctor(&self) -> Result<DoctorSummary> {
        let _timing = TimingGuard::new("library_doctor");
        let mut summary = DoctorSummary {
            partials_removed: self.content().sweep_partials()?,
            ..DoctorSummary::default()
        };

        let mut checked = HashSet::new();
        for entry in self.index().entries(None)? {
            if !checked.insert(entry.hash.clone()) {
                continue;
            }
            if !self.content().exists(&entry.hash)? {
                let pruned = self.prune_if_still_missing(&entry.hash)?;
                summary.names_pruned.extend(pruned);
            } else if self.blob_is_corrupt(&entry.hash)? {
                let pruned = self.purge_hash(&entry.hash)?;
                summary.corrupt_removed += 1;
                summary.names_pruned.extend(pruned);
            }
        }

        let orphans = self.sweep_orphans(Duration::ZERO)?;
        summary.orphans_removed = orphans.reclaimed;
        summary.orphan_bytes = orphans.reclaimed_bytes;

        debug!(
            partials_removed = summary.partials_removed,
            orphans_removed = summary.orphans_removed,
            corrupt_removed = summary.corrupt_removed,
            names_pruned = summary.names_pruned.len(),
            "library doctor complete"
        );
        Ok(summary)
    }

    fn blob_is_corrupt(&self, hash: &str) -> Result<bool> {
        Ok(match self.content().read(hash)? {
            Some(bytes) => self.verify_digest(hash, &bytes).is_err(),
            None => false,
        })
    }

    /// Drop rows for `hash` if its blob is still absent once the write lock is
    /// held. A concurrent `put` may have restored it in the meantime.
    fn prune_if_still_missing(&self, hash: &str) -> Result<Vec<String>> {
        self.index().with_immediate_tx(|tx| {
            if self.content().exists(hash)? {
                return Ok(Vec::new());
            }
            let names = self.index().delete_by_hash_with_conn(tx, hash)?;
            for name in &names {
                warn!(%name, %hash, "pruned name whose blob is missing");
            }
            Ok(names)
        })
    }

    fn purge_hash(&self, hash: &str) -> Result<Vec<String>> {
        self.index().with_immediate_tx(|tx| {
            let names = self.index().delete_by_hash_with_conn(tx, hash)?;
            self.content().delete(hash)?;
            for name in &names {
                warn!(%name, %hash, "pruned name whose blob is corrupt");
            }
            Ok(names)
        })
    }
}
