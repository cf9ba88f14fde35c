//! The grouping engine: assigns each scanned image to a duplicate group.
//!
//! Records are inserted one at a time, in traversal order. An incoming record
//! is tested against existing group representatives in the order the groups
//! were created; the first representative that passes BOTH the fingerprint
//! gate and the histogram gate wins. First match, not best match: this is
//! documented behavior, and membership is only ever decided against a group's
//! original representative, never against later members.

use crate::config::ScanConfig;
use crate::error::ConfigError;
use crate::fingerprint::Fingerprint;
use crate::histogram::HueSatHistogram;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One successfully decoded image. Immutable; lives only for the duration of
/// a scan.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub histogram: HueSatHistogram,
}

/// A resolved duplicate group: two or more paths in discovery order. The
/// representative is the first member and never changes.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    members: Vec<PathBuf>,
}

impl Group {
    pub fn representative(&self) -> &Path {
        &self.members[0]
    }

    pub fn members(&self) -> &[PathBuf] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_paths(members: Vec<PathBuf>) -> Self {
        Self { members }
    }
}

struct Bucket {
    representative: ImageRecord,
    members: Vec<PathBuf>,
}

/// Working state for one scan. Owns the group list exclusively; create at
/// scan start, drain with [`ScanSession::finish`] at scan end.
pub struct ScanSession<'a> {
    config: &'a ScanConfig,
    buckets: Vec<Bucket>,
}

impl<'a> ScanSession<'a> {
    pub fn new(config: &'a ScanConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            buckets: Vec::new(),
        })
    }

    /// Assign a record to the first existing group whose representative is
    /// within the fingerprint threshold and at or above the histogram
    /// threshold; otherwise found a new singleton group.
    pub fn insert(&mut self, record: ImageRecord) {
        for bucket in &mut self.buckets {
            let rep = &bucket.representative;
            if record.fingerprint.distance(&rep.fingerprint) > self.config.similarity_threshold {
                continue;
            }
            if record.histogram.similarity(&rep.histogram) < self.config.hist_threshold {
                continue;
            }
            bucket.members.push(record.path);
            return;
        }
        self.buckets.push(Bucket {
            members: vec![record.path.clone()],
            representative: record,
        });
    }

    /// Total number of groups, singletons included.
    pub fn group_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drop singletons and return the duplicate groups in creation order.
    pub fn finish(self) -> Vec<Group> {
        self.buckets
            .into_iter()
            .filter(|b| b.members.len() > 1)
            .map(|b| Group { members: b.members })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fingerprint with the first `ones` bits set, so two such fingerprints
    /// built from overlapping prefixes have a known Hamming distance.
    fn fp_with_prefix_bits(ones: u32) -> Fingerprint {
        let mut bytes = [0u8; 8];
        for i in 0..ones {
            bytes[(i / 8) as usize] |= 1 << (i % 8);
        }
        Fingerprint::from_bytes(&bytes).unwrap()
    }

    fn record(name: &str, fingerprint: Fingerprint, histogram: HueSatHistogram) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from(name),
            fingerprint,
            histogram,
        }
    }

    fn flat_hist() -> HueSatHistogram {
        HueSatHistogram::from_raw(vec![0.25, 0.25, 0.25, 0.25])
    }

    fn config(similarity_threshold: u32, hist_threshold: f64) -> ScanConfig {
        ScanConfig {
            similarity_threshold,
            hist_threshold,
            ..Default::default()
        }
    }

    #[test]
    fn session_rejects_invalid_config() {
        let bad = config(99, 0.9);
        assert!(ScanSession::new(&bad).is_err());
    }

    #[test]
    fn identical_records_group_at_threshold_zero() {
        let cfg = config(0, 0.9);
        let mut session = ScanSession::new(&cfg).unwrap();
        session.insert(record("a.png", fp_with_prefix_bits(0), flat_hist()));
        session.insert(record("b.png", fp_with_prefix_bits(0), flat_hist()));

        let groups = session.finish();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members().len(), 2);
        assert_eq!(groups[0].representative(), Path::new("a.png"));
    }

    #[test]
    fn distance_above_threshold_never_groups() {
        // Histograms are identical (similarity 1.0); only the fingerprint
        // gate keeps these apart.
        let cfg = config(5, 0.9);
        let mut session = ScanSession::new(&cfg).unwrap();
        session.insert(record("a.png", fp_with_prefix_bits(0), flat_hist()));
        session.insert(record("b.png", fp_with_prefix_bits(8), flat_hist()));

        assert_eq!(session.group_count(), 2);
        assert!(session.finish().is_empty());
    }

    #[test]
    fn histogram_gate_applies_even_with_identical_fingerprints() {
        let cfg = config(0, 0.9);
        let mut session = ScanSession::new(&cfg).unwrap();
        let peaked = HueSatHistogram::from_raw(vec![1.0, 0.0, 0.0, 0.0]);
        let shifted = HueSatHistogram::from_raw(vec![0.0, 1.0, 0.0, 0.0]);
        session.insert(record("a.png", fp_with_prefix_bits(0), peaked));
        session.insert(record("b.png", fp_with_prefix_bits(0), shifted));

        assert!(session.finish().is_empty());
    }

    #[test]
    fn singletons_are_excluded_from_output() {
        let cfg = config(0, 0.9);
        let mut session = ScanSession::new(&cfg).unwrap();
        session.insert(record("only.png", fp_with_prefix_bits(0), flat_hist()));
        assert_eq!(session.group_count(), 1);
        assert!(session.finish().is_empty());
    }

    #[test]
    fn empty_session_yields_no_groups() {
        let cfg = config(5, 0.9);
        let session = ScanSession::new(&cfg).unwrap();
        assert!(session.finish().is_empty());
    }

    #[test]
    fn first_match_wins_over_later_better_match() {
        // Three records with identical fingerprints. The second joins the
        // first record's group. The third correlates well with the second
        // but poorly with the first; since membership is only tested against
        // representatives, it must end up in its own singleton group.
        let h1 = HueSatHistogram::from_raw(vec![1.0, 0.0, 0.0, 0.0]);
        let h2 = HueSatHistogram::from_raw(vec![0.55, 0.45, 0.0, 0.0]);
        let h3 = HueSatHistogram::from_raw(vec![0.3, 0.7, 0.0, 0.0]);
        assert!(h1.similarity(&h2) >= 0.6);
        assert!(h2.similarity(&h3) >= 0.6);
        assert!(h1.similarity(&h3) < 0.6);

        let cfg = config(0, 0.6);
        let mut session = ScanSession::new(&cfg).unwrap();
        session.insert(record("one.png", fp_with_prefix_bits(0), h1));
        session.insert(record("two.png", fp_with_prefix_bits(0), h2));
        session.insert(record("three.png", fp_with_prefix_bits(0), h3));

        assert_eq!(session.group_count(), 2);
        let groups = session.finish();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].members(),
            &[PathBuf::from("one.png"), PathBuf::from("two.png")]
        );
    }

    #[test]
    fn relaxing_the_threshold_never_shrinks_groups() {
        // Distances from the base record: 3 and 7 bits.
        let records = || {
            vec![
                record("base.png", fp_with_prefix_bits(0), flat_hist()),
                record("near.png", fp_with_prefix_bits(3), flat_hist()),
                record("far.png", fp_with_prefix_bits(7), flat_hist()),
            ]
        };

        let mut largest_so_far = 0;
        for threshold in 0..=10 {
            let cfg = config(threshold, 0.9);
            let mut session = ScanSession::new(&cfg).unwrap();
            for r in records() {
                session.insert(r);
            }
            let biggest = session
                .finish()
                .iter()
                .map(|g| g.len())
                .max()
                .unwrap_or(1);
            assert!(
                biggest >= largest_so_far,
                "group shrank when threshold rose to {threshold}"
            );
            largest_so_far = biggest;
        }
        assert_eq!(largest_so_far, 3);
    }

    #[test]
    fn groups_come_out_in_creation_order() {
        let cfg = config(0, 0.9);
        let mut session = ScanSession::new(&cfg).unwrap();
        session.insert(record("b1.png", fp_with_prefix_bits(20), flat_hist()));
        session.insert(record("a1.png", fp_with_prefix_bits(0), flat_hist()));
        session.insert(record("a2.png", fp_with_prefix_bits(0), flat_hist()));
        session.insert(record("b2.png", fp_with_prefix_bits(20), flat_hist()));

        let groups = session.finish();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].representative(), Path::new("b1.png"));
        assert_eq!(groups[1].representative(), Path::new("a1.png"));
    }
}
