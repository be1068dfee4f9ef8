//! Groups file records into duplications.

use std::collections::BTreeMap;

use filedb::FileRecord;
use fingerprint::Fingerprint;
use getset::Getters;
use serde::{Serialize, Serializer};

/// A group of two or more paths sharing one content fingerprint.
///
/// Paths appear in the order their records were appended during traversal.
/// Serialized form:
/// `{"properties": {"size": N, "hashes": {"md5": "...", "sha1": "..."}}, "paths": [...]}`.
#[derive(Clone, PartialEq, Debug, Getters)]
pub struct Duplication {
    /// The fingerprint shared by every path in the group.
    #[getset(get = "pub")]
    fingerprint: Fingerprint,

    paths: Vec<String>,
}

impl Duplication {
    /// The paths sharing the fingerprint.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl Serialize for Duplication {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Hashes<'a> {
            md5: &'a fingerprint::Md5Digest,
            sha1: &'a fingerprint::Sha1Digest,
        }

        #[derive(Serialize)]
        struct Properties<'a> {
            size: u64,
            hashes: Hashes<'a>,
        }

        #[derive(Serialize)]
        struct Repr<'a> {
            properties: Properties<'a>,
            paths: &'a [String],
        }

        Repr {
            properties: Properties {
                size: *self.fingerprint.size(),
                hashes: Hashes {
                    md5: self.fingerprint.md5(),
                    sha1: self.fingerprint.sha1(),
                },
            },
            paths: &self.paths,
        }
        .serialize(serializer)
    }
}

/// Group records by fingerprint and emit every group with at least two
/// paths, ordered by `(size, md5, sha1)` ascending.
pub fn group(records: &[FileRecord]) -> Vec<Duplication> {
    let mut by_print: BTreeMap<Fingerprint, Vec<String>> = BTreeMap::new();
    for record in records {
        by_print
            .entry(record.fingerprint().clone())
            .or_default()
            .push(record.path().clone());
    }

    by_print
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        .map(|(fingerprint, paths)| Duplication { fingerprint, paths })
        .collect()
}

/// The three disjoint size bands of a split report.
#[derive(Debug, Default)]
pub struct Bands {
    /// Groups whose size is at or under the small threshold.
    pub small: Vec<Duplication>,

    /// Groups in neither split band.
    pub middle: Vec<Duplication>,

    /// Groups whose size is at or over the large threshold.
    pub large: Vec<Duplication>,
}

/// Partition sorted duplications into size bands.
///
/// A band is only split off when its threshold is provided; with neither
/// threshold, everything lands in the middle. When the thresholds overlap,
/// the small band wins, keeping the partitions disjoint.
pub fn partition(
    duplications: Vec<Duplication>,
    small: Option<u64>,
    large: Option<u64>,
) -> Bands {
    let mut bands = Bands::default();
    for duplication in duplications {
        let size = *duplication.fingerprint().size();
        if small.map_or(false, |max| size <= max) {
            bands.small.push(duplication);
        } else if large.map_or(false, |min| size >= min) {
            bands.large.push(duplication);
        } else {
            bands.middle.push(duplication);
        }
    }
    bands
}
