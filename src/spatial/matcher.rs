//! Nearest-neighbor matching of signatures with exclusive claims
//!
//! Library signatures live in a k-d tree with one point per distinct feature
//! vector. Photos sharing a vector (copies, solid frames) hang off the same
//! point and are handed out one at a time; the point leaves the tree once its
//! last photo is claimed. Search, claim and removal happen under one lock, so
//! concurrent callers never receive the same photo and never observe a
//! half-removed entry.

use crate::analysis::library::LibraryEntries;
use crate::analysis::signature::{Signature, dimensions};
use crate::io::error::{MosaicError, Result, computation_error, invalid_parameter};
use bitvec::vec::BitVec;
use kdtree::KdTree;
use kdtree::distance::squared_euclidean;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

type SignatureTree = KdTree<f64, usize, Vec<f64>>;

/// What to do once every library photo has been claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReusePolicy {
    /// Fail with [`MosaicError::LibraryExhausted`]
    #[default]
    Never,
    /// Fall back to the closest photo of the full library, allowing repeats
    WhenExhausted,
}

/// A photo assigned to one caller
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Path identifier of the photo
    pub path: PathBuf,
    /// Euclidean distance between the query and the photo's signature
    pub distance: f64,
    /// Whether the photo had already been claimed by someone else
    pub reused: bool,
}

// Photos with bit-identical feature vectors, in path order
struct VectorGroup {
    vector: Vec<f64>,
    members: Vec<usize>,
}

struct ClaimState {
    tree: SignatureTree,
    // Next unclaimed member of each group
    cursors: Vec<usize>,
    claimed: BitVec,
    requests: usize,
}

/// Shared index handing out each library photo at most once
pub struct NearestMatcher {
    fidelity: u32,
    paths: Vec<PathBuf>,
    groups: Vec<VectorGroup>,
    state: Mutex<ClaimState>,
    // Untouched copy of the library, present only when reuse is allowed
    reserve: Option<SignatureTree>,
}

// -0.0 and 0.0 compare equal in the tree, so they must share a key
fn vector_key(vector: &[f64]) -> Vec<u64> {
    vector.iter().map(|value| (value + 0.0).to_bits()).collect()
}

impl NearestMatcher {
    /// Index every entry of a library
    ///
    /// Entries are grouped by feature vector and inserted in path order.
    ///
    /// # Errors
    ///
    /// Returns an error if a signature does not match the library fidelity or
    /// cannot be inserted into the tree
    pub fn new(entries: LibraryEntries, policy: ReusePolicy) -> Result<Self> {
        let fidelity = entries.fidelity();
        let dims = dimensions(fidelity);
        let capacity = entries.len();

        let mut paths = Vec::with_capacity(capacity);
        let mut groups: Vec<VectorGroup> = Vec::new();
        let mut group_of: HashMap<Vec<u64>, usize> = HashMap::new();

        for (index, (path, signature)) in entries.into_inner().into_iter().enumerate() {
            let vector = signature.to_vector();
            if vector.len() != dims {
                return Err(invalid_parameter(
                    "signature",
                    &path.display(),
                    &format!("expected {dims} values, found {}", vector.len()),
                ));
            }

            match group_of.entry(vector_key(&vector)) {
                Entry::Occupied(slot) => {
                    if let Some(group) = groups.get_mut(*slot.get()) {
                        group.members.push(index);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(VectorGroup {
                        vector,
                        members: vec![index],
                    });
                }
            }
            paths.push(path);
        }

        let mut tree = SignatureTree::new(dims);
        let mut reserve = (policy == ReusePolicy::WhenExhausted).then(|| SignatureTree::new(dims));
        for (group_index, group) in groups.iter().enumerate() {
            tree.add(group.vector.clone(), group_index)
                .map_err(|e| computation_error("index insert", &format!("{e:?}")))?;
            if let Some(reserve) = reserve.as_mut() {
                reserve
                    .add(group.vector.clone(), group_index)
                    .map_err(|e| computation_error("index insert", &format!("{e:?}")))?;
            }
        }

        Ok(Self {
            fidelity,
            paths,
            state: Mutex::new(ClaimState {
                tree,
                cursors: vec![0; groups.len()],
                claimed: BitVec::repeat(false, capacity),
                requests: 0,
            }),
            groups,
            reserve,
        })
    }

    /// Fidelity of the indexed signatures
    pub const fn fidelity(&self) -> u32 {
        self.fidelity
    }

    /// Feature vector length accepted by queries
    pub const fn dimensions(&self) -> usize {
        dimensions(self.fidelity)
    }

    /// Number of photos the matcher was built with
    pub fn capacity(&self) -> usize {
        self.paths.len()
    }

    /// Whether exhausted claims fall back to reuse
    pub const fn allows_reuse(&self) -> bool {
        self.reserve.is_some()
    }

    /// Number of photos not yet claimed
    ///
    /// # Errors
    ///
    /// Returns an error if another claim panicked while holding the lock
    pub fn remaining(&self) -> Result<usize> {
        Ok(self.lock()?.claimed.count_zeros())
    }

    /// Claim the photo closest to a signature
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Self::claim_nearest`]
    pub fn claim_signature(&self, signature: &Signature) -> Result<Claim> {
        self.claim_nearest(&signature.to_vector())
    }

    /// Find the unclaimed photo closest to `query` and take it out of the index
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `query` has the wrong length or non-finite values
    /// - Every photo has been claimed and reuse is not allowed
    /// - Another claim panicked while holding the lock
    pub fn claim_nearest(&self, query: &[f64]) -> Result<Claim> {
        let dims = self.dimensions();
        if query.len() != dims {
            return Err(invalid_parameter(
                "query",
                &query.len(),
                &format!("expected {dims} values"),
            ));
        }

        let (claimed, requests) = {
            let mut guard = self.lock()?;
            let state = &mut *guard;
            state.requests += 1;

            let nearest = state
                .tree
                .nearest(query, 1, &squared_euclidean)
                .map_err(|e| computation_error("nearest search", &format!("{e:?}")))?
                .first()
                .map(|&(distance, &group_index)| (distance, group_index));

            let claimed = match nearest {
                Some((squared, group_index)) => {
                    Some((squared, self.take_member(state, group_index)?))
                }
                None => None,
            };
            (claimed, state.requests)
        };

        if let Some((squared, index)) = claimed {
            return Ok(Claim {
                path: self.path(index)?.to_path_buf(),
                distance: squared.sqrt(),
                reused: false,
            });
        }

        let Some(reserve) = &self.reserve else {
            return Err(MosaicError::LibraryExhausted {
                available: self.capacity(),
                required: requests,
            });
        };

        let fallback = reserve
            .nearest(query, 1, &squared_euclidean)
            .map_err(|e| computation_error("nearest search", &format!("{e:?}")))?
            .first()
            .map(|&(distance, &group_index)| (distance, group_index));

        match fallback {
            Some((squared, group_index)) => {
                let index = self
                    .group(group_index)?
                    .members
                    .first()
                    .copied()
                    .ok_or_else(|| computation_error("claim", &"empty signature group"))?;
                Ok(Claim {
                    path: self.path(index)?.to_path_buf(),
                    distance: squared.sqrt(),
                    reused: true,
                })
            }
            None => Err(MosaicError::LibraryExhausted {
                available: 0,
                required: requests,
            }),
        }
    }

    // Hand out the next member of a group, dropping its point once drained
    fn take_member(&self, state: &mut ClaimState, group_index: usize) -> Result<usize> {
        let group = self.group(group_index)?;
        let cursor = state
            .cursors
            .get_mut(group_index)
            .ok_or_else(|| computation_error("claim", &format!("unknown group {group_index}")))?;
        let index = group.members.get(*cursor).copied().ok_or_else(|| {
            computation_error("claim", &format!("group {group_index} is already drained"))
        })?;
        *cursor += 1;

        if *cursor == group.members.len() {
            let removed = state
                .tree
                .remove(&group.vector, &group_index)
                .map_err(|e| computation_error("index remove", &format!("{e:?}")))?;
            if removed != 1 {
                return Err(computation_error(
                    "index remove",
                    &format!("removed {removed} points for group {group_index}"),
                ));
            }
        }

        let previously_claimed = match state.claimed.get_mut(index) {
            Some(mut bit) => std::mem::replace(&mut *bit, true),
            None => true,
        };
        if previously_claimed {
            return Err(computation_error(
                "claim",
                &format!("entry {index} was already claimed"),
            ));
        }
        Ok(index)
    }

    fn group(&self, group_index: usize) -> Result<&VectorGroup> {
        self.groups
            .get(group_index)
            .ok_or_else(|| computation_error("claim", &format!("unknown group {group_index}")))
    }

    fn path(&self, index: usize) -> Result<&Path> {
        self.paths
            .get(index)
            .map(PathBuf::as_path)
            .ok_or_else(|| computation_error("claim", &format!("unknown entry {index}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ClaimState>> {
        self.state
            .lock()
            .map_err(|e| computation_error("matcher lock", &e))
    }
}
