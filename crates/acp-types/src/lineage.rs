//! Lineage root computation.
//!
//! A capsule's lineage is the ordered chain of ancestor content hashes.
//! The registry stores only its root, so anyone holding the chain can
//! recompute the root and compare it with the anchored record.
//!
//! Leaves and interior nodes are domain-separated so a leaf can never be
//! confused with an interior node. An odd trailing node is paired with
//! itself.

use sha2::{Digest, Sha256};

use crate::{Hash32, MerkleRoot};

const LEAF_TAG: &[u8] = b"acp:lineage:leaf:v1:";
const NODE_TAG: &[u8] = b"acp:lineage:node:v1:";

/// Compute the lineage root over an ordered ancestor chain.
///
/// An empty chain yields [`Hash32::ZERO`], the "no lineage yet" value.
#[must_use]
pub fn lineage_root(chain: &[Hash32]) -> MerkleRoot {
    if chain.is_empty() {
        return Hash32::ZERO;
    }

    let mut level: Vec<Hash32> = chain.iter().map(hash_leaf).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                hash_node(left, pair.get(1).unwrap_or(left))
            })
            .collect();
    }
    level[0]
}

fn hash_leaf(leaf: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(LEAF_TAG);
    hasher.update(leaf.as_bytes());
    finish(hasher)
}

fn hash_node(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(NODE_TAG);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    finish(hasher)
}

fn finish(hasher: Sha256) -> Hash32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Vec<Hash32> {
        (0..n).map(|i| Hash32::of_str(&format!("v{i}"))).collect()
    }

    #[test]
    fn empty_chain_is_zero() {
        assert!(lineage_root(&[]).is_zero());
    }

    #[test]
    fn single_leaf_is_tagged() {
        let leaf = Hash32::of_str("v0");
        let root = lineage_root(&[leaf]);
        assert_ne!(root, leaf, "leaf must be domain-separated");
        assert!(!root.is_zero());
    }

    #[test]
    fn deterministic() {
        assert_eq!(lineage_root(&chain(5)), lineage_root(&chain(5)));
    }

    #[test]
    fn order_matters() {
        let mut reversed = chain(4);
        reversed.reverse();
        assert_ne!(lineage_root(&chain(4)), lineage_root(&reversed));
    }

    #[test]
    fn extending_chain_changes_root() {
        assert_ne!(lineage_root(&chain(3)), lineage_root(&chain(4)));
    }
}
