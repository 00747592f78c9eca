//! Merkle roots over transaction ids.

use crate::hash::{hash, hash_concat, Hash};

/// Root of an empty transaction list: the hash of the empty string.
pub fn empty_root() -> Hash {
    hash(b"")
}

/// Reduce one layer to the next by pairwise hashing.
///
/// An odd trailing element is paired with itself.
fn next_layer(layer: &[Hash]) -> Vec<Hash> {
    layer
        .chunks(2)
        .map(|chunk| {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left);
            hash_concat(&[left.as_ref(), right.as_ref()])
        })
        .collect()
}

/// Compute the merkle root of an ordered list of transaction ids.
///
/// An empty list yields `hash("")`, a single id is returned unchanged.
/// Parents hash the concatenated raw 32-byte children (left then right),
/// not their hex renderings.
pub fn merkle_root(ids: &[Hash]) -> Hash {
    match ids {
        [] => empty_root(),
        [only] => *only,
        _ => {
            let mut layer = next_layer(ids);
            while layer.len() > 1 {
                layer = next_layer(&layer);
            }
            layer[0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hashes(n: usize) -> Vec<Hash> {
        (0..n).map(|i| hash(&[i as u8])).collect()
    }

    #[test]
    fn test_merkle_root_empty() {
        assert_eq!(merkle_root(&[]), hash(b""));
    }

    #[test]
    fn test_merkle_root_single() {
        let hashes = make_hashes(1);
        assert_eq!(merkle_root(&hashes), hashes[0]);
    }

    #[test]
    fn test_merkle_root_two() {
        let hashes = make_hashes(2);
        let expected = hash_concat(&[hashes[0].as_ref(), hashes[1].as_ref()]);
        assert_eq!(merkle_root(&hashes), expected);
    }

    #[test]
    fn test_merkle_root_three_duplicates_last() {
        let h = make_hashes(3);
        let left = hash_concat(&[h[0].as_ref(), h[1].as_ref()]);
        let right = hash_concat(&[h[2].as_ref(), h[2].as_ref()]);
        let expected = hash_concat(&[left.as_ref(), right.as_ref()]);
        assert_eq!(merkle_root(&h), expected);
    }

    #[test]
    fn test_merkle_root_deterministic() {
        let hashes = make_hashes(10);
        assert_eq!(merkle_root(&hashes), merkle_root(&hashes));
    }

    #[test]
    fn test_merkle_root_order_matters() {
        let hashes = make_hashes(4);
        let mut reversed = hashes.clone();
        reversed.reverse();
        assert_ne!(merkle_root(&hashes), merkle_root(&reversed));
    }

    #[test]
    fn test_merkle_root_changes_with_any_leaf() {
        let hashes = make_hashes(7);
        let root = merkle_root(&hashes);
        for i in 0..hashes.len() {
            let mut changed = hashes.clone();
            changed[i] = hash(b"replacement");
            assert_ne!(merkle_root(&changed), root, "leaf {} not covered", i);
        }
    }
}
