//! commitment tree
//!
//! fixed-depth append-only merkle tree over MiMC. every layer is kept, so
//! inserts touch one node per level and inclusion paths are lookups. empty
//! positions are filled with precomputed zero subtrees rooted in the
//! "tornado" zero element.

use crate::error::{Result, TonnelError};
use crate::field::FieldElement;
use crate::mimc;
use crate::TREE_DEPTH;
use once_cell::sync::Lazy;
use tracing::debug;

/// deepest tree `with_depth` accepts
pub const MAX_DEPTH: usize = 30;

static ZERO: Lazy<FieldElement> = Lazy::new(|| mimc::keccak_to_field(b"tornado"));

/// filler for empty leaves
pub fn zero_element() -> FieldElement {
    *ZERO
}

/// roots of empty subtrees, `zeros[0]` is the zero element
fn zero_subtrees(depth: usize) -> Vec<FieldElement> {
    let mut zeros = Vec::with_capacity(depth + 1);
    let mut current = zero_element();
    zeros.push(current);
    for _ in 0..depth {
        current = mimc::hash2(&current, &current);
        zeros.push(current);
    }
    zeros
}

/// inclusion witness, leaf to root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// leaf position
    pub index: usize,
    /// sibling at each level
    pub elements: Vec<FieldElement>,
    /// 0 when the running node is the left child, 1 when right
    pub indices: Vec<u8>,
}

impl MerklePath {
    /// hash `leaf` up the path
    pub fn compute_root(&self, leaf: &FieldElement) -> FieldElement {
        self.elements
            .iter()
            .zip(&self.indices)
            .fold(*leaf, |node, (sibling, bit)| {
                if *bit == 0 {
                    mimc::hash2(&node, sibling)
                } else {
                    mimc::hash2(sibling, &node)
                }
            })
    }
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    depth: usize,
    zeros: Vec<FieldElement>,
    /// `layers[0]` are the leaves, `layers[depth]` holds the root once non-empty
    layers: Vec<Vec<FieldElement>>,
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MerkleTree {
    /// empty depth-20 tree
    pub fn new() -> Self {
        Self::empty(TREE_DEPTH)
    }

    /// empty tree of `depth` levels, 1 to `MAX_DEPTH`
    pub fn with_depth(depth: usize) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TonnelError::InvalidData(format!(
                "tree depth {} outside 1..={}",
                depth, MAX_DEPTH
            )));
        }
        Ok(Self::empty(depth))
    }

    fn empty(depth: usize) -> Self {
        Self {
            depth,
            zeros: zero_subtrees(depth),
            layers: vec![Vec::new(); depth + 1],
        }
    }

    /// depth-20 tree over `leaves` in order
    pub fn build(leaves: &[FieldElement]) -> Result<Self> {
        Self::build_with_depth(TREE_DEPTH, leaves)
    }

    pub fn build_with_depth(depth: usize, leaves: &[FieldElement]) -> Result<Self> {
        let mut tree = Self::with_depth(depth)?;
        if leaves.len() > tree.capacity() {
            return Err(TonnelError::TreeFull(tree.capacity()));
        }

        tree.layers[0] = leaves.to_vec();
        for level in 1..=depth {
            let below = &tree.layers[level - 1];
            let zero = tree.zeros[level - 1];
            let layer: Vec<FieldElement> = below
                .chunks(2)
                .map(|pair| mimc::hash2(&pair[0], pair.get(1).unwrap_or(&zero)))
                .collect();
            tree.layers[level] = layer;
        }
        debug!("built tree over {} leaves", leaves.len());
        Ok(tree)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        1usize << self.depth
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.layers[0]
    }

    pub fn root(&self) -> FieldElement {
        self.layers[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    /// append a leaf, returns the new root
    pub fn insert(&mut self, leaf: FieldElement) -> Result<FieldElement> {
        if self.len() >= self.capacity() {
            return Err(TonnelError::TreeFull(self.capacity()));
        }

        let mut index = self.len();
        self.layers[0].push(leaf);
        for level in 1..=self.depth {
            index >>= 1;
            let below = &self.layers[level - 1];
            let left = below[2 * index];
            let right = below.get(2 * index + 1).copied().unwrap_or(self.zeros[level - 1]);
            let node = mimc::hash2(&left, &right);

            let layer = &mut self.layers[level];
            if index < layer.len() {
                layer[index] = node;
            } else {
                layer.push(node);
            }
        }
        Ok(self.root())
    }

    /// first position holding `leaf`
    pub fn index_of(&self, leaf: &FieldElement) -> Option<usize> {
        self.layers[0].iter().position(|l| l == leaf)
    }

    /// inclusion witness for the leaf at `index`
    pub fn path(&self, index: usize) -> Result<MerklePath> {
        if index >= self.len() {
            return Err(TonnelError::InvalidData(format!(
                "leaf index {} out of range ({} leaves)",
                index,
                self.len()
            )));
        }

        let mut elements = Vec::with_capacity(self.depth);
        let mut indices = Vec::with_capacity(self.depth);
        let mut position = index;
        for level in 0..self.depth {
            let sibling = self.layers[level]
                .get(position ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            elements.push(sibling);
            indices.push((position & 1) as u8);
            position >>= 1;
        }
        Ok(MerklePath {
            index,
            elements,
            indices,
        })
    }

    /// inclusion witness for the first occurrence of `leaf`
    pub fn proof(&self, leaf: &FieldElement) -> Result<MerklePath> {
        let index = self.index_of(leaf).ok_or(TonnelError::CommitmentNotFound)?;
        self.path(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZERO_ELEMENT;

    fn leaves(n: u64) -> Vec<FieldElement> {
        (1..=n).map(FieldElement::from_u64).collect()
    }

    #[test]
    fn test_zero_element_constant() {
        assert_eq!(zero_element().to_string(), ZERO_ELEMENT);
    }

    #[test]
    fn test_empty_root() {
        let tree = MerkleTree::with_depth(3).unwrap();
        let z = zero_element();
        let z1 = mimc::hash2(&z, &z);
        let z2 = mimc::hash2(&z1, &z1);
        let z3 = mimc::hash2(&z2, &z2);
        assert_eq!(tree.root(), z3);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_small_tree_by_hand() {
        let [a, b, c] = [1u64, 2, 3].map(FieldElement::from_u64);
        let tree = MerkleTree::build_with_depth(2, &[a, b, c]).unwrap();
        let z = zero_element();
        let expected = mimc::hash2(&mimc::hash2(&a, &b), &mimc::hash2(&c, &z));
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_insert_matches_build() {
        let all = leaves(9);
        let mut tree = MerkleTree::with_depth(5).unwrap();
        for (i, leaf) in all.iter().enumerate() {
            let root = tree.insert(*leaf).unwrap();
            let built = MerkleTree::build_with_depth(5, &all[..=i]).unwrap();
            assert_eq!(root, built.root());
        }
    }

    #[test]
    fn test_paths_recombine() {
        let tree = MerkleTree::build_with_depth(4, &leaves(11)).unwrap();
        for (i, leaf) in tree.leaves().iter().enumerate() {
            let path = tree.path(i).unwrap();
            assert_eq!(path.elements.len(), 4);
            assert_eq!(path.compute_root(leaf), tree.root());
        }
        assert!(tree.path(11).is_err());
    }

    #[test]
    fn test_single_leaf_path_is_zero_subtrees() {
        let leaf = FieldElement::from_u64(42);
        let tree = MerkleTree::build(&[leaf]).unwrap();
        let path = tree.proof(&leaf).unwrap();
        assert_eq!(path.elements.len(), TREE_DEPTH);
        assert!(path.indices.iter().all(|b| *b == 0));
        assert_eq!(path.elements[0], zero_element());
        assert_eq!(path.elements, zero_subtrees(TREE_DEPTH)[..TREE_DEPTH].to_vec());
        assert_eq!(path.compute_root(&leaf), tree.root());
    }

    #[test]
    fn test_tree_full() {
        let mut tree = MerkleTree::build_with_depth(2, &leaves(4)).unwrap();
        assert!(matches!(tree.insert(FieldElement::from_u64(5)), Err(TonnelError::TreeFull(4))));
        assert!(MerkleTree::build_with_depth(2, &leaves(5)).is_err());
    }

    #[test]
    fn test_depth_bounds() {
        assert!(MerkleTree::with_depth(0).is_err());
        assert!(MerkleTree::with_depth(MAX_DEPTH + 1).is_err());
        assert!(MerkleTree::with_depth(usize::BITS as usize).is_err());
        assert!(MerkleTree::build_with_depth(usize::MAX, &[]).is_err());

        let deepest = MerkleTree::with_depth(MAX_DEPTH).unwrap();
        assert_eq!(deepest.capacity(), 1usize << MAX_DEPTH);
    }

    #[test]
    fn test_proof_unknown_leaf() {
        let tree = MerkleTree::build_with_depth(3, &leaves(3)).unwrap();
        assert!(matches!(
            tree.proof(&FieldElement::from_u64(99)),
            Err(TonnelError::CommitmentNotFound)
        ));
        assert_eq!(tree.index_of(&FieldElement::from_u64(2)), Some(1));
    }
}
