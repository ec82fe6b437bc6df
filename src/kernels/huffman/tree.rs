//! Bottom-up Huffman tree construction and code-length extraction.
//!
//! Nodes live in a flat arena indexed by `usize`. Leaves are inserted in
//! ascending symbol order and internal nodes are appended as they are created,
//! so the arena index doubles as the insertion sequence number. The priority
//! queue is keyed on `(weight, index)`, which makes equal-weight merges pick the
//! earlier-inserted node first and the resulting tree fully deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::{CodeLengths, FrequencyTable};
use crate::error::BitframeError;

/// Longest code a canonical table can hold.
pub const MAX_CODE_LENGTH: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Leaf { symbol: u32, weight: u64 },
    Internal { left: usize, right: usize, weight: u64 },
}

impl Node {
    fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: usize,
}

impl HuffmanTree {
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Total weight of all leaves.
    pub fn weight(&self) -> u64 {
        self.nodes[self.root].weight()
    }
}

/// Merges the two lightest nodes until one root remains.
pub fn build_tree(freqs: &FrequencyTable) -> Result<HuffmanTree, BitframeError> {
    if freqs.is_empty() {
        return Err(BitframeError::FormatError(
            "cannot build a Huffman tree from an empty frequency table".to_string(),
        ));
    }

    let mut symbols: Vec<(u32, u64)> = freqs.iter().map(|(&s, &w)| (s, w)).collect();
    symbols.sort_unstable_by_key(|&(symbol, _)| symbol);

    let mut nodes = Vec::with_capacity(symbols.len() * 2 - 1);
    let mut heap = BinaryHeap::with_capacity(symbols.len());
    for (symbol, weight) in symbols {
        heap.push(Reverse((weight, nodes.len())));
        nodes.push(Node::Leaf { symbol, weight });
    }

    while heap.len() > 1 {
        let (Some(Reverse((left_weight, left))), Some(Reverse((right_weight, right)))) =
            (heap.pop(), heap.pop())
        else {
            break;
        };
        let weight = left_weight.saturating_add(right_weight);
        heap.push(Reverse((weight, nodes.len())));
        nodes.push(Node::Internal { left, right, weight });
    }

    let root = heap
        .pop()
        .map(|Reverse((_, index))| index)
        .ok_or_else(|| BitframeError::InternalError("Huffman heap drained".to_string()))?;
    Ok(HuffmanTree { nodes, root })
}

/// Depth of every leaf, capped at `MAX_CODE_LENGTH`. A tree with a single leaf
/// still yields a 1-bit code.
pub fn code_lengths(tree: &HuffmanTree) -> Result<CodeLengths, BitframeError> {
    let mut depths: Vec<(u32, u32)> = Vec::new();
    let mut stack = vec![(tree.root, 0u32)];
    while let Some((index, depth)) = stack.pop() {
        match tree.nodes.get(index) {
            Some(Node::Leaf { symbol, .. }) => depths.push((*symbol, depth.max(1))),
            Some(Node::Internal { left, right, .. }) => {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
            None => {
                return Err(BitframeError::InternalError(format!(
                    "Huffman node {} is outside the arena",
                    index
                )))
            }
        }
    }

    let deepest = depths.iter().map(|&(_, depth)| depth).max().unwrap_or(0);
    if deepest > MAX_CODE_LENGTH {
        log::debug!(
            "huffman: limiting {}-bit codes to {} bits",
            deepest,
            MAX_CODE_LENGTH
        );
        limit_lengths(&mut depths)?;
    }
    Ok(depths
        .into_iter()
        .map(|(symbol, depth)| (symbol, depth as u8))
        .collect())
}

/// Rebuilds `depths` so no code exceeds `MAX_CODE_LENGTH` while the Kraft sum
/// stays at most one. Symbols keep their relative order: a leaf that was
/// shallower never ends up with a longer code than a deeper one.
fn limit_lengths(depths: &mut [(u32, u32)]) -> Result<(), BitframeError> {
    let limit = MAX_CODE_LENGTH as usize;
    if depths.len() as u64 > 1u64 << MAX_CODE_LENGTH {
        return Err(BitframeError::RangeError(format!(
            "{} symbols cannot share {}-bit codes",
            depths.len(),
            MAX_CODE_LENGTH
        )));
    }

    // counts[len] = number of codes of that length.
    let mut counts = vec![0u64; limit + 1];
    for &(_, depth) in depths.iter() {
        counts[(depth as usize).min(limit)] += 1;
    }

    // Kraft sum scaled by 2^limit.
    let capacity = 1u64 << MAX_CODE_LENGTH;
    let mut kraft: u64 = (1..=limit).map(|len| counts[len] << (limit - len)).sum();
    while kraft > capacity {
        let Some(len) = (1..limit).rev().find(|&len| counts[len] > 0) else {
            return Err(BitframeError::InternalError(
                "code length limiting did not converge".to_string(),
            ));
        };
        // Moving one code a level deeper halves its share.
        counts[len] -= 1;
        counts[len + 1] += 1;
        kraft -= 1u64 << (limit - len - 1);
    }

    depths.sort_unstable_by_key(|&(symbol, depth)| (depth, symbol));
    let mut lengths = (1..=limit)
        .flat_map(|len| std::iter::repeat(len as u32).take(counts[len] as usize));
    for entry in depths.iter_mut() {
        entry.1 = lengths.next().ok_or_else(|| {
            BitframeError::InternalError("length counts do not cover every symbol".to_string())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(u32, u64)]) -> FrequencyTable {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_skewed_distribution() {
        let tree = build_tree(&table(&[(0, 10), (1, 1), (2, 1), (3, 2)])).unwrap();
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.weight(), 14);
        let lengths = code_lengths(&tree).unwrap();
        assert_eq!(lengths[&0], 1);
        assert_eq!(lengths[&3], 2);
        assert_eq!(lengths[&1], 3);
        assert_eq!(lengths[&2], 3);
    }

    #[test]
    fn test_single_leaf_gets_one_bit() {
        let tree = build_tree(&table(&[(7, 3)])).unwrap();
        let lengths = code_lengths(&tree).unwrap();
        assert_eq!(lengths.len(), 1);
        assert_eq!(lengths[&7], 1);
    }

    #[test]
    fn test_ties_are_deterministic() {
        let freqs = table(&[(4, 1), (1, 1), (3, 1), (2, 1), (0, 1)]);
        let first = code_lengths(&build_tree(&freqs).unwrap()).unwrap();

        // Same weights inserted in descending symbol order.
        let mut entries: Vec<(u32, u64)> = freqs.iter().map(|(&s, &w)| (s, w)).collect();
        entries.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        let mut reordered = FrequencyTable::new();
        for (symbol, weight) in entries {
            reordered.insert(symbol, weight);
        }
        assert_eq!(code_lengths(&build_tree(&reordered).unwrap()).unwrap(), first);

        // 0 and 1 merge first, then 2 and 3; 4 joins the (0,1) pair.
        assert_eq!(first[&4], 2);
        assert_eq!(first[&0], 3);
        assert_eq!(first[&1], 3);
        assert_eq!(first[&2], 2);
        assert_eq!(first[&3], 2);
    }

    /// Fibonacci weights build a maximally unbalanced tree, one level per symbol.
    fn fibonacci_table(symbols: u32) -> FrequencyTable {
        let (mut a, mut b) = (1u64, 1u64);
        let mut freqs = FrequencyTable::new();
        for symbol in 0..symbols {
            freqs.insert(symbol, a);
            (a, b) = (b, a + b);
        }
        freqs
    }

    #[test]
    fn test_deep_trees_are_length_limited() {
        let freqs = fibonacci_table(45);
        let lengths = code_lengths(&build_tree(&freqs).unwrap()).unwrap();
        assert_eq!(lengths.len(), 45);
        assert!(lengths.values().all(|&len| (1..=MAX_CODE_LENGTH as u8).contains(&len)));
        assert_eq!(lengths.values().copied().max(), Some(MAX_CODE_LENGTH as u8));

        let kraft: u64 = lengths
            .values()
            .map(|&len| 1u64 << (MAX_CODE_LENGTH - len as u32))
            .sum();
        assert!(kraft <= 1u64 << MAX_CODE_LENGTH);

        // Heavier symbols never get longer codes than lighter ones (0 and 1 tie).
        for symbol in 2..45 {
            assert!(lengths[&symbol] <= lengths[&(symbol - 1)]);
        }
    }

    #[test]
    fn test_shallow_trees_are_untouched() {
        let freqs = fibonacci_table(20);
        let lengths = code_lengths(&build_tree(&freqs).unwrap()).unwrap();
        assert_eq!(lengths[&0], 19);
        assert_eq!(lengths[&1], 19);
        assert_eq!(lengths[&19], 1);
    }

    #[test]
    fn test_empty_table_is_rejected() {
        assert!(matches!(
            build_tree(&FrequencyTable::new()),
            Err(BitframeError::FormatError(_))
        ));
    }
}
