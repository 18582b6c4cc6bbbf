//! The decode trie.
//!
//! The trie is a flat array of [`TrieNode`]s. Decoding a word starts at node
//! 0 and, while the current node is not a leaf, moves to child
//! `node.index + ((word >> node.shift) & node.mask)`. The children of a node
//! are stored contiguously. A leaf (mask 0) holds either the opcode id of the
//! instruction to try, or [`NO_MATCH`]; the runtime decoder still compares
//! the word against that instruction's mask and match.
//!
//! Only non-compressed instructions are placed in the trie.

use crate::error::Error;
use crate::listing::{InstId, Listing, Opcodes};
use std::collections::VecDeque;

/// The leaf index meaning no instruction decodes the word.
pub const NO_MATCH: u16 = 0xffff;

/// The root inspects the major opcode field, bits 0 to 6.
pub const ROOT_MASK: u8 = 0x7f;

/// See [`ROOT_MASK`].
pub const ROOT_SHIFT: u8 = 0;

/// A node's mask is a byte, so no step inspects more bits than this.
pub const MAX_STEP_BITS: u32 = 8;

/// One decision step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrieNode {
    /// The contiguous run of bits this node inspects, shifted down to bit 0.
    /// Zero for leaves.
    pub mask: u8,
    /// The position of the lowest inspected bit.
    pub shift: u8,
    /// The first child for inner nodes; the opcode id or [`NO_MATCH`] for
    /// leaves.
    pub index: u16,
}

impl TrieNode {
    const NO_MATCH: TrieNode = TrieNode {
        mask: 0,
        shift: 0,
        index: NO_MATCH,
    };

    /// Whether this node ends the walk.
    pub fn is_leaf(&self) -> bool {
        self.mask == 0
    }

    /// The inspected bits in place.
    fn field(&self) -> u32 {
        u32::from(self.mask) << self.shift
    }

    fn child(&self, word: u32) -> usize {
        usize::from(self.index) + ((word >> self.shift) & u32::from(self.mask)) as usize
    }
}

/// A finished decode trie.
#[derive(Clone, Debug)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    /// For each node, the instruction its leaf refers to.
    resolved: Vec<Option<InstId>>,
}

impl Trie {
    /// Build the trie for the non-compressed instructions of `listing`.
    ///
    /// `op_offset` is the id of the listing's first opcode; leaves hold
    /// `op_offset` plus the opcode index of their instruction. The result is
    /// checked by decoding the match value of every instruction.
    pub fn build(listing: &Listing, op_offset: usize, verbose: bool) -> Result<Trie, Error> {
        let members: Vec<InstId> = listing
            .iter()
            .filter(|(_, inst)| !inst.is_compressed())
            .map(|(id, _)| id)
            .collect();
        log::debug!("building decode trie for {} instructions", members.len());

        let mut builder = Builder {
            listing,
            opcodes: listing.opcodes(),
            op_offset,
            verbose,
            nodes: vec![TrieNode::NO_MATCH],
            resolved: vec![None],
            pending: VecDeque::new(),
        };
        let root = TrieNode {
            mask: ROOT_MASK,
            shift: ROOT_SHIFT,
            index: 0,
        };
        builder.split(0, root, Bucket { members, decided: 0 })?;
        while let Some((at, bucket)) = builder.pending.pop_front() {
            builder.resolve(at, bucket)?;
        }

        let trie = Trie {
            nodes: builder.nodes,
            resolved: builder.resolved,
        };
        trie.verify(listing)?;
        log::debug!("decode trie has {} nodes", trie.nodes.len());
        Ok(trie)
    }

    /// The nodes, root first.
    pub fn nodes(&self) -> &[TrieNode] {
        &self.nodes
    }

    /// The instruction referenced by the leaf at position `node`, if any.
    pub fn leaf_instruction(&self, node: usize) -> Option<InstId> {
        self.resolved.get(node).copied().flatten()
    }

    /// Walk the trie for `word` and return the position of the leaf reached.
    fn walk(&self, word: u32) -> Option<usize> {
        let mut at = 0;
        loop {
            let node = self.nodes.get(at)?;
            if node.is_leaf() {
                return Some(at);
            }
            at = node.child(word);
        }
    }

    /// The index stored in the leaf `word` reaches: an opcode id or
    /// [`NO_MATCH`].
    pub fn lookup(&self, word: u32) -> u16 {
        self.walk(word).map_or(NO_MATCH, |at| self.nodes[at].index)
    }

    /// Decode `word` the way the runtime does: walk to a leaf, then check the
    /// word against the instruction found there.
    pub fn decode(&self, listing: &Listing, word: u32) -> Option<InstId> {
        let id = self.leaf_instruction(self.walk(word)?)?;
        listing[id].matches(word).then_some(id)
    }

    fn verify(&self, listing: &Listing) -> Result<(), Error> {
        for (id, inst) in listing.iter().filter(|(_, inst)| !inst.is_compressed()) {
            let found = self.decode(listing, inst.value);
            let ok = found.is_some_and(|found| {
                found == id || listing[found].fixed_bits() >= inst.fixed_bits()
            });
            if !ok {
                let found = match found {
                    Some(found) => format!("`{}`", listing[found].name),
                    None => "no instruction".to_string(),
                };
                return Err(Error::Trie(format!(
                    "`{}` (match {:#010x}) decodes to {found}",
                    inst.name, inst.value
                )));
            }
        }
        Ok(())
    }
}

/// The candidate instructions of a node under construction.
struct Bucket {
    members: Vec<InstId>,
    /// Bits inspected on the path from the root. Every member agrees with
    /// the path on those of these bits it fixes.
    decided: u32,
}

struct Builder<'a> {
    listing: &'a Listing,
    opcodes: Opcodes,
    op_offset: usize,
    verbose: bool,
    nodes: Vec<TrieNode>,
    resolved: Vec<Option<InstId>>,
    /// Nodes whose contents are not yet known, in index order.
    pending: VecDeque<(usize, Bucket)>,
}

impl Builder<'_> {
    fn resolve(&mut self, at: usize, bucket: Bucket) -> Result<(), Error> {
        match bucket.members.len() {
            0 => Ok(()),
            1 => self.leaf(at, bucket.members[0]),
            _ => match self.discriminator(&bucket) {
                Some(node) => self.split(at, node, bucket),
                None => {
                    let id = self.most_specific(&bucket.members);
                    self.leaf(at, id)
                }
            },
        }
    }

    fn leaf(&mut self, at: usize, id: InstId) -> Result<(), Error> {
        let index = self.op_offset + self.opcodes.index_of(id);
        let index = u16::try_from(index)
            .ok()
            .filter(|&index| index != NO_MATCH)
            .ok_or_else(|| {
                Error::Trie(format!(
                    "opcode id {index} of `{}` does not fit a trie leaf",
                    self.listing[id].name
                ))
            })?;
        self.nodes[at] = TrieNode {
            mask: 0,
            shift: 0,
            index,
        };
        self.resolved[at] = Some(id);
        Ok(())
    }

    /// Pick the bits the next step should inspect.
    ///
    /// Prefer bits every member fixes but not every member agrees on. When
    /// there are none, the bucket holds aliases and the bits fixed by the
    /// largest number of members (but not all) are used instead. Bits
    /// already inspected are never picked again.
    fn discriminator(&self, bucket: &Bucket) -> Option<TrieNode> {
        let first = &self.listing[bucket.members[0]];
        let mut anded = u32::MAX;
        let mut union = 0;
        let mut differ = 0;
        for &id in &bucket.members {
            let inst = &self.listing[id];
            anded &= inst.mask;
            union |= inst.mask;
            differ |= first.value ^ inst.value;
        }
        let undecided = !bucket.decided;
        let mut bits = anded & differ & undecided;
        if bits == 0 {
            bits = self.most_fixed(&bucket.members, union & !anded & undecided);
        }
        if bits == 0 {
            return None;
        }
        let shift = bits.trailing_zeros();
        let run = (bits >> shift).trailing_ones().min(MAX_STEP_BITS);
        Some(TrieNode {
            mask: ((1u32 << run) - 1) as u8,
            shift: shift as u8,
            index: 0,
        })
    }

    /// The subset of `candidates` fixed by the most members.
    fn most_fixed(&self, members: &[InstId], candidates: u32) -> u32 {
        let mut best = 0;
        let mut most = 0;
        for bit in (0..u32::BITS).filter(|&bit| candidates & (1 << bit) != 0) {
            let count = members
                .iter()
                .filter(|&&id| self.listing[id].mask & (1 << bit) != 0)
                .count();
            if count > most {
                most = count;
                best = 1 << bit;
            } else if count == most {
                best |= 1 << bit;
            }
        }
        best
    }

    /// Turn the node at `at` into `node` and queue its children.
    ///
    /// A member goes into every child whose key agrees with the bits of the
    /// member's encoding under the node's mask. Members fixing all of those
    /// bits land in exactly one child; members fixing none land in all of
    /// them.
    fn split(&mut self, at: usize, mut node: TrieNode, bucket: Bucket) -> Result<(), Error> {
        let start = self.nodes.len();
        let count = usize::from(node.mask) + 1;
        if start + count >= usize::from(NO_MATCH) {
            return Err(Error::Trie(format!(
                "more than {} nodes needed",
                NO_MATCH - 1
            )));
        }
        node.index = start as u16;
        self.nodes[at] = node;
        self.nodes.resize(start + count, TrieNode::NO_MATCH);
        self.resolved.resize(start + count, None);

        if self.verbose {
            let names: Vec<&str> = bucket
                .members
                .iter()
                .map(|&id| self.listing[id].name.as_str())
                .collect();
            log::debug!(
                "node {at}: shift {} mask {:#x} -> {start}..{}: {}",
                node.shift,
                node.mask,
                start + count,
                names.join(" ")
            );
        }

        let mask = u32::from(node.mask);
        let mut children = vec![Vec::new(); count];
        for &id in &bucket.members {
            let inst = &self.listing[id];
            let fixed = (inst.mask >> node.shift) & mask;
            let value = (inst.value >> node.shift) & mask;
            for (key, child) in children.iter_mut().enumerate() {
                if (key as u32) & fixed == value {
                    child.push(id);
                }
            }
        }

        let decided = bucket.decided | node.field();
        for (i, members) in children.into_iter().enumerate() {
            self.pending
                .push_back((start + i, Bucket { members, decided }));
        }
        Ok(())
    }

    /// The member with the most fixed bits, earliest in listing order on
    /// ties.
    fn most_specific(&self, members: &[InstId]) -> InstId {
        let mut best = members[0];
        for &id in &members[1..] {
            if self.listing[id].fixed_bits() > self.listing[best].fixed_bits() {
                best = id;
            }
        }
        let chosen = &self.listing[best];
        for &id in members {
            let other = &self.listing[id];
            if other.mask & !chosen.mask != 0 {
                log::warn!(
                    "`{}` and `{}` overlap and neither is more specific; decoding as `{}`",
                    chosen.name,
                    other.name,
                    chosen.name
                );
            }
        }
        best
    }
}
