#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

macro_rules! declare_id {
    (
        $(#[$attr:meta])*
            $name:ident
    ) => {
        $(#[$attr])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);
        impl $name {
            /// Get the index of this id.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

pub mod catalog;
pub mod check;
pub mod compile;
pub mod emit;
pub mod error;
pub mod fixup;
pub mod listing;
pub mod parser;
pub mod srcgen;
pub mod trie;

pub use crate::compile::Options;
pub use crate::error::{Error, Errors};
pub use crate::listing::{InstId, Instruction, Listing};
