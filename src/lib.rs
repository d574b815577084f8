//! Ordered set of values, backed by a [left-leaning-red-black][llrb]
//! tree.
//!
//! [`Llrb`] supports add, remove and lookup in O(log n). Values can be
//! walked in sort order with [`Llrb::iter`], which borrows the tree, or
//! with a [`Cursor`], which keeps walking correctly while the tree is
//! being mutated:
//!
//! ```
//! use llrb_set::Llrb;
//!
//! let mut llrb: Llrb<i64> = Llrb::new("example");
//! llrb.add(20);
//! llrb.add(10);
//! llrb.add(30);
//!
//! let mut cursor = llrb.cursor();
//! assert_eq!(cursor.advance(&llrb), Some(&10));
//! llrb.remove(&20);
//! assert_eq!(cursor.advance(&llrb), Some(&30));
//! assert_eq!(cursor.advance(&llrb), None);
//! ```
//!
//! [llrb]: https://en.wikipedia.org/wiki/Left-leaning_red-black_tree

mod cursor;
mod depth;
mod error;
mod llrb;

pub use crate::cursor::{Cursor, Iter};
pub use crate::depth::Depth;
pub use crate::error::Error;
pub use crate::llrb::{Llrb, Stats};

#[cfg(test)]
mod cursor_test;
