use std::{error, fmt};

/// Error enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq)]
pub enum Error<E>
where
    E: Clone + Ord,
{
    /// Fatal case, breaking one of the LLRB rules.
    ConsecutiveReds,
    /// Fatal case, a red link is leaning right.
    RightLeaningRed,
    /// Fatal case, root node is painted red.
    RedRoot,
    /// Fatal case, breaking one of the LLRB rules. The String
    /// component of this variant can be used for debugging.
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    SortError(E, E),
    /// Fatal case, counted nodes (first) differs from tracked
    /// length (second).
    CountMismatch(usize, usize),
    /// Returned by create() API when value is already present.
    OverwriteKey,
}

impl<E> fmt::Display for Error<E>
where
    E: Clone + Ord + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ConsecutiveReds => write!(f, "consecutive red links"),
            Error::RightLeaningRed => write!(f, "right leaning red link"),
            Error::RedRoot => write!(f, "root is red"),
            Error::UnbalancedBlacks(msg) => write!(f, "unbalanced blacks, {}", msg),
            Error::SortError(a, b) => write!(f, "sort error, {:?} against {:?}", a, b),
            Error::CountMismatch(n, len) => {
                write!(f, "count mismatch, counted {} tracked {}", n, len)
            }
            Error::OverwriteKey => write!(f, "value already present"),
        }
    }
}

impl<E> error::Error for Error<E> where E: Clone + Ord + fmt::Debug {}
