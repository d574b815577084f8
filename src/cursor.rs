use std::{cmp::Ordering, ptr::NonNull};

use log::debug;

use crate::llrb::{Llrb, Node};

/// Cursor walks an [`Llrb`] tree in sort order, and unlike [`Iter`] it
/// does not hold a borrow on the tree between calls. Each call takes
/// the tree as argument, which means the tree can be mutated while the
/// cursor is alive.
///
/// The cursor remembers the tree's version when it last synchronized.
/// When the tree has moved on, the next call rebuilds the traversal
/// stack by descending from the root toward the value the cursor was
/// about to return, so iteration resumes from the smallest value that
/// is not less than it. Values removed ahead of the cursor are skipped,
/// values added ahead of it are returned.
///
/// ```
/// use llrb_set::Llrb;
///
/// let mut llrb = Llrb::load_from("doc", 0..10);
/// let mut cursor = llrb.cursor();
/// while let Some(value) = cursor.advance(&llrb).copied() {
///     llrb.remove(&value);
/// }
/// assert!(llrb.is_empty());
/// ```
pub struct Cursor<E>
where
    E: Clone + Ord,
{
    instance: usize,
    version: usize,
    stack: Vec<NonNull<Node<E>>>,
    // copy of the value at the top of the stack, the node holding it
    // may be gone by the time we need it.
    anchor: Option<E>,
}

impl<E> Cursor<E>
where
    E: Clone + Ord,
{
    pub(crate) fn new(tree: &Llrb<E>) -> Cursor<E> {
        let mut cursor = Cursor {
            instance: tree.instance(),
            version: tree.version(),
            stack: Vec::default(),
            anchor: None,
        };
        cursor.push_left(tree.root_deref());
        cursor.set_anchor(tree);
        cursor
    }

    /// Check whether there are more values to walk. Panics if `tree`
    /// is not the instance this cursor was created from.
    pub fn has_next(&mut self, tree: &Llrb<E>) -> bool {
        self.sync(tree);
        !self.stack.is_empty()
    }

    /// Return the value that the next call to [`Cursor::advance`] will
    /// return, without moving the cursor.
    pub fn peek<'t>(&mut self, tree: &'t Llrb<E>) -> Option<&'t E> {
        self.sync(tree);
        let ptr = *self.stack.last()?;
        Some(Cursor::node(tree, ptr).as_value())
    }

    /// Return the current value and move to its in-order successor.
    /// Returns None once the cursor is exhausted.
    pub fn advance<'t>(&mut self, tree: &'t Llrb<E>) -> Option<&'t E> {
        self.sync(tree);
        let node = Cursor::node(tree, self.stack.pop()?);
        self.push_left(node.right_deref());
        self.set_anchor(tree);
        Some(node.as_value())
    }

    /// Check whether `tree` was mutated since this cursor last looked
    /// at it. Does not resynchronize.
    pub fn is_stale(&self, tree: &Llrb<E>) -> bool {
        self.version != tree.version()
    }

    fn sync(&mut self, tree: &Llrb<E>) {
        if self.instance != tree.instance() {
            panic!("cursor used with llrb {:?}, not its origin", tree.id());
        }
        if self.version == tree.version() {
            return;
        }

        let stale = self.stack.len();
        self.stack.clear();
        if let Some(anchor) = self.anchor.as_ref() {
            let mut node = tree.root_deref();
            while let Some(nref) = node {
                node = match anchor.cmp(nref.as_value()) {
                    Ordering::Less => {
                        self.stack.push(NonNull::from(nref));
                        nref.left_deref()
                    }
                    // already visited, skip.
                    Ordering::Greater => nref.right_deref(),
                    Ordering::Equal => {
                        self.stack.push(NonNull::from(nref));
                        None
                    }
                };
            }
        }
        debug!(
            "cursor on {:?} resync version {} -> {}, stack {} -> {}",
            tree.id(),
            self.version,
            tree.version(),
            stale,
            self.stack.len()
        );

        self.set_anchor(tree);
        self.version = tree.version();
    }

    fn push_left(&mut self, mut node: Option<&Node<E>>) {
        while let Some(nref) = node {
            self.stack.push(NonNull::from(nref));
            node = nref.left_deref();
        }
    }

    fn set_anchor(&mut self, tree: &Llrb<E>) {
        self.anchor = match self.stack.last() {
            Some(ptr) => Some(Cursor::node(tree, *ptr).as_value().clone()),
            None => None,
        };
    }

    // Every pointer on the stack was taken from `tree` at the version
    // recorded in the cursor. Nodes are only moved or freed through
    // `&mut Llrb`, and every such path bumps the version before it
    // detaches the root, so even a mutation that unwinds half way is
    // seen as a version change. Callers must run sync() before the
    // first node() after any mutation.
    fn node<'t>(tree: &'t Llrb<E>, ptr: NonNull<Node<E>>) -> &'t Node<E> {
        // SAFETY: the node is owned by `tree`, which is borrowed for 't
        // and has not been mutated since `ptr` was taken.
        unsafe { &*ptr.as_ptr() }
    }
}

/// Iter walks an [`Llrb`] tree in sort order, borrowing it for the
/// whole walk.
pub struct Iter<'a, E>
where
    E: Clone + Ord,
{
    stack: Vec<&'a Node<E>>,
}

impl<'a, E> Iter<'a, E>
where
    E: Clone + Ord,
{
    pub(crate) fn new(root: Option<&'a Node<E>>) -> Iter<'a, E> {
        let mut iter = Iter { stack: vec![] };
        iter.push_left(root);
        iter
    }

    fn push_left(&mut self, mut node: Option<&'a Node<E>>) {
        while let Some(nref) = node {
            self.stack.push(nref);
            node = nref.left_deref();
        }
    }
}

impl<'a, E> Iterator for Iter<'a, E>
where
    E: Clone + Ord,
{
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right_deref());
        Some(node.as_value())
    }
}

impl<'a, E> IntoIterator for &'a Llrb<E>
where
    E: Clone + Ord,
{
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Iter<'a, E> {
        self.iter()
    }
}
