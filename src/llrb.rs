use std::{
    borrow::Borrow,
    cmp::{self, Ord, Ordering},
    fmt, mem,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
};

use log::trace;
use rand::Rng;

use crate::cursor::{Cursor, Iter};
use crate::depth::Depth;
use crate::error::Error;

// every Llrb instance, including clones, gets a unique id so that
// detached cursors can tell which tree they were built from.
static INSTANCES: AtomicUsize = AtomicUsize::new(1);

/// Llrb manage a single instance of in-memory ordered set using
/// [left-leaning-red-black][llrb] tree.
///
/// Every structural mutation bumps a version counter, which [`Cursor`]
/// compares against on every operation to resynchronize itself after
/// the tree was mutated underneath it.
///
/// [llrb]: https://en.wikipedia.org/wiki/Left-leaning_red-black_tree
pub struct Llrb<E>
where
    E: Clone + Ord,
{
    name: String,
    instance: usize,
    root: Option<Box<Node<E>>>,
    n_count: usize, // number of entries in the tree.
    // bumped on every mutation, before any node is detached from root.
    // Cursors hold raw node handles that stay valid only while version
    // is unchanged, a panic in E::cmp or E::drop half way through a
    // mutation must still leave version moved.
    version: usize,
}

impl<E> Clone for Llrb<E>
where
    E: Clone + Ord,
{
    fn clone(&self) -> Llrb<E> {
        Llrb {
            name: self.name.clone(),
            instance: INSTANCES.fetch_add(1, Relaxed),
            root: self.root.clone(),
            n_count: self.n_count,
            version: Default::default(),
        }
    }
}

/// Different ways to construct a new Llrb instance.
impl<E> Llrb<E>
where
    E: Clone + Ord,
{
    /// Create an empty instance of Llrb, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> Llrb<E>
    where
        S: AsRef<str>,
    {
        Llrb {
            name: name.as_ref().to_string(),
            instance: INSTANCES.fetch_add(1, Relaxed),
            root: Default::default(),
            n_count: Default::default(),
            version: Default::default(),
        }
    }

    /// Create an instance of Llrb holding a single `value`.
    pub fn seeded<S>(name: S, value: E) -> Llrb<E>
    where
        S: AsRef<str>,
    {
        let mut llrb = Llrb::new(name);
        let mut root = Node::new(value);
        root.set_black();
        llrb.root = Some(root);
        llrb.n_count = 1;
        llrb
    }

    /// Create a new instance of Llrb tree and load it with values
    /// from `iter`. Values equal to an earlier one replace it.
    pub fn load_from<S, I>(name: S, iter: I) -> Llrb<E>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = E>,
    {
        let mut llrb = Llrb::new(name);
        llrb.extend(iter);
        llrb
    }
}

/// Maintenance API.
impl<E> Llrb<E>
where
    E: Clone + Ord,
{
    /// Identify this instance. Applications can choose unique names while
    /// creating Llrb instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return the current version of this instance. Version moves
    /// forward on every mutation and never on reads.
    #[inline]
    pub fn version(&self) -> usize {
        self.version
    }

    /// Return quickly with basic statisics, only entries() method is valid
    /// with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<E>>())
    }

    /// Length of the longest path from root to a leaf node, counted in
    /// links. A single node tree has height 0, an empty tree -1.
    pub fn height(&self) -> isize {
        Llrb::height_of(self.root_deref())
    }

    #[inline]
    pub(crate) fn instance(&self) -> usize {
        self.instance
    }

    #[inline]
    pub(crate) fn root_deref(&self) -> Option<&Node<E>> {
        self.root.as_ref().map(Deref::deref)
    }

    fn height_of(node: Option<&Node<E>>) -> isize {
        match node {
            None => -1,
            Some(node) => {
                let left = Llrb::height_of(node.left_deref());
                let right = Llrb::height_of(node.right_deref());
                1 + cmp::max(left, right)
            }
        }
    }

    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

type Upsert<E> = (Box<Node<E>>, Option<E>);

type Delete<E> = (Option<Box<Node<E>>>, Option<E>);

type Delmin<E> = (Option<Box<Node<E>>>, Option<Box<Node<E>>>);

/// Write operations on Llrb instance.
impl<E> Llrb<E>
where
    E: Clone + Ord,
{
    /// Add `value` into this instance. If an equal value is already
    /// present, it is replaced with `value` and the old one is returned.
    pub fn add(&mut self, value: E) -> Option<E> {
        self.bump_version();
        let (mut root, old_value) = Llrb::upsert(self.root.take(), value);
        root.set_black();
        self.root = Some(root);
        match old_value {
            old_value @ Some(_) => old_value,
            None => {
                self.n_count += 1;
                None
            }
        }
    }

    /// Add `value` into this instance. If an equal value is already
    /// present return error, leaving the tree untouched.
    pub fn create(&mut self, value: E) -> Result<(), Error<E>> {
        if self.contains(&value) {
            trace!("{}: create rejected, value already present", self.name);
            return Err(Error::OverwriteKey);
        }
        self.add(value);
        Ok(())
    }

    /// Remove `value` from this instance and return the stored value.
    /// If value is not present, then remove is a no-op and does not
    /// change the version.
    pub fn remove<Q>(&mut self, value: &Q) -> Option<E>
    where
        E: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if !self.contains(value) {
            return None;
        }

        self.bump_version();
        let (root, old_value) = match self.root.take() {
            Some(root) => Llrb::do_delete(root, value),
            None => (None, None),
        };
        self.root = root.map(|mut root| {
            root.set_black();
            root
        });
        if old_value.is_some() {
            self.n_count -= 1;
        }
        old_value
    }

    /// Remove all values from this instance.
    pub fn clear(&mut self) {
        if self.root.is_some() {
            self.bump_version();
            self.n_count = 0;
            mem::drop(self.root.take());
        }
    }

    /// Validate LLRB tree with following rules:
    ///
    /// * Root node is black.
    /// * Red links lean left, no right child is red.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Make sure values are in sorted order.
    /// * Number of nodes match the tracked length.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, Error<E>> {
        let root = self.root_deref();
        if is_red(root) {
            return Err(Error::RedRoot);
        }

        let (red, nb, d) = (is_red(root), 0, 0);
        let mut depths = Depth::new();
        let blacks = Llrb::validate_tree(root, red, nb, d, &mut depths)?;

        // a binary tree of n nodes has n+1 absent children.
        let n = depths.samples() - 1;
        if n != self.n_count {
            return Err(Error::CountMismatch(n, self.n_count));
        }

        let mut stats = Stats::new(self.n_count, mem::size_of::<Node<E>>());
        stats.set_depths(depths);
        stats.set_blacks(blacks);
        Ok(stats)
    }
}

impl<E> Extend<E> for Llrb<E>
where
    E: Clone + Ord,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = E>,
    {
        for value in iter {
            self.add(value);
        }
    }
}

/// Read operations on Llrb instance.
impl<E> Llrb<E>
where
    E: Clone + Ord,
{
    /// Get the stored value that compares equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&E>
    where
        E: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root_deref();
        while let Some(nref) = node {
            node = match nref.value.borrow().cmp(value) {
                Ordering::Less => nref.right_deref(),
                Ordering::Greater => nref.left_deref(),
                Ordering::Equal => return Some(&nref.value),
            };
        }
        None
    }

    /// Check whether `value` is present in this instance.
    #[inline]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        E: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(value).is_some()
    }

    /// Return the smallest value.
    pub fn first(&self) -> Option<&E> {
        let mut nref = self.root_deref()?;
        while let Some(left) = nref.left_deref() {
            nref = left;
        }
        Some(&nref.value)
    }

    /// Return the largest value.
    pub fn last(&self) -> Option<&E> {
        let mut nref = self.root_deref()?;
        while let Some(right) = nref.right_deref() {
            nref = right;
        }
        Some(&nref.value)
    }

    /// Return a random value from this index.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<&E> {
        let mut nref = self.root_deref()?;

        let mut at_depth = rng.gen::<u8>() % 40;
        loop {
            let next = match rng.gen::<bool>() {
                true => nref.left_deref(),
                false => nref.right_deref(),
            };
            match next {
                Some(next) if at_depth > 0 => {
                    at_depth -= 1;
                    nref = next;
                }
                _ => break Some(&nref.value),
            }
        }
    }

    /// Return an iterator over all values in this instance. The
    /// iterator borrows the tree, use [`Llrb::cursor`] to iterate while
    /// mutating the tree.
    pub fn iter(&self) -> Iter<E> {
        Iter::new(self.root_deref())
    }

    /// Return a detached cursor over all values in this instance. The
    /// cursor survives mutations on this tree and resumes from the
    /// smallest value not less than its last position.
    pub fn cursor(&self) -> Cursor<E> {
        Cursor::new(self)
    }
}

impl<E> Llrb<E>
where
    E: Clone + Ord,
{
    fn upsert(node: Option<Box<Node<E>>>, value: E) -> Upsert<E> {
        let mut node = match node {
            None => return (Node::new(value), None),
            Some(node) => node,
        };

        match node.value.cmp(&value) {
            Ordering::Greater => {
                let (left, o) = Llrb::upsert(node.left.take(), value);
                node.left = Some(left);
                (Llrb::walkuprot_23(node), o)
            }
            Ordering::Less => {
                let (right, o) = Llrb::upsert(node.right.take(), value);
                node.right = Some(right);
                (Llrb::walkuprot_23(node), o)
            }
            Ordering::Equal => {
                let old_value = mem::replace(&mut node.value, value);
                (node, Some(old_value))
            }
        }
    }

    // caller makes sure that value is present in the sub-tree, the
    // moves below rely on the children that presence implies.
    fn do_delete<Q>(mut node: Box<Node<E>>, value: &Q) -> Delete<E>
    where
        E: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if node.value.borrow().gt(value) {
            let left = node.left_deref();
            if left.is_none() {
                return (Some(node), None);
            }
            if !is_red(left) && !is_red(left.and_then(Node::left_deref)) {
                node = Llrb::move_red_left(node);
            }
            let (left, old_value) = match node.left.take() {
                Some(left) => Llrb::do_delete(left, value),
                None => (None, None),
            };
            node.left = left;
            return (Some(Llrb::fixup(node)), old_value);
        }

        if is_red(node.left_deref()) {
            node = Llrb::rotate_right(node);
        }

        if node.value.borrow().eq(value) && node.right.is_none() {
            let Node {
                value: old_value, ..
            } = *node;
            return (None, Some(old_value));
        }

        let right = node.right_deref();
        if right.is_some() && !is_red(right) && !is_red(right.and_then(Node::left_deref)) {
            node = Llrb::move_red_right(node);
        }

        if node.value.borrow().eq(value) {
            // replace with the in-order successor and delete that instead.
            let (right, res_node) = Llrb::delete_min(node.right.take());
            node.right = right;
            let Node { value: min, .. } = match res_node {
                Some(res_node) => *res_node,
                None => panic!("do_delete(): fatal logic, call the programmer"),
            };
            let old_value = mem::replace(&mut node.value, min);
            (Some(Llrb::fixup(node)), Some(old_value))
        } else {
            let (right, old_value) = match node.right.take() {
                Some(right) => Llrb::do_delete(right, value),
                None => (None, None),
            };
            node.right = right;
            (Some(Llrb::fixup(node)), old_value)
        }
    }

    fn delete_min(node: Option<Box<Node<E>>>) -> Delmin<E> {
        let mut node = match node {
            None => return (None, None),
            Some(node) => node,
        };
        if node.left.is_none() {
            return (None, Some(node));
        }
        let left = node.left_deref();
        if !is_red(left) && !is_red(left.and_then(Node::left_deref)) {
            node = Llrb::move_red_left(node);
        }
        let (left, old_node) = Llrb::delete_min(node.left.take());
        node.left = left;
        (Some(Llrb::fixup(node)), old_node)
    }

    fn validate_tree(
        node: Option<&Node<E>>,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        depths: &mut Depth,
    ) -> Result<usize, Error<E>> {
        let node = match node {
            None => {
                depths.sample(depth);
                return Ok(nb);
            }
            Some(node) => node,
        };

        let red = !node.is_black();
        if fromred && red {
            return Err(Error::ConsecutiveReds);
        }
        if is_red(node.right_deref()) {
            return Err(Error::RightLeaningRed);
        }
        if !red {
            nb += 1;
        }
        let (left, right) = (node.left_deref(), node.right_deref());
        let lblacks = Llrb::validate_tree(left, red, nb, depth + 1, depths)?;
        let rblacks = Llrb::validate_tree(right, red, nb, depth + 1, depths)?;
        if lblacks != rblacks {
            let err = format!("left: {} right: {}", lblacks, rblacks);
            return Err(Error::UnbalancedBlacks(err));
        }
        if let Some(left) = left {
            if left.value.ge(&node.value) {
                let (lval, parent) = (left.value.clone(), node.value.clone());
                return Err(Error::SortError(lval, parent));
            }
        }
        if let Some(right) = right {
            if right.value.le(&node.value) {
                let (rval, parent) = (right.value.clone(), node.value.clone());
                return Err(Error::SortError(rval, parent));
            }
        }
        Ok(lblacks)
    }

    //--------- rotation routines for 2-3 algorithm ----------------

    // applied on the way up after insert, in this order.
    fn walkuprot_23(mut node: Box<Node<E>>) -> Box<Node<E>> {
        if is_red(node.right_deref()) && !is_red(node.left_deref()) {
            node = Llrb::rotate_left(node);
        }
        let left = node.left_deref();
        if is_red(left) && is_red(left.and_then(Node::left_deref)) {
            node = Llrb::rotate_right(node);
        }
        if is_red(node.left_deref()) && is_red(node.right_deref()) {
            Llrb::flip(node.deref_mut())
        }
        node
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    (r)                 (r)  \
    //            /       \                 /     \
    //          left       x             node      xr
    //                    / \            /  \
    //                  xl   xr       left   xl
    //
    fn rotate_left(mut node: Box<Node<E>>) -> Box<Node<E>> {
        let mut x = match node.right.take() {
            Some(x) if !x.is_black() => x,
            _ => panic!("rotate_left(): rotating a black link ? call the programmer"),
        };
        node.right = x.left.take();
        x.black = node.black;
        node.set_red();
        x.left = Some(node);
        x
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //            (r)   \                   (r)  \
    //           /       \                 /      \
    //          x       right             xl      node
    //         / \                                / \
    //       xl   xr                             xr  right
    //
    fn rotate_right(mut node: Box<Node<E>>) -> Box<Node<E>> {
        let mut x = match node.left.take() {
            Some(x) if !x.is_black() => x,
            _ => panic!("rotate_right(): rotating a black link ? call the programmer"),
        };
        node.left = x.right.take();
        x.black = node.black;
        node.set_red();
        x.right = Some(node);
        x
    }

    //        (x)                   (!x)
    //         |                     |
    //        node                  node
    //        / \                   / \
    //      (y) (z)              (!y) (!z)
    //     /      \              /      \
    //   left    right         left    right
    //
    fn flip(node: &mut Node<E>) {
        match (node.left.as_mut(), node.right.as_mut()) {
            (Some(left), Some(right)) => {
                left.toggle_link();
                right.toggle_link();
            }
            _ => panic!("flip(): missing child, call the programmer"),
        }
        node.toggle_link();
    }

    // applied on the way up after delete. Unlike walkuprot_23 a red
    // right link is rotated even when the left link is red, the
    // following steps then resolve the double red on the left.
    fn fixup(mut node: Box<Node<E>>) -> Box<Node<E>> {
        if is_red(node.right_deref()) {
            node = Llrb::rotate_left(node);
        }
        let left = node.left_deref();
        if is_red(left) && is_red(left.and_then(Node::left_deref)) {
            node = Llrb::rotate_right(node);
        }
        if is_red(node.left_deref()) && is_red(node.right_deref()) {
            Llrb::flip(node.deref_mut());
        }
        node
    }

    fn move_red_left(mut node: Box<Node<E>>) -> Box<Node<E>> {
        Llrb::flip(node.deref_mut());
        if is_red(node.right_deref().and_then(Node::left_deref)) {
            node.right = node.right.take().map(Llrb::rotate_right);
            node = Llrb::rotate_left(node);
            Llrb::flip(node.deref_mut());
        }
        node
    }

    fn move_red_right(mut node: Box<Node<E>>) -> Box<Node<E>> {
        Llrb::flip(node.deref_mut());
        if is_red(node.left_deref().and_then(Node::left_deref)) {
            node = Llrb::rotate_right(node);
            Llrb::flip(node.deref_mut());
        }
        node
    }
}

/// Render the tree in-order, a red node as `(left value right)` and a
/// black node as `[left value right]`. Empty tree renders as an empty
/// string.
impl<E> fmt::Display for Llrb<E>
where
    E: Clone + Ord + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.root_deref() {
            Some(root) => root.render(f),
            None => Ok(()),
        }
    }
}

fn is_red<E>(node: Option<&Node<E>>) -> bool
where
    E: Clone + Ord,
{
    node.map_or(false, |node| !node.is_black())
}

/// Node corresponds to a single value in Llrb instance.
#[derive(Clone)]
pub struct Node<E>
where
    E: Clone + Ord,
{
    value: E,
    black: bool,                 // store: black or red
    left: Option<Box<Node<E>>>,  // store: left child
    right: Option<Box<Node<E>>>, // store: right child
}

// Primary operations on a single node.
impl<E> Node<E>
where
    E: Clone + Ord,
{
    // CREATE operation, new nodes always hang from a red link.
    fn new(value: E) -> Box<Node<E>> {
        Box::new(Node {
            value,
            black: false,
            left: None,
            right: None,
        })
    }

    #[inline]
    pub(crate) fn as_value(&self) -> &E {
        &self.value
    }

    #[inline]
    pub(crate) fn left_deref(&self) -> Option<&Node<E>> {
        self.left.as_ref().map(Deref::deref)
    }

    #[inline]
    pub(crate) fn right_deref(&self) -> Option<&Node<E>> {
        self.right.as_ref().map(Deref::deref)
    }

    #[inline]
    fn set_red(&mut self) {
        self.black = false
    }

    #[inline]
    fn set_black(&mut self) {
        self.black = true
    }

    #[inline]
    fn toggle_link(&mut self) {
        self.black = !self.black
    }

    #[inline]
    fn is_black(&self) -> bool {
        self.black
    }
}

impl<E> Node<E>
where
    E: Clone + Ord + fmt::Display,
{
    fn render(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (open, close) = if self.black { ('[', ']') } else { ('(', ')') };
        write!(f, "{}", open)?;
        if let Some(left) = self.left_deref() {
            left.render(f)?;
        }
        write!(f, "{}", self.value)?;
        if let Some(right) = self.right_deref() {
            right.render(f)?;
        }
        write!(f, "{}", close)
    }
}

/// Statistics on [`Llrb`] tree. Serves two purpose:
///
/// * To get partial but quick statistics via [`Llrb::stats`] method.
/// * To get full statisics via [`Llrb::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`Llrb`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head for `Llrb<E>`. Although
    /// the node overhead is constant, the node size varies based on
    /// the element type. EG:
    ///
    /// ```
    /// use llrb_set::Llrb;
    /// let llrb: Llrb<u64> = Llrb::new("myinstance");
    ///
    /// // size of value: 8 bytes
    /// // overhead is 24 bytes
    /// assert_eq!(llrb.stats().node_size(), 32);
    /// ```
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to leaf, on both left
    /// and right child.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics, available only after a full
    /// [`Llrb::validate`] on a non-empty tree.
    pub fn depths(&self) -> Option<Depth> {
        match &self.depths {
            Some(depths) if self.entries > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
