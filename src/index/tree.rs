//! A persistent (copy-on-write), height-balanced ordered map from `String`
//! keys to an arbitrary clonable value.
//!
//! This stands in for `prataprc-rdms`'s `Llrb`/`Mvcc` pair
//! (`src/llrb.rs`, `src/mvcc.rs`): those use a left-leaning red-black tree
//! of `Box<Node>` mutated through an unsafe `mvcc_clone`/`AtomicPtr` dance to
//! get copy-on-write snapshots (`src/mvcc.rs`'s `Snapshot`). Here the same
//! "fork is cheap, a fork's mutations don't affect its parent" property
//! (spec §4.A/§4.B, invariant I5) is had directly from structural sharing:
//! every node is `Arc`-owned, `insert`/`remove` only reallocate nodes on the
//! path to the change, and cloning a tree is one `Arc::clone` of the root.
//! No unsafe code is needed because nothing is ever mutated in place.
//!
//! Balance is plain AVL (not left-leaning red-black) — simpler to get right
//! without being able to run the result, and it gives the same O(log n)
//! point-operation / O(log n + k) range-iteration bounds spec §4.A asks for.

use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::Arc;

struct Node<V> {
    key: Arc<str>,
    value: V,
    height: u8,
    left: Link<V>,
    right: Link<V>,
}

type Link<V> = Option<Arc<Node<V>>>;

fn height<V>(link: &Link<V>) -> u8 {
    link.as_ref().map_or(0, |n| n.height)
}

fn balance_factor<V>(left: &Link<V>, right: &Link<V>) -> i16 {
    height(left) as i16 - height(right) as i16
}

fn make_node<V>(key: Arc<str>, value: V, left: Link<V>, right: Link<V>) -> Arc<Node<V>> {
    let height = 1 + height(&left).max(height(&right));
    Arc::new(Node { key, value, height, left, right })
}

/// Re-root a node around its heavy child, restoring the AVL invariant.
/// `left`/`right` are already-rebuilt subtrees; `key`/`value` belong to the
/// node sitting between them.
fn rebalance<V: Clone>(key: Arc<str>, value: V, left: Link<V>, right: Link<V>) -> Arc<Node<V>> {
    let bf = balance_factor(&left, &right);
    if bf > 1 {
        let l = left.clone().unwrap();
        if balance_factor(&l.left, &l.right) < 0 {
            let new_left = rotate_left(l);
            rotate_right(make_node(key, value, Some(new_left), right))
        } else {
            rotate_right(make_node(key, value, left, right))
        }
    } else if bf < -1 {
        let r = right.clone().unwrap();
        if balance_factor(&r.left, &r.right) > 0 {
            let new_right = rotate_right(r);
            rotate_left(make_node(key, value, left, Some(new_right)))
        } else {
            rotate_left(make_node(key, value, left, right))
        }
    } else {
        make_node(key, value, left, right)
    }
}

fn rotate_left<V: Clone>(node: Arc<Node<V>>) -> Arc<Node<V>> {
    let r = node.right.clone().expect("rotate_left requires a right child");
    let new_left = make_node(node.key.clone(), node.value.clone(), node.left.clone(), r.left.clone());
    make_node(r.key.clone(), r.value.clone(), Some(new_left), r.right.clone())
}

fn rotate_right<V: Clone>(node: Arc<Node<V>>) -> Arc<Node<V>> {
    let l = node.left.clone().expect("rotate_right requires a left child");
    let new_right = make_node(node.key.clone(), node.value.clone(), l.right.clone(), node.right.clone());
    make_node(l.key.clone(), l.value.clone(), l.left.clone(), Some(new_right))
}

fn insert_rec<V: Clone>(link: &Link<V>, key: &str, value: V) -> (Arc<Node<V>>, bool) {
    match link {
        None => (make_node(Arc::from(key), value, None, None), true),
        Some(node) => match key.cmp(node.key.as_ref()) {
            Ordering::Equal => (make_node(node.key.clone(), value, node.left.clone(), node.right.clone()), false),
            Ordering::Less => {
                let (new_left, is_new) = insert_rec(&node.left, key, value);
                (rebalance(node.key.clone(), node.value.clone(), Some(new_left), node.right.clone()), is_new)
            }
            Ordering::Greater => {
                let (new_right, is_new) = insert_rec(&node.right, key, value);
                (rebalance(node.key.clone(), node.value.clone(), node.left.clone(), Some(new_right)), is_new)
            }
        },
    }
}

/// Detach and return the leftmost (key, value) pair of a subtree, along with
/// the subtree that remains once it's removed. Used by `remove_rec` to find
/// an in-order successor.
fn take_min<V: Clone>(link: &Link<V>) -> ((Arc<str>, V), Link<V>) {
    let node = link.as_ref().expect("take_min requires a non-empty subtree");
    match &node.left {
        None => ((node.key.clone(), node.value.clone()), node.right.clone()),
        Some(_) => {
            let (min, new_left) = take_min(&node.left);
            (min, Some(rebalance(node.key.clone(), node.value.clone(), new_left, node.right.clone())))
        }
    }
}

fn remove_rec<V: Clone>(link: &Link<V>, key: &str) -> (Link<V>, bool) {
    match link {
        None => (None, false),
        Some(node) => match key.cmp(node.key.as_ref()) {
            Ordering::Less => {
                let (new_left, removed) = remove_rec(&node.left, key);
                (Some(rebalance(node.key.clone(), node.value.clone(), new_left, node.right.clone())), removed)
            }
            Ordering::Greater => {
                let (new_right, removed) = remove_rec(&node.right, key);
                (Some(rebalance(node.key.clone(), node.value.clone(), node.left.clone(), new_right)), removed)
            }
            Ordering::Equal => {
                let merged = match (&node.left, &node.right) {
                    (None, None) => None,
                    (Some(l), None) => Some(l.clone()),
                    (None, Some(r)) => Some(r.clone()),
                    (Some(_), Some(_)) => {
                        let ((succ_key, succ_value), new_right) = take_min(&node.right);
                        Some(rebalance(succ_key, succ_value, node.left.clone(), new_right))
                    }
                };
                (merged, true)
            }
        },
    }
}

fn cmp_bound_lo(key: &str, lo: &Bound<&str>) -> bool {
    match lo {
        Bound::Unbounded => true,
        Bound::Included(l) => key >= *l,
        Bound::Excluded(l) => key > *l,
    }
}

fn cmp_bound_hi(key: &str, hi: &Bound<&str>) -> bool {
    match hi {
        Bound::Unbounded => true,
        Bound::Included(h) => key <= *h,
        Bound::Excluded(h) => key < *h,
    }
}

/// Returns `false` if the visitor asked to stop.
fn visit<V, F>(link: &Link<V>, lo: &Bound<&str>, hi: &Bound<&str>, f: &mut F) -> bool
where
    F: FnMut(&str, &V) -> bool,
{
    let Some(node) = link else { return true };

    let may_hold_lo = match lo {
        Bound::Unbounded => true,
        Bound::Included(l) => node.key.as_ref() >= *l,
        Bound::Excluded(l) => node.key.as_ref() > *l,
    };
    if may_hold_lo && !visit(&node.left, lo, hi, f) {
        return false;
    }

    if cmp_bound_lo(&node.key, lo) && cmp_bound_hi(&node.key, hi) {
        if !f(&node.key, &node.value) {
            return false;
        }
    }

    let may_hold_hi = match hi {
        Bound::Unbounded => true,
        Bound::Included(h) => node.key.as_ref() <= *h,
        Bound::Excluded(h) => node.key.as_ref() < *h,
    };
    if may_hold_hi {
        return visit(&node.right, lo, hi, f);
    }
    true
}

/// A persistent ordered map. Cloning is O(1) (an `Arc::clone` of the root);
/// mutating one clone never affects another (spec invariant I5).
#[derive(Clone)]
pub struct Tree<V> {
    root: Link<V>,
    len: usize,
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Tree { root: None, len: 0 }
    }
}

impl<V: Clone> Tree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut cur = &self.root;
        while let Some(node) = cur {
            match key.cmp(node.key.as_ref()) {
                Ordering::Equal => return Some(node.value.clone()),
                Ordering::Less => cur = &node.left,
                Ordering::Greater => cur = &node.right,
            }
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns a new tree with `key` mapped to `value`. `self` is untouched.
    pub fn insert(&self, key: &str, value: V) -> Tree<V> {
        let (root, is_new) = insert_rec(&self.root, key, value);
        Tree { root: Some(root), len: self.len + usize::from(is_new) }
    }

    /// Returns a new tree with `key` absent. `self` is untouched.
    pub fn remove(&self, key: &str) -> Tree<V> {
        let (root, removed) = remove_rec(&self.root, key);
        Tree { root, len: self.len - usize::from(removed) }
    }

    /// Ascending iteration over `[lo, hi)`, calling `f(key, value)` for each
    /// entry until `f` returns `false`. Returns whether iteration ran to
    /// completion (`true`) or was stopped early (`false`).
    pub fn range<F>(&self, lo: Bound<&str>, hi: Bound<&str>, mut f: F) -> bool
    where
        F: FnMut(&str, &V) -> bool,
    {
        visit(&self.root, &lo, &hi, &mut f)
    }
}

/// The smallest string that is a strict upper bound for every string with
/// `prefix` as a prefix, found by incrementing the last byte of `prefix`.
///
/// Per spec §4.A/§9: this does **not** handle the case where the last byte
/// is `0xff` (it would need to roll over and extend the string); callers
/// must not rely on pivots or prefixes whose last byte is `0xff`. This is an
/// accepted limitation carried over from the source, not a bug to silently
/// paper over.
pub fn increment_last_byte(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.wrapping_add(1);
    }
    String::from_utf8(bytes).unwrap_or_else(|_| prefix.to_string())
}
