//! One-to-one association between two key sets.

use std::collections::HashMap;
use std::hash::Hash;

/// A bijective association between left and right keys.
///
/// Each left key maps to at most one right key and vice versa. Insertion is
/// rejected when either side is already bound to a different counterpart, so
/// the association is a true bijection at all times.
#[derive(Debug, Clone, Default)]
pub struct BijectiveAssociation<L, R>
where
    L: Eq + Hash + Clone,
    R: Eq + Hash + Clone,
{
    forward: HashMap<L, R>,
    backward: HashMap<R, L>,
}

impl<L, R> BijectiveAssociation<L, R>
where
    L: Eq + Hash + Clone,
    R: Eq + Hash + Clone,
{
    /// Create an empty association.
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    /// Insert a pair.
    ///
    /// Returns `true` if the pair is now present. Returns `false`, leaving
    /// every existing mapping unchanged, when either key is already bound to
    /// a different counterpart. Re-inserting an existing pair succeeds.
    pub fn insert(&mut self, left: L, right: R) -> bool {
        match (self.forward.get(&left), self.backward.get(&right)) {
            (Some(r), _) if *r != right => false,
            (_, Some(l)) if *l != left => false,
            _ => {
                self.forward.insert(left.clone(), right.clone());
                self.backward.insert(right, left);
                true
            }
        }
    }

    /// Right key associated with `left`, if any.
    pub fn get(&self, left: &L) -> Option<&R> {
        self.forward.get(left)
    }

    /// Left key associated with `right`, if any.
    pub fn key_of(&self, right: &R) -> Option<&L> {
        self.backward.get(right)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the association is empty.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate over all pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, &R)> {
        self.forward.iter()
    }
}
