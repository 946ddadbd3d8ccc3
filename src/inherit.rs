//! Inheritance linearization and effective member computation.
//!
//! Classes may extend several bases. The chain is flattened depth-first,
//! left to right in declaration order, each class visited once. The class
//! itself always comes first, so the most derived definition of a member
//! shadows everything above it.

use std::collections::HashSet;

use crate::model::{EntityId, ObjectModel};

/// A member as seen through the inheritance chain of some class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveMember {
    /// Local name within the defining class.
    pub name: String,
    /// The class in the chain that defines this member.
    pub defined_in: EntityId,
    pub member: EntityId,
}

/// Flatten the inheritance chain of `class`: the class itself, then its
/// bases depth-first in declaration order. Unresolved bases are skipped;
/// cycles are broken by the visited set, so this always terminates.
pub fn linearize(model: &ObjectModel, class: EntityId) -> Vec<EntityId> {
    linearize_checked(model, class).0
}

/// Like [`linearize`], also reporting whether a cycle was detected (the
/// class reachable as its own transitive ancestor).
pub fn linearize_checked(model: &ObjectModel, class: EntityId) -> (Vec<EntityId>, bool) {
    let mut chain = vec![class];
    let mut visited = HashSet::from([class]);
    let mut cyclic = false;
    visit(model, class, &mut visited, &mut chain, class, &mut cyclic);
    (chain, cyclic)
}

fn visit(
    model: &ObjectModel,
    current: EntityId,
    visited: &mut HashSet<EntityId>,
    chain: &mut Vec<EntityId>,
    origin: EntityId,
    cyclic: &mut bool,
) {
    for (_, resolved) in &model.entity(current).bases {
        let Some(base) = *resolved else { continue };
        if base == origin {
            *cyclic = true;
        }
        if visited.insert(base) {
            chain.push(base);
            visit(model, base, visited, chain, origin, cyclic);
        }
    }
}

/// Every member visible on `class` through its inheritance chain, in chain
/// order with the defining class's insertion order within each class. The
/// first definition of each name wins.
pub fn effective_members(model: &ObjectModel, class: EntityId) -> Vec<EffectiveMember> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    for cls in linearize(model, class) {
        for (name, member) in &model.entity(cls).children {
            if seen.insert(name.clone()) {
                members.push(EffectiveMember {
                    name: name.clone(),
                    defined_in: cls,
                    member: *member,
                });
            }
        }
    }
    members
}
