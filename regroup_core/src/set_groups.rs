//! Set-group operations.
//!
//! Each operation takes an item and returns an updated copy with its derived
//! `count`/`special` recomputed. Guards (decrement at 1, deleting the last
//! set-group, unknown set-group ids) return an unchanged copy.

use crate::{ExerciseItem, ItemId, ListEntry, SetGroupId, WorkingList};
use serde::{Deserialize, Serialize};

/// Editing action on one set-group of one item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetGroupOp {
    Increment,
    Decrement,
    ToggleSpecial,
    InsertAfter,
    Delete,
}

/// Apply `op` to the named set-group
pub fn apply(item: &ExerciseItem, set_group_id: &SetGroupId, op: SetGroupOp) -> ExerciseItem {
    match op {
        SetGroupOp::Increment => increment(item, set_group_id),
        SetGroupOp::Decrement => decrement(item, set_group_id),
        SetGroupOp::ToggleSpecial => toggle_special(item, set_group_id),
        SetGroupOp::InsertAfter => insert_after(item, set_group_id),
        SetGroupOp::Delete => delete(item, set_group_id),
    }
}

/// Apply `op` to a set-group of an item in the list
pub fn apply_in_list(
    list: &WorkingList,
    item_id: &ItemId,
    set_group_id: &SetGroupId,
    op: SetGroupOp,
) -> WorkingList {
    list.with_item_updated(item_id, |item| apply(item, set_group_id, op))
}

pub fn increment(item: &ExerciseItem, set_group_id: &SetGroupId) -> ExerciseItem {
    update(item, set_group_id, |sgs, idx| {
        sgs[idx].count = sgs[idx].count.saturating_add(1);
    })
}

/// No-op at count 1
pub fn decrement(item: &ExerciseItem, set_group_id: &SetGroupId) -> ExerciseItem {
    update(item, set_group_id, |sgs, idx| {
        if sgs[idx].count > 1 {
            sgs[idx].count -= 1;
        } else {
            tracing::debug!("Set-group {} already at 1, not decrementing", sgs[idx].id);
        }
    })
}

/// Flip one set-group's flag; the item flag becomes the OR over all of them
pub fn toggle_special(item: &ExerciseItem, set_group_id: &SetGroupId) -> ExerciseItem {
    update(item, set_group_id, |sgs, idx| {
        sgs[idx].special = !sgs[idx].special;
    })
}

/// Insert a freshly-id'd copy right after the named set-group
pub fn insert_after(item: &ExerciseItem, set_group_id: &SetGroupId) -> ExerciseItem {
    update(item, set_group_id, |sgs, idx| {
        let copy = sgs[idx].duplicate();
        sgs.insert(idx + 1, copy);
    })
}

/// No-op when it is the item's only set-group
pub fn delete(item: &ExerciseItem, set_group_id: &SetGroupId) -> ExerciseItem {
    update(item, set_group_id, |sgs, idx| {
        if sgs.len() > 1 {
            sgs.remove(idx);
        } else {
            tracing::debug!("Refusing to delete last set-group {}", sgs[idx].id);
        }
    })
}

fn update<F>(item: &ExerciseItem, set_group_id: &SetGroupId, f: F) -> ExerciseItem
where
    F: FnOnce(&mut Vec<crate::SetGroup>, usize),
{
    let mut updated = item.clone();
    match updated.set_groups.iter().position(|sg| &sg.id == set_group_id) {
        Some(idx) => f(&mut updated.set_groups, idx),
        None => tracing::debug!("Item {} has no set-group {}", item.id, set_group_id),
    }
    updated.refresh();
    updated
}

/// Insert a copy of an item right after it, with fresh item and set-group ids.
///
/// A group member's copy joins the same group; first/last flags are
/// re-derived across the enlarged member set.
pub fn duplicate_item(list: &WorkingList, item_id: &ItemId) -> WorkingList {
    let mut result = list.clone();
    let Some(pos) = result.item_position(item_id) else {
        tracing::debug!("No item {} to duplicate", item_id);
        return result;
    };

    let copy = match &result.entries()[pos] {
        ListEntry::Item(source) => {
            let mut copy = source.clone();
            copy.id = ItemId::generate();
            copy.set_groups = source.set_groups.iter().map(|sg| sg.duplicate()).collect();
            copy.refresh();
            copy
        }
        _ => return result,
    };

    tracing::debug!("Duplicated item {} as {}", item_id, copy.id);
    result.entries_mut().insert(pos + 1, ListEntry::Item(copy));
    result.normalize();
    result
}
