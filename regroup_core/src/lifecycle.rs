//! Creating, dissolving and editing groups.

use crate::{
    GroupFooter, GroupHeader, GroupId, GroupKind, ItemId, ListEntry, WorkingList,
};
use std::collections::HashSet;

/// Wrap the selected standalone items in a new group.
///
/// Members keep their current relative order regardless of selection order,
/// and the block lands where the earliest of them was. The group gets the
/// next free number for its kind. Grouped or unknown ids are skipped; if
/// nothing is left the list is returned unchanged with no group id.
pub fn create_group(
    list: &WorkingList,
    selected: &[ItemId],
    kind: GroupKind,
) -> (WorkingList, Option<GroupId>) {
    let mut positions: Vec<usize> = Vec::new();
    let mut seen = HashSet::new();
    for id in selected {
        if !seen.insert(id) {
            continue;
        }
        match list.item_position(id) {
            Some(pos) if list.entries()[pos].group_id().is_none() => positions.push(pos),
            Some(_) => tracing::warn!("Item {} already belongs to a group, skipping", id),
            None => tracing::warn!("No item {} to group, skipping", id),
        }
    }

    if positions.is_empty() {
        tracing::debug!("Empty selection, no group created");
        return (list.clone(), None);
    }
    positions.sort_unstable();

    let number = next_group_number(list, kind);
    let group_id = GroupId::generate();
    let insert_at = positions[0];

    let chosen: HashSet<usize> = positions.iter().copied().collect();
    let mut members = Vec::with_capacity(positions.len());
    let mut entries = Vec::with_capacity(list.len() + 2);
    for (i, entry) in list.clone().into_entries().into_iter().enumerate() {
        if chosen.contains(&i) {
            if let ListEntry::Item(mut item) = entry {
                item.group_id = Some(group_id.clone());
                members.push(ListEntry::Item(item));
            }
        } else {
            entries.push(entry);
        }
    }

    let mut block = Vec::with_capacity(members.len() + 2);
    block.push(ListEntry::Header(GroupHeader::new(group_id.clone(), kind, number)));
    block.extend(members);
    block.push(ListEntry::Footer(GroupFooter::new(group_id.clone(), kind)));
    let tail = entries.split_off(insert_at);
    entries.extend(block);
    entries.extend(tail);

    tracing::info!(
        "Created {} {} ({}) with {} members",
        kind,
        number,
        group_id,
        positions.len()
    );
    (WorkingList::new(entries), Some(group_id))
}

/// Highest existing number for `kind` plus one
pub fn next_group_number(list: &WorkingList, kind: GroupKind) -> u32 {
    list.headers()
        .filter(|h| h.kind == kind)
        .map(|h| h.number)
        .max()
        .unwrap_or(0)
        + 1
}

/// Remove an item; a group left with fewer than two members is dissolved
pub fn delete_item(list: &WorkingList, item_id: &ItemId) -> WorkingList {
    let Some(pos) = list.item_position(item_id) else {
        tracing::debug!("No item {} to delete", item_id);
        return list.clone();
    };

    let mut result = list.clone();
    let removed = result.entries_mut().remove(pos);
    tracing::debug!("Deleted item {}", item_id);

    if let Some(gid) = removed.group_id() {
        if result.members(gid).len() < 2 {
            tracing::info!("Group {} dropped below two members, dissolving", gid);
            return dissolve_group(&result, gid);
        }
    }

    result.normalize();
    result
}

/// Remove a group's sentinels and make its members standalone
pub fn dissolve_group(list: &WorkingList, group_id: &GroupId) -> WorkingList {
    let entries: Vec<ListEntry> = list
        .clone()
        .into_entries()
        .into_iter()
        .filter_map(|entry| match entry {
            ListEntry::Header(h) if &h.group_id == group_id => None,
            ListEntry::Footer(f) if &f.group_id == group_id => None,
            ListEntry::Item(mut item) => {
                if item.group_id.as_ref() == Some(group_id) {
                    item.clear_group();
                }
                Some(ListEntry::Item(item))
            }
            other => Some(other),
        })
        .collect();
    WorkingList::new(entries)
}

/// Flip Superset <-> HIIT on a group's sentinels; the number is kept
pub fn toggle_group_kind(list: &WorkingList, group_id: &GroupId) -> WorkingList {
    let mut result = list.clone();
    for entry in result.entries_mut().iter_mut() {
        match entry {
            ListEntry::Header(h) if &h.group_id == group_id => h.kind = h.kind.toggled(),
            ListEntry::Footer(f) if &f.group_id == group_id => f.kind = f.kind.toggled(),
            _ => {}
        }
    }
    result
}
