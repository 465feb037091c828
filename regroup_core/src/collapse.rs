//! Folding groups into atomic blocks for header drags.
//!
//! While a group header is dragged, every group's members and footer are
//! marked collapsed so only headers and standalone items take part in the
//! reorder. Collapsed entries keep their data and their `order_index`;
//! [`expand_all`] puts them back behind wherever their header ended up.

use crate::{ExerciseItem, GroupFooter, GroupId, ListEntry, WorkingList};
use std::collections::HashMap;

/// Fold all groups for a drag of `group_id`'s header.
///
/// The dragged group's header is marked collapsed as well (it renders as
/// the whole block); other headers stay expanded so they remain drop
/// boundaries. Unknown group ids leave the list unchanged.
pub fn collapse_for_drag(list: &WorkingList, group_id: &GroupId) -> WorkingList {
    if list.header(group_id).is_none() {
        tracing::debug!("No group {} to collapse", group_id);
        return list.clone();
    }

    let mut result = list.clone();
    for entry in result.entries_mut().iter_mut() {
        let collapse = match entry {
            ListEntry::Header(h) => &h.group_id == group_id,
            ListEntry::Item(item) => item.group_id.is_some(),
            ListEntry::Footer(_) => true,
        };
        if collapse {
            entry.set_collapsed(true);
        }
    }

    tracing::debug!("Collapsed groups for drag of {}", group_id);
    result
}

/// Unfold every collapsed group behind its header's current position.
///
/// Members are re-sorted by `order_index` and the footer goes last. A list
/// without collapsed entries is returned unchanged.
pub fn expand_all(list: &WorkingList) -> WorkingList {
    if !list.has_collapsed() {
        return list.clone();
    }

    let mut detached: HashMap<GroupId, (Vec<ExerciseItem>, Option<GroupFooter>)> = HashMap::new();
    let mut anchors = Vec::with_capacity(list.len());

    for entry in list.clone().into_entries() {
        match entry {
            ListEntry::Item(item) if item.collapsed && item.group_id.is_some() => {
                if let Some(gid) = item.group_id.clone() {
                    detached.entry(gid).or_default().0.push(item);
                }
            }
            ListEntry::Footer(footer) if footer.collapsed => {
                let gid = footer.group_id.clone();
                detached.entry(gid).or_default().1 = Some(footer);
            }
            other => anchors.push(other),
        }
    }

    let mut entries = Vec::with_capacity(list.len());
    for mut entry in anchors {
        entry.set_collapsed(false);
        let block = match &entry {
            ListEntry::Header(h) => detached.remove(&h.group_id),
            _ => None,
        };
        entries.push(entry);

        if let Some((mut members, footer)) = block {
            members.sort_by_key(|m| m.order_index);
            for mut member in members {
                member.collapsed = false;
                entries.push(ListEntry::Item(member));
            }
            if let Some(mut footer) = footer {
                footer.collapsed = false;
                entries.push(ListEntry::Footer(footer));
            }
        }
    }

    // Members whose header vanished become standalone at the end
    for (gid, (mut members, _)) in detached {
        tracing::warn!("Group {} lost its header while collapsed", gid);
        members.sort_by_key(|m| m.order_index);
        for mut member in members {
            member.collapsed = false;
            member.clear_group();
            entries.push(ListEntry::Item(member));
        }
    }

    WorkingList::new(entries)
}
