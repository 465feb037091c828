//! Group membership after a drag settles.
//!
//! Membership is recomputed from scratch from the header/footer sentinels on
//! every settle, never patched incrementally: an item belongs to group G
//! exactly when the nearest sentinel above it is G's header and the nearest
//! sentinel below it is G's footer.

use crate::collapse::expand_all;
use crate::{GroupId, ListEntry, WorkingList};
use std::collections::HashSet;

/// Reassign every item's group from its position between sentinels
pub fn resolve(list: &WorkingList) -> WorkingList {
    let owners: Vec<Option<GroupId>> = (0..list.len())
        .map(|i| enclosing_group(list.entries(), i))
        .collect();

    let mut result = list.clone();
    let mut moved = 0;
    for (entry, owner) in result.entries_mut().iter_mut().zip(owners) {
        if let ListEntry::Item(item) = entry {
            if item.group_id != owner {
                moved += 1;
            }
            match owner {
                Some(gid) => item.group_id = Some(gid),
                None => item.clear_group(),
            }
        }
    }

    if moved > 0 {
        tracing::debug!("Membership changed for {} items", moved);
    }
    result.normalize();
    result
}

/// Group enclosing the item at `pos`, or None for sentinels and standalone items
fn enclosing_group(entries: &[ListEntry], pos: usize) -> Option<GroupId> {
    if !matches!(entries.get(pos), Some(ListEntry::Item(_))) {
        return None;
    }

    let above = entries[..pos].iter().rev().find_map(|e| match e {
        ListEntry::Header(h) => Some(Some(&h.group_id)),
        ListEntry::Footer(_) => Some(None),
        ListEntry::Item(_) => None,
    })??;

    let below = entries[pos + 1..].iter().find_map(|e| match e {
        ListEntry::Footer(f) => Some(Some(&f.group_id)),
        ListEntry::Header(_) => Some(None),
        ListEntry::Item(_) => None,
    })??;

    (above == below).then(|| above.clone())
}

/// Everything that must happen once a drag is dropped:
/// unfold collapsed groups, re-derive membership, then drop sentinels that
/// no longer delimit anything.
pub fn settle_after_drag(list: &WorkingList) -> WorkingList {
    let expanded = expand_all(list);
    let resolved = resolve(&expanded);
    prune_sentinels(&resolved)
}

/// Remove empty groups (header directly followed by its footer) and
/// sentinels without a partner in the right order.
pub fn prune_sentinels(list: &WorkingList) -> WorkingList {
    let entries = list.entries();
    let mut drop = vec![false; entries.len()];
    let mut opened: HashSet<&GroupId> = HashSet::new();

    for (i, entry) in entries.iter().enumerate() {
        match entry {
            ListEntry::Header(h) => {
                let closes = entries[i + 1..]
                    .iter()
                    .any(|e| matches!(e, ListEntry::Footer(f) if f.group_id == h.group_id));
                let empty = matches!(
                    entries.get(i + 1),
                    Some(ListEntry::Footer(f)) if f.group_id == h.group_id
                );
                if !closes || empty || opened.contains(&h.group_id) {
                    drop[i] = true;
                    if empty {
                        drop[i + 1] = true;
                    }
                } else {
                    opened.insert(&h.group_id);
                }
            }
            ListEntry::Footer(f) => {
                if !opened.remove(&f.group_id) {
                    drop[i] = true;
                }
            }
            ListEntry::Item(_) => {}
        }
    }

    let removed = drop.iter().filter(|d| **d).count();
    if removed == 0 {
        return list.clone();
    }
    tracing::debug!("Pruned {} orphaned or empty group sentinels", removed);

    let kept: Vec<ListEntry> = list
        .clone()
        .into_entries()
        .into_iter()
        .zip(drop)
        .filter_map(|(entry, dropped)| (!dropped).then_some(entry))
        .collect();

    // Items left inside a removed pair lose their membership
    resolve(&WorkingList::from_raw(kept))
}
