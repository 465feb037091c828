//! Core domain types for the regroup editing engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Identifiers for items, set-groups and groups
//! - Set-groups and exercise items
//! - Group sentinels and the working list they delimit
//! - Persisted workout shapes read at session start

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Creates a fresh random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the string representation
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of one exercise card in the working list
    ItemId
);
string_id!(
    /// Identifier of one set-group inside an item
    SetGroupId
);
string_id!(
    /// Identifier of a Superset/HIIT group
    GroupId
);

// ============================================================================
// Set-groups and exercises
// ============================================================================

/// One contiguous run of identical sets for one exercise
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetGroup {
    pub id: SetGroupId,
    pub count: u32,
    #[serde(default)]
    pub special: bool,
}

impl SetGroup {
    /// Creates a set-group with a fresh id. Counts below 1 are raised to 1.
    pub fn new(count: u32, special: bool) -> Self {
        Self {
            id: SetGroupId::generate(),
            count: count.max(1),
            special,
        }
    }

    /// Clone with a fresh id
    pub fn duplicate(&self) -> Self {
        Self {
            id: SetGroupId::generate(),
            count: self.count,
            special: self.special,
        }
    }
}

/// Exercise catalog entry, referenced by value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Kind of exercise group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Superset,
    Hiit,
}

impl GroupKind {
    /// Superset <-> HIIT
    pub fn toggled(self) -> Self {
        match self {
            GroupKind::Superset => GroupKind::Hiit,
            GroupKind::Hiit => GroupKind::Superset,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Superset => write!(f, "Superset"),
            GroupKind::Hiit => write!(f, "HIIT"),
        }
    }
}

/// A draggable exercise card
///
/// `count` and `special` are derived from `set_groups` and refreshed by
/// [`ExerciseItem::refresh`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseItem {
    pub id: ItemId,
    pub exercise: ExerciseRef,
    pub order_index: usize,
    pub set_groups: Vec<SetGroup>,
    pub group_id: Option<GroupId>,
    pub is_first_in_group: bool,
    pub is_last_in_group: bool,
    pub count: u32,
    pub special: bool,
    pub collapsed: bool,
}

impl ExerciseItem {
    /// Creates a standalone item and derives its totals
    pub fn new(id: ItemId, exercise: ExerciseRef, set_groups: Vec<SetGroup>) -> Self {
        let mut item = Self {
            id,
            exercise,
            order_index: 0,
            set_groups,
            group_id: None,
            is_first_in_group: false,
            is_last_in_group: false,
            count: 1,
            special: false,
            collapsed: false,
        };
        item.refresh();
        item
    }

    /// Recompute `count` and `special` from the set-groups.
    ///
    /// An item without set-groups gets one synthesized from the cached
    /// `count`/`special` values before the totals are recomputed. Set-group
    /// counts below 1 are raised to 1 and the total saturates at `u32::MAX`.
    pub fn refresh(&mut self) {
        if self.set_groups.is_empty() {
            tracing::warn!(
                "Item {} has no set-groups, synthesizing one from count {}",
                self.id,
                self.count
            );
            self.set_groups.push(SetGroup::new(self.count, self.special));
        }
        for sg in self.set_groups.iter_mut().filter(|sg| sg.count == 0) {
            tracing::warn!("Set-group {} of item {} has count 0, raising to 1", sg.id, self.id);
            sg.count = 1;
        }
        self.count = self
            .set_groups
            .iter()
            .fold(0u32, |total, sg| total.saturating_add(sg.count));
        self.special = self.set_groups.iter().any(|sg| sg.special);
    }

    /// True if the item belongs to no group
    pub fn is_standalone(&self) -> bool {
        self.group_id.is_none()
    }

    /// Look up one of the item's set-groups
    pub fn set_group(&self, id: &SetGroupId) -> Option<&SetGroup> {
        self.set_groups.iter().find(|sg| &sg.id == id)
    }

    /// Drop group membership and the first/last flags
    pub fn clear_group(&mut self) {
        self.group_id = None;
        self.is_first_in_group = false;
        self.is_last_in_group = false;
    }
}

// ============================================================================
// Working list
// ============================================================================

/// Sentinel opening a group's extent in the working list
#[derive(Clone, Debug, PartialEq)]
pub struct GroupHeader {
    pub group_id: GroupId,
    pub kind: GroupKind,
    pub number: u32,
    /// Display names of the group's members
    pub summary: Vec<String>,
    pub collapsed: bool,
}

impl GroupHeader {
    pub fn new(group_id: GroupId, kind: GroupKind, number: u32) -> Self {
        Self {
            group_id,
            kind,
            number,
            summary: Vec::new(),
            collapsed: false,
        }
    }
}

/// Sentinel closing a group's extent in the working list
#[derive(Clone, Debug, PartialEq)]
pub struct GroupFooter {
    pub group_id: GroupId,
    pub kind: GroupKind,
    pub collapsed: bool,
}

impl GroupFooter {
    pub fn new(group_id: GroupId, kind: GroupKind) -> Self {
        Self {
            group_id,
            kind,
            collapsed: false,
        }
    }
}

/// One row of the working list
#[derive(Clone, Debug, PartialEq)]
pub enum ListEntry {
    Header(GroupHeader),
    Item(ExerciseItem),
    Footer(GroupFooter),
}

/// Stable handle for any list entry, as delivered by drag gestures
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntryKey {
    Header(GroupId),
    Item(ItemId),
    Footer(GroupId),
}

impl ListEntry {
    pub fn key(&self) -> EntryKey {
        match self {
            ListEntry::Header(h) => EntryKey::Header(h.group_id.clone()),
            ListEntry::Item(item) => EntryKey::Item(item.id.clone()),
            ListEntry::Footer(f) => EntryKey::Footer(f.group_id.clone()),
        }
    }

    /// Group this entry belongs to, if any
    pub fn group_id(&self) -> Option<&GroupId> {
        match self {
            ListEntry::Header(h) => Some(&h.group_id),
            ListEntry::Item(item) => item.group_id.as_ref(),
            ListEntry::Footer(f) => Some(&f.group_id),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            ListEntry::Header(h) => h.collapsed,
            ListEntry::Item(item) => item.collapsed,
            ListEntry::Footer(f) => f.collapsed,
        }
    }

    pub(crate) fn set_collapsed(&mut self, collapsed: bool) {
        match self {
            ListEntry::Header(h) => h.collapsed = collapsed,
            ListEntry::Item(item) => item.collapsed = collapsed,
            ListEntry::Footer(f) => f.collapsed = collapsed,
        }
    }

    pub fn as_item(&self) -> Option<&ExerciseItem> {
        match self {
            ListEntry::Item(item) => Some(item),
            _ => None,
        }
    }
}

/// Ordered sequence of headers, items and footers; the single source of
/// truth for one editing session.
///
/// Every header with id G is followed by exactly one footer with id G, and
/// all items with `group_id == G` lie between them.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WorkingList {
    entries: Vec<ListEntry>,
}

impl WorkingList {
    /// Build a list and derive order indices, group flags and header summaries
    pub fn new(entries: Vec<ListEntry>) -> Self {
        let mut list = Self { entries };
        list.normalize();
        list
    }

    /// Build a list exactly as given, without deriving anything
    pub fn from_raw(entries: Vec<ListEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &ExerciseItem> {
        self.entries.iter().filter_map(ListEntry::as_item)
    }

    pub fn item(&self, id: &ItemId) -> Option<&ExerciseItem> {
        self.items().find(|item| &item.id == id)
    }

    pub fn position(&self, key: &EntryKey) -> Option<usize> {
        self.entries.iter().position(|e| &e.key() == key)
    }

    pub fn item_position(&self, id: &ItemId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_item().is_some_and(|item| &item.id == id))
    }

    pub fn header(&self, group_id: &GroupId) -> Option<&GroupHeader> {
        self.entries.iter().find_map(|e| match e {
            ListEntry::Header(h) if &h.group_id == group_id => Some(h),
            _ => None,
        })
    }

    pub fn footer(&self, group_id: &GroupId) -> Option<&GroupFooter> {
        self.entries.iter().find_map(|e| match e {
            ListEntry::Footer(f) if &f.group_id == group_id => Some(f),
            _ => None,
        })
    }

    /// Headers in list order
    pub fn headers(&self) -> impl Iterator<Item = &GroupHeader> {
        self.entries.iter().filter_map(|e| match e {
            ListEntry::Header(h) => Some(h),
            _ => None,
        })
    }

    /// Members of a group, in list order
    pub fn members(&self, group_id: &GroupId) -> Vec<&ExerciseItem> {
        self.items()
            .filter(|item| item.group_id.as_ref() == Some(group_id))
            .collect()
    }

    pub fn keys(&self) -> Vec<EntryKey> {
        self.entries.iter().map(ListEntry::key).collect()
    }

    pub fn has_collapsed(&self) -> bool {
        self.entries.iter().any(ListEntry::is_collapsed)
    }

    /// Copy of the list with one item modified; unknown ids leave it unchanged
    pub fn with_item_updated<F>(&self, id: &ItemId, f: F) -> WorkingList
    where
        F: FnOnce(&ExerciseItem) -> ExerciseItem,
    {
        let mut list = self.clone();
        match list.item_position(id) {
            Some(pos) => {
                if let ListEntry::Item(item) = &list.entries[pos] {
                    let updated = f(item);
                    list.entries[pos] = ListEntry::Item(updated);
                }
                list.normalize();
            }
            None => tracing::debug!("No item {} in working list", id),
        }
        list
    }

    /// Raw reorder delivered by a drag-end.
    ///
    /// Unknown keys are ignored and entries missing from `keys` keep their
    /// relative order after the named ones. Membership is not touched; run
    /// [`crate::membership::settle_after_drag`] afterwards.
    pub fn reordered(&self, keys: &[EntryKey]) -> WorkingList {
        let mut remaining: Vec<Option<ListEntry>> =
            self.entries.iter().cloned().map(Some).collect();
        let index: HashMap<EntryKey, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), i))
            .collect();

        let mut entries = Vec::with_capacity(self.entries.len());
        for key in keys {
            match index.get(key).and_then(|&i| remaining[i].take()) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!("Ignoring unknown or repeated drag key {:?}", key),
            }
        }

        let leftover = remaining.iter().filter(|e| e.is_some()).count();
        if leftover > 0 {
            tracing::warn!("{} entries missing from drag result, keeping them at the end", leftover);
        }
        entries.extend(remaining.into_iter().flatten());

        WorkingList { entries }
    }

    /// Raw single-entry move, the common shape of a drag-end
    pub fn moved(&self, from: usize, to: usize) -> WorkingList {
        let mut list = self.clone();
        if from >= list.entries.len() {
            tracing::warn!("Move source {} out of range", from);
            return list;
        }
        let entry = list.entries.remove(from);
        let to = to.min(list.entries.len());
        list.entries.insert(to, entry);
        list
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<ListEntry> {
        &mut self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<ListEntry> {
        self.entries
    }

    /// Re-derive order indices, first/last flags and header summaries.
    ///
    /// Order indices are frozen while any entry is collapsed; expansion
    /// relies on them.
    pub(crate) fn normalize(&mut self) {
        if !self.has_collapsed() {
            for (i, entry) in self.entries.iter_mut().enumerate() {
                if let ListEntry::Item(item) = entry {
                    item.order_index = i;
                }
            }
        }

        let mut bounds: HashMap<GroupId, (usize, usize)> = HashMap::new();
        let mut names: HashMap<GroupId, Vec<String>> = HashMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if let ListEntry::Item(item) = entry {
                if let Some(gid) = &item.group_id {
                    bounds
                        .entry(gid.clone())
                        .and_modify(|b| b.1 = i)
                        .or_insert((i, i));
                    names
                        .entry(gid.clone())
                        .or_default()
                        .push(item.exercise.name.clone());
                }
            }
        }

        for (i, entry) in self.entries.iter_mut().enumerate() {
            match entry {
                ListEntry::Item(item) => match item.group_id.as_ref().and_then(|g| bounds.get(g)) {
                    Some(&(first, last)) => {
                        item.is_first_in_group = first == i;
                        item.is_last_in_group = last == i;
                    }
                    None => {
                        item.is_first_in_group = false;
                        item.is_last_in_group = false;
                    }
                },
                ListEntry::Header(h) => {
                    h.summary = names.remove(&h.group_id).unwrap_or_default();
                }
                ListEntry::Footer(_) => {}
            }
        }
    }
}

// ============================================================================
// Persisted shapes
// ============================================================================

/// A group as persisted: its members are positions in the flat order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseGroup {
    pub id: GroupId,
    pub kind: GroupKind,
    pub number: u32,
    pub member_indices: Vec<usize>,
}

/// Legacy de-duplicated per-exercise summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedSummary {
    pub exercise_id: String,
    pub count: u32,
    #[serde(default)]
    pub special: bool,
}

/// Everything persisted about a workout's ordering, read at session start
///
/// `ordered_ids`, `groups` and `grouped_summaries` form the legacy shape;
/// `item_order_indices` and `item_set_groups` form the structured shape.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkoutSnapshot {
    #[serde(default)]
    pub ordered_ids: Vec<String>,
    #[serde(default)]
    pub groups: Vec<ExerciseGroup>,
    #[serde(default)]
    pub grouped_summaries: Vec<GroupedSummary>,
    #[serde(default)]
    pub special_ids: Vec<String>,
    #[serde(default)]
    pub item_order_indices: BTreeMap<ItemId, Vec<usize>>,
    #[serde(default)]
    pub item_set_groups: BTreeMap<ItemId, Vec<SetGroup>>,
}
