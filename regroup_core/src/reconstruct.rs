//! Rebuilding the working list from a persisted workout.
//!
//! Two persisted shapes exist. The structured shape (item id -> flat indices,
//! item id -> set-groups) keeps separately edited cards for the same exercise
//! apart; the legacy shape (flat ids + group ranges + summaries) is the
//! fallback when no structured state has been saved yet. The choice is made
//! once, up front, by [`ReconstructionSource::select`].

use crate::{
    ExerciseGroup, ExerciseItem, ExerciseLookup, ExerciseRef, GroupFooter, GroupHeader, GroupId,
    ItemId, ListEntry, SetGroup, SetGroupId, WorkingList, WorkoutSnapshot,
};
use std::collections::{HashMap, HashSet};

/// Which persisted shape drives reconstruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconstructionSource {
    /// Item id -> order indices and item id -> set-groups
    Structured,
    /// Flat ordered ids with group ranges and grouped summaries
    Legacy,
}

impl ReconstructionSource {
    /// Structured wins when both of its maps are non-empty
    pub fn select(snapshot: &WorkoutSnapshot) -> Self {
        if !snapshot.item_order_indices.is_empty() && !snapshot.item_set_groups.is_empty() {
            ReconstructionSource::Structured
        } else {
            ReconstructionSource::Legacy
        }
    }
}

/// One logical item before sentinels are placed
struct Draft {
    id: ItemId,
    exercise: ExerciseRef,
    indices: Vec<usize>,
    set_groups: Vec<SetGroup>,
}

impl Draft {
    fn first_index(&self) -> usize {
        self.indices.first().copied().unwrap_or(usize::MAX)
    }
}

/// Build the working list from whichever shape the snapshot supports best
pub fn reconstruct(snapshot: &WorkoutSnapshot, catalog: &impl ExerciseLookup) -> WorkingList {
    let source = ReconstructionSource::select(snapshot);
    reconstruct_from(snapshot, catalog, source)
}

/// Build the working list from an explicitly chosen shape
pub fn reconstruct_from(
    snapshot: &WorkoutSnapshot,
    catalog: &impl ExerciseLookup,
    source: ReconstructionSource,
) -> WorkingList {
    let drafts = match source {
        ReconstructionSource::Structured => structured_drafts(snapshot, catalog),
        ReconstructionSource::Legacy => legacy_drafts(snapshot, catalog),
    };
    tracing::info!(
        "Reconstructed {} items from {:?} shape",
        drafts.len(),
        source
    );
    place_sentinels(drafts, &snapshot.groups)
}

fn structured_drafts(snapshot: &WorkoutSnapshot, catalog: &impl ExerciseLookup) -> Vec<Draft> {
    let special: HashSet<&str> = snapshot.special_ids.iter().map(String::as_str).collect();
    let mut drafts = Vec::new();

    for (item_id, indices) in &snapshot.item_order_indices {
        let mut indices = indices.clone();
        indices.sort_unstable();
        indices.dedup();

        let Some(&first) = indices.first() else {
            tracing::debug!("Item {} has no order indices, skipping", item_id);
            continue;
        };
        let Some(exercise_id) = snapshot.ordered_ids.get(first) else {
            tracing::warn!(
                "Item {} points at flat index {} beyond order of length {}",
                item_id,
                first,
                snapshot.ordered_ids.len()
            );
            continue;
        };
        let Some(exercise) = catalog.lookup(exercise_id) else {
            tracing::debug!("Dropping item {}: unknown exercise '{}'", item_id, exercise_id);
            continue;
        };

        let set_groups = match snapshot.item_set_groups.get(item_id) {
            Some(set_groups) if set_groups.is_empty() => {
                tracing::debug!("Item {} has no set-groups, treating as deleted", item_id);
                continue;
            }
            Some(set_groups) => set_groups.clone(),
            None => vec![SetGroup::new(
                indices.len() as u32,
                special.contains(exercise_id.as_str()),
            )],
        };

        drafts.push(Draft {
            id: item_id.clone(),
            exercise: exercise.clone(),
            indices,
            set_groups,
        });
    }

    drafts
}

fn legacy_drafts(snapshot: &WorkoutSnapshot, catalog: &impl ExerciseLookup) -> Vec<Draft> {
    let ids = &snapshot.ordered_ids;

    let owner: HashMap<usize, &GroupId> = index_owners(&snapshot.groups)
        .into_iter()
        .map(|(idx, group)| (idx, &group.id))
        .collect();
    let special: HashSet<&str> = snapshot
        .special_ids
        .iter()
        .map(String::as_str)
        .chain(
            snapshot
                .grouped_summaries
                .iter()
                .filter(|s| s.special)
                .map(|s| s.exercise_id.as_str()),
        )
        .collect();

    let mut drafts = Vec::new();
    let mut start = 0;
    while start < ids.len() {
        // Merge a run of equal ids, never across a group boundary
        let mut end = start;
        while end + 1 < ids.len()
            && ids[end + 1] == ids[start]
            && owner.get(&(end + 1)) == owner.get(&start)
        {
            end += 1;
        }

        let exercise_id = &ids[start];
        match catalog.lookup(exercise_id) {
            Some(exercise) => {
                let count = (end - start + 1) as u32;
                drafts.push(Draft {
                    id: ItemId::new(format!("{}@{}", exercise_id, start)),
                    exercise: exercise.clone(),
                    indices: (start..=end).collect(),
                    set_groups: vec![SetGroup {
                        id: SetGroupId::new(format!("{}@{}:0", exercise_id, start)),
                        count,
                        special: special.contains(exercise_id.as_str()),
                    }],
                });
            }
            None => {
                tracing::debug!("Dropping unknown exercise '{}' at {}", exercise_id, start)
            }
        }

        start = end + 1;
    }

    drafts
}

/// Flat index -> the group listing it in `member_indices`; the first group
/// to claim an index keeps it
fn index_owners(groups: &[ExerciseGroup]) -> HashMap<usize, &ExerciseGroup> {
    let mut owners = HashMap::new();
    for group in groups {
        for &idx in &group.member_indices {
            owners.entry(idx).or_insert(group);
        }
    }
    owners
}

/// Emit items in flat order, wrapping each group's members in a header and
/// a footer. A group with no surviving members emits nothing.
fn place_sentinels(mut drafts: Vec<Draft>, groups: &[ExerciseGroup]) -> WorkingList {
    drafts.sort_by_key(Draft::first_index);

    let owners = index_owners(groups);
    let owner_of = |first: usize| owners.get(&first).copied();

    let mut entries = Vec::with_capacity(drafts.len());
    let mut open: Option<&ExerciseGroup> = None;
    let mut emitted: HashSet<&GroupId> = HashSet::new();

    for draft in drafts {
        let mut owner = owner_of(draft.first_index());

        if let Some(group) = owner {
            let is_open = open.is_some_and(|o| o.id == group.id);
            if !is_open && emitted.contains(&group.id) {
                tracing::warn!(
                    "Group {} is not contiguous, item {} left standalone",
                    group.id,
                    draft.id
                );
                owner = None;
            }
        }

        if open.map(|o| &o.id) != owner.map(|g| &g.id) {
            if let Some(group) = open.take() {
                entries.push(ListEntry::Footer(GroupFooter::new(group.id.clone(), group.kind)));
            }
            if let Some(group) = owner {
                entries.push(ListEntry::Header(GroupHeader::new(
                    group.id.clone(),
                    group.kind,
                    group.number,
                )));
                emitted.insert(&group.id);
                open = Some(group);
            }
        }

        let mut item = ExerciseItem::new(draft.id, draft.exercise, draft.set_groups);
        item.group_id = owner.map(|g| g.id.clone());
        entries.push(ListEntry::Item(item));
    }

    if let Some(group) = open {
        entries.push(ListEntry::Footer(GroupFooter::new(group.id.clone(), group.kind)));
    }

    WorkingList::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExerciseCatalog, GroupKind, GroupedSummary};
    use std::collections::BTreeMap;

    fn catalog() -> ExerciseCatalog {
        ExerciseCatalog::from_exercises(["sq", "bp", "dl", "row"].iter().map(|id| ExerciseRef {
            id: id.to_string(),
            name: id.to_uppercase(),
            category: None,
        }))
    }

    fn group(id: &str, kind: GroupKind, number: u32, members: Vec<usize>) -> ExerciseGroup {
        ExerciseGroup {
            id: id.into(),
            kind,
            number,
            member_indices: members,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn shape(list: &WorkingList) -> Vec<String> {
        list.entries()
            .iter()
            .map(|e| match e {
                ListEntry::Header(h) => format!("H:{}", h.group_id),
                ListEntry::Item(i) => format!("{}x{}", i.exercise.id, i.count),
                ListEntry::Footer(f) => format!("F:{}", f.group_id),
            })
            .collect()
    }

    #[test]
    fn test_select_prefers_structured_only_when_both_maps_present() {
        let mut snapshot = WorkoutSnapshot::default();
        assert_eq!(ReconstructionSource::select(&snapshot), ReconstructionSource::Legacy);

        snapshot.item_order_indices.insert("a".into(), vec![0]);
        assert_eq!(ReconstructionSource::select(&snapshot), ReconstructionSource::Legacy);

        snapshot
            .item_set_groups
            .insert("a".into(), vec![SetGroup::new(1, false)]);
        assert_eq!(
            ReconstructionSource::select(&snapshot),
            ReconstructionSource::Structured
        );
    }

    #[test]
    fn test_legacy_merges_runs_inside_group() {
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "sq", "bp"]),
            groups: vec![group("g1", GroupKind::Superset, 1, vec![0, 1])],
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["H:g1", "sqx2", "F:g1", "bpx1"]);

        let sq = list.items().next().unwrap();
        assert_eq!(sq.group_id, Some(GroupId::from("g1")));
        assert!(sq.is_first_in_group && sq.is_last_in_group);
        assert_eq!(sq.set_groups.len(), 1);

        let header = list.header(&"g1".into()).unwrap();
        assert_eq!(header.kind, GroupKind::Superset);
        assert_eq!(header.number, 1);
        assert_eq!(header.summary, vec!["SQ"]);
    }

    #[test]
    fn test_legacy_run_does_not_cross_group_boundary() {
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "sq", "sq", "bp"]),
            groups: vec![group("g1", GroupKind::Hiit, 1, vec![2, 3])],
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["sqx2", "H:g1", "sqx1", "bpx1", "F:g1"]);
    }

    #[test]
    fn test_index_outside_member_list_stays_standalone() {
        // bp sits between g1's members but is not one of them
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "bp", "dl"]),
            groups: vec![group("g1", GroupKind::Superset, 1, vec![0, 2])],
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["H:g1", "sqx1", "F:g1", "bpx1", "dlx1"]);
        assert!(list.item(&"bp@1".into()).unwrap().is_standalone());
        assert!(list.item(&"dl@2".into()).unwrap().is_standalone());
    }

    #[test]
    fn test_legacy_drops_unknown_exercises() {
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "mystery", "bp"]),
            ..Default::default()
        };
        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["sqx1", "bpx1"]);
    }

    #[test]
    fn test_legacy_special_from_ids_and_summaries() {
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "bp", "dl"]),
            special_ids: ids(&["sq"]),
            grouped_summaries: vec![GroupedSummary {
                exercise_id: "dl".into(),
                count: 1,
                special: true,
            }],
            ..Default::default()
        };
        let list = reconstruct(&snapshot, &catalog());
        let flags: Vec<bool> = list.items().map(|i| i.special).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn test_legacy_ids_are_stable() {
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "bp"]),
            ..Default::default()
        };
        let first = reconstruct(&snapshot, &catalog());
        let second = reconstruct(&snapshot, &catalog());
        assert_eq!(first, second);
        assert_eq!(first.items().next().unwrap().id, ItemId::from("sq@0"));
    }

    #[test]
    fn test_structured_keeps_separate_cards_for_same_exercise() {
        let mut order = BTreeMap::new();
        order.insert(ItemId::from("a"), vec![0, 1]);
        order.insert(ItemId::from("b"), vec![2]);
        let mut sets = BTreeMap::new();
        sets.insert(ItemId::from("a"), vec![SetGroup::new(2, false)]);
        sets.insert(ItemId::from("b"), vec![SetGroup::new(1, true)]);

        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "sq", "sq"]),
            item_order_indices: order,
            item_set_groups: sets,
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["sqx2", "sqx1"]);
        assert!(list.item(&"b".into()).unwrap().special);
    }

    #[test]
    fn test_structured_empty_set_groups_means_deleted() {
        let mut order = BTreeMap::new();
        order.insert(ItemId::from("a"), vec![0]);
        order.insert(ItemId::from("b"), vec![1]);
        let mut sets = BTreeMap::new();
        sets.insert(ItemId::from("a"), vec![SetGroup::new(1, false)]);
        sets.insert(ItemId::from("b"), vec![]);

        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "bp"]),
            item_order_indices: order,
            item_set_groups: sets,
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["sqx1"]);
    }

    #[test]
    fn test_structured_group_wraps_members_and_skips_empty_groups() {
        let mut order = BTreeMap::new();
        order.insert(ItemId::from("a"), vec![0]);
        order.insert(ItemId::from("b"), vec![1, 2]);
        order.insert(ItemId::from("c"), vec![3]);
        let mut sets = BTreeMap::new();
        sets.insert(ItemId::from("a"), vec![SetGroup::new(1, false)]);
        sets.insert(ItemId::from("b"), vec![SetGroup::new(2, false)]);
        sets.insert(ItemId::from("c"), vec![SetGroup::new(1, false)]);

        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "bp", "bp", "nope", "dl"]),
            groups: vec![
                group("g1", GroupKind::Superset, 1, vec![0, 1, 2]),
                group("g2", GroupKind::Hiit, 1, vec![3]),
            ],
            item_order_indices: order,
            item_set_groups: sets,
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(shape(&list), vec!["H:g1", "sqx1", "bpx2", "F:g1"]);
        assert!(list.header(&"g2".into()).is_none());
    }

    #[test]
    fn test_structured_missing_set_groups_are_synthesized() {
        let mut order = BTreeMap::new();
        order.insert(ItemId::from("a"), vec![0, 1, 2]);
        order.insert(ItemId::from("b"), vec![3]);
        let mut sets = BTreeMap::new();
        sets.insert(ItemId::from("b"), vec![SetGroup::new(1, false)]);

        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["row", "row", "row", "sq"]),
            special_ids: ids(&["row"]),
            item_order_indices: order,
            item_set_groups: sets,
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        let row = list.item(&"a".into()).unwrap();
        assert_eq!(row.count, 3);
        assert!(row.special);
    }
}
