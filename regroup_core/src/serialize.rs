//! Converting the working list back into the persisted shape.
//!
//! This is the only place the in-memory model turns into what gets saved.
//! It reads the list once and never mutates it.

use crate::collapse::expand_all;
use crate::{
    ExerciseGroup, GroupHeader, GroupedSummary, ItemId, ListEntry, SetGroup, WorkingList,
    WorkoutSnapshot,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Everything the next edit cycle (and downstream scheduling) needs
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializedWorkout {
    /// One entry per set, in workout order
    pub flat_order: Vec<String>,
    pub groups: Vec<ExerciseGroup>,
    /// Exercise ids with at least one special set, each listed once
    pub special_ids: Vec<String>,
    pub item_order_indices: BTreeMap<ItemId, Vec<usize>>,
    pub item_set_groups: BTreeMap<ItemId, Vec<SetGroup>>,
}

impl SerializedWorkout {
    /// Shape read by the next session, with legacy summaries regenerated
    pub fn into_snapshot(self) -> WorkoutSnapshot {
        let mut summaries: Vec<GroupedSummary> = Vec::new();
        let special: HashSet<&str> = self.special_ids.iter().map(String::as_str).collect();
        for exercise_id in &self.flat_order {
            match summaries.iter_mut().find(|s| &s.exercise_id == exercise_id) {
                Some(summary) => summary.count += 1,
                None => summaries.push(GroupedSummary {
                    exercise_id: exercise_id.clone(),
                    count: 1,
                    special: special.contains(exercise_id.as_str()),
                }),
            }
        }

        WorkoutSnapshot {
            grouped_summaries: summaries,
            ordered_ids: self.flat_order,
            groups: self.groups,
            special_ids: self.special_ids,
            item_order_indices: self.item_order_indices,
            item_set_groups: self.item_set_groups,
        }
    }
}

/// Expand every item into one flat entry per set and collect groups, special
/// ids and the per-item maps.
///
/// A collapsed list is serialized as if expanded. A group is only recorded
/// if its members produced at least one flat index.
pub fn serialize(list: &WorkingList) -> SerializedWorkout {
    let list: Cow<'_, WorkingList> = if list.has_collapsed() {
        Cow::Owned(expand_all(list))
    } else {
        Cow::Borrowed(list)
    };

    let mut out = SerializedWorkout::default();
    let mut special_seen: HashSet<String> = HashSet::new();
    let mut open: Option<(&GroupHeader, Vec<usize>)> = None;

    for entry in list.entries() {
        match entry {
            ListEntry::Header(header) => {
                if let Some((unclosed, indices)) = open.take() {
                    tracing::warn!("Group {} has no footer before next header", unclosed.group_id);
                    push_group(&mut out, unclosed, indices);
                }
                open = Some((header, Vec::new()));
            }
            ListEntry::Item(item) => {
                let needs_repair =
                    item.set_groups.is_empty() || item.set_groups.iter().any(|sg| sg.count == 0);
                let item = if needs_repair {
                    let mut repaired = item.clone();
                    repaired.refresh();
                    Cow::Owned(repaired)
                } else {
                    Cow::Borrowed(item)
                };

                let total = item
                    .set_groups
                    .iter()
                    .fold(0u32, |total, sg| total.saturating_add(sg.count));
                let start = out.flat_order.len();
                out.flat_order
                    .extend(std::iter::repeat(item.exercise.id.clone()).take(total as usize));
                let indices: Vec<usize> = (start..out.flat_order.len()).collect();

                if let Some((_, group_indices)) = open.as_mut() {
                    group_indices.extend(&indices);
                }
                if item.special && special_seen.insert(item.exercise.id.clone()) {
                    out.special_ids.push(item.exercise.id.clone());
                }

                out.item_order_indices.insert(item.id.clone(), indices);
                out.item_set_groups
                    .insert(item.id.clone(), item.set_groups.clone());
            }
            ListEntry::Footer(footer) => match open.take() {
                Some((header, indices)) if header.group_id == footer.group_id => {
                    push_group(&mut out, header, indices);
                }
                other => {
                    tracing::warn!("Footer {} does not close the open group", footer.group_id);
                    open = other;
                }
            },
        }
    }

    if let Some((unclosed, indices)) = open {
        tracing::warn!("Group {} has no footer", unclosed.group_id);
        push_group(&mut out, unclosed, indices);
    }

    tracing::debug!(
        "Serialized {} sets, {} groups, {} items",
        out.flat_order.len(),
        out.groups.len(),
        out.item_order_indices.len()
    );
    out
}

fn push_group(out: &mut SerializedWorkout, header: &GroupHeader, indices: Vec<usize>) {
    if indices.is_empty() {
        tracing::debug!("Skipping empty group {}", header.group_id);
        return;
    }
    out.groups.push(ExerciseGroup {
        id: header.group_id.clone(),
        kind: header.kind,
        number: header.number,
        member_indices: indices,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::collapse_for_drag;
    use crate::lifecycle::{create_group, delete_item};
    use crate::reconstruct::reconstruct;
    use crate::set_groups::{apply_in_list, duplicate_item, SetGroupOp};
    use crate::{
        ExerciseCatalog, ExerciseItem, ExerciseRef, GroupFooter, GroupId, GroupKind,
    };

    fn exercise(id: &str) -> ExerciseRef {
        ExerciseRef {
            id: id.into(),
            name: id.to_uppercase(),
            category: None,
        }
    }

    fn catalog() -> ExerciseCatalog {
        ExerciseCatalog::from_exercises(["sq", "bp", "dl", "row"].iter().map(|id| exercise(id)))
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn item(id: &str, exercise_id: &str, set_groups: Vec<SetGroup>, group: Option<&str>) -> ListEntry {
        let mut item = ExerciseItem::new(id.into(), exercise(exercise_id), set_groups);
        item.group_id = group.map(GroupId::from);
        ListEntry::Item(item)
    }

    fn sg(id: &str, count: u32, special: bool) -> SetGroup {
        SetGroup {
            id: id.into(),
            count,
            special,
        }
    }

    fn sample() -> WorkingList {
        WorkingList::new(vec![
            item("i1", "row", vec![sg("s1", 2, false)], None),
            ListEntry::Header(crate::GroupHeader::new("g1".into(), GroupKind::Hiit, 1)),
            item("i2", "sq", vec![sg("s2", 3, false), sg("s3", 2, true)], Some("g1")),
            item("i3", "bp", vec![sg("s4", 1, false)], Some("g1")),
            ListEntry::Footer(GroupFooter::new("g1".into(), GroupKind::Hiit)),
            item("i4", "sq", vec![sg("s5", 1, false)], None),
        ])
    }

    #[test]
    fn test_flat_order_and_indices() {
        let out = serialize(&sample());

        assert_eq!(
            out.flat_order,
            ids(&["row", "row", "sq", "sq", "sq", "sq", "sq", "bp", "sq"])
        );
        assert_eq!(out.item_order_indices[&ItemId::from("i2")], vec![2, 3, 4, 5, 6]);
        assert_eq!(out.item_order_indices[&ItemId::from("i4")], vec![8]);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].member_indices, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(out.groups[0].kind, GroupKind::Hiit);
        assert_eq!(out.special_ids, ids(&["sq"]));
        assert_eq!(out.item_set_groups[&ItemId::from("i2")].len(), 2);
    }

    #[test]
    fn test_legacy_scenario_reserializes_identically() {
        let snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "sq", "bp"]),
            groups: vec![ExerciseGroup {
                id: "g1".into(),
                kind: GroupKind::Superset,
                number: 1,
                member_indices: vec![0, 1],
            }],
            ..Default::default()
        };

        let list = reconstruct(&snapshot, &catalog());
        let out = serialize(&list);

        assert_eq!(out.flat_order, ids(&["sq", "sq", "bp"]));
        assert_eq!(out.groups, snapshot.groups);
        assert!(out.special_ids.is_empty());
    }

    #[test]
    fn test_toggle_special_shows_up_in_special_ids() {
        let list = WorkingList::new(vec![item("i1", "dl", vec![sg("s1", 3, false)], None)]);
        let list = apply_in_list(&list, &"i1".into(), &"s1".into(), SetGroupOp::ToggleSpecial);

        assert!(list.item(&"i1".into()).unwrap().special);
        assert_eq!(serialize(&list).special_ids, ids(&["dl"]));
    }

    #[test]
    fn test_roundtrip_through_structured_shape() {
        let list = sample();
        let rebuilt = reconstruct(&serialize(&list).into_snapshot(), &catalog());
        assert_eq!(rebuilt, list);
    }

    #[test]
    fn test_roundtrip_after_edits() {
        let list = sample();
        let list = duplicate_item(&list, &"i3".into());
        let list = apply_in_list(&list, &"i1".into(), &"s1".into(), SetGroupOp::InsertAfter);
        let (list, _) = create_group(&list, &["i4".into(), "i1".into()], GroupKind::Superset);
        let list = delete_item(&list, &"i2".into());

        let rebuilt = reconstruct(&serialize(&list).into_snapshot(), &catalog());
        assert_eq!(rebuilt, list);
    }

    #[test]
    fn test_collapsed_list_serializes_as_expanded() {
        let list = sample();
        let collapsed = collapse_for_drag(&list, &"g1".into());
        assert_eq!(serialize(&collapsed), serialize(&list));
    }

    #[test]
    fn test_empty_group_is_not_recorded() {
        let list = WorkingList::from_raw(vec![
            ListEntry::Header(crate::GroupHeader::new("g1".into(), GroupKind::Superset, 1)),
            ListEntry::Footer(GroupFooter::new("g1".into(), GroupKind::Superset)),
            item("i1", "sq", vec![sg("s1", 1, false)], None),
        ]);
        let out = serialize(&list);
        assert!(out.groups.is_empty());
        assert_eq!(out.flat_order, ids(&["sq"]));
    }

    #[test]
    fn test_zero_count_set_group_survives_roundtrip() {
        let mut snapshot = WorkoutSnapshot {
            ordered_ids: ids(&["sq", "bp"]),
            ..Default::default()
        };
        snapshot.item_order_indices.insert("a".into(), vec![0]);
        snapshot.item_order_indices.insert("b".into(), vec![1]);
        snapshot
            .item_set_groups
            .insert("a".into(), vec![sg("s1", 0, false)]);
        snapshot
            .item_set_groups
            .insert("b".into(), vec![sg("s2", 1, false)]);

        let list = reconstruct(&snapshot, &catalog());
        assert_eq!(list.item(&"a".into()).unwrap().count, 1);

        let rebuilt = reconstruct(&serialize(&list).into_snapshot(), &catalog());
        let ids: Vec<&str> = rebuilt.items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_raw_zero_count_item_still_emits_a_set() {
        let mut raw = ExerciseItem::new("i1".into(), exercise("dl"), vec![sg("s1", 1, false)]);
        raw.set_groups[0].count = 0;
        let list = WorkingList::from_raw(vec![ListEntry::Item(raw)]);

        let out = serialize(&list);
        assert_eq!(out.flat_order, ids(&["dl"]));
        assert_eq!(out.item_set_groups[&ItemId::from("i1")][0].count, 1);
    }

    #[test]
    fn test_serialize_does_not_mutate() {
        let list = sample();
        let before = list.clone();
        let _ = serialize(&list);
        assert_eq!(list, before);
    }

    #[test]
    fn test_snapshot_summaries() {
        let snapshot = serialize(&sample()).into_snapshot();
        let sq = snapshot
            .grouped_summaries
            .iter()
            .find(|s| s.exercise_id == "sq")
            .unwrap();
        assert_eq!(sq.count, 6);
        assert!(sq.special);
        assert_eq!(snapshot.grouped_summaries[0].exercise_id, "row");
    }
}
