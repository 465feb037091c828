//! Editing session: one working list plus the gesture state around it.
//!
//! A session is opened from a persisted workout, mutated in response to
//! gestures, and either saved (serialized once and handed to a sink) or
//! dropped. Only one drag is live at a time; while it is, the dragged item
//! ignores taps and edits, and a header drag freezes the whole list until
//! the drop.

use crate::collapse::collapse_for_drag;
use crate::lifecycle::{delete_item, dissolve_group, toggle_group_kind};
use crate::membership::settle_after_drag;
use crate::reconstruct::reconstruct;
use crate::serialize::serialize;
use crate::set_groups::{apply_in_list, duplicate_item, SetGroupOp};
use crate::store::WorkoutSink;
use crate::{
    EntryKey, ExerciseLookup, GroupId, GroupKind, ItemId, Result, SelectionController,
    SerializedWorkout, SetGroupId, WorkingList, WorkoutSnapshot,
};
use serde::{Deserialize, Serialize};

/// A user gesture, as replayed from a script or delivered by a UI
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    DragStart { key: EntryKey },
    /// Full new order reported by the drag surface
    DragEnd { order: Vec<EntryKey> },
    /// Drop the dragged entry at a list index
    DropAt { index: usize },
    Tap { item: ItemId },
    BeginGroup { item: ItemId, kind: GroupKind },
    CommitGroup,
    CancelGroup,
    EditSets {
        item: ItemId,
        set_group: SetGroupId,
        op: SetGroupOp,
    },
    Duplicate { item: ItemId },
    Delete { item: ItemId },
    ToggleKind { group: GroupId },
    Ungroup { group: GroupId },
}

#[derive(Debug, Default)]
pub struct EditingSession {
    list: WorkingList,
    selection: SelectionController,
    active_drag: Option<EntryKey>,
}

impl EditingSession {
    /// Rebuild the working list from persisted state
    pub fn open(snapshot: &WorkoutSnapshot, catalog: &impl ExerciseLookup) -> Self {
        Self::from_list(reconstruct(snapshot, catalog))
    }

    pub fn from_list(list: WorkingList) -> Self {
        Self {
            list,
            selection: SelectionController::new(),
            active_drag: None,
        }
    }

    pub fn list(&self) -> &WorkingList {
        &self.list
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn active_drag(&self) -> Option<&EntryKey> {
        self.active_drag.as_ref()
    }

    /// Start dragging an item or a group header. Footers are not draggable.
    pub fn drag_start(&mut self, key: &EntryKey) -> bool {
        if let Some(active) = &self.active_drag {
            tracing::debug!("Drag of {:?} ignored, {:?} is still live", key, active);
            return false;
        }
        if self.list.position(key).is_none() {
            tracing::warn!("Drag start on unknown entry {:?}", key);
            return false;
        }

        match key {
            EntryKey::Header(gid) => self.list = collapse_for_drag(&self.list, gid),
            EntryKey::Item(_) => {}
            EntryKey::Footer(_) => {
                tracing::debug!("Footers cannot be dragged");
                return false;
            }
        }
        self.active_drag = Some(key.clone());
        true
    }

    /// Finish the live drag with the full new order
    pub fn drag_end(&mut self, order: &[EntryKey]) -> bool {
        if self.active_drag.take().is_none() {
            tracing::warn!("Drag end without a live drag, ignoring");
            return false;
        }
        self.list = settle_after_drag(&self.list.reordered(order));
        true
    }

    /// Finish the live drag by dropping the dragged entry at `index`.
    ///
    /// `index` counts the visible rows left once the dragged row is lifted
    /// out; collapsed rows take no slot.
    pub fn drop_at(&mut self, index: usize) -> bool {
        let Some(key) = self.active_drag.take() else {
            tracing::warn!("Drop without a live drag, ignoring");
            return false;
        };
        let moved = match self.list.position(&key) {
            Some(from) => self.list.moved(from, self.drop_position(from, index)),
            None => self.list.clone(),
        };
        self.list = settle_after_drag(&moved);
        true
    }

    /// List position, after removing `from`, of the `visible`-th visible row
    fn drop_position(&self, from: usize, visible: usize) -> usize {
        if !self.list.has_collapsed() {
            return visible;
        }
        self.list
            .entries()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != from)
            .map(|(_, entry)| entry)
            .enumerate()
            .filter(|(_, entry)| !entry.is_collapsed())
            .nth(visible)
            .map(|(pos, _)| pos)
            .unwrap_or(self.list.len().saturating_sub(1))
    }

    /// Tap toggles selection while selecting; otherwise it is display-only
    pub fn tap(&mut self, item_id: &ItemId) -> bool {
        if self.is_blocked(item_id) {
            return false;
        }
        self.selection.toggle(&self.list, item_id)
    }

    pub fn begin_group(&mut self, item_id: &ItemId, kind: GroupKind) -> bool {
        if self.is_blocked(item_id) {
            return false;
        }
        self.selection.begin(&self.list, item_id, kind)
    }

    pub fn commit_group(&mut self) -> Option<GroupId> {
        if self.frozen() {
            return None;
        }
        let (list, group_id) = self.selection.commit(&self.list);
        self.list = list;
        group_id
    }

    pub fn cancel_group(&mut self) {
        self.selection.cancel();
    }

    pub fn edit_sets(&mut self, item_id: &ItemId, set_group_id: &SetGroupId, op: SetGroupOp) -> bool {
        if self.is_blocked(item_id) {
            return false;
        }
        self.list = apply_in_list(&self.list, item_id, set_group_id, op);
        true
    }

    pub fn duplicate(&mut self, item_id: &ItemId) -> bool {
        if self.is_blocked(item_id) {
            return false;
        }
        self.list = duplicate_item(&self.list, item_id);
        true
    }

    pub fn delete(&mut self, item_id: &ItemId) -> bool {
        if self.is_blocked(item_id) {
            return false;
        }
        self.list = delete_item(&self.list, item_id);
        true
    }

    pub fn toggle_kind(&mut self, group_id: &GroupId) -> bool {
        if self.frozen() {
            return false;
        }
        self.list = toggle_group_kind(&self.list, group_id);
        true
    }

    pub fn ungroup(&mut self, group_id: &GroupId) -> bool {
        if self.frozen() {
            return false;
        }
        self.list = dissolve_group(&self.list, group_id);
        true
    }

    /// Dispatch one command; returns whether it was applied
    pub fn apply(&mut self, command: &SessionCommand) -> bool {
        tracing::debug!("Applying {:?}", command);
        match command {
            SessionCommand::DragStart { key } => self.drag_start(key),
            SessionCommand::DragEnd { order } => self.drag_end(order),
            SessionCommand::DropAt { index } => self.drop_at(*index),
            SessionCommand::Tap { item } => self.tap(item),
            SessionCommand::BeginGroup { item, kind } => self.begin_group(item, *kind),
            SessionCommand::CommitGroup => self.commit_group().is_some(),
            SessionCommand::CancelGroup => {
                self.cancel_group();
                true
            }
            SessionCommand::EditSets {
                item,
                set_group,
                op,
            } => self.edit_sets(item, set_group, *op),
            SessionCommand::Duplicate { item } => self.duplicate(item),
            SessionCommand::Delete { item } => self.delete(item),
            SessionCommand::ToggleKind { group } => self.toggle_kind(group),
            SessionCommand::Ungroup { group } => self.ungroup(group),
        }
    }

    /// Current state in persisted form
    pub fn serialize(&self) -> SerializedWorkout {
        serialize(&self.list)
    }

    /// Serialize once and hand the result to `sink`
    pub fn save(&self, sink: &mut impl WorkoutSink) -> Result<SerializedWorkout> {
        let workout = self.serialize();
        sink.save(&workout)?;
        tracing::info!(
            "Saved workout: {} sets in {} groups",
            workout.flat_order.len(),
            workout.groups.len()
        );
        Ok(workout)
    }

    /// Close without saving; the working list is discarded
    pub fn discard(self) {
        tracing::info!("Editing session discarded");
    }

    /// A header drag folds the list; nothing else may touch it until the drop
    fn frozen(&self) -> bool {
        if matches!(self.active_drag, Some(EntryKey::Header(_))) {
            tracing::debug!("Ignoring action during group drag");
            return true;
        }
        false
    }

    fn is_blocked(&self, item_id: &ItemId) -> bool {
        if self.frozen() {
            return true;
        }
        if matches!(&self.active_drag, Some(EntryKey::Item(id)) if id == item_id) {
            tracing::debug!("Item {} is being dragged, ignoring action", item_id);
            return true;
        }
        false
    }
}
