//! Multi-select mode for building a new group.
//!
//! `Idle -> Selecting -> Idle`. Choosing a group kind on a standalone item
//! pins it and enters `Selecting`; taps on other standalone items toggle
//! them; `commit` creates the group and `cancel` leaves the list alone.

use crate::lifecycle::create_group;
use crate::{GroupId, GroupKind, ItemId, WorkingList};

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting {
        pending_kind: GroupKind,
        pinned: ItemId,
        /// Tapped items in tap order; never contains `pinned`
        selected: Vec<ItemId>,
    },
}

/// Short-lived controller owning the selection state
#[derive(Clone, Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SelectionState::Selecting { .. })
    }

    /// True for the pinned item and every toggled-on item
    pub fn is_selected(&self, item_id: &ItemId) -> bool {
        match &self.state {
            SelectionState::Idle => false,
            SelectionState::Selecting {
                pinned, selected, ..
            } => pinned == item_id || selected.contains(item_id),
        }
    }

    /// Enter selection mode with `item_id` pinned.
    ///
    /// Returns false (and stays idle) if already selecting or the item is
    /// missing or grouped.
    pub fn begin(&mut self, list: &WorkingList, item_id: &ItemId, kind: GroupKind) -> bool {
        if self.is_active() {
            tracing::debug!("Selection already in progress");
            return false;
        }
        if !is_standalone(list, item_id) {
            tracing::debug!("Item {} cannot start a group", item_id);
            return false;
        }

        tracing::debug!("Selecting items for a new {} around {}", kind, item_id);
        self.state = SelectionState::Selecting {
            pending_kind: kind,
            pinned: item_id.clone(),
            selected: Vec::new(),
        };
        true
    }

    /// Toggle a standalone item in or out of the selection.
    ///
    /// Returns whether the tap changed anything. The pinned item cannot be
    /// deselected.
    pub fn toggle(&mut self, list: &WorkingList, item_id: &ItemId) -> bool {
        let standalone = is_standalone(list, item_id);
        let SelectionState::Selecting {
            pinned, selected, ..
        } = &mut self.state
        else {
            return false;
        };

        if pinned == item_id || !standalone {
            return false;
        }

        match selected.iter().position(|id| id == item_id) {
            Some(pos) => {
                selected.remove(pos);
            }
            None => selected.push(item_id.clone()),
        }
        true
    }

    /// Create the group from the pinned item plus the selection and go idle
    pub fn commit(&mut self, list: &WorkingList) -> (WorkingList, Option<GroupId>) {
        match std::mem::take(&mut self.state) {
            SelectionState::Idle => (list.clone(), None),
            SelectionState::Selecting {
                pending_kind,
                pinned,
                selected,
            } => {
                let mut members = Vec::with_capacity(selected.len() + 1);
                members.push(pinned);
                members.extend(selected);
                create_group(list, &members, pending_kind)
            }
        }
    }

    /// Drop the pending selection without touching the list
    pub fn cancel(&mut self) {
        if self.is_active() {
            tracing::debug!("Selection cancelled");
        }
        self.state = SelectionState::Idle;
    }
}

fn is_standalone(list: &WorkingList, item_id: &ItemId) -> bool {
    list.item(item_id).is_some_and(|item| item.is_standalone())
}
