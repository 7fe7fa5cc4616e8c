use serde::Serialize;

use triage_protocol::Record;
use triage_protocol::RecordKey;

/// Keyboard input after the embedder has resolved physical keys. Which key
/// acts as the modifier is not decided here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Up,
    Down,
    Left,
    Right,
    ModifierUp,
    ModifierDown,
    ModifierLeft,
    ModifierRight,
    ModifierReleased,
}

/// Which record is selected and, within it, which flow and location.
///
/// `flow`/`location` are only meaningful while `selected` is set; both are
/// cleared whenever the selected record changes. `keyboard_active` is a
/// transient styling affordance, not data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SelectionCursor {
    pub selected: Option<RecordKey>,
    pub flow: Option<usize>,
    pub location: Option<usize>,
    pub keyboard_active: bool,
}

impl SelectionCursor {
    /// Move to another record, clearing flow and location when the target
    /// differs from the current selection.
    pub fn select(&mut self, key: Option<RecordKey>) {
        if self.selected != key {
            self.flow = None;
            self.location = None;
        }
        self.selected = key;
    }
}

/// Clamped record move: no wraparound at either end. An unknown or absent
/// current key lands on the first record.
pub fn step_record(records: &[Record], current: Option<&str>, forward: bool) -> Option<RecordKey> {
    if records.is_empty() {
        return None;
    }
    let position = current.and_then(|key| records.iter().position(|record| record.key == key));
    let next = match position {
        None => 0,
        Some(index) if forward => (index + 1).min(records.len() - 1),
        Some(index) => index.saturating_sub(1),
    };
    records.get(next).map(|record| record.key.clone())
}

/// Step through a location list, deselecting one past either end rather
/// than wrapping to the opposite side. From no selection, forward enters at
/// the first location and backward at the last.
pub fn cycle_location(len: usize, current: Option<usize>, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match (current, forward) {
        (None, true) => Some(0),
        (None, false) => Some(len - 1),
        (Some(index), true) => {
            if index + 1 >= len {
                None
            } else {
                Some(index + 1)
            }
        }
        (Some(0), false) => None,
        (Some(index), false) => Some(index - 1),
    }
}

/// Clamped flow move. `None` is the record's own location list; stepping
/// forward from it enters the first flow, stepping backward stays put.
pub fn step_flow(flow_count: usize, current: Option<usize>, forward: bool) -> Option<usize> {
    if flow_count == 0 {
        return None;
    }
    match (current, forward) {
        (None, true) => Some(0),
        (None, false) => None,
        (Some(index), true) => Some((index + 1).min(flow_count - 1)),
        (Some(index), false) => Some(index.saturating_sub(1)),
    }
}

/// The stored location index, validated against the active flow. An index
/// out of range for the current flow reads as no selection.
pub fn effective_location(
    record: &Record,
    flow: Option<usize>,
    location: Option<usize>,
) -> Option<usize> {
    let len = record.flow_locations(flow).len();
    location.filter(|index| *index < len)
}
