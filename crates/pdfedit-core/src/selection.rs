//! Select/edit state machine shared by runs and overlays
//!
//! There is one selection slot for the whole session. Transitions report the
//! target whose editing just ended, which is the point where a run's text is
//! committed to the ledger.

use crate::extract::RunId;
use crate::overlay::OverlayId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SelectionTarget {
    Run(RunId),
    Overlay(OverlayId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    Selected(SelectionTarget),
    Editing(SelectionTarget),
}

/// Pointer and keyboard events, already hit-tested against the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    Click(Option<SelectionTarget>),
    DoubleClick(Option<SelectionTarget>),
    Blur,
    Confirm,
    Escape,
}

impl Selection {
    pub fn target(&self) -> Option<SelectionTarget> {
        match self {
            Selection::Idle => None,
            Selection::Selected(t) | Selection::Editing(t) => Some(*t),
        }
    }

    pub fn editing(&self) -> Option<SelectionTarget> {
        match self {
            Selection::Editing(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_editing(&self, target: SelectionTarget) -> bool {
        self.editing() == Some(target)
    }

    /// Apply an event; returns the target whose editing ended, if any
    pub fn handle(&mut self, event: InteractionEvent) -> Option<SelectionTarget> {
        use InteractionEvent::*;

        let editing = self.editing();
        let (next, ended) = match (*self, event) {
            // clicking inside the field being edited keeps editing
            (Selection::Editing(t), Click(Some(hit))) if hit == t => (*self, None),
            (Selection::Editing(t), DoubleClick(Some(hit))) if hit == t => (*self, None),

            (_, Click(Some(hit))) => (Selection::Selected(hit), editing),
            (_, DoubleClick(Some(hit))) => (Selection::Editing(hit), editing),
            (_, Click(None)) | (_, DoubleClick(None)) => (Selection::Idle, editing),

            (Selection::Editing(t), Blur | Confirm | Escape) => (Selection::Selected(t), Some(t)),
            (Selection::Selected(_), Escape) => (Selection::Idle, None),
            (state, _) => (state, None),
        };
        *self = next;
        ended
    }

    /// Start editing `target` directly; returns a previously edited target
    pub fn begin_edit(&mut self, target: SelectionTarget) -> Option<SelectionTarget> {
        let ended = self.editing().filter(|t| *t != target);
        *self = Selection::Editing(target);
        ended
    }

    /// Return to idle; returns the target being edited, if any
    pub fn clear(&mut self) -> Option<SelectionTarget> {
        let ended = self.editing();
        *self = Selection::Idle;
        ended
    }
}
