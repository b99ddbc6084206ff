//! Edit ledger for tracking rewritten page text
//!
//! One entry per edited run, keyed by [`RunId`]. Entries freeze the run's
//! original text and PDF-space geometry at commit time, so they survive page
//! navigation, zoom changes and re-extraction, and the patcher can replay them
//! without the run being on screen.

use crate::coords::PdfPoint;
use crate::extract::{RunId, TextRun};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub run_id: RunId,
    pub page: u32,
    pub new_text: String,
    pub original_text: String,
    pub pdf_position: PdfPoint,
    pub pdf_font_size: f64,
    pub pdf_width: f64,
    pub pdf_height: f64,
}

impl LedgerEntry {
    fn from_run(run: &TextRun) -> Self {
        Self {
            run_id: run.id,
            page: run.page(),
            new_text: run.current_text.clone(),
            original_text: run.original_text.clone(),
            pdf_position: run.pdf_position,
            pdf_font_size: run.pdf_font_size,
            pdf_width: run.pdf_width,
            pdf_height: run.pdf_height,
        }
    }
}

/// What [`EditLedger::commit_edit`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Upserted,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<LedgerEntry>", into = "Vec<LedgerEntry>")]
pub struct EditLedger {
    entries: BTreeMap<RunId, LedgerEntry>,
}

impl From<Vec<LedgerEntry>> for EditLedger {
    fn from(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.run_id, e)).collect(),
        }
    }
}

impl From<EditLedger> for Vec<LedgerEntry> {
    fn from(ledger: EditLedger) -> Self {
        ledger.entries.into_values().collect()
    }
}

impl EditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the ledger with a run's current text.
    ///
    /// This is the only way an entry is created: upsert when the text differs
    /// from the original, drop the entry when it matches again.
    pub fn commit_edit(&mut self, run: &mut TextRun) -> LedgerChange {
        if run.current_text != run.original_text {
            let entry = LedgerEntry::from_run(run);
            run.is_edited = true;
            match self.entries.insert(run.id, entry.clone()) {
                Some(previous) if previous == entry => LedgerChange::Unchanged,
                _ => LedgerChange::Upserted,
            }
        } else {
            run.is_edited = false;
            match self.entries.remove(&run.id) {
                Some(_) => LedgerChange::Removed,
                None => LedgerChange::Unchanged,
            }
        }
    }

    /// Restore a run's original text and drop its entry. Safe to repeat.
    ///
    /// Returns whether an entry was removed.
    pub fn revert(&mut self, run: &mut TextRun) -> bool {
        run.current_text = run.original_text.clone();
        run.is_edited = false;
        self.entries.remove(&run.id).is_some()
    }

    /// Drop the entry for a run that is not currently extracted
    pub fn remove(&mut self, id: &RunId) -> Option<LedgerEntry> {
        self.entries.remove(id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &RunId) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &RunId) -> bool {
        self.entries.contains_key(id)
    }

    /// All entries ordered by page, then source index
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Owned copy of every entry, for handing to the patcher
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
