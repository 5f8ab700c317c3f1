//! Optimistic schedule editing
//!
//! The board keeps the dashboard's view of a plan's cells. An edit is shown
//! immediately as a placeholder, sent to `POST /api/schedules/:planId`, and
//! then either confirmed with the row the server returned or rolled back.
//! A later edit of the same cell supersedes an earlier one: the earlier
//! edit's response only updates what a rollback would restore.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Assignment;

/// One cell write as sent to the server. `shift_type_id: None` clears the cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleChange {
    pub employee_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub shift_type_id: Option<i64>,
}

/// Server outcome for one [`ScheduleChange`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResult {
    pub employee_id: i64,
    pub date: NaiveDate,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Assignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CellKey {
    employee_id: i64,
    date: NaiveDate,
}

#[derive(Clone, Debug)]
enum CellState {
    Saved(Assignment),
    Pending {
        shown: Option<Assignment>,
        previous: Option<Assignment>,
        token: u64,
    },
}

/// Handle for an in-flight edit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub change: ScheduleChange,
    token: u64,
}

#[derive(Debug, Default)]
pub struct ScheduleBoard {
    cells: HashMap<CellKey, CellState>,
    next_token: u64,
    next_placeholder: i64,
}

impl ScheduleBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace saved cells with the server's rows. Cells with an edit in
    /// flight keep showing it; the server row becomes their rollback target.
    pub fn load(&mut self, rows: impl IntoIterator<Item = Assignment>) {
        let mut server: HashMap<CellKey, Assignment> = rows
            .into_iter()
            .map(|a| (key_of(&a), a))
            .collect();

        self.cells.retain(|key, state| match state {
            CellState::Saved(_) => false,
            CellState::Pending { previous, .. } => {
                *previous = server.remove(key);
                true
            }
        });

        for (key, row) in server {
            self.cells.insert(key, CellState::Saved(row));
        }
    }

    /// Show `shift_type_id` (or an empty cell for `None`) right away and
    /// return the change to send.
    pub fn assign(
        &mut self,
        employee_id: i64,
        date: NaiveDate,
        shift_type_id: Option<i64>,
    ) -> PendingEdit {
        let key = CellKey { employee_id, date };
        self.next_token += 1;
        let token = self.next_token;

        let shown = shift_type_id.map(|shift_type_id| {
            self.next_placeholder -= 1;
            Assignment {
                schedule_id: self.next_placeholder,
                employee_id,
                shift_type_id,
                date,
            }
        });

        let previous = match self.cells.remove(&key) {
            Some(CellState::Saved(row)) => Some(row),
            Some(CellState::Pending { previous, .. }) => previous,
            None => None,
        };

        self.cells.insert(key, CellState::Pending { shown, previous, token });

        PendingEdit {
            change: ScheduleChange { employee_id, date, shift_type_id },
            token,
        }
    }

    /// Accept the server's row for `edit` (`None` when the cell was cleared).
    /// Returns `false` if a later edit of the cell is still in flight.
    pub fn confirm(&mut self, edit: &PendingEdit, saved: Option<Assignment>) -> bool {
        let key = key_of_change(&edit.change);
        match self.cells.get_mut(&key) {
            Some(CellState::Pending { token, previous, .. }) => {
                if *token != edit.token {
                    *previous = saved;
                    return false;
                }
            }
            _ => return false,
        }
        match saved {
            Some(row) => self.cells.insert(key, CellState::Saved(row)),
            None => self.cells.remove(&key),
        };
        true
    }

    /// Restore what the cell showed before `edit`. Returns `false` for an
    /// edit that has been superseded or already settled.
    pub fn rollback(&mut self, edit: &PendingEdit) -> bool {
        let key = key_of_change(&edit.change);
        let previous = match self.cells.get(&key) {
            Some(CellState::Pending { token, previous, .. }) if *token == edit.token => *previous,
            _ => return false,
        };
        match previous {
            Some(row) => self.cells.insert(key, CellState::Saved(row)),
            None => self.cells.remove(&key),
        };
        true
    }

    /// Settle a batch of edits from the server's per-item results. The server
    /// answers in request order, so `results[i]` belongs to `edits[i]`; an
    /// edit whose result is missing or names another cell is rolled back.
    pub fn apply_results(&mut self, edits: &[PendingEdit], results: &[ChangeResult]) {
        for (i, edit) in edits.iter().enumerate() {
            let result = results.get(i).filter(|r| {
                r.employee_id == edit.change.employee_id && r.date == edit.change.date
            });
            match result {
                Some(r) if r.success => {
                    self.confirm(edit, r.schedule);
                }
                _ => {
                    self.rollback(edit);
                }
            }
        }
    }

    /// What the cell currently shows
    pub fn cell(&self, employee_id: i64, date: NaiveDate) -> Option<&Assignment> {
        match self.cells.get(&CellKey { employee_id, date })? {
            CellState::Saved(row) => Some(row),
            CellState::Pending { shown, .. } => shown.as_ref(),
        }
    }

    pub fn is_pending(&self, employee_id: i64, date: NaiveDate) -> bool {
        matches!(
            self.cells.get(&CellKey { employee_id, date }),
            Some(CellState::Pending { .. })
        )
    }

    pub fn pending_count(&self) -> usize {
        self.cells
            .values()
            .filter(|s| matches!(s, CellState::Pending { .. }))
            .count()
    }

    /// Everything currently shown, ordered by date then employee, ready for
    /// [`super::CalendarGrid::build`]
    pub fn assignments(&self) -> Vec<Assignment> {
        let mut rows: Vec<Assignment> = self
            .cells
            .keys()
            .filter_map(|k| self.cell(k.employee_id, k.date).copied())
            .collect();
        rows.sort_by_key(|a| (a.date, a.employee_id));
        rows
    }
}

fn key_of(a: &Assignment) -> CellKey {
    CellKey {
        employee_id: a.employee_id,
        date: a.date,
    }
}

fn key_of_change(c: &ScheduleChange) -> CellKey {
    CellKey {
        employee_id: c.employee_id,
        date: c.date,
    }
}
