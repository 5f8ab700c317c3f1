//! Employee x day grid
//!
//! Rows are grouped by department group, columns are the days of the plan.
//! Each cell holds at most one assignment.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::{group_by_week, Assignment, CalendarWeek};

/// Employee as shown in a grid row
#[derive(Clone, Debug)]
pub struct GridEmployee {
    pub id: i64,
    pub name: String,
    pub group: Option<String>,
}

/// Shift type as shown in a grid cell
#[derive(Clone, Debug)]
pub struct GridShift {
    pub id: i64,
    pub code: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub schedule_id: i64,
    pub shift_type_id: i64,
    pub code: String,
    pub color: String,
    /// Not yet confirmed by the server
    pub pending: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub employee_id: i64,
    pub name: String,
    /// One entry per grid day
    pub cells: Vec<Option<GridCell>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridGroup {
    /// `None` for employees without a group
    pub name: Option<String>,
    pub rows: Vec<GridRow>,
}

/// Two rows found for the same employee and day
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCell {
    pub employee_id: i64,
    pub date: NaiveDate,
    pub kept_schedule_id: i64,
    pub dropped_schedule_id: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGrid {
    pub days: Vec<NaiveDate>,
    pub weeks: Vec<CalendarWeek>,
    pub groups: Vec<GridGroup>,
    /// Per day: shift code -> number of employees on it
    pub daily_totals: Vec<BTreeMap<String, u32>>,
    pub duplicates: Vec<DuplicateCell>,
}

impl CalendarGrid {
    /// Lay out `assignments` over `days`. Assignments outside the days, for
    /// unknown employees or for unknown shift types are left out.
    pub fn build(
        days: Vec<NaiveDate>,
        employees: &[GridEmployee],
        shifts: &[GridShift],
        assignments: &[Assignment],
    ) -> Self {
        let day_index: HashMap<NaiveDate, usize> =
            days.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let shift_by_id: HashMap<i64, &GridShift> = shifts.iter().map(|s| (s.id, s)).collect();

        let mut groups = group_rows(employees, days.len());

        let mut row_pos: HashMap<i64, (usize, usize)> = HashMap::new();
        for (gi, group) in groups.iter().enumerate() {
            for (ri, row) in group.rows.iter().enumerate() {
                row_pos.insert(row.employee_id, (gi, ri));
            }
        }

        // (row position, day) -> every schedule id that landed there
        let mut collisions: HashMap<(usize, usize, usize), Vec<i64>> = HashMap::new();
        for a in assignments {
            let (Some(&di), Some(&(gi, ri)), Some(shift)) = (
                day_index.get(&a.date),
                row_pos.get(&a.employee_id),
                shift_by_id.get(&a.shift_type_id),
            ) else {
                continue;
            };

            let cell = GridCell {
                schedule_id: a.schedule_id,
                shift_type_id: shift.id,
                code: shift.code.clone(),
                color: shift.color.clone(),
                pending: a.schedule_id < 0,
            };

            let slot = &mut groups[gi].rows[ri].cells[di];
            let replace = match slot.as_ref() {
                Some(existing) => {
                    collisions
                        .entry((gi, ri, di))
                        .or_insert_with(|| vec![existing.schedule_id])
                        .push(cell.schedule_id);
                    cell.schedule_id > existing.schedule_id
                }
                None => true,
            };
            if replace {
                *slot = Some(cell);
            }
        }

        let mut duplicates = Vec::new();
        for ((gi, ri, di), ids) in collisions {
            let row = &groups[gi].rows[ri];
            let Some(kept) = row.cells[di].as_ref().map(|c| c.schedule_id) else {
                continue;
            };
            duplicates.extend(ids.into_iter().filter(|&id| id != kept).map(|dropped| DuplicateCell {
                employee_id: row.employee_id,
                date: days[di],
                kept_schedule_id: kept,
                dropped_schedule_id: dropped,
            }));
        }
        duplicates.sort_by_key(|d| (d.employee_id, d.date, d.dropped_schedule_id));

        let mut daily_totals = vec![BTreeMap::new(); days.len()];
        for row in groups.iter().flat_map(|g| g.rows.iter()) {
            for (di, cell) in row.cells.iter().enumerate() {
                if let Some(cell) = cell {
                    *daily_totals[di].entry(cell.code.clone()).or_insert(0) += 1;
                }
            }
        }

        Self {
            weeks: group_by_week(&days),
            days,
            groups,
            daily_totals,
            duplicates,
        }
    }

    pub fn cell(&self, employee_id: i64, date: NaiveDate) -> Option<&GridCell> {
        let di = self.days.iter().position(|d| *d == date)?;
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .find(|r| r.employee_id == employee_id)?
            .cells[di]
            .as_ref()
    }
}

/// Named groups in name order, then the ungrouped employees
fn group_rows(employees: &[GridEmployee], width: usize) -> Vec<GridGroup> {
    let mut named: BTreeMap<String, Vec<&GridEmployee>> = BTreeMap::new();
    let mut ungrouped: Vec<&GridEmployee> = Vec::new();

    for e in employees {
        match e.group.as_deref().map(str::trim) {
            Some(g) if !g.is_empty() => named.entry(g.to_string()).or_default().push(e),
            _ => ungrouped.push(e),
        }
    }

    let to_group = |name: Option<String>, mut members: Vec<&GridEmployee>| {
        members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        GridGroup {
            name,
            rows: members
                .into_iter()
                .map(|e| GridRow {
                    employee_id: e.id,
                    name: e.name.clone(),
                    cells: vec![None; width],
                })
                .collect(),
        }
    };

    let mut groups: Vec<GridGroup> = named
        .into_iter()
        .map(|(name, members)| to_group(Some(name), members))
        .collect();
    if !ungrouped.is_empty() {
        groups.push(to_group(None, ungrouped));
    }
    groups
}
