use std::collections::BTreeMap;

use crate::grid::Grid;
use crate::models::Module;

/// Marker in the first column of the module table's header row.
pub const MODULE_HEADER: &str = "CODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleScanState {
    SeekingHeader { row: usize },
    ReadingRows { row: usize },
    /// `next_row` is the blank row that terminated the table.
    Finished { next_row: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleTable {
    pub modules: BTreeMap<String, Module>,
    /// First row after the module table; week blocks are searched from here.
    pub next_row: usize,
}

/// Advance the module scan by one row.
pub fn transition(grid: &Grid, state: ModuleScanState) -> (ModuleScanState, Option<Module>) {
    match state {
        ModuleScanState::SeekingHeader { row } if row >= grid.len() => {
            // No header anywhere: read from the top and take what we get.
            (ModuleScanState::ReadingRows { row: 0 }, None)
        }
        ModuleScanState::SeekingHeader { row } => {
            if grid.label(row) == Some(MODULE_HEADER) {
                (ModuleScanState::ReadingRows { row: row + 1 }, None)
            } else {
                (ModuleScanState::SeekingHeader { row: row + 1 }, None)
            }
        }
        ModuleScanState::ReadingRows { row } => match module_at(grid, row) {
            Some(module) => (ModuleScanState::ReadingRows { row: row + 1 }, Some(module)),
            None => (ModuleScanState::Finished { next_row: row }, None),
        },
        finished @ ModuleScanState::Finished { .. } => (finished, None),
    }
}

fn module_at(grid: &Grid, row: usize) -> Option<Module> {
    let cells = &grid.row(row)?.cells;
    let first = cells.first().filter(|cell| !cell.value.is_empty())?;
    let text = |column: usize| {
        cells
            .get(column)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    };

    Some(Module {
        code: first.value.clone(),
        name: text(1),
        credits: text(2),
        lead: text(3),
        fill_color: first.fill_color.clone(),
    })
}

/// Collect the module lookup from the header block; later duplicates win.
pub fn parse_modules(grid: &Grid) -> ModuleTable {
    let mut modules = BTreeMap::new();
    let mut state = ModuleScanState::SeekingHeader { row: 0 };

    loop {
        let (next, module) = transition(grid, state);
        if let Some(module) = module {
            modules.insert(module.code.clone(), module);
        }
        if let ModuleScanState::Finished { next_row } = next {
            return ModuleTable { modules, next_row };
        }
        state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::grid;
    use pretty_assertions::assert_eq;

    fn module(code: &str, name: &str, credits: &str, lead: &str, fill: &str) -> Module {
        Module {
            code: code.into(),
            name: name.into(),
            credits: credits.into(),
            lead: lead.into(),
            fill_color: fill.into(),
        }
    }

    #[test]
    fn reads_rows_after_header_until_blank() {
        let grid = grid(vec![
            vec![("Year 1", "")],
            vec![("Semester 1", "")],
            vec![("CODE", ""), ("NAME", ""), ("CREDITS", ""), ("LEAD", "")],
            vec![("CS101", "FFFF0000"), ("Intro", ""), ("4", ""), ("Dr X", "")],
            vec![("MA102", "FF00FF00"), ("Calculus", ""), ("4", ""), ("Dr Y", "")],
            vec![("", "")],
            vec![("Week 1", "")],
        ]);

        let table = parse_modules(&grid);

        assert_eq!(table.next_row, 5);
        assert_eq!(table.modules.len(), 2);
        assert_eq!(
            table.modules["CS101"],
            module("CS101", "Intro", "4", "Dr X", "FFFF0000")
        );
    }

    #[test]
    fn duplicate_code_keeps_later_row() {
        let grid = grid(vec![
            vec![("CODE", "")],
            vec![("CS101", "A"), ("Old", ""), ("2", ""), ("Dr A", "")],
            vec![("CS101", "B"), ("New", ""), ("4", ""), ("Dr B", "")],
            vec![],
        ]);

        let table = parse_modules(&grid);

        assert_eq!(table.modules.len(), 1);
        assert_eq!(table.modules["CS101"], module("CS101", "New", "4", "Dr B", "B"));
        assert_eq!(table.next_row, 3);
    }

    #[test]
    fn short_rows_fill_missing_fields_with_blanks() {
        let grid = grid(vec![vec![("CODE", "")], vec![("CS101", "")]]);

        let table = parse_modules(&grid);

        assert_eq!(table.modules["CS101"], module("CS101", "", "", "", ""));
        assert_eq!(table.next_row, 2);
    }

    #[test]
    fn missing_header_degrades_to_reading_from_top() {
        let grid = grid(vec![vec![("", "")], vec![("CS101", "")]]);

        let table = parse_modules(&grid);

        assert!(table.modules.is_empty());
        assert_eq!(table.next_row, 0);
    }

    #[test]
    fn empty_grid_yields_empty_table() {
        let table = parse_modules(&Grid::default());
        assert_eq!(table, ModuleTable::default());
    }

    #[test]
    fn transitions_are_stepwise() {
        let grid = grid(vec![vec![("x", "")], vec![("CODE", "")], vec![("CS101", "")]]);

        let (state, _) = transition(&grid, ModuleScanState::SeekingHeader { row: 0 });
        assert_eq!(state, ModuleScanState::SeekingHeader { row: 1 });
        let (state, _) = transition(&grid, state);
        assert_eq!(state, ModuleScanState::ReadingRows { row: 2 });
        let (state, emitted) = transition(&grid, state);
        assert_eq!(state, ModuleScanState::ReadingRows { row: 3 });
        assert_eq!(emitted.map(|m| m.code), Some("CS101".to_string()));
        let (state, _) = transition(&grid, state);
        assert_eq!(state, ModuleScanState::Finished { next_row: 3 });
    }
}
