//! Human-readable labels from adjacent header text.
//!
//! A non-text cell is labelled by the nearest text cell above it in the same
//! column (column header) and the nearest text cell to its left in the same
//! row (row label). `Q1` at C1 and `Revenue` at A5 label C5 as `Q1 Revenue`.
//! A position inside a merged region reads the region's top-left text.

use std::collections::BTreeMap;

use calamine::Dimensions;

use crate::types::{CellId, Literal, Workbook};

/// Merged regions per sheet name.
pub type MergedRegions = BTreeMap<String, Vec<Dimensions>>;

/// Fill in `label` for every non-text cell that has no label yet.
pub fn assign_labels(workbook: &mut Workbook, merges: &MergedRegions) {
    // (sheet, row, col) -> header text, for quick neighbour scans.
    let mut texts: BTreeMap<String, BTreeMap<(u32, u32), String>> = BTreeMap::new();
    for (id, cell) in &workbook.cells {
        if let Some(Literal::Text(s)) = cell.literal() {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                texts
                    .entry(id.sheet.clone())
                    .or_default()
                    .insert((id.row, id.col), trimmed.to_string());
            }
        }
    }

    let labels: Vec<(CellId, String)> = workbook
        .cells
        .iter()
        .filter(|(_, cell)| cell.label.is_none())
        .filter(|(_, cell)| !cell.literal().is_some_and(Literal::is_text))
        .filter_map(|(id, _)| {
            let sheet = SheetText {
                texts: texts.get(id.sheet.as_str())?,
                merges: merges
                    .get(id.sheet.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            };
            sheet.label_for(id.row, id.col).map(|label| (id.clone(), label))
        })
        .collect();

    for (id, label) in labels {
        if let Some(cell) = workbook.cells.get_mut(&id) {
            cell.label = Some(label);
        }
    }
}

struct SheetText<'a> {
    texts: &'a BTreeMap<(u32, u32), String>,
    merges: &'a [Dimensions],
}

impl SheetText<'_> {
    fn text_at(&self, row: u32, col: u32) -> Option<&String> {
        self.texts.get(&(row, col)).or_else(|| {
            self.merges
                .iter()
                .find(|merge| merge.contains(row, col))
                .and_then(|merge| self.texts.get(&merge.start))
        })
    }

    fn label_for(&self, row: u32, col: u32) -> Option<String> {
        let column_header = (0..row).rev().find_map(|r| self.text_at(r, col));
        let row_label = (0..col).rev().find_map(|c| self.text_at(row, c));

        match (column_header, row_label) {
            (Some(above), Some(left)) => Some(format!("{above} {left}")),
            (Some(above), None) => Some(above.clone()),
            (None, Some(left)) => Some(left.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn text(s: &str) -> Cell {
        Cell::value(Literal::Text(s.to_string()))
    }

    fn num(n: i64) -> Cell {
        Cell::value(Literal::Integer(n))
    }

    #[test]
    fn test_row_label_and_column_header_combine() {
        let mut wb = Workbook::new("book");
        wb.insert(CellId::new("S", 0, 1), text("Q1"));
        wb.insert(CellId::new("S", 1, 0), text("Revenue"));
        wb.insert(CellId::new("S", 1, 1), num(100));

        assign_labels(&mut wb, &MergedRegions::new());

        let cell = wb.get(&CellId::new("S", 1, 1)).unwrap();
        assert_eq!(cell.label.as_deref(), Some("Q1 Revenue"));
    }

    #[test]
    fn test_nearest_text_wins_and_text_cells_unlabelled() {
        let mut wb = Workbook::new("book");
        wb.insert(CellId::new("S", 0, 0), text("Old"));
        wb.insert(CellId::new("S", 0, 1), text("Price"));
        wb.insert(CellId::new("S", 0, 2), num(5));
        wb.insert(CellId::new("S", 1, 0), text("  "));

        assign_labels(&mut wb, &MergedRegions::new());

        assert_eq!(
            wb.get(&CellId::new("S", 0, 2)).unwrap().label.as_deref(),
            Some("Price")
        );
        assert_eq!(wb.get(&CellId::new("S", 0, 1)).unwrap().label, None);
    }

    #[test]
    fn test_no_neighbours_no_label_and_existing_label_kept() {
        let mut wb = Workbook::new("book");
        wb.insert(CellId::new("S", 3, 3), num(1));
        wb.insert(CellId::new("S", 0, 4), text("Header"));
        wb.insert(CellId::new("S", 3, 4), num(2).with_label("custom"));
        wb.insert(CellId::new("Other", 5, 5), num(3));

        assign_labels(&mut wb, &MergedRegions::new());

        assert_eq!(wb.get(&CellId::new("S", 3, 3)).unwrap().label, None);
        assert_eq!(
            wb.get(&CellId::new("S", 3, 4)).unwrap().label.as_deref(),
            Some("custom")
        );
        assert_eq!(wb.get(&CellId::new("Other", 5, 5)).unwrap().label, None);
    }

    #[test]
    fn test_merged_header_labels_every_covered_column() {
        let mut wb = Workbook::new("book");
        wb.insert(CellId::new("S", 0, 1), text("Quarter"));
        wb.insert(CellId::new("S", 2, 0), text("Sales"));
        wb.insert(CellId::new("S", 2, 1), num(1));
        wb.insert(CellId::new("S", 2, 2), num(2));
        wb.insert(CellId::new("S", 2, 4), num(3));
        // B1:C2 is one merged header.
        let merges = MergedRegions::from([(
            "S".to_string(),
            vec![Dimensions::new((0, 1), (1, 2))],
        )]);

        assign_labels(&mut wb, &merges);

        let label = |col| wb.get(&CellId::new("S", 2, col)).unwrap().label.clone();
        assert_eq!(label(1).as_deref(), Some("Quarter Sales"));
        assert_eq!(label(2).as_deref(), Some("Quarter Sales"));
        assert_eq!(label(4).as_deref(), Some("Sales"));
    }
}
