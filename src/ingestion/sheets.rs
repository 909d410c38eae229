//! Sheet selection.

use std::collections::BTreeSet;

use crate::problems::Problem;
use crate::schema::{SchemaDescriptor, SheetSelection};
use crate::workbook::Workbook;

/// Sheets picked for import, plus the problems found while picking them.
///
/// The two outputs are independent: in ordinal mode an out-of-range index is both reported and
/// kept in `indices`, so callers must range-check before reading a sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedSheets {
    pub indices: BTreeSet<usize>,
    pub problems: Vec<Problem>,
}

/// Resolve which sheet indices of `workbook` the schema imports.
pub fn select_sheets(schema: &SchemaDescriptor, workbook: &Workbook) -> SelectedSheets {
    match schema.sheet_selection() {
        SheetSelection::Names(patterns) => {
            let regexes = schema.sheet_regexes();
            let indices: BTreeSet<usize> = workbook
                .sheets()
                .iter()
                .filter(|s| !s.name().is_empty())
                .filter(|s| regexes.iter().any(|re| re.is_match(s.name())))
                .map(|s| s.index())
                .collect();
            let problems = if indices.is_empty() {
                vec![Problem::SheetNotPresent {
                    sheet: patterns.join(","),
                }]
            } else {
                Vec::new()
            };
            SelectedSheets { indices, problems }
        }
        SheetSelection::Indices(declared) => {
            let count = workbook.sheet_count();
            let indices: BTreeSet<usize> = declared.iter().copied().collect();
            let problems = indices
                .iter()
                .filter(|&&i| i >= count)
                .map(|i| Problem::SheetNotPresent { sheet: format!("#{i}") })
                .collect();
            SelectedSheets { indices, problems }
        }
    }
}
