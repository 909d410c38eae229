//! Load a [`Workbook`] from an Excel/OpenDocument file (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`).
//!
//! Behavior:
//! - Every sheet is loaded, in workbook order, with absolute row and column indices
//! - Cached formula results come from the sheet's value range, formula text from its formula range
//! - Date-formatted cells become date serials; standalone error cells become their error text

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};

use super::{Cell, EvaluatedValue, Row, Sheet, Workbook};
use crate::error::ImportResult;

/// Open a workbook file, detecting its format from the extension.
pub fn open_path(path: impl AsRef<Path>) -> ImportResult<Workbook> {
    let sheets = open_workbook_auto(path)?;
    load(sheets)
}

/// Open a workbook held in memory, detecting its format from the content.
pub fn open_bytes(bytes: Vec<u8>) -> ImportResult<Workbook> {
    let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    load(sheets)
}

/// Read a whole stream into memory and open it as a workbook.
pub fn open_reader(mut reader: impl Read) -> ImportResult<Workbook> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    open_bytes(bytes)
}

fn load<RS: Read + Seek>(mut sheets: Sheets<RS>) -> ImportResult<Workbook> {
    let names = sheets.sheet_names().to_vec();
    let mut workbook = Workbook::default();
    for name in names {
        let values = sheets.worksheet_range(&name)?;
        // Formats without formula support (or sheets without formulas) report an error here.
        let formulas = sheets.worksheet_formula(&name).ok();
        workbook.push_sheet(build_sheet(&name, &values, formulas.as_ref()));
    }
    Ok(workbook)
}

fn build_sheet(name: &str, values: &Range<Data>, formulas: Option<&Range<String>>) -> Sheet {
    let mut grid: BTreeMap<usize, Vec<Cell>> = BTreeMap::new();

    if let Some((row0, col0)) = values.start() {
        for (r, row) in values.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                if matches!(data, Data::Empty) {
                    continue;
                }
                put(&mut grid, row0 as usize + r, col0 as usize + c, data_to_cell(data));
            }
        }
    }

    if let Some((range, (row0, col0))) = formulas.and_then(|f| f.start().map(|s| (f, s))) {
        for (r, row) in range.rows().enumerate() {
            for (c, formula) in row.iter().enumerate() {
                if formula.is_empty() {
                    continue;
                }
                let (abs_r, abs_c) = (row0 as usize + r, col0 as usize + c);
                let cached = values
                    .get_value((abs_r as u32, abs_c as u32))
                    .map_or(EvaluatedValue::Blank, data_to_evaluated);
                put(&mut grid, abs_r, abs_c, Cell::formula(formula.clone(), cached));
            }
        }
    }

    grid.into_iter()
        .fold(Sheet::new(name), |sheet, (row_no, cells)| sheet.with_row_at(row_no, cells))
}

fn put(grid: &mut BTreeMap<usize, Vec<Cell>>, row: usize, col: usize, cell: Cell) {
    let cells = grid.entry(row).or_default();
    if cells.len() <= col {
        cells.resize(col + 1, Cell::Blank);
    }
    cells[col] = cell;
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Blank,
        Data::Int(i) => Cell::number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::String(s) => Cell::String(s.clone()),
        Data::Bool(b) => Cell::Boolean(*b),
        Data::DateTime(dt) => Cell::date_serial(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::String(s.clone()),
        Data::Error(e) => Cell::String(e.to_string()),
    }
}

fn data_to_evaluated(data: &Data) -> EvaluatedValue {
    match data {
        Data::Empty => EvaluatedValue::Blank,
        Data::Int(i) => EvaluatedValue::Numeric(*i as f64),
        Data::Float(f) => EvaluatedValue::Numeric(*f),
        Data::DateTime(dt) => EvaluatedValue::Numeric(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            EvaluatedValue::String(s.clone())
        }
        Data::Bool(b) => EvaluatedValue::Boolean(*b),
        Data::Error(e) => EvaluatedValue::Error(e.to_string()),
    }
}
