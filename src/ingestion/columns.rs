//! Column resolution: which sheet columns feed which declared field.
//!
//! Named mode matches header texts against each field's pattern. Ordinal mode takes the declared
//! indices as-is and only reads the header (if any) for display names.
//!
//! When two matching headers carry the same text, the later column wins while the entry keeps the
//! position of the first occurrence. This mirrors a last-write-wins ordered map and is kept on
//! purpose; see `duplicate_headers_resolve_to_last_column`.

use crate::problems::Problem;
use crate::schema::{ColumnLocator, SchemaDescriptor};
use crate::workbook::Row;

/// A matched column of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Header text (named mode), header text or `None` (ordinal with header), or the stringified
    /// index (ordinal without header).
    pub display_name: Option<String>,
    pub index: usize,
}

/// Per-sheet mapping from field keys to matched columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedColumns {
    fields: Vec<(String, Vec<ResolvedColumn>)>,
    unmatched: Vec<ResolvedColumn>,
}

impl ResolvedColumns {
    /// Matched columns of `key`, in resolution order. Empty for unknown or dropped keys.
    pub fn columns(&self, key: &str) -> &[ResolvedColumn] {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, cols)| cols.as_slice())
            .unwrap_or(&[])
    }

    /// `true` when `key` still has an entry (possibly empty before [`Self::check_required`]).
    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Header columns no field claimed, in header order.
    pub fn unmatched(&self) -> &[ResolvedColumn] {
        &self.unmatched
    }

    /// Check every field's match count against its multiplicity.
    ///
    /// Returns one `ColumnNotPresent` problem per violating field; the sheet is importable only
    /// when none are returned. Fields without any match are dropped from the map.
    pub fn check_required(&mut self, schema: &SchemaDescriptor, sheet_name: &str) -> Vec<Problem> {
        let problems = schema
            .fields()
            .iter()
            .filter(|f| !f.multiplicity_ok(self.columns(f.key()).len()))
            .map(|f| Problem::ColumnNotPresent {
                sheet_name: sheet_name.to_string(),
                column_key: f.key().to_string(),
            })
            .collect();
        self.fields.retain(|(_, cols)| !cols.is_empty());
        problems
    }
}

/// Resolve the columns of one sheet. `header` is the sheet's header row, when the schema has one.
pub fn resolve_columns(schema: &SchemaDescriptor, header: Option<&Row>) -> ResolvedColumns {
    let headers: Vec<(usize, String)> = header
        .map(|row| {
            row.cells
                .iter()
                .enumerate()
                .map(|(i, c)| (i, c.formatted()))
                .filter(|(_, text)| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if schema.is_named() {
        resolve_named(schema, &headers)
    } else {
        resolve_ordinal(schema, header.is_some().then_some(&headers))
    }
}

fn resolve_named(schema: &SchemaDescriptor, headers: &[(usize, String)]) -> ResolvedColumns {
    let mut claimed = vec![false; headers.len()];
    let mut fields = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let mut cols = Vec::new();
        if let Some(re) = field.column_regex() {
            for (pos, (index, text)) in headers.iter().enumerate() {
                if re.is_match(text) {
                    claimed[pos] = true;
                    put_last_wins(&mut cols, text, *index);
                }
            }
        }
        fields.push((field.key().to_string(), cols));
    }

    let mut unmatched = Vec::new();
    for (pos, (index, text)) in headers.iter().enumerate() {
        if !claimed[pos] {
            put_last_wins(&mut unmatched, text, *index);
        }
    }

    ResolvedColumns { fields, unmatched }
}

fn put_last_wins(cols: &mut Vec<ResolvedColumn>, text: &str, index: usize) {
    match cols.iter_mut().find(|c| c.display_name.as_deref() == Some(text)) {
        Some(existing) => existing.index = index,
        None => cols.push(ResolvedColumn {
            display_name: Some(text.to_string()),
            index,
        }),
    }
}

fn resolve_ordinal(schema: &SchemaDescriptor, headers: Option<&Vec<(usize, String)>>) -> ResolvedColumns {
    let header_text = |index: usize| {
        headers.and_then(|h| h.iter().find(|(i, _)| *i == index).map(|(_, t)| t.clone()))
    };

    let mut declared = Vec::with_capacity(schema.fields().len());
    let mut fields = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let ColumnLocator::Ordinal(index) = *field.locator() else {
            continue;
        };
        declared.push(index);
        let display_name = match headers {
            Some(_) => header_text(index),
            None => Some(index.to_string()),
        };
        fields.push((
            field.key().to_string(),
            vec![ResolvedColumn { display_name, index }],
        ));
    }

    let unmatched = headers
        .map(|h| {
            h.iter()
                .filter(|(i, _)| !declared.contains(i))
                .map(|(i, t)| ResolvedColumn {
                    display_name: Some(t.clone()),
                    index: *i,
                })
                .collect()
        })
        .unwrap_or_default();

    ResolvedColumns { fields, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnOptions, FieldSpec};
    use crate::types::{FieldKind, ScalarType};
    use crate::workbook::Cell;

    fn header(texts: &[&str]) -> Row {
        Row::new(0, texts.iter().map(|t| Cell::from(*t)).collect())
    }

    fn named_schema() -> SchemaDescriptor {
        SchemaDescriptor::builder()
            .sheet_indices([0])
            .field(FieldSpec::named("name", "Name", FieldKind::scalar(ScalarType::String)))
            .field(
                FieldSpec::named("bonus", "Bonus \\d+", FieldKind::List(ScalarType::Int))
                    .with_multiplicity(2, usize::MAX),
            )
            .field(
                FieldSpec::named("email", "E-?mail", FieldKind::scalar(ScalarType::String))
                    .with_options(ColumnOptions::default().required()),
            )
            .build()
            .unwrap()
    }

    fn names(cols: &[ResolvedColumn]) -> Vec<(Option<&str>, usize)> {
        cols.iter().map(|c| (c.display_name.as_deref(), c.index)).collect()
    }

    #[test]
    fn named_headers_are_matched_in_scan_order() {
        let row = header(&["Bonus 1", "Name", "", "Comment", "Bonus 2", "Email"]);
        let cols = resolve_columns(&named_schema(), Some(&row));
        assert_eq!(names(cols.columns("name")), vec![(Some("Name"), 1)]);
        assert_eq!(
            names(cols.columns("bonus")),
            vec![(Some("Bonus 1"), 0), (Some("Bonus 2"), 4)]
        );
        assert_eq!(names(cols.unmatched()), vec![(Some("Comment"), 3)]);
    }

    #[test]
    fn duplicate_headers_resolve_to_last_column() {
        let row = header(&["Name", "Bonus 1", "Name", "Bonus 1", "Bonus 2", "Notes", "Notes"]);
        let cols = resolve_columns(&named_schema(), Some(&row));
        assert_eq!(names(cols.columns("name")), vec![(Some("Name"), 2)]);
        assert_eq!(
            names(cols.columns("bonus")),
            vec![(Some("Bonus 1"), 3), (Some("Bonus 2"), 4)]
        );
        assert_eq!(names(cols.unmatched()), vec![(Some("Notes"), 6)]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let row = header(&["Name", "Bonus 1", "Bonus 2", "x"]);
        let schema = named_schema();
        assert_eq!(resolve_columns(&schema, Some(&row)), resolve_columns(&schema, Some(&row)));
    }

    #[test]
    fn multiplicity_violations_make_sheet_unimportable() {
        let row = header(&["Name", "Bonus 1"]);
        let schema = named_schema();
        let mut cols = resolve_columns(&schema, Some(&row));
        let problems = cols.check_required(&schema, "S");
        let keys: Vec<_> = problems
            .iter()
            .map(|p| match p {
                Problem::ColumnNotPresent { column_key, .. } => column_key.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(keys, vec!["bonus", "email"]);
        assert!(!cols.contains("email"));
        assert!(cols.contains("bonus"));
    }

    #[test]
    fn ordinal_display_names() {
        let schema = SchemaDescriptor::builder()
            .named(false)
            .sheet_indices([0])
            .field(FieldSpec::ordinal("id", 0, FieldKind::scalar(ScalarType::Long)))
            .field(FieldSpec::ordinal("note", 2, FieldKind::scalar(ScalarType::String)))
            .build()
            .unwrap();

        let row = header(&["Id", "Skipped", ""]);
        let with_header = resolve_columns(&schema, Some(&row));
        assert_eq!(names(with_header.columns("id")), vec![(Some("Id"), 0)]);
        assert_eq!(names(with_header.columns("note")), vec![(None, 2)]);
        assert_eq!(names(with_header.unmatched()), vec![(Some("Skipped"), 1)]);

        let without = resolve_columns(&schema, None);
        assert_eq!(names(without.columns("note")), vec![(Some("2"), 2)]);
        assert!(without.unmatched().is_empty());
    }
}
