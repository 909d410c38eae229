#![allow(dead_code)]

use std::sync::Arc;

use sheet_import::ingestion::RowLocation;
use sheet_import::problems::RowProblem;
use sheet_import::schema::{ColumnOptions, FieldSpec, InjectKind, PreProcessor, SchemaDescriptor};
use sheet_import::types::{FieldKind, ScalarType, Value};
use sheet_import::workbook::Cell;
use sheet_import::{FieldError, Importable};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Employee {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub salary: Option<i32>,
    pub gender: Option<String>,
    pub bonuses: Vec<Value>,
    pub sheet: Option<String>,
    pub import_index: Option<i64>,
}

impl Importable for Employee {
    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        match key {
            "id" => self.id = value.as_i64(),
            "name" => self.name = value.into_string(),
            "salary" => self.salary = value.as_i64().map(|v| v as i32),
            "gender" => self.gender = value.into_string(),
            "bonuses" => self.bonuses = value.into_list(),
            "sheet" => self.sheet = value.into_string(),
            "import_index" => self.import_index = value.as_i64(),
            _ => {}
        }
        Ok(())
    }
}

pub fn employee_schema(sheet_patterns: &[&str]) -> Arc<SchemaDescriptor> {
    Arc::new(
        SchemaDescriptor::builder()
            .sheet_names(sheet_patterns.iter().copied())
            .field(FieldSpec::named("id", "(?i)id", FieldKind::scalar(ScalarType::Long)))
            .field(FieldSpec::named("name", "(?i)name", FieldKind::scalar(ScalarType::String)))
            .field(
                FieldSpec::named("salary", "(?i)salary", FieldKind::scalar(ScalarType::Int))
                    .with_options(ColumnOptions::default().required()),
            )
            .field(
                FieldSpec::named("gender", "Gender", FieldKind::enumeration(["MALE", "FEMALE"]))
                    .with_options(ColumnOptions::default().with_pre_process(PreProcessor::enum_name())),
            )
            .inject("sheet", InjectKind::SheetName)
            .inject("import_index", InjectKind::ImportIndex)
            .build()
            .expect("valid employee schema"),
    )
}

pub fn employee_header() -> Vec<Cell> {
    vec![
        Cell::from("Id"),
        Cell::from("Name"),
        Cell::from("Salary"),
        Cell::from("Gender"),
    ]
}

pub fn employee_row(id: i64, name: &str, salary: Cell, gender: &str) -> Vec<Cell> {
    vec![Cell::from(id), Cell::from(name), salary, Cell::from(gender)]
}

/// Rejects salaries below 1000.
pub fn minimum_salary(e: &Employee, loc: &RowLocation<'_>) -> Result<Vec<RowProblem>, sheet_import::ingestion::BoxError> {
    Ok(match e.salary {
        Some(s) if s < 1000 => vec![loc.business("SALARY_TOO_LOW", format!("salary {s} is below 1000"))],
        _ => Vec::new(),
    })
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
