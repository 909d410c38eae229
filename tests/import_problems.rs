mod common;

use std::sync::Arc;

use common::{employee_header, employee_row, employee_schema, minimum_salary, Employee};
use sheet_import::problems::{Problem, ProblemKind, ValueProblemKind};
use sheet_import::schema::SchemaDescriptor;
use sheet_import::types::Value;
use sheet_import::workbook::{Cell, EvaluatedValue, Sheet, Workbook};
use sheet_import::{FieldError, Importable, Importer};

#[test]
fn no_sheet_matches_the_declared_names() {
    let wb = Workbook::new(vec![
        Sheet::new("Sheet1").with_row(employee_header()),
        Sheet::new("Notes"),
    ]);
    let session = Importer::<Employee>::builder(employee_schema(&["Employees", "Staff.*"]))
        .build()
        .process_workbook(&wb);

    assert_eq!(session.total_rows(), 0);
    assert_eq!(session.sheet_count(), 0);
    assert!(!session.is_valid());
    assert_eq!(
        session.problems(),
        vec![Problem::SheetNotPresent {
            sheet: "Employees,Staff.*".to_string()
        }]
    );
    assert_eq!(
        session.problems()[0].to_string(),
        "no sheet matching 'Employees,Staff.*' is present"
    );
}

#[test]
fn missing_required_columns_skip_the_sheet() {
    let wb = Workbook::new(vec![Sheet::new("Employees")
        .with_row(vec![Cell::from("Id"), Cell::from("Name")])
        .with_row(vec![Cell::from(1_i64), Cell::from("Ann")])
        .with_row(vec![Cell::from(2_i64), Cell::from("Bob")])]);

    let mut seen = 0;
    let session = Importer::<Employee>::builder(employee_schema(&["Employees"]))
        .consumer(|_| seen += 1)
        .build()
        .process_workbook(&wb);

    assert_eq!(session.total_rows(), 0);
    assert_eq!(session.sheet_count(), 1);
    assert_eq!(seen, 0);
    let missing: Vec<_> = session
        .problems_of(ProblemKind::ColumnNotPresent)
        .into_iter()
        .map(|p| match p {
            Problem::ColumnNotPresent { column_key, .. } => column_key,
            other => panic!("unexpected problem {other}"),
        })
        .collect();
    assert_eq!(missing, vec!["salary".to_string(), "gender".to_string()]);
    assert_eq!(session.problems_in(ProblemKind::Row).len(), 2);
}

#[test]
fn one_bad_sheet_does_not_stop_the_next() {
    let broken = Sheet::new("Staff A").with_row(vec![Cell::from("Id")]);
    let good = Sheet::new("Staff B")
        .with_row(employee_header())
        .with_row(employee_row(7, "Gail", Cell::from(3000.0), "FEMALE"));
    let session = Importer::<Employee>::builder(employee_schema(&["Staff .*"]))
        .build()
        .process_workbook(&Workbook::new(vec![broken, good]));

    assert_eq!(session.sheet_count(), 2);
    assert_eq!(session.total_rows(), 1);
    assert_eq!(session.import_problems().len(), 3);
    assert!(session.import_problems().iter().all(|p| p.sheet_name() == Some("Staff A")));
    assert_eq!(session.rows()[0].import_index(), 1);
}

#[cfg(feature = "excel")]
#[test]
fn non_spreadsheet_bytes_yield_a_file_problem() {
    let mut seen = 0;
    let session = Importer::<Employee>::builder(employee_schema(&["Employees"]))
        .consumer(|_| seen += 1)
        .build()
        .process_bytes(b"id,name,salary\n1,Ann,1200\n".to_vec());

    assert_eq!(session.total_rows(), 0);
    assert_eq!(session.problems(), vec![Problem::File]);
    assert_eq!(seen, 0);
}

#[cfg(feature = "excel")]
#[test]
fn missing_file_yields_a_file_problem() {
    let session = Importer::<Employee>::builder(employee_schema(&["Employees"]))
        .build()
        .process_path("does/not/exist.xlsx");
    assert_eq!(session.problems_of(ProblemKind::File).len(), 1);
    assert!(!session.is_valid());
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Contact {
    email: Option<String>,
    code: Option<String>,
    total: Option<f64>,
    active: Option<bool>,
}

impl Importable for Contact {
    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        match key {
            "email" => self.email = value.into_string(),
            "code" => match value {
                Value::Null => {}
                Value::String(s) if s.starts_with("X-") => self.code = Some(s),
                Value::String(s) => {
                    return Err(FieldError::business(
                        "BAD_CODE",
                        format!("code '{s}' must start with X-"),
                    ));
                }
                other => return Err(FieldError::failed(format!("unexpected {other:?}"))),
            },
            "total" => self.total = value.as_f64(),
            "active" => self.active = value.as_bool(),
            _ => {}
        }
        Ok(())
    }
}

fn contact_schema() -> Arc<SchemaDescriptor> {
    let schema = SchemaDescriptor::from_json_str(
        r#"{
            "sheet_indices": [0],
            "fields": [
                { "key": "email", "column": "(?i)e-?mail", "kind": { "scalar": "string" },
                  "required": true, "matches": "[^@\\s]+@[^@\\s]+", "pre_process": ["lower_case"] },
                { "key": "code", "column": "Code", "kind": "custom", "pre_process": ["upper_case"] },
                { "key": "total", "column": "Total", "kind": { "scalar": "double" },
                  "formula_allowed": false },
                { "key": "active", "column": "Active", "kind": { "scalar": "boolean" } }
            ]
        }"#,
    )
    .unwrap();
    Arc::new(schema)
}

fn contacts() -> Workbook {
    Workbook::new(vec![Sheet::new("Contacts")
        .with_row(vec![
            Cell::from("E-mail"),
            Cell::from("Code"),
            Cell::from("Total"),
            Cell::from("Active"),
        ])
        .with_row(vec![
            Cell::from("  ANN@Example.com "),
            Cell::from("x-1"),
            Cell::from(10.0),
            Cell::from("yes"),
        ])
        .with_row(vec![
            Cell::from("not an address"),
            Cell::from("y-2"),
            Cell::formula("SUM(A1:A3)", EvaluatedValue::Numeric(6.0)),
            Cell::from(true),
        ])
        .with_row(vec![
            Cell::from("bob@example.com"),
            Cell::Blank,
            Cell::from(2.5),
            Cell::from("maybe"),
        ])])
}

#[test]
fn configured_schema_reports_each_value_problem() {
    let session = Importer::<Contact>::builder(contact_schema())
        .build()
        .process_workbook(&contacts());

    assert_eq!(session.total_rows(), 3);
    assert_eq!(session.valid_row_count(), 1);

    let first = session.rows()[0].record();
    assert_eq!(first.email.as_deref(), Some("ann@example.com"));
    assert_eq!(first.code.as_deref(), Some("X-1"));
    assert_eq!(first.active, Some(true));

    let second = &session.rows()[1];
    let kinds: Vec<_> = second.problems().iter().map(|p| p.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ProblemKind::ValueFormatRegex,
            ProblemKind::Business,
            ProblemKind::ValueFormulaNotAllowed,
        ]
    );
    assert_eq!(second.problems()[1].business_code(), Some("BAD_CODE"));
    assert_eq!(second.record().total, None);

    let third = &session.rows()[2];
    assert_eq!(third.problems().len(), 1);
    assert_eq!(third.problems()[0].as_value().unwrap().kind, ValueProblemKind::Format);
    assert_eq!(third.problems()[0].as_value().unwrap().raw_value.as_deref(), Some("maybe"));

    assert_eq!(session.problems_in(ProblemKind::ValueFormat).len(), 2);
    assert_eq!(session.problems_in(ProblemKind::Value).len(), 3);
}

#[test]
fn problems_for_a_record() {
    let session = Importer::<Contact>::builder(contact_schema())
        .build()
        .process_workbook(&contacts());

    let bob = session.rows()[2].record().clone();
    let problems = session.problems_for(&bob);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].row_no, 3);
    assert!(session.problems_for(&Contact::default()).is_empty());
}

#[test]
fn invalid_consumer_sees_row_problems() {
    let mut reported = Vec::new();
    let wb = Workbook::new(vec![Sheet::new("Employees")
        .with_row(employee_header())
        .with_row(employee_row(1, "Ann", Cell::from(1500.0), "FEMALE"))
        .with_row(employee_row(2, "Bob", Cell::from(900.0), "MALE"))]);

    let session = Importer::<Employee>::builder(employee_schema(&["Employees"]))
        .validator(minimum_salary)
        .invalid_consumer_with_problems(|e, problems| {
            reported.push((e.id, problems.iter().map(|p| p.to_string()).collect::<Vec<_>>()))
        })
        .build()
        .process_workbook(&wb);

    assert_eq!(session.invalid_row_count(), 1);
    assert_eq!(
        reported,
        vec![(
            Some(2),
            vec!["sheet 'Employees', row 3: salary 900 is below 1000 [SALARY_TOO_LOW]".to_string()]
        )]
    );
}

#[test]
fn session_display_starts_with_the_summary() {
    let session = Importer::<Contact>::builder(contact_schema())
        .build()
        .process_workbook(&contacts());
    let stats = session.summary();
    assert_eq!(stats.rows, 3);
    assert_eq!(stats.valid, 1);
    assert_eq!(stats.invalid, 2);
    let text = session.to_string();
    assert!(text.starts_with(&stats.to_string()));
}

#[test]
#[should_panic(expected = "consumer rejected Ann")]
fn consumer_panics_are_not_swallowed() {
    let wb = Workbook::new(vec![Sheet::new("Employees")
        .with_row(employee_header())
        .with_row(employee_row(1, "Ann", Cell::from(1500.0), "FEMALE"))]);

    Importer::<Employee>::builder(employee_schema(&["Employees"]))
        .valid_consumer(|e| panic!("consumer rejected {}", e.name.as_deref().unwrap_or("?")))
        .build()
        .process_workbook(&wb);
}
