//! Console tables for extracted records

use crate::storage::ProcessRecord;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Placeholder shown for NULL columns
const NULL_CELL: &str = "NULL";

/// One line of a record table
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct RecordField {
    pub column: &'static str,
    pub value: String,
}

impl RecordField {
    fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Column names and display values of a record, in schema order
pub fn record_fields(record: &ProcessRecord) -> Vec<RecordField> {
    let text = |value: &Option<String>| value.as_deref().unwrap_or(NULL_CELL).to_string();

    vec![
        RecordField::new("nome_processo", record.name.as_str()),
        RecordField::new("descricao", record.description.as_str()),
        RecordField::new("data_recebimento", text(&record.received_at)),
        RecordField::new("unidade", text(&record.unit)),
        RecordField::new("usuario", text(&record.user)),
        RecordField::new("detalhes", text(&record.details)),
        RecordField::new(
            "quantidade_dias",
            record
                .day_count
                .map(|days| days.to_string())
                .unwrap_or_else(|| NULL_CELL.to_string()),
        ),
    ]
}

/// Renders a record as a two-column ASCII table
pub fn render_record_table(record: &ProcessRecord) -> String {
    Table::new(record_fields(record))
        .with(Style::ascii())
        .to_string()
}

/// Prints a record table to stdout
pub fn print_record(record: &ProcessRecord) {
    println!("{}", render_record_table(record));
}
