use std::io::IsTerminal;

use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;

pub mod table;

use table::Table;

/// Columns shown for list output in table mode, when present.
const PREFERRED_COLUMNS: &[&str] = &[
    "id",
    "lead_id",
    "first_name",
    "last_name",
    "phone",
    "phone_number",
    "status",
    "call_status",
    "attempt_number",
    "success",
    "error_message",
    "started_at",
    "updated_at",
];

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat, color: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value, color),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format, std::io::stdout().is_terminal())?;
    println!("{rendered}");
    Ok(())
}

fn render_table<T: Serialize>(value: &T, color: bool) -> anyhow::Result<String> {
    let max_width = terminal_width();
    let rendered = match serde_json::to_value(value)? {
        Value::Array(items) if items.is_empty() => String::from("(no rows)"),
        Value::Array(items) => array_table(&items).render(max_width, color),
        Value::Object(map) => {
            let mut table = Table::new(&["key", "value"]);
            for (key, value) in &map {
                table.push(vec![key.clone(), value_to_cell(value)]);
            }
            table.render(max_width, color)
        }
        scalar => {
            let mut table = Table::new(&["value"]);
            table.push(vec![value_to_cell(&scalar)]);
            table.render(max_width, color)
        }
    };
    Ok(rendered)
}

/// Columns of the first object, narrowed to [`PREFERRED_COLUMNS`] when any match.
fn array_table(items: &[Value]) -> Table {
    let Some(first) = items.first().and_then(Value::as_object) else {
        let mut table = Table::new(&["value"]);
        for item in items {
            table.push(vec![value_to_cell(item)]);
        }
        return table;
    };

    let mut headers: Vec<&str> = PREFERRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| first.contains_key(*column))
        .collect();
    if headers.is_empty() {
        headers = first.keys().map(String::as_str).collect();
    }

    let mut table = Table::new(&headers);
    for map in items.iter().filter_map(Value::as_object) {
        table.push(
            headers
                .iter()
                .map(|header| map.get(*header).map_or_else(|| String::from("-"), value_to_cell))
                .collect(),
        );
    }
    table
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

fn terminal_width() -> Option<usize> {
    std::env::var("COLUMNS").ok()?.parse().ok()
}
