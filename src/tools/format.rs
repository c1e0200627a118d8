//! Output formatting utilities for MCP tools.
//!
//! Results are returned to the client as plain delimited text: one header
//! line followed by one line per row.

use crate::db::ResultSet;

/// Format a catalog query as a single-column table list.
///
/// The header line is `Tables_in_<database>`, followed by the first column of
/// each row.
pub fn format_table_listing(database: &str, result: &ResultSet) -> String {
    std::iter::once(format!("Tables_in_{}", database))
        .chain(result.first_column())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a result set as comma-separated lines with a header of column names.
///
/// Values are not quoted or escaped.
pub fn format_as_csv(result: &ResultSet) -> String {
    let header = result.columns.join(",");
    let lines = result.rows.iter().map(|row| {
        row.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    });

    std::iter::once(header)
        .chain(lines)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_rows_affected(rows_affected: u64) -> String {
    format!("Query executed successfully. Rows affected: {}", rows_affected)
}
