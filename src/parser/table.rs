//! HTML table sources.

use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::models::{RawRecord, TableLayout};

lazy_static! {
    static ref ROW: Selector = Selector::parse("tr").unwrap();
    static ref CELL: Selector = Selector::parse("td").unwrap();
}

/// Extract the cell texts of every data row.
///
/// The first `<tr>` of the document is treated as the header and skipped.
/// Cell text is the concatenated, trimmed text of the `<td>` subtree.
pub fn parse_table_rows(body: &str) -> Vec<Vec<String>> {
    let doc = Html::parse_document(body);
    doc.select(&ROW)
        .skip(1)
        .map(|row| {
            row.select(&CELL)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect()
}

/// Turn table rows into [`RawRecord::TableRow`]s.
///
/// Rows shorter than `layout.min_columns`, or too short to hold either
/// configured column, are skipped silently.
pub fn table_records(rows: Vec<Vec<String>>, layout: &TableLayout) -> Vec<RawRecord> {
    let needed = layout
        .min_columns
        .max(layout.host_column + 1)
        .max(layout.label_column + 1);

    rows.into_iter()
        .filter(|cells| cells.len() >= needed)
        .map(|mut cells| {
            let secondary = cells[layout.label_column].clone();
            let host = std::mem::take(&mut cells[layout.host_column]);
            RawRecord::TableRow { host, secondary }
        })
        .collect()
}
