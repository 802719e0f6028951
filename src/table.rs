//! Text Table Rendering
//!
//! Boxed, left-aligned tables for the CLI. Widths are measured in terminal
//! columns, so CJK and emoji count double; cells are flattened to one line so embedded newlines cannot break the
//! frame.

use std::fmt::Write as _;

use unicode_width::UnicodeWidthStr;

use crate::engine::ResultSet;
use crate::query::TableRef;

/// A rectangular grid of already-stringified cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    #[must_use]
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { headers: headers.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    /// Append a row; short rows are padded with empty cells, long rows truncated
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).take(self.headers.len()).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    #[must_use]
    pub fn render(&self) -> String {
        let headers: Vec<String> = self.headers.iter().map(|h| flatten(h)).collect();
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| flatten(c)).collect())
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                rows.iter()
                    .map(|row| row[i].width())
                    .chain(std::iter::once(h.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        rule(&mut out, &widths, '┌', '┬', '┐');
        line(&mut out, &widths, &headers);
        rule(&mut out, &widths, '├', '┼', '┤');
        for row in &rows {
            line(&mut out, &widths, row);
        }
        rule(&mut out, &widths, '└', '┴', '┘');
        out
    }
}

impl From<&ResultSet> for TextTable {
    fn from(result: &ResultSet) -> Self {
        let mut table = Self::new(result.columns.iter().cloned());
        for row in &result.rows {
            table.push_row(row.iter().map(ToString::to_string));
        }
        table
    }
}

impl From<&[TableRef]> for TextTable {
    fn from(tables: &[TableRef]) -> Self {
        let mut table = Self::new(["schema", "table"]);
        for t in tables {
            table.push_row([t.schema.as_str(), t.table.as_str()]);
        }
        table
    }
}

fn flatten(cell: &str) -> String {
    cell.replace(['\r', '\n', '\t'], " ")
}

fn rule(out: &mut String, widths: &[usize], left: char, mid: char, right: char) {
    out.push(left);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            out.push(mid);
        }
        out.extend(std::iter::repeat('─').take(width + 2));
    }
    out.push(right);
    out.push('\n');
}

fn line(out: &mut String, widths: &[usize], cells: &[String]) {
    out.push('│');
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.width());
        let _ = write!(out, " {cell}{} │", " ".repeat(pad));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_result_set_with_null() {
        let result = ResultSet::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::Integer(1), Value::Text("ada".to_string())],
                vec![Value::Integer(10), Value::Null],
            ],
        )
        .unwrap();

        let expected = "\
┌────┬──────┐
│ id │ name │
├────┼──────┤
│ 1  │ ada  │
│ 10 │      │
└────┴──────┘
";
        assert_eq!(TextTable::from(&result).render(), expected);
    }

    #[test]
    fn test_render_table_refs() {
        let tables = vec![TableRef { schema: "public".to_string(), table: "orders".to_string() }];
        let rendered = TextTable::from(tables.as_slice()).render();
        assert!(rendered.contains("│ schema │ table  │"));
        assert!(rendered.contains("│ public │ orders │"));
    }

    #[test]
    fn test_render_header_only() {
        let rendered = TextTable::new(["a"]).render();
        assert_eq!(rendered, "┌───┐\n│ a │\n├───┤\n└───┘\n");
    }

    #[test]
    fn test_wide_chars_and_newlines() {
        let mut table = TextTable::new(["k"]);
        table.push_row(["é\nx"]);
        assert_eq!(table.render(), "┌─────┐\n│ k   │\n├─────┤\n│ é x │\n└─────┘\n");
    }

    #[test]
    fn test_double_width_cells_keep_frame_aligned() {
        let mut table = TextTable::new(["city"]);
        table.push_row(["東京"]);
        table.push_row(["Oslo"]);
        assert_eq!(table.render(), "┌──────┐\n│ city │\n├──────┤\n│ 東京 │\n│ Oslo │\n└──────┘\n");
    }

    #[test]
    fn test_push_row_normalizes_width() {
        let mut table = TextTable::new(["a", "b"]);
        table.push_row(["1"]);
        table.push_row(["1", "2", "3"]);
        assert_eq!(table.rows, vec![vec!["1".to_string(), String::new()], vec!["1".to_string(), "2".to_string()]]);
    }
}
