use std::io::{self, Write};

use unicode_width::UnicodeWidthStr;

/// A boxed text table
///
/// ```text
/// +----------+-------+
/// | NODE     | OS    |
/// +----------+-------+
/// | worker-1 | linux |
/// +----------+-------+
/// ```
#[derive(Clone, Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells are drawn empty, extra cells are dropped
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells
            .into_iter()
            .take(self.headers.len())
            .map(Into::into)
            .collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Display width of each column, header included
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].width())
                    .chain(std::iter::once(header.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let widths = self.column_widths();
        let separator = separator_line(&widths);

        writeln!(out, "{separator}")?;
        write_row(out, &self.headers, &widths)?;
        writeln!(out, "{separator}")?;
        for row in &self.rows {
            write_row(out, row, &widths)?;
        }
        writeln!(out, "{separator}")
    }
}

fn separator_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    write!(out, "|")?;
    for (cell, width) in cells.iter().zip(widths) {
        // Pad by display width; `{:width$}` counts chars, not columns
        let padding = width.saturating_sub(cell.width());
        write!(out, " {cell}{} |", " ".repeat(padding))?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(table: &Table) -> String {
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_table_layout() {
        let mut table = Table::new(["NODE", "OS"]);
        table.push_row(["worker-1", "linux"]);
        table.push_row(["w2", "windows"]);

        let expected = "\
+----------+---------+
| NODE     | OS      |
+----------+---------+
| worker-1 | linux   |
| w2       | windows |
+----------+---------+
";
        assert_eq!(render(&table), expected);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_wide_characters_align() {
        let mut table = Table::new(["NODE"]);
        table.push_row(["ノード"]);
        table.push_row(["abc"]);

        assert_eq!(table.column_widths(), vec![6]);
        let rendered = render(&table);
        assert!(rendered.contains("| ノード |"));
        assert!(rendered.contains("| abc    |"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(["A", "B", "C"]);
        table.push_row(["1"]);
        table.push_row(["1", "2", "3", "4"]);

        let rendered = render(&table);
        assert!(rendered.contains("| 1 |   |   |"));
        assert!(rendered.contains("| 1 | 2 | 3 |"));
    }
}
