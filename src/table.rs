//! Fixed-width text tables for the LLM-facing context.
//!
//! Output mirrors the familiar dataframe console layout: a left-aligned index
//! column, right-aligned value columns separated by two spaces, and `...`
//! markers when rows or columns are elided.

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    index: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, index: impl Into<String>, cells: Vec<String>) {
        self.index.push(index.into());
        self.rows.push(cells);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render the whole table
    pub fn render(&self) -> String {
        self.render_truncated(None, None)
    }

    /// Render at most `max_rows` rows and `max_cols` columns, keeping the
    /// head and tail halves of each and marking the gap with `...`.
    pub fn render_truncated(&self, max_rows: Option<usize>, max_cols: Option<usize>) -> String {
        let col_positions = keep_positions(self.headers.len(), max_cols);
        let row_positions = keep_positions(self.rows.len(), max_rows);

        let project = |cells: &[String]| -> Vec<String> {
            col_positions
                .iter()
                .map(|pos| match pos {
                    Some(i) => cells.get(*i).cloned().unwrap_or_default(),
                    None => ELLIPSIS.to_string(),
                })
                .collect()
        };

        let header = project(&self.headers);
        let mut index_cells = Vec::with_capacity(row_positions.len());
        let mut body = Vec::with_capacity(row_positions.len());
        for pos in &row_positions {
            match pos {
                Some(r) => {
                    index_cells.push(self.index[*r].clone());
                    body.push(project(&self.rows[*r]));
                }
                None => {
                    index_cells.push(ELLIPSIS.to_string());
                    body.push(vec![ELLIPSIS.to_string(); header.len()]);
                }
            }
        }

        let index_width = index_cells.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        let widths: Vec<usize> = (0..header.len())
            .map(|c| {
                body.iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(header[c].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(body.len() + 1);
        lines.push(format_line(&" ".repeat(index_width), &header, &widths));
        for (idx, row) in index_cells.iter().zip(body.iter()) {
            lines.push(format_line(&format!("{:<width$}", idx, width = index_width), row, &widths));
        }

        let mut out = lines.join("\n");
        if row_positions.contains(&None) || col_positions.contains(&None) {
            out.push_str(&format!(
                "\n\n[{} rows x {} columns]",
                self.rows.len(),
                self.headers.len()
            ));
        }
        out
    }
}

fn format_line(index: &str, cells: &[String], widths: &[usize]) -> String {
    let mut line = index.to_string();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str("  ");
        line.push_str(&format!("{:>width$}", cell, width = *width));
    }
    line.trim_end().to_string()
}

/// Positions to keep out of `total`; `None` marks the elided gap.
fn keep_positions(total: usize, limit: Option<usize>) -> Vec<Option<usize>> {
    match limit {
        Some(max) if total > max && max >= 2 => {
            let head = max / 2;
            let tail = max - head;
            (0..head)
                .map(Some)
                .chain(std::iter::once(None))
                .chain((total - tail..total).map(Some))
                .collect()
        }
        _ => (0..total).map(Some).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_aligns_columns() {
        let mut table = TextTable::new(vec!["name".to_string(), "value".to_string()]);
        table.push_row("0", vec!["a".to_string(), "10".to_string()]);
        table.push_row("1", vec!["long".to_string(), "2".to_string()]);

        let out = table.render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "   name  value");
        assert_eq!(lines[1], "0     a     10");
        assert_eq!(lines[2], "1  long      2");
    }

    #[test]
    fn test_truncates_rows_and_columns() {
        let headers: Vec<String> = (0..12).map(|c| format!("c{}", c)).collect();
        let mut table = TextTable::new(headers);
        for r in 0..60 {
            table.push_row(r.to_string(), (0..12).map(|c| (r * c).to_string()).collect());
        }

        let out = table.render_truncated(Some(50), Some(10));
        assert!(out.contains("..."));
        assert!(out.ends_with("[60 rows x 12 columns]"));
        // header + 25 head rows + gap + 25 tail rows
        let table_lines = out.split("\n\n").next().unwrap().lines().count();
        assert_eq!(table_lines, 52);
        assert!(!out.contains("c5 "));
        assert!(out.contains("c11"));
    }
}
