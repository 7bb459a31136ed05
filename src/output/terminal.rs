//! Terminal output utilities.
//!
//! Provides column-aligned tables for terminal output.

/// Spaces between columns.
const COLUMN_GAP: usize = 2;

/// Format a value as a left-aligned field of at least `width` characters.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A left-aligned string, never truncated
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    format!("{value_str:<width$}")
}

/// A table whose columns are aligned to the widest cell.
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: &[&str]) -> Table {
        Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: vec![],
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Render with a dashed line under the header.
    ///
    /// `style` may color a cell after it has been padded, so escape codes
    /// do not disturb the alignment.
    pub fn render_with<F>(&self, style: F) -> String
    where
        F: Fn(usize, &str, String) -> String,
    {
        let widths = self.widths();
        let mut out = String::new();

        let underline: Vec<String> = self.header.iter().map(|h| "-".repeat(h.chars().count())).collect();
        out.push_str(&render_line(&self.header, &widths, |_, _, cell| cell));
        out.push_str(&render_line(&underline, &widths, |_, _, cell| cell));
        for row in &self.rows {
            out.push_str(&render_line(row, &widths, &style));
        }
        out
    }

    pub fn render(&self) -> String {
        self.render_with(|_, _, cell| cell)
    }
}

fn render_line<F>(cells: &[String], widths: &[usize], style: F) -> String
where
    F: Fn(usize, &str, String) -> String,
{
    let last = cells.len().saturating_sub(1);
    let line: String = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let padded = if i == last {
                cell.clone()
            } else {
                format_field(cell, widths[i] + COLUMN_GAP)
            };
            style(i, cell, padded)
        })
        .collect();
    format!("{}\n", line.trim_end())
}
