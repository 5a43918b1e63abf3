//! Tabular results and their text rendering.

use crate::constants::{
    COLUMN_SEPARATOR, MAX_RULE_WIDTH, NO_ROWS_MESSAGE, RULE_WIDTH_PER_COLUMN,
};
use crate::database::types::SqlValue;
use crate::error::ServerError;

/// Rows of a single result set, aligned by column position.
///
/// Column names keep database order and may repeat (`SELECT 1 AS a, 2 AS a`).
/// Rows only enter through [`ResultSet::push_row`], which enforces arity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    truncated: bool,
}

impl ResultSet {
    /// Create an empty result set with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            truncated: false,
        }
    }

    /// Append a row; it must have exactly one value per column.
    pub fn push_row(&mut self, row: Vec<SqlValue>) -> Result<(), ServerError> {
        if row.len() != self.columns.len() {
            return Err(ServerError::formatting(format!(
                "row {} has {} values, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether rows were dropped because of a row cap.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn mark_truncated(&mut self) {
        self.truncated = true;
    }
}

/// Width of the dash rule under the header.
pub fn rule_width(column_count: usize) -> usize {
    column_count
        .saturating_mul(RULE_WIDTH_PER_COLUMN)
        .min(MAX_RULE_WIDTH)
}

/// Render a result set as tab-separated text.
///
/// With no rows the output is exactly `"No rows returned from the query.\n"`.
/// Otherwise the header, a dash rule, then one line per row, each ending in
/// `\n`. Rows are emitted in the order given; nothing is sorted or merged.
pub fn render(result: &ResultSet) -> String {
    let mut output = String::new();

    if result.is_empty() {
        output.push_str(NO_ROWS_MESSAGE);
        output.push('\n');
        return output;
    }

    output.push_str(&result.columns.join(COLUMN_SEPARATOR));
    output.push('\n');
    output.push_str(&"-".repeat(rule_width(result.columns.len())));
    output.push('\n');

    for row in &result.rows {
        for (idx, value) in row.iter().enumerate() {
            if idx > 0 {
                output.push_str(COLUMN_SEPARATOR);
            }
            output.push_str(&value.to_string());
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> ResultSet {
        let mut rs = ResultSet::new(["Id", "Name"]);
        rs.push_row(vec![SqlValue::I32(1), SqlValue::from("Ann")])
            .unwrap();
        rs.push_row(vec![SqlValue::I32(2), SqlValue::Null]).unwrap();
        rs
    }

    #[test]
    fn test_empty_result_renders_sentence() {
        assert_eq!(
            render(&ResultSet::default()),
            "No rows returned from the query.\n"
        );
        assert_eq!(
            render(&ResultSet::new(["Id"])),
            "No rows returned from the query.\n"
        );
    }

    #[test]
    fn test_render_rows() {
        let text = render(&people());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Id\t|\tName");
        assert_eq!(lines[1], "-".repeat(40));
        assert_eq!(lines[2], "1\t|\tAnn");
        assert_eq!(lines[3], "2\t|\tNULL");
        assert_eq!(lines.len(), 4);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_rule_width_is_bounded() {
        assert_eq!(rule_width(1), 20);
        assert_eq!(rule_width(6), 120);
        assert_eq!(rule_width(50), 120);
    }

    #[test]
    fn test_duplicate_column_names_are_kept() {
        let mut rs = ResultSet::new(["a", "a"]);
        rs.push_row(vec![SqlValue::I32(1), SqlValue::I32(2)])
            .unwrap();
        assert!(render(&rs).starts_with("a\t|\ta\n"));
    }

    #[test]
    fn test_row_order_is_preserved() {
        let mut reversed = ResultSet::new(["Id", "Name"]);
        reversed
            .push_row(vec![SqlValue::I32(2), SqlValue::Null])
            .unwrap();
        reversed
            .push_row(vec![SqlValue::I32(1), SqlValue::from("Ann")])
            .unwrap();

        let a: Vec<String> = render(&people()).lines().map(String::from).collect();
        let b: Vec<String> = render(&reversed).lines().map(String::from).collect();

        assert_eq!(a[..2], b[..2]);
        assert_eq!(a[2], b[3]);
        assert_eq!(a[3], b[2]);
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render(&people()), render(&people()));
    }

    #[test]
    fn test_push_row_checks_arity() {
        let mut rs = ResultSet::new(["Id", "Name"]);
        let err = rs.push_row(vec![SqlValue::I32(1)]).unwrap_err();
        assert!(matches!(err, ServerError::Formatting(_)));
        assert!(rs.is_empty());
    }

    #[test]
    fn test_text_with_separator_characters_is_not_escaped() {
        let mut rs = ResultSet::new(["note"]);
        rs.push_row(vec![SqlValue::from("a\t|\tb")]).unwrap();
        assert_eq!(render(&rs).lines().nth(2), Some("a\t|\tb"));
    }
}
