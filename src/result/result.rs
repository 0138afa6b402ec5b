use crate::core::{RawResult, Row, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positional view: a single selected column yields bare scalars.
    pub fn into_tuples(self) -> Vec<RawResult> {
        let single = self.columns.len() == 1;
        self.rows
            .into_iter()
            .map(|mut row| {
                if single && row.len() == 1 {
                    RawResult::Scalar(row.remove(0))
                } else {
                    RawResult::Tuple(row)
                }
            })
            .collect()
    }

    /// Name-tagged view of every row.
    pub fn into_associations(self) -> Vec<RawResult> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| {
                RawResult::Columns(
                    columns
                        .iter()
                        .cloned()
                        .zip(row.into_iter().chain(std::iter::repeat(Value::Null)))
                        .collect(),
                )
            })
            .collect()
    }
}
