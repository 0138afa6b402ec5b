use super::Value;

pub type Row = Vec<Value>;

/// Name-tagged row: column name paired with its value, in backend order.
pub type ColumnValues = Vec<(String, Value)>;

/// Looks up a column by exact name.
pub fn column_value<'a>(columns: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    columns
        .iter()
        .find(|(column, _)| column == name)
        .map(|(_, value)| value)
}

/// Raw backend output for a single result row, before it is mapped to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// A query that selects exactly one expression yields a bare value.
    Scalar(Value),
    Tuple(Row),
    Columns(ColumnValues),
}

impl RawResult {
    pub fn arity(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Tuple(values) => values.len(),
            Self::Columns(columns) => columns.len(),
        }
    }
}

/// Either a single raw result or a sequence of them.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBatch {
    One(RawResult),
    Many(Vec<RawResult>),
}

impl RawBatch {
    pub fn into_vec(self) -> Vec<RawResult> {
        match self {
            Self::One(raw) => vec![raw],
            Self::Many(raws) => raws,
        }
    }
}

impl From<RawResult> for RawBatch {
    fn from(raw: RawResult) -> Self {
        Self::One(raw)
    }
}

impl From<Vec<RawResult>> for RawBatch {
    fn from(raws: Vec<RawResult>) -> Self {
        Self::Many(raws)
    }
}
