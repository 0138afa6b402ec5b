pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorKind, RecordError, Result};
pub use types::{ColumnValues, RawBatch, RawResult, Row, column_value};
pub use value::{FieldType, Value};
