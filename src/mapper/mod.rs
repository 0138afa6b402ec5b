//! Mapping of raw backend output into typed records.

mod cast;
mod naming;

pub use cast::{NumberCast, coerce};
pub use naming::{names_match, normalize_name};

use crate::core::{RawBatch, RawResult, RecordError, Result, Value};
use crate::record::{Record, RecordValue, descriptor_of};
use tracing::{Level, event};

pub struct ResultMapper;

impl ResultMapper {
    /// Builds `T` through the first declared constructor whose arity equals
    /// the tuple length.
    pub fn map_tuple<T: Record>(values: Vec<Value>) -> Result<T> {
        let descriptor = descriptor_of::<T>()?;
        let arity = values.len();
        let (index, constructor) = descriptor.constructor_for_arity(arity).ok_or_else(|| {
            RecordError::NoMatchingConstructor {
                type_name: descriptor.type_name.to_string(),
                arity,
            }
        })?;

        let args = values
            .into_iter()
            .zip(&constructor.params)
            .map(|(value, param)| coerce(value, param.field_type))
            .collect::<Result<Vec<_>>>()?;

        T::construct(index, args)
    }

    /// Coerces a single scalar straight to the target value type.
    pub fn map_scalar<V: RecordValue>(value: Value) -> Result<V> {
        V::from_value(coerce(value, V::field_type())?)
    }

    /// Populates a default instance of `T` from name-tagged columns.
    ///
    /// Column and field names are compared after normalization, ignoring
    /// case. Columns with no matching field are skipped.
    pub fn map_association<T: Record + Default>(columns: Vec<(String, Value)>) -> Result<T> {
        let descriptor = descriptor_of::<T>()?;
        let mut instance = T::default();

        for (column, value) in columns {
            let Some(field) = descriptor
                .fields
                .iter()
                .find(|field| names_match(&column, field.name))
            else {
                event!(Level::TRACE, column = %column, record = descriptor.type_name, "ignoring unmatched column");
                continue;
            };
            instance.set(field.name, coerce(value, field.field_type)?)?;
        }

        Ok(instance)
    }

    pub fn map_raw<T: Record + Default>(raw: RawResult) -> Result<T> {
        match raw {
            RawResult::Tuple(values) => Self::map_tuple(values),
            RawResult::Scalar(value) => Self::map_tuple(vec![value]),
            RawResult::Columns(columns) => Self::map_association(columns),
        }
    }

    /// Maps every element in order, failing on the first bad row.
    pub fn map_sequence<T: Record + Default>(batch: impl Into<RawBatch>) -> Result<Vec<T>> {
        batch.into().into_vec().into_iter().map(Self::map_raw).collect()
    }

    /// Maps every element in order, keeping per-row outcomes.
    pub fn map_each<T: Record + Default>(batch: impl Into<RawBatch>) -> Vec<Result<T>> {
        batch.into().into_vec().into_iter().map(Self::map_raw).collect()
    }

    pub fn map_scalars<V: RecordValue>(batch: impl Into<RawBatch>) -> Result<Vec<V>> {
        batch
            .into()
            .into_vec()
            .into_iter()
            .map(|raw| match raw {
                RawResult::Scalar(value) => Self::map_scalar(value),
                RawResult::Tuple(mut values) if values.len() == 1 => Self::map_scalar(values.remove(0)),
                RawResult::Columns(mut columns) if columns.len() == 1 => {
                    Self::map_scalar(columns.remove(0).1)
                }
                other => Err(RecordError::NoMatchingConstructor {
                    type_name: V::field_type().to_string(),
                    arity: other.arity(),
                }),
            })
            .collect()
    }
}
