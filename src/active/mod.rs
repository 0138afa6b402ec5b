//! Active-record surface.

mod context;

pub use context::RecordContext;

use crate::core::{Result, Value};
use crate::record::Record;

/// Self-persisting methods for every record type.
///
/// Blanket-implemented; bring the trait into scope and call `user.save(&ctx)`
/// or `User::find(&ctx, 1)`.
pub trait ActiveRecord: Record + Default {
    fn save(self, ctx: &RecordContext) -> Result<Self> {
        ctx.save(self)
    }

    fn update(self, ctx: &RecordContext) -> Result<Self> {
        ctx.update(self)
    }

    fn update_if_exists(self, ctx: &RecordContext) -> Result<Self> {
        ctx.update_if_exists(self)
    }

    fn delete(&self, ctx: &RecordContext) -> Result<()> {
        ctx.delete(self)
    }

    fn exists(&self, ctx: &RecordContext) -> Result<bool> {
        ctx.exists(self)
    }

    fn find(ctx: &RecordContext, id: impl Into<Value>) -> Result<Option<Self>> {
        ctx.find(id)
    }

    fn find_all(ctx: &RecordContext) -> Result<Vec<Self>> {
        ctx.find_all()
    }

    fn find_where<K, I>(ctx: &RecordContext, filters: I) -> Result<Vec<Self>>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        ctx.find_where(filters)
    }
}

impl<T: Record + Default> ActiveRecord for T {}
