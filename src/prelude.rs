//! Recommended imports grouped by abstraction level.
//!
//! `dx` covers application code: derive, context, active-record methods.
//! `advanced` is the escape hatch for custom backends and crypto primitives.

pub mod dx {
    //! Everyday surface for record types and their persistence.
    pub use crate::{
        ActiveRecord, Json, Record, RecordConfig, RecordContext, RecordError, Result, Value,
    };
}

pub mod advanced {
    //! Contracts for plugging in backends, hashers and ciphers.
    pub use crate::backend::{EntityRow, MemoryBackend, PersistenceBackend};
    pub use crate::crypto::{Aes256Cipher, BcryptHasher, CryptoGate, OneWayHasher, TwoWayCipher};
    pub use crate::identity::{IdentityResolver, RecordMeta};
    pub use crate::mapper::ResultMapper;
    pub use crate::query::{CriteriaBuilder, CriteriaQuery, FilteredQueryBuilder, Predicate};
    pub use crate::record::{
        AccessorDescriptor, ConstructorDescriptor, CryptMode, FieldDescriptor, ParamDescriptor,
        RecordDescriptor, RecordValue,
    };
    pub use crate::transaction::{ScopeState, TransactionHandle, TransactionScope};
}
