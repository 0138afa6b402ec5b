//! Per-type capability discovery: identity member, audit timestamps and
//! encrypted fields.
//!
//! Metadata is resolved from [`Record::descriptor`] once per type and kept in a
//! process-wide cache. Resolution failures are returned to the caller and not
//! cached, so a misconfigured type fails the same way on every call.

use crate::core::{FieldType, RecordError, Result, Value};
use crate::record::{CryptMode, Record, RecordDescriptor};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

lazy_static! {
    static ref META_CACHE: RwLock<HashMap<TypeId, Arc<RecordMeta>>> = RwLock::new(HashMap::new());
}

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMember {
    Field(&'static str),
    Accessor(&'static str),
}

impl IdentityMember {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Field(name) | Self::Accessor(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    Created,
    Updated,
}

impl AuditKind {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Created => CREATED_AT,
            Self::Updated => UPDATED_AT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditMember {
    pub field: &'static str,
    pub field_type: FieldType,
}

impl AuditMember {
    /// `now` expressed in this member's temporal representation.
    pub fn stamp_value(&self, now: DateTime<Utc>) -> Value {
        match self.field_type {
            FieldType::DateTime => Value::DateTime(now.naive_utc()),
            FieldType::Date => Value::Date(now.date_naive()),
            _ => Value::Timestamp(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedField {
    pub field: &'static str,
    pub mode: CryptMode,
}

/// Resolved capability set of one record type.
#[derive(Debug, Clone)]
pub struct RecordMeta {
    pub descriptor: RecordDescriptor,
    pub identity: Option<IdentityMember>,
    pub created_at: Option<AuditMember>,
    pub updated_at: Option<AuditMember>,
    pub encrypted: Vec<EncryptedField>,
}

impl RecordMeta {
    pub fn resolve(descriptor: RecordDescriptor) -> Result<Self> {
        let identity = resolve_identity(&descriptor)?;
        let created_at = resolve_audit(&descriptor, AuditKind::Created)?;
        let updated_at = resolve_audit(&descriptor, AuditKind::Updated)?;

        let mut encrypted = Vec::new();
        for field in &descriptor.fields {
            let Some(mode) = field.crypt else {
                continue;
            };
            if !field.field_type.is_textual() {
                return Err(RecordError::NonTextEncryptedField {
                    field: field.name.to_string(),
                    field_type: field.field_type.to_string(),
                });
            }
            encrypted.push(EncryptedField {
                field: field.name,
                mode,
            });
        }

        Ok(Self {
            descriptor,
            identity,
            created_at,
            updated_at,
            encrypted,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.descriptor.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.descriptor.table_name
    }

    pub fn audit(&self, kind: AuditKind) -> Option<AuditMember> {
        match kind {
            AuditKind::Created => self.created_at,
            AuditKind::Updated => self.updated_at,
        }
    }

    /// Declared type of the identity member, when it is a field.
    pub fn identity_type(&self) -> Option<FieldType> {
        match self.identity? {
            IdentityMember::Field(name) => self.descriptor.find_field(name).map(|f| f.field_type),
            IdentityMember::Accessor(_) => None,
        }
    }

    pub fn identity_value<T: Record>(&self, record: &T) -> Result<Value> {
        let member = self
            .identity
            .ok_or_else(|| RecordError::NoIdentity(self.type_name().to_string()))?;

        let read = match member {
            IdentityMember::Field(name) => record.get(name),
            IdentityMember::Accessor(name) => record.call_accessor(name),
        };

        read.map_err(|err| RecordError::IdentityUnreadable {
            member: member.name().to_string(),
            reason: err.to_string(),
        })
    }
}

fn resolve_identity(descriptor: &RecordDescriptor) -> Result<Option<IdentityMember>> {
    let fields: Vec<_> = descriptor.fields.iter().filter(|f| f.identity).collect();
    if fields.len() > 1 {
        return Err(RecordError::MultipleIdentity {
            type_name: descriptor.type_name.to_string(),
            kind: "field",
        });
    }

    let accessors: Vec<_> = descriptor.accessors.iter().filter(|a| a.identity).collect();
    if accessors.len() > 1 {
        return Err(RecordError::MultipleIdentity {
            type_name: descriptor.type_name.to_string(),
            kind: "accessor",
        });
    }

    Ok(fields
        .first()
        .map(|f| IdentityMember::Field(f.name))
        .or_else(|| accessors.first().map(|a| IdentityMember::Accessor(a.name))))
}

fn resolve_audit(descriptor: &RecordDescriptor, kind: AuditKind) -> Result<Option<AuditMember>> {
    let Some(field) = descriptor.find_field(kind.field_name()) else {
        return Ok(None);
    };

    if !field.field_type.is_temporal() {
        return Err(RecordError::UnsupportedAuditType {
            field: field.name.to_string(),
            field_type: field.field_type.to_string(),
        });
    }

    Ok(Some(AuditMember {
        field: field.name,
        field_type: field.field_type,
    }))
}

/// Entry points over the cached [`RecordMeta`] of a type.
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn meta<T: Record>() -> Result<Arc<RecordMeta>> {
        let key = TypeId::of::<T>();
        if let Some(meta) = META_CACHE.read()?.get(&key) {
            return Ok(meta.clone());
        }

        let meta = Arc::new(RecordMeta::resolve(T::descriptor())?);
        let mut cache = META_CACHE.write()?;
        Ok(cache.entry(key).or_insert(meta).clone())
    }

    pub fn identity_member<T: Record>() -> Result<Option<IdentityMember>> {
        Ok(Self::meta::<T>()?.identity)
    }

    pub fn identity_value<T: Record>(record: &T) -> Result<Value> {
        Self::meta::<T>()?.identity_value(record)
    }

    pub fn audit_member<T: Record>(kind: AuditKind) -> Result<Option<AuditMember>> {
        Ok(Self::meta::<T>()?.audit(kind))
    }

    /// Writes `now` into the audit member of `kind`, if the type declares one.
    pub fn stamp<T: Record>(record: &mut T, meta: &RecordMeta, kind: AuditKind, now: DateTime<Utc>) -> Result<bool> {
        match meta.audit(kind) {
            Some(member) => {
                record.set(member.field, member.stamp_value(now))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes a backend-assigned key into the identity field.
    ///
    /// Accessor identities are derived values and are left untouched.
    pub fn assign_identity<T: Record>(record: &mut T, meta: &RecordMeta, key: Value) -> Result<bool> {
        match meta.identity {
            Some(IdentityMember::Field(name)) => {
                let field_type = meta.identity_type().unwrap_or(FieldType::Other("key"));
                let key = crate::mapper::coerce(key, field_type)?;
                record.set(name, key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
