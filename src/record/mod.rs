//! Record contracts.
//!
//! A [`Record`] exposes a static [`RecordDescriptor`] (member names, declared
//! types, identity/encryption markers and constructor signatures) together
//! with by-name member access. `#[derive(Record)]` generates both; the rest of
//! the crate works only through this trait, so hand-written impls behave the
//! same as derived ones.

mod value_impls;

pub use value_impls::Json;

use crate::core::{FieldType, RecordError, Result, Value};
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

lazy_static! {
    static ref DESCRIPTOR_CACHE: RwLock<HashMap<TypeId, Arc<RecordDescriptor>>> =
        RwLock::new(HashMap::new());
}

/// How an encrypted member is transformed before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CryptMode {
    /// Irreversible digest (bcrypt).
    #[default]
    OneWay,
    /// Reversible cipher (AES-256).
    TwoWay,
}

impl CryptMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OneWay => "one_way",
            Self::TwoWay => "two_way",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub identity: bool,
    pub crypt: Option<CryptMode>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            nullable: false,
            identity: false,
            crypt: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn crypt(mut self, mode: CryptMode) -> Self {
        self.crypt = Some(mode);
        self
    }
}

/// A zero-argument method whose result can serve as the record identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorDescriptor {
    pub name: &'static str,
    pub identity: bool,
}

impl AccessorDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            identity: false,
        }
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
}

impl ParamDescriptor {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type }
    }
}

/// Ordered parameter list of one way to build the record positionally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstructorDescriptor {
    pub params: Vec<ParamDescriptor>,
}

impl ConstructorDescriptor {
    pub fn new(params: Vec<ParamDescriptor>) -> Self {
        Self { params }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub type_name: &'static str,
    pub table_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub accessors: Vec<AccessorDescriptor>,
    pub constructors: Vec<ConstructorDescriptor>,
}

impl RecordDescriptor {
    pub fn new(type_name: &'static str, table_name: impl Into<String>) -> Self {
        Self {
            type_name,
            table_name: table_name.into(),
            fields: Vec::new(),
            accessors: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn accessor(mut self, accessor: AccessorDescriptor) -> Self {
        self.accessors.push(accessor);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// First declared constructor taking exactly `arity` arguments.
    pub fn constructor_for_arity(&self, arity: usize) -> Option<(usize, &ConstructorDescriptor)> {
        self.constructors
            .iter()
            .enumerate()
            .find(|(_, constructor)| constructor.arity() == arity)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name).collect()
    }
}

/// A type the active-record layer can persist, map and encrypt.
pub trait Record: Sized + Send + Sync + 'static {
    fn descriptor() -> RecordDescriptor;

    /// Reads a declared field by name.
    fn get(&self, field: &str) -> Result<Value>;

    /// Writes a declared field by name. The value must already have the field's type.
    fn set(&mut self, field: &str, value: Value) -> Result<()>;

    /// Invokes a declared accessor by name.
    fn call_accessor(&self, accessor: &str) -> Result<Value> {
        Err(RecordError::UnknownMember {
            type_name: Self::descriptor().type_name.to_string(),
            member: accessor.to_string(),
        })
    }

    /// Builds an instance through the constructor at `constructor` in the
    /// descriptor's list. Arguments are already coerced to the parameter types.
    fn construct(constructor: usize, args: Vec<Value>) -> Result<Self>;
}

/// The descriptor of `T`, built on first use and shared afterwards.
pub fn descriptor_of<T: Record>() -> Result<Arc<RecordDescriptor>> {
    let key = TypeId::of::<T>();
    if let Some(descriptor) = DESCRIPTOR_CACHE.read()?.get(&key) {
        return Ok(descriptor.clone());
    }

    let descriptor = Arc::new(T::descriptor());
    let mut cache = DESCRIPTOR_CACHE.write()?;
    Ok(cache.entry(key).or_insert(descriptor).clone())
}

/// A Rust type that can live in a record member.
pub trait RecordValue: Sized {
    fn field_type() -> FieldType;

    fn nullable() -> bool {
        false
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

/// Default table name for a record type: lower snake case of the type name.
pub fn default_table_name(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, ch) in type_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Pulls the next constructor argument, failing if the caller supplied too few.
pub fn next_arg(
    args: &mut impl Iterator<Item = Value>,
    type_name: &str,
    param: &str,
) -> Result<Value> {
    args.next().ok_or_else(|| RecordError::UnknownMember {
        type_name: type_name.to_string(),
        member: format!("constructor argument '{}'", param),
    })
}

/// Collects every declared field of `record` as a name-tagged row.
pub fn to_columns<T: Record>(record: &T, descriptor: &RecordDescriptor) -> Result<Vec<(String, Value)>> {
    descriptor
        .fields
        .iter()
        .map(|field| Ok((field.name.to_string(), record.get(field.name)?)))
        .collect()
}
