//! Runtime type descriptors.
//!
//! A type opts into mapping by implementing [`Reflect`]. Its descriptor is
//! built once through [`TypeInfo`] and then served from a process-wide cache
//! as a [`CachedType`].

mod attributes;
mod cached_type;
mod impls;
mod info;
mod member;

pub use attributes::{Ignore, ItemName, Metadata, Rename};
pub use cached_type::{CachedType, CollectionKind, SimpleKind, TypeKind};
pub use info::{
    Constructor, Dependency, DictionaryInfo, EnumBuilder, EnumInfo, EnumVariant, ListInfo,
    ObjectBuilder, ObjectInfo, TypeInfo,
};
pub use member::{CachedMember, Member, MemberKind, Visibility};

use crate::value::{ConversionError, EnumValue, Instance, Value};

/// A type that can be mapped to and from a node tree.
///
/// Only [`type_info`](Reflect::type_info) is required for structs and
/// enums; the conversions default to boxing the value in an [`Instance`]
/// (or an [`EnumValue`] for enums).
pub trait Reflect: std::any::Any + Clone {
    fn type_info() -> TypeInfo;

    fn cached_type() -> CachedType {
        CachedType::of::<Self>()
    }

    fn to_value(&self) -> Option<Value> {
        let ty = Self::cached_type();
        if let Some(info) = ty.as_enum() {
            let index = info.position(self)?;
            return Some(Value::Enum(EnumValue::new(ty.clone(), index)));
        }
        Some(Value::Instance(Instance::with_type(ty, self.clone())))
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        match value {
            Some(Value::Instance(instance)) => instance.take::<Self>(),
            Some(Value::Enum(value)) => value.to_variant::<Self>(),
            other => Err(ConversionError::mismatch(Self::cached_type().name(), &other)),
        }
    }
}
