use crate::reflection::info::{DictionaryInfo, EnumInfo, ListInfo, ObjectInfo, TypeInfo};
use crate::reflection::{Constructor, Metadata, Reflect};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static TYPE_CACHE: Lazy<RwLock<HashMap<TypeId, CachedType>>> = Lazy::new(Default::default);

/// Atomic value types. These are converted, never enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    Uuid,
    Url,
    IpAddr,
    Mail,
    DateTime,
    DateTimeOffset,
    NaiveDateTime,
    Duration,
}

impl SimpleKind {
    /// The wire-facing type name, used for item and root names.
    pub fn display_name(self) -> &'static str {
        match self {
            SimpleKind::Bool => "Boolean",
            SimpleKind::Char => "Char",
            SimpleKind::I8 => "SByte",
            SimpleKind::I16 => "Int16",
            SimpleKind::I32 => "Int32",
            SimpleKind::I64 => "Int64",
            SimpleKind::U8 => "Byte",
            SimpleKind::U16 => "UInt16",
            SimpleKind::U32 => "UInt32",
            SimpleKind::U64 => "UInt64",
            SimpleKind::F32 => "Single",
            SimpleKind::F64 => "Double",
            SimpleKind::String => "String",
            SimpleKind::Bytes => "Bytes",
            SimpleKind::Uuid => "Uuid",
            SimpleKind::Url => "Url",
            SimpleKind::IpAddr => "IpAddress",
            SimpleKind::Mail => "MailAddress",
            SimpleKind::DateTime => "DateTime",
            SimpleKind::DateTimeOffset => "DateTimeOffset",
            SimpleKind::NaiveDateTime => "NaiveDateTime",
            SimpleKind::Duration => "Duration",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            SimpleKind::I8
                | SimpleKind::I16
                | SimpleKind::I32
                | SimpleKind::I64
                | SimpleKind::U8
                | SimpleKind::U16
                | SimpleKind::U32
                | SimpleKind::U64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, SimpleKind::F32 | SimpleKind::F64)
    }
}

/// The shape of a reflected type.
#[derive(Clone)]
pub enum TypeKind {
    Simple(SimpleKind),
    Enum(EnumInfo),
    Object(ObjectInfo),
    /// Growable sequence (`Vec<T>`).
    List(ListInfo),
    /// Fixed sequence (`Box<[T]>`), built through a list.
    Array(ListInfo),
    /// Read-mostly sequence; appendable only if it declares a builder.
    Enumerable(ListInfo),
    Dictionary(DictionaryInfo),
    /// `Option<T>`.
    Nullable(fn() -> CachedType),
    /// An untyped [`Value`](crate::Value); the shape comes from the runtime value.
    Dynamic,
    /// A pre-built node tree inserted as is.
    Node { format: Option<&'static str> },
}

/// Collection classification of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Array,
    Enumerable,
    Dictionary,
}

struct TypeData {
    id: TypeId,
    rust_name: &'static str,
    info: TypeInfo,
}

/// Cached descriptor of one reflected type.
///
/// Descriptors are computed once per `TypeId` and shared process-wide; they
/// are immutable after publication.
#[derive(Clone)]
pub struct CachedType(Arc<TypeData>);

impl CachedType {
    /// Returns the descriptor of `T`, computing it on first use.
    pub fn of<T: Reflect>() -> CachedType {
        let id = TypeId::of::<T>();
        if let Some(cached) = TYPE_CACHE.read().get(&id) {
            return cached.clone();
        }
        // Built outside the lock: `type_info` may resolve other types.
        let created = CachedType(Arc::new(TypeData {
            id,
            rust_name: std::any::type_name::<T>(),
            info: T::type_info(),
        }));
        log::trace!("caching type descriptor for {}", created.rust_name());
        TYPE_CACHE.write().entry(id).or_insert(created).clone()
    }

    pub fn id(&self) -> TypeId {
        self.0.id
    }

    pub fn is<T: Reflect>(&self) -> bool {
        *self == T::cached_type()
    }

    /// The declared name (`Int32`, `Person`, ...).
    pub fn name(&self) -> &str {
        self.0.info.name()
    }

    pub fn rust_name(&self) -> &'static str {
        self.0.rust_name
    }

    pub fn kind(&self) -> &TypeKind {
        self.0.info.kind()
    }

    pub fn metadata(&self) -> &Metadata {
        self.0.info.metadata()
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.kind(), TypeKind::Nullable(_) | TypeKind::Dynamic)
    }

    /// The nullable-unwrapped type; `self` for non-nullable types.
    pub fn underlying(&self) -> CachedType {
        match self.kind() {
            TypeKind::Nullable(inner) => inner().underlying(),
            _ => self.clone(),
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(
            self.underlying().kind(),
            TypeKind::Simple(_) | TypeKind::Enum(_)
        )
    }

    pub fn simple_kind(&self) -> Option<SimpleKind> {
        match self.kind() {
            TypeKind::Simple(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind(), TypeKind::Dynamic)
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind(), TypeKind::Node { .. })
    }

    /// The format tag of the nodes a node-tree type holds, if it is bound to one.
    pub fn node_format(&self) -> Option<&'static str> {
        match self.kind() {
            TypeKind::Node { format } => *format,
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match self.kind() {
            TypeKind::Enum(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectInfo> {
        match self.kind() {
            TypeKind::Object(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListInfo> {
        match self.kind() {
            TypeKind::List(info) | TypeKind::Array(info) | TypeKind::Enumerable(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&DictionaryInfo> {
        match self.kind() {
            TypeKind::Dictionary(info) => Some(info),
            _ => None,
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self.kind() {
            TypeKind::List(_) => Some(CollectionKind::List),
            TypeKind::Array(_) => Some(CollectionKind::Array),
            TypeKind::Enumerable(_) => Some(CollectionKind::Enumerable),
            TypeKind::Dictionary(_) => Some(CollectionKind::Dictionary),
            _ => None,
        }
    }

    /// `false` for collections whose items are untyped [`Value`](crate::Value)s.
    pub fn is_generic_collection(&self) -> bool {
        match self.kind() {
            TypeKind::List(info) | TypeKind::Array(info) | TypeKind::Enumerable(info) => {
                !info.element().is_dynamic()
            }
            TypeKind::Dictionary(info) => !info.value_type().is_dynamic(),
            _ => false,
        }
    }

    pub fn element_type(&self) -> Option<CachedType> {
        self.as_list().map(ListInfo::element)
    }

    pub fn key_type(&self) -> Option<CachedType> {
        self.as_dictionary().map(DictionaryInfo::key_type)
    }

    pub fn value_type(&self) -> Option<CachedType> {
        self.as_dictionary().map(DictionaryInfo::value_type)
    }

    pub fn constructors(&self) -> &[Constructor] {
        self.as_object().map_or(&[], ObjectInfo::constructors)
    }
}

impl PartialEq for CachedType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for CachedType {}

impl fmt::Debug for CachedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CachedType").field(&self.0.rust_name).finish()
    }
}

impl fmt::Display for CachedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use std::collections::HashMap;

    #[test]
    fn test_descriptors_are_cached_by_type() {
        let first = CachedType::of::<Vec<i32>>();
        let second = <Vec<i32>>::cached_type();
        assert!(Arc::ptr_eq(&first.0, &second.0));
    }

    #[test]
    fn test_nullable_unwraps_to_underlying() {
        let ty = <Option<i32>>::cached_type();
        assert!(ty.is_nullable());
        assert!(ty.is_simple());
        assert_eq!(ty.underlying(), i32::cached_type());
        assert_eq!(ty.underlying().name(), "Int32");
    }

    #[test]
    fn test_collection_classification() {
        assert_eq!(<Vec<String>>::cached_type().collection_kind(), Some(CollectionKind::List));
        assert_eq!(<Box<[u8]>>::cached_type().collection_kind(), Some(CollectionKind::Array));
        assert_eq!(
            <HashMap<String, i32>>::cached_type().collection_kind(),
            Some(CollectionKind::Dictionary)
        );
        assert!(<Vec<String>>::cached_type().is_generic_collection());
        assert!(!<Vec<Value>>::cached_type().is_generic_collection());
        assert_eq!(<String>::cached_type().collection_kind(), None);
    }
}
