//! `Reflect` for std and third-party types.

use super::{CachedType, DictionaryInfo, ListInfo, Reflect, SimpleKind, TypeInfo, TypeKind};
use crate::nodes::Element;
use crate::value::{Bytes, ConversionError, Instance, MailAddress, Value};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

macro_rules! reflect_simple {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::simple(SimpleKind::$kind)
                }

                fn to_value(&self) -> Option<Value> {
                    Some(Value::$kind(self.clone()))
                }

                fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
                    match value {
                        Some(Value::$kind(value)) => Ok(value),
                        other => Err(ConversionError::mismatch(
                            SimpleKind::$kind.display_name(),
                            &other,
                        )),
                    }
                }
            }
        )*
    };
}

reflect_simple! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Bytes => Bytes,
    Uuid => Uuid,
    Url => Url,
    IpAddr => IpAddr,
    MailAddress => Mail,
    DateTime<Utc> => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveDateTime => NaiveDateTime,
    Duration => Duration,
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new(T::cached_type().name(), TypeKind::Nullable(T::cached_type))
    }

    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(T::to_value)
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        match value {
            None => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new("List", TypeKind::List(ListInfo::of_vec::<T>()))
    }
}

impl<T: Reflect> Reflect for Box<[T]> {
    fn type_info() -> TypeInfo {
        TypeInfo::new("Array", TypeKind::Array(ListInfo::of_vec::<T>()))
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Instance(Instance::with_type(
            Self::cached_type(),
            self.to_vec(),
        )))
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        match value {
            Some(Value::Instance(instance)) => {
                instance.take::<Vec<T>>().map(Vec::into_boxed_slice)
            }
            other => Err(ConversionError::mismatch("Array", &other)),
        }
    }
}

impl<T: Reflect> Reflect for Arc<[T]> {
    fn type_info() -> TypeInfo {
        TypeInfo::new("Enumerable", TypeKind::Enumerable(ListInfo::of_vec::<T>()))
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Instance(Instance::with_type(
            Self::cached_type(),
            self.to_vec(),
        )))
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        match value {
            Some(Value::Instance(instance)) => instance.take::<Vec<T>>().map(Arc::from),
            other => Err(ConversionError::mismatch("Enumerable", &other)),
        }
    }
}

impl<K, V> Reflect for HashMap<K, V>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
{
    fn type_info() -> TypeInfo {
        let info = DictionaryInfo::new::<Self, K, V>(|map| {
            map.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .with_insert(|map: &mut Self, key: K, value: V| {
            map.insert(key, value);
        })
        .with_create(HashMap::<K, V>::new);
        TypeInfo::new("Dictionary", TypeKind::Dictionary(info))
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Ord,
    V: Reflect,
{
    fn type_info() -> TypeInfo {
        let info = DictionaryInfo::new::<Self, K, V>(|map| {
            map.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .with_insert(|map: &mut Self, key: K, value: V| {
            map.insert(key, value);
        })
        .with_create(BTreeMap::<K, V>::new);
        TypeInfo::new("Dictionary", TypeKind::Dictionary(info))
    }
}

/// Shared references keep their identity: the instance wraps the same cell,
/// which is what lets cycles be detected.
impl<T: Reflect> Reflect for Rc<RefCell<T>> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }

    fn cached_type() -> CachedType {
        T::cached_type()
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Instance(Instance::shared(T::cached_type(), self.clone())))
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        match value {
            Some(Value::Instance(instance)) => match instance.downcast::<T>() {
                Some(shared) => Ok(shared),
                None => T::from_value(Some(Value::Instance(instance)))
                    .map(|value| Rc::new(RefCell::new(value))),
            },
            other => T::from_value(other).map(|value| Rc::new(RefCell::new(value))),
        }
    }
}

/// An untyped value: the shape is decided by the runtime value.
impl Reflect for Value {
    fn type_info() -> TypeInfo {
        TypeInfo::new("Object", TypeKind::Dynamic)
    }

    fn to_value(&self) -> Option<Value> {
        Some(self.clone())
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        value.ok_or_else(|| ConversionError::mismatch("Object", &None))
    }
}

impl Reflect for Element {
    fn type_info() -> TypeInfo {
        TypeInfo::new("Element", TypeKind::Node { format: Some("element") })
    }

    fn to_value(&self) -> Option<Value> {
        Some(Value::Node(Box::new(self.clone())))
    }

    fn from_value(value: Option<Value>) -> Result<Self, ConversionError> {
        match value {
            Some(Value::Node(element)) => Ok(*element),
            other => Err(ConversionError::mismatch("Element", &other)),
        }
    }
}
