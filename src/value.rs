//! Boxed runtime values exchanged between the object graph and the node tree.

use crate::nodes::Element;
use crate::reflection::{CachedType, Reflect, SimpleKind};
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::net::IpAddr;
use std::rc::Rc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// A boxed value at one position of the tree.
///
/// Null is never a variant: absent values are `Option<Value>::None`.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    Uuid(Uuid),
    Url(Url),
    IpAddr(IpAddr),
    Mail(MailAddress),
    DateTime(DateTime<Utc>),
    DateTimeOffset(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
    Duration(Duration),
    Enum(EnumValue),
    Instance(Instance),
    Node(Box<Element>),
}

impl Value {
    /// Boxes a composite value into a fresh [`Instance`].
    pub fn instance<T: Reflect>(value: T) -> Self {
        Value::Instance(Instance::new(value))
    }

    /// The runtime type of this value.
    pub fn cached_type(&self) -> CachedType {
        match self {
            Value::Bool(_) => bool::cached_type(),
            Value::Char(_) => char::cached_type(),
            Value::I8(_) => i8::cached_type(),
            Value::I16(_) => i16::cached_type(),
            Value::I32(_) => i32::cached_type(),
            Value::I64(_) => i64::cached_type(),
            Value::U8(_) => u8::cached_type(),
            Value::U16(_) => u16::cached_type(),
            Value::U32(_) => u32::cached_type(),
            Value::U64(_) => u64::cached_type(),
            Value::F32(_) => f32::cached_type(),
            Value::F64(_) => f64::cached_type(),
            Value::String(_) => String::cached_type(),
            Value::Bytes(_) => Bytes::cached_type(),
            Value::Uuid(_) => Uuid::cached_type(),
            Value::Url(_) => Url::cached_type(),
            Value::IpAddr(_) => IpAddr::cached_type(),
            Value::Mail(_) => MailAddress::cached_type(),
            Value::DateTime(_) => DateTime::<Utc>::cached_type(),
            Value::DateTimeOffset(_) => DateTime::<FixedOffset>::cached_type(),
            Value::NaiveDateTime(_) => NaiveDateTime::cached_type(),
            Value::Duration(_) => Duration::cached_type(),
            Value::Enum(value) => value.ty().clone(),
            Value::Instance(instance) => instance.ty().clone(),
            Value::Node(_) => Element::cached_type(),
        }
    }

    /// The scalar kind of this value, `None` for enums, instances and nodes.
    pub fn simple_kind(&self) -> Option<SimpleKind> {
        Some(match self {
            Value::Bool(_) => SimpleKind::Bool,
            Value::Char(_) => SimpleKind::Char,
            Value::I8(_) => SimpleKind::I8,
            Value::I16(_) => SimpleKind::I16,
            Value::I32(_) => SimpleKind::I32,
            Value::I64(_) => SimpleKind::I64,
            Value::U8(_) => SimpleKind::U8,
            Value::U16(_) => SimpleKind::U16,
            Value::U32(_) => SimpleKind::U32,
            Value::U64(_) => SimpleKind::U64,
            Value::F32(_) => SimpleKind::F32,
            Value::F64(_) => SimpleKind::F64,
            Value::String(_) => SimpleKind::String,
            Value::Bytes(_) => SimpleKind::Bytes,
            Value::Uuid(_) => SimpleKind::Uuid,
            Value::Url(_) => SimpleKind::Url,
            Value::IpAddr(_) => SimpleKind::IpAddr,
            Value::Mail(_) => SimpleKind::Mail,
            Value::DateTime(_) => SimpleKind::DateTime,
            Value::DateTimeOffset(_) => SimpleKind::DateTimeOffset,
            Value::NaiveDateTime(_) => SimpleKind::NaiveDateTime,
            Value::Duration(_) => SimpleKind::Duration,
            Value::Enum(_) | Value::Instance(_) | Value::Node(_) => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Identity of the shared instance behind this value, if any.
    pub(crate) fn identity(&self) -> Option<usize> {
        self.as_instance().map(Instance::id)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::F64(a), Value::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Url(a), Value::Url(b)) => a == b,
            (Value::IpAddr(a), Value::IpAddr(b)) => a == b,
            (Value::Mail(a), Value::Mail(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => a == b,
            (Value::NaiveDateTime(a), Value::NaiveDateTime(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write_float(f, f64::from(*v), &v.to_string()),
            Value::F64(v) => write_float(f, *v, &v.to_string()),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{}", v.hyphenated()),
            Value::Url(v) => f.write_str(v.as_str()),
            Value::IpAddr(v) => write!(f, "{v}"),
            Value::Mail(v) => write!(f, "{v}"),
            Value::DateTime(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
            Value::NaiveDateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Duration(v) => f.write_str(&format_duration(v)),
            Value::Enum(v) => f.write_str(v.name()),
            Value::Instance(v) => f.write_str(v.ty().name()),
            Value::Node(v) => f.write_str(v.name.as_deref().unwrap_or("node")),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64, finite: &str) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        f.write_str(finite)
    }
}

/// Formats a duration as `[d.]hh:mm:ss[.fffffffff]`.
pub(crate) fn format_duration(duration: &Duration) -> String {
    let total = duration.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, minutes, seconds) = (rest / 3600, (rest % 3600) / 60, rest % 60);
    let mut text = if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    };
    let nanos = duration.subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text
}

// -----------------------------------------------------------------------------
// Enum values

/// One variant of a reflected fieldless enum.
#[derive(Clone)]
pub struct EnumValue {
    ty: CachedType,
    index: usize,
}

impl EnumValue {
    pub(crate) fn new(ty: CachedType, index: usize) -> Self {
        Self { ty, index }
    }

    pub fn ty(&self) -> &CachedType {
        &self.ty
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The declared variant name.
    pub fn name(&self) -> &str {
        self.ty
            .as_enum()
            .and_then(|info| info.variants().get(self.index))
            .map(|variant| variant.name())
            .unwrap_or_default()
    }

    /// The numeric value declared for the variant.
    pub fn discriminant(&self) -> i64 {
        self.ty
            .as_enum()
            .and_then(|info| info.variants().get(self.index))
            .map(|variant| variant.discriminant())
            .unwrap_or_default()
    }

    /// Rebuilds the native enum value.
    pub fn to_variant<T: Any>(&self) -> Result<T, ConversionError> {
        let boxed = self
            .ty
            .as_enum()
            .and_then(|info| info.instantiate(self.index))
            .ok_or_else(|| ConversionError::new(format!("'{}' has no variant {}", self.ty.name(), self.index)))?;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ConversionError::new(format!("'{}' is not '{}'", self.ty.name(), std::any::type_name::<T>())))
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.index == other.index
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.ty.name(), self.name())
    }
}

// -----------------------------------------------------------------------------
// Instances

/// A shared, type-erased composite value (object, list or dictionary).
///
/// The payload is an `Rc<RefCell<S>>`; its address is the instance identity
/// used for cycle detection.
#[derive(Clone)]
pub struct Instance {
    ty: CachedType,
    cell: Rc<dyn Any>,
}

impl Instance {
    /// Moves `value` into a new instance of its own reflected type.
    pub fn new<T: Reflect>(value: T) -> Self {
        Self::with_type(T::cached_type(), value)
    }

    /// Creates an instance whose storage type differs from the reflected
    /// type, as for boxed slices backed by a `Vec`.
    pub fn with_type<S: Any>(ty: CachedType, storage: S) -> Self {
        Self {
            ty,
            cell: Rc::new(RefCell::new(storage)),
        }
    }

    /// Wraps an existing shared cell without copying, keeping its identity.
    pub fn shared<S: Any>(ty: CachedType, cell: Rc<RefCell<S>>) -> Self {
        Self { ty, cell }
    }

    pub fn ty(&self) -> &CachedType {
        &self.ty
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.id() == other.id()
    }

    /// The `RefCell<S>` behind this instance.
    pub fn cell(&self) -> &dyn Any {
        &*self.cell
    }

    pub fn borrow<S: Any>(&self) -> Option<Ref<'_, S>> {
        self.cell
            .downcast_ref::<RefCell<S>>()
            .and_then(|cell| cell.try_borrow().ok())
    }

    pub fn downcast<S: Any>(&self) -> Option<Rc<RefCell<S>>> {
        self.cell.clone().downcast::<RefCell<S>>().ok()
    }

    /// Takes the payload out, cloning it only when the cell is still shared.
    pub fn take<S: Any + Clone>(self) -> Result<S, ConversionError> {
        let name = self.ty.name().to_string();
        let rc = self.cell.downcast::<RefCell<S>>().map_err(|_| {
            ConversionError::new(format!("instance of '{name}' is not '{}'", std::any::type_name::<S>()))
        })?;
        match Rc::try_unwrap(rc) {
            Ok(cell) => Ok(cell.into_inner()),
            Err(rc) => rc
                .try_borrow()
                .map(|value| value.clone())
                .map_err(|_| ConversionError::new(format!("instance of '{name}' is being modified"))),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({} @ {:#x})", self.ty.name(), self.id())
    }
}

// -----------------------------------------------------------------------------
// Scalar newtypes

/// A byte array, mapped as a single base64 value rather than a list of bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base64::engine::general_purpose::STANDARD.encode(&self.0))
    }
}

/// A syntactically checked e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MailAddress {
    address: String,
    at: usize,
}

impl MailAddress {
    pub fn parse(text: &str) -> Result<Self, String> {
        let address = text.trim();
        let at = address
            .rfind('@')
            .ok_or_else(|| format!("'{address}' has no '@'"))?;
        let (user, host) = (&address[..at], &address[at + 1..]);
        if user.is_empty() || host.is_empty() {
            return Err(format!("'{address}' needs both a user and a host"));
        }
        if address.chars().any(char::is_whitespace) || host.starts_with('.') || host.ends_with('.') {
            return Err(format!("'{address}' is not a valid address"));
        }
        Ok(Self {
            address: address.to_string(),
            at,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    pub fn user(&self) -> &str {
        &self.address[..self.at]
    }

    pub fn host(&self) -> &str {
        &self.address[self.at + 1..]
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

// -----------------------------------------------------------------------------
// Conversion errors

/// Failure to move a [`Value`] into or out of a native type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn mismatch(expected: &str, found: &Option<Value>) -> Self {
        let found = match found {
            None => "null".to_string(),
            Some(value) => format!("'{}'", value.cached_type().name()),
        };
        Self::new(format!("expected '{expected}', found {found}"))
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConversionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(&Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_duration(&Duration::from_secs(90_061)), "1.01:01:01");
        assert_eq!(format_duration(&Duration::from_millis(1500)), "00:00:01.5");
    }

    #[test]
    fn test_non_finite_floats_display_by_name() {
        assert_eq!(Value::F64(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::F32(f32::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::F64(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_mail_address_parts() {
        let mail = MailAddress::parse("jane@example.com").unwrap();
        assert_eq!(mail.user(), "jane");
        assert_eq!(mail.host(), "example.com");
        assert!(MailAddress::parse("nobody").is_err());
        assert!(MailAddress::parse("@example.com").is_err());
    }

    #[test]
    fn test_instances_compare_by_identity() {
        let a = Value::instance(vec![1, 2, 3]);
        let b = Value::instance(vec![1, 2, 3]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
