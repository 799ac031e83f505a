//! Conversions between raw node values and the value a type expects.

use crate::error::MappingError;
use crate::options::{NonNumericFloat, Options};
use crate::reflection::{CachedType, EnumInfo, SimpleKind};
use crate::value::{Bytes, EnumValue, MailAddress, Value};
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Outcome of reading a value into a typed slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Coerced {
    Assign(Option<Value>),
    /// Null for a non-nullable type with `ignore_nulls_for_value_types`.
    Keep,
}

/// Converts a raw inbound value to `target`.
///
/// Order: null, untyped targets, already assignable values, enums, text
/// parsing, empty text, numeric and textual conversion.
pub(crate) fn read(
    raw: Option<Value>,
    target: &CachedType,
    options: &Options,
    path: &str,
) -> Result<Coerced, MappingError> {
    let Some(raw) = raw else {
        return null_value(target, options, path);
    };
    let ty = target.underlying();
    if ty.is_dynamic() || raw.cached_type() == ty {
        return Ok(Coerced::Assign(Some(raw)));
    }
    if let Some(info) = ty.as_enum() {
        if let Some(index) = enum_index(&raw, info, options) {
            return Ok(Coerced::Assign(Some(Value::Enum(EnumValue::new(ty.clone(), index)))));
        }
    }
    if let Value::String(text) = &raw {
        if text.is_empty() {
            return if target.is_nullable() {
                Ok(Coerced::Assign(None))
            } else {
                null_value(target, options, path)
            };
        }
        if ty.as_enum().is_none() || options.deserialization().parser(&ty).is_some() {
            return parse(text, &ty, options, path).map(|value| Coerced::Assign(Some(value)));
        }
    }
    if ty.as_enum().is_some() {
        return Err(parse_error(&raw.to_string(), &ty, options, path, "no variant matches"));
    }
    convert(&raw, &ty, path).map(|value| Coerced::Assign(Some(value)))
}

fn null_value(target: &CachedType, options: &Options, path: &str) -> Result<Coerced, MappingError> {
    if target.is_nullable() {
        Ok(Coerced::Assign(None))
    } else if options.deserialization().ignore_nulls_for_value_types() {
        log::debug!("ignoring null for non-nullable '{}' at {path}", target.name());
        Ok(Coerced::Keep)
    } else {
        Err(MappingError::cannot_be_null(path, target.name()))
    }
}

fn enum_index(raw: &Value, info: &EnumInfo, options: &Options) -> Option<usize> {
    match raw {
        Value::String(text) if !text.is_empty() => {
            let text = text.trim();
            let case_sensitive = options.deserialization().case_sensitive_enum_names();
            info.index_of_name(text, case_sensitive)
                .or_else(|| {
                    info.variants().iter().position(|variant| {
                        let written = options.naming().enum_name(variant.name());
                        if case_sensitive {
                            written == text
                        } else {
                            written.eq_ignore_ascii_case(text)
                        }
                    })
                })
                .or_else(|| {
                    text.parse::<i64>()
                        .ok()
                        .and_then(|number| info.index_of_discriminant(number))
                })
        }
        other => integer_of(other).and_then(|number| {
            i64::try_from(number)
                .ok()
                .and_then(|number| info.index_of_discriminant(number))
        }),
    }
}

/// Parses text with the custom parser for `ty` or the built-in one.
pub(crate) fn parse(
    text: &str,
    ty: &CachedType,
    options: &Options,
    path: &str,
) -> Result<Value, MappingError> {
    if let Some(parser) = options.deserialization().parser(ty) {
        return match parser(text) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(parse_error(text, ty, options, path, "parser produced no value")),
            Err(error) => Err(parse_error(text, ty, options, path, &error.to_string())),
        };
    }
    let Some(kind) = ty.simple_kind() else {
        return Err(MappingError::ValueConversion {
            path: path.to_string(),
            value: text.to_string(),
            from: "String".to_string(),
            to: ty.name().to_string(),
            reason: "no parser is registered for this type".to_string(),
        });
    };
    parse_simple(text, kind).map_err(|reason| parse_error(text, ty, options, path, &reason))
}

fn parse_simple(text: &str, kind: SimpleKind) -> Result<Value, String> {
    fn number<T: std::str::FromStr>(text: &str) -> Result<T, String>
    where
        T::Err: std::fmt::Display,
    {
        text.trim().parse::<T>().map_err(|e| e.to_string())
    }

    Ok(match kind {
        SimpleKind::Bool => match text.trim() {
            t if t.eq_ignore_ascii_case("true") => Value::Bool(true),
            t if t.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => return Err("expected 'true' or 'false'".to_string()),
        },
        SimpleKind::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err("expected exactly one character".to_string()),
            }
        }
        SimpleKind::I8 => Value::I8(number(text)?),
        SimpleKind::I16 => Value::I16(number(text)?),
        SimpleKind::I32 => Value::I32(number(text)?),
        SimpleKind::I64 => Value::I64(number(text)?),
        SimpleKind::U8 => Value::U8(number(text)?),
        SimpleKind::U16 => Value::U16(number(text)?),
        SimpleKind::U32 => Value::U32(number(text)?),
        SimpleKind::U64 => Value::U64(number(text)?),
        SimpleKind::F32 => Value::F32(number(text)?),
        SimpleKind::F64 => Value::F64(number(text)?),
        SimpleKind::String => Value::String(text.to_string()),
        SimpleKind::Bytes => Value::Bytes(Bytes(
            base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| e.to_string())?,
        )),
        SimpleKind::Uuid => Value::Uuid(Uuid::parse_str(text.trim()).map_err(|e| e.to_string())?),
        SimpleKind::Url => Value::Url(Url::parse(text.trim()).map_err(|e| e.to_string())?),
        SimpleKind::IpAddr => Value::IpAddr(number::<IpAddr>(text)?),
        SimpleKind::Mail => Value::Mail(MailAddress::parse(text)?),
        SimpleKind::DateTime => Value::DateTime(parse_utc(text.trim())?),
        SimpleKind::DateTimeOffset => Value::DateTimeOffset(
            DateTime::parse_from_rfc3339(text.trim()).map_err(|e| e.to_string())?,
        ),
        SimpleKind::NaiveDateTime => Value::NaiveDateTime(number::<NaiveDateTime>(text)?),
        SimpleKind::Duration => Value::Duration(parse_duration(text.trim())?),
    })
}

/// RFC 3339, or a naive timestamp taken as UTC.
fn parse_utc(text: &str) -> Result<DateTime<Utc>, String> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(value) => Ok(value.with_timezone(&Utc)),
        Err(_) => text
            .parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|e| e.to_string()),
    }
}

/// Parses `[d.]hh:mm:ss[.fffffffff]`.
pub(crate) fn parse_duration(text: &str) -> Result<Duration, String> {
    let invalid = || format!("'{text}' is not a duration like [d.]hh:mm:ss[.f]");
    let parts: Vec<&str> = text.split(':').collect();
    let [head, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };
    let (days, hours) = match head.split_once('.') {
        Some((days, hours)) => (days, hours),
        None => ("0", *head),
    };
    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (*seconds, ""),
    };
    let field = |text: &str| text.parse::<u64>().map_err(|_| invalid());
    let (days, hours, minutes, whole) = (field(days)?, field(hours)?, field(minutes)?, field(whole)?);
    if hours > 23 || minutes > 59 || whole > 59 {
        return Err(invalid());
    }
    let nanos = if fraction.is_empty() {
        0
    } else if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    } else {
        format!("{fraction:0<9}").parse::<u32>().map_err(|_| invalid())?
    };
    let seconds = days * 86_400 + hours * 3600 + minutes * 60 + whole;
    Ok(Duration::new(seconds, nanos))
}

/// The user-facing parse message for `ty`, with `{value}` still in place.
pub(crate) fn friendly_parse_message(ty: &CachedType, options: &Options) -> Option<String> {
    let ty = ty.underlying();
    if let Some(message) = options.deserialization().friendly_parse_message(&ty) {
        return Some(message.to_string());
    }
    if ty.as_enum().is_some() {
        return Some("'{value}' is not a valid option.".to_string());
    }
    let message = match ty.simple_kind()? {
        SimpleKind::Bool => "'{value}' is not a valid yes/no value.",
        SimpleKind::Char => "'{value}' is not a single character.",
        SimpleKind::I8
        | SimpleKind::I16
        | SimpleKind::I32
        | SimpleKind::I64
        | SimpleKind::U8
        | SimpleKind::U16
        | SimpleKind::U32
        | SimpleKind::U64 => "'{value}' is not a valid whole number.",
        SimpleKind::F32 | SimpleKind::F64 => "'{value}' is not a valid number.",
        SimpleKind::String => return None,
        SimpleKind::Bytes => "'{value}' is not valid base64 data.",
        SimpleKind::Uuid => "'{value}' is not a valid identifier.",
        SimpleKind::Url => "'{value}' is not a valid URL.",
        SimpleKind::IpAddr => "'{value}' is not a valid IP address.",
        SimpleKind::Mail => "'{value}' is not a valid email address.",
        SimpleKind::DateTime | SimpleKind::DateTimeOffset | SimpleKind::NaiveDateTime => {
            "'{value}' is not a valid date and time."
        }
        SimpleKind::Duration => "'{value}' is not a valid duration.",
    };
    Some(message.to_string())
}

fn parse_error(
    text: &str,
    ty: &CachedType,
    options: &Options,
    path: &str,
    reason: &str,
) -> MappingError {
    let friendly = friendly_parse_message(ty, options)
        .unwrap_or_else(|| "'{value}' is not valid.".to_string())
        .replace("{value}", text);
    MappingError::ValueParse {
        path: path.to_string(),
        value: text.to_string(),
        type_name: ty.name().to_string(),
        reason: reason.to_string(),
        friendly,
    }
}

// -----------------------------------------------------------------------------
// General conversion

fn integer_of(value: &Value) -> Option<i128> {
    Some(match value {
        Value::Bool(v) => i128::from(*v),
        Value::Char(v) => i128::from(u32::from(*v)),
        Value::I8(v) => i128::from(*v),
        Value::I16(v) => i128::from(*v),
        Value::I32(v) => i128::from(*v),
        Value::I64(v) => i128::from(*v),
        Value::U8(v) => i128::from(*v),
        Value::U16(v) => i128::from(*v),
        Value::U32(v) => i128::from(*v),
        Value::U64(v) => i128::from(*v),
        Value::Enum(v) => i128::from(v.discriminant()),
        _ => return None,
    })
}

fn float_of(value: &Value) -> Option<f64> {
    match value {
        Value::F32(v) => Some(f64::from(*v)),
        Value::F64(v) => Some(*v),
        other => integer_of(other).map(|v| v as f64),
    }
}

fn from_integer(number: i128, kind: SimpleKind) -> Option<Value> {
    Some(match kind {
        SimpleKind::Bool => Value::Bool(number != 0),
        SimpleKind::Char => Value::Char(char::from_u32(u32::try_from(number).ok()?)?),
        SimpleKind::I8 => Value::I8(i8::try_from(number).ok()?),
        SimpleKind::I16 => Value::I16(i16::try_from(number).ok()?),
        SimpleKind::I32 => Value::I32(i32::try_from(number).ok()?),
        SimpleKind::I64 => Value::I64(i64::try_from(number).ok()?),
        SimpleKind::U8 => Value::U8(u8::try_from(number).ok()?),
        SimpleKind::U16 => Value::U16(u16::try_from(number).ok()?),
        SimpleKind::U32 => Value::U32(u32::try_from(number).ok()?),
        SimpleKind::U64 => Value::U64(u64::try_from(number).ok()?),
        SimpleKind::F32 => Value::F32(number as f32),
        SimpleKind::F64 => Value::F64(number as f64),
        _ => return None,
    })
}

fn from_float(number: f64, kind: SimpleKind) -> Option<Value> {
    match kind {
        SimpleKind::F32 => Some(Value::F32(number as f32)),
        SimpleKind::F64 => Some(Value::F64(number)),
        SimpleKind::Bool => Some(Value::Bool(number != 0.0)),
        kind if kind.is_integer() => {
            let rounded = number.round_ties_even();
            if !rounded.is_finite() || rounded.abs() > 1e38 {
                return None;
            }
            from_integer(rounded as i128, kind)
        }
        _ => None,
    }
}

/// Numeric and textual conversion between simple values.
pub(crate) fn convert(raw: &Value, ty: &CachedType, path: &str) -> Result<Value, MappingError> {
    let failure = |reason: &str| MappingError::ValueConversion {
        path: path.to_string(),
        value: raw.to_string(),
        from: raw.cached_type().name().to_string(),
        to: ty.name().to_string(),
        reason: reason.to_string(),
    };
    let Some(kind) = ty.simple_kind() else {
        return Err(failure("the target type is not a simple type"));
    };
    if kind == SimpleKind::String {
        return match raw {
            Value::Instance(_) | Value::Node(_) => Err(failure("composite values have no text form")),
            other => Ok(Value::String(other.to_string())),
        };
    }
    let converted = match raw {
        Value::F32(_) | Value::F64(_) => float_of(raw).and_then(|number| from_float(number, kind)),
        other => integer_of(other).and_then(|number| from_integer(number, kind)),
    };
    converted.ok_or_else(|| failure("the value is out of range or has no numeric form"))
}

// -----------------------------------------------------------------------------
// Outbound

/// Converts a raw outbound value to the value written into the node.
pub(crate) fn write(raw: Option<Value>, options: &Options) -> Option<Value> {
    let handling = options.serialization().non_numeric_floats();
    match raw? {
        Value::Enum(value) => Some(if options.serialization().enum_values_as_numeric() {
            Value::I64(value.discriminant())
        } else {
            Value::String(options.naming().enum_name(value.name()))
        }),
        Value::F32(v) if !v.is_finite() => Some(non_finite(f64::from(v), handling, Value::F32(v), Value::F32(0.0))),
        Value::F64(v) if !v.is_finite() => Some(non_finite(v, handling, Value::F64(v), Value::F64(0.0))),
        other => Some(other),
    }
}

fn non_finite(value: f64, handling: NonNumericFloat, raw: Value, zero: Value) -> Value {
    match handling {
        NonNumericFloat::Raw => raw,
        NonNumericFloat::Zero => zero,
        NonNumericFloat::Name => Value::String(non_finite_name(value).to_string()),
    }
}

/// `NaN`, `Infinity` or `-Infinity`; the float parsers read all three back.
pub(crate) fn non_finite_name(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// The node name of a dictionary key.
pub(crate) fn key_text(key: Option<Value>, options: &Options) -> String {
    write(key, options)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

/// Reads a dictionary key from a node name.
pub(crate) fn parse_key(
    name: &str,
    key_type: &CachedType,
    options: &Options,
    path: &str,
) -> Result<Option<Value>, MappingError> {
    match read(Some(Value::String(name.to_string())), key_type, options, path)? {
        Coerced::Assign(key) => Ok(key),
        Coerced::Keep => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{Reflect, TypeInfo};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level {
        Low,
        HighEnough,
    }

    impl Reflect for Level {
        fn type_info() -> TypeInfo {
            TypeInfo::enumeration::<Level>("Level")
                .variant("Low", Level::Low, 1)
                .variant("HighEnough", Level::HighEnough, 5)
                .build()
        }
    }

    fn read_default(raw: Value, ty: &CachedType) -> Result<Coerced, MappingError> {
        read(Some(raw), ty, &Options::default(), "Root.Field")
    }

    fn assigned(coerced: Result<Coerced, MappingError>) -> Option<Value> {
        match coerced.unwrap() {
            Coerced::Assign(value) => value,
            Coerced::Keep => panic!("value was kept"),
        }
    }

    #[test]
    fn test_null_handling() {
        let options = Options::default();
        let err = read(None, &i32::cached_type(), &options, "P.Age").unwrap_err();
        assert!(matches!(err, MappingError::ValueCannotBeNull { .. }));
        assert_eq!(
            read(None, &<Option<i32>>::cached_type(), &options, "P.Age").unwrap(),
            Coerced::Assign(None)
        );

        let lenient = Options::builder()
            .deserialization(|d| d.ignore_nulls_for_value_types())
            .build();
        assert_eq!(read(None, &i32::cached_type(), &lenient, "P.Age").unwrap(), Coerced::Keep);
    }

    #[test]
    fn test_text_is_parsed() {
        let ty = i32::cached_type();
        assert_eq!(assigned(read_default(Value::String(" 42 ".into()), &ty)), Some(Value::I32(42)));
        let err = read_default(Value::String("forty".into()), &ty).unwrap_err();
        assert_eq!(err.friendly_message(), Some("'forty' is not a valid whole number."));
        assert_eq!(
            assigned(read_default(Value::String("01:30:00".into()), &Duration::cached_type())),
            Some(Value::Duration(Duration::from_secs(5400)))
        );
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(
            assigned(read_default(Value::String(String::new()), &<Option<f64>>::cached_type())),
            None
        );
        let err = read_default(Value::String(String::new()), &f64::cached_type()).unwrap_err();
        assert!(matches!(err, MappingError::ValueCannotBeNull { .. }));
        assert_eq!(
            assigned(read_default(Value::String(String::new()), &String::cached_type())),
            Some(Value::String(String::new()))
        );
    }

    #[test]
    fn test_numeric_conversion() {
        assert_eq!(assigned(read_default(Value::I64(7), &u8::cached_type())), Some(Value::U8(7)));
        assert_eq!(assigned(read_default(Value::F64(2.5), &i32::cached_type())), Some(Value::I32(2)));
        assert_eq!(assigned(read_default(Value::F64(3.5), &i32::cached_type())), Some(Value::I32(4)));
        assert_eq!(assigned(read_default(Value::I32(1), &bool::cached_type())), Some(Value::Bool(true)));
        assert_eq!(
            assigned(read_default(Value::I32(12), &String::cached_type())),
            Some(Value::String("12".into()))
        );
        let err = read_default(Value::I64(300), &u8::cached_type()).unwrap_err();
        assert!(matches!(err, MappingError::ValueConversion { .. }));
    }

    #[test]
    fn test_enums_by_name_and_number() {
        let ty = Level::cached_type();
        let high = Some(Value::Enum(EnumValue::new(ty.clone(), 1)));
        assert_eq!(assigned(read_default(Value::String("HighEnough".into()), &ty)), high);
        assert_eq!(assigned(read_default(Value::String("highenough".into()), &ty)), high);
        assert_eq!(assigned(read_default(Value::String("5".into()), &ty)), high);
        assert_eq!(assigned(read_default(Value::I64(5), &ty)), high);
        let err = read_default(Value::String("Medium".into()), &ty).unwrap_err();
        assert_eq!(err.friendly_message(), Some("'Medium' is not a valid option."));

        let snake = Options::builder().use_snake_case_enum_names().build();
        let coerced = read(Some(Value::String("high_enough".into())), &ty, &snake, "L").unwrap();
        assert_eq!(coerced, Coerced::Assign(high));
    }

    #[test]
    fn test_outbound_values() {
        let ty = Level::cached_type();
        let low = Some(Value::Enum(EnumValue::new(ty, 0)));
        assert_eq!(write(low.clone(), &Options::default()), Some(Value::String("Low".into())));
        let numeric = Options::builder()
            .serialization(|s| s.enum_values_as_numeric())
            .build();
        assert_eq!(write(low, &numeric), Some(Value::I64(1)));

        let named = Options::builder()
            .serialization(|s| s.non_numeric_floats(NonNumericFloat::Name))
            .build();
        assert_eq!(
            write(Some(Value::F64(f64::NEG_INFINITY)), &named),
            Some(Value::String("-Infinity".into()))
        );
        assert_eq!(write(Some(Value::F32(1.5)), &named), Some(Value::F32(1.5)));
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration("1.02:03:04").unwrap(), Duration::from_secs(93_784));
        assert_eq!(parse_duration("00:00:00.25").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("25:00:00").is_err());
        assert!(parse_duration("12:00").is_err());
    }
}
