//! Metadata values
//!
//! A value is either untyped data (raw bytes, usually text) or a typed
//! value tagged with an XML Schema atomic type. Typed values are checked
//! against their type when they are built, so a store never holds a value
//! whose lexical form does not match its tag.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::error::{DocumentError, Result};

/// XML Schema type of a typed metadata value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Boolean,
    Integer,
    Decimal,
    Double,
    DateTime,
    AnyUri,
    Base64Binary,
}

impl ValueKind {
    /// Prefixed XML Schema type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::String => "xs:string",
            ValueKind::Boolean => "xs:boolean",
            ValueKind::Integer => "xs:integer",
            ValueKind::Decimal => "xs:decimal",
            ValueKind::Double => "xs:double",
            ValueKind::DateTime => "xs:dateTime",
            ValueKind::AnyUri => "xs:anyURI",
            ValueKind::Base64Binary => "xs:base64Binary",
        }
    }

    /// Check `lexical` against this type
    fn validate(&self, lexical: &str) -> std::result::Result<(), String> {
        match self {
            ValueKind::String => Ok(()),
            ValueKind::Boolean => match lexical {
                "true" | "false" | "1" | "0" => Ok(()),
                _ => Err("expected true, false, 1 or 0".to_string()),
            },
            ValueKind::Integer => {
                let digits = lexical.strip_prefix(['+', '-']).unwrap_or(lexical);
                if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(())
                } else {
                    Err("expected an optionally signed sequence of digits".to_string())
                }
            }
            ValueKind::Decimal => {
                let unsigned = lexical.strip_prefix(['+', '-']).unwrap_or(lexical);
                let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
                let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
                if (!int.is_empty() || !frac.is_empty()) && all_digits(int) && all_digits(frac) {
                    Ok(())
                } else {
                    Err("expected a decimal number".to_string())
                }
            }
            ValueKind::Double => {
                if matches!(lexical, "INF" | "+INF" | "-INF" | "NaN") {
                    return Ok(());
                }
                let numeric = lexical
                    .bytes()
                    .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
                if numeric && lexical.parse::<f64>().is_ok() {
                    Ok(())
                } else {
                    Err("expected a floating point number".to_string())
                }
            }
            ValueKind::DateTime => parse_date_time(lexical).map(|_| ()),
            ValueKind::AnyUri => {
                if lexical.chars().any(|c| c.is_whitespace() || c.is_control()) {
                    Err("URI contains whitespace or control characters".to_string())
                } else {
                    Ok(())
                }
            }
            ValueKind::Base64Binary => decode_base64(lexical).map(|_| ()),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// xs:dateTime: RFC 3339 with an optional timezone. A value without a
/// timezone is read as UTC.
fn parse_date_time(lexical: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(lexical) {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| format!("expected YYYY-MM-DDThh:mm:ss with optional timezone ({})", e))
}

fn decode_base64(lexical: &str) -> std::result::Result<Vec<u8>, String> {
    let compact: String = lexical.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| e.to_string())
}

/// A value tagged with its XML Schema type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    kind: ValueKind,
    lexical: String,
}

impl TypedValue {
    /// Build a typed value, rejecting lexical forms that do not match `kind`
    pub fn new(kind: ValueKind, lexical: impl Into<String>) -> Result<Self> {
        let lexical = lexical.into();
        kind.validate(&lexical)
            .map_err(|reason| DocumentError::InvalidValue {
                kind,
                value: lexical.clone(),
                reason,
            })?;
        Ok(TypedValue { kind, lexical })
    }

    pub fn string(value: impl Into<String>) -> Self {
        TypedValue {
            kind: ValueKind::String,
            lexical: value.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        TypedValue {
            kind: ValueKind::Boolean,
            lexical: value.to_string(),
        }
    }

    pub fn integer(value: i64) -> Self {
        TypedValue {
            kind: ValueKind::Integer,
            lexical: value.to_string(),
        }
    }

    pub fn double(value: f64) -> Self {
        let lexical = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value > 0.0 { "INF" } else { "-INF" }.to_string()
        } else {
            value.to_string()
        };
        TypedValue {
            kind: ValueKind::Double,
            lexical,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Lexical form as stored
    pub fn as_str(&self) -> &str {
        &self.lexical
    }

    pub fn as_bool(&self) -> Option<bool> {
        match (self.kind, self.lexical.as_str()) {
            (ValueKind::Boolean, "true" | "1") => Some(true),
            (ValueKind::Boolean, "false" | "0") => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer => self.lexical.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Double | ValueKind::Decimal | ValueKind::Integer => {
                match self.lexical.as_str() {
                    "INF" | "+INF" => Some(f64::INFINITY),
                    "-INF" => Some(f64::NEG_INFINITY),
                    "NaN" => Some(f64::NAN),
                    other => other.parse().ok(),
                }
            }
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<FixedOffset>> {
        match self.kind {
            ValueKind::DateTime => parse_date_time(&self.lexical).ok(),
            _ => None,
        }
    }

    /// Decoded bytes of an xs:base64Binary value
    pub fn as_binary(&self) -> Option<Vec<u8>> {
        match self.kind {
            ValueKind::Base64Binary => decode_base64(&self.lexical).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical)
    }
}

/// Untyped data: content bytes or a raw metadata value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct XmlData(Vec<u8>);

impl XmlData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        XmlData(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The data as text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for XmlData {
    fn from(bytes: Vec<u8>) -> Self {
        XmlData(bytes)
    }
}

impl From<&[u8]> for XmlData {
    fn from(bytes: &[u8]) -> Self {
        XmlData(bytes.to_vec())
    }
}

impl From<&str> for XmlData {
    fn from(text: &str) -> Self {
        XmlData(text.as_bytes().to_vec())
    }
}

impl From<String> for XmlData {
    fn from(text: String) -> Self {
        XmlData(text.into_bytes())
    }
}

impl AsRef<[u8]> for XmlData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A metadata value, tagged untyped or typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Untyped(XmlData),
    Typed(TypedValue),
}

impl MetadataValue {
    pub fn untyped(data: impl Into<XmlData>) -> Self {
        MetadataValue::Untyped(data.into())
    }

    pub fn is_typed(&self) -> bool {
        matches!(self, MetadataValue::Typed(_))
    }

    /// Type of a typed value
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            MetadataValue::Typed(v) => Some(v.kind()),
            MetadataValue::Untyped(_) => None,
        }
    }

    /// Raw bytes view: untyped data as is, typed values as their lexical form
    pub fn to_data(&self) -> XmlData {
        match self {
            MetadataValue::Untyped(data) => data.clone(),
            MetadataValue::Typed(value) => XmlData::from(value.as_str()),
        }
    }

    /// Typed view: typed values as is, UTF-8 untyped data as an xs:string
    pub fn to_typed(&self) -> Option<TypedValue> {
        match self {
            MetadataValue::Typed(value) => Some(value.clone()),
            MetadataValue::Untyped(data) => data.as_str().map(TypedValue::string),
        }
    }

    /// Text of the value, if it has one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Typed(value) => Some(value.as_str()),
            MetadataValue::Untyped(data) => data.as_str(),
        }
    }
}

impl From<TypedValue> for MetadataValue {
    fn from(value: TypedValue) -> Self {
        MetadataValue::Typed(value)
    }
}

impl From<XmlData> for MetadataValue {
    fn from(data: XmlData) -> Self {
        MetadataValue::Untyped(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_lexical_forms() {
        let ok = [
            (ValueKind::String, "anything at all"),
            (ValueKind::Boolean, "true"),
            (ValueKind::Boolean, "0"),
            (ValueKind::Integer, "-42"),
            (ValueKind::Integer, "123456789012345678901234567890"),
            (ValueKind::Decimal, "3.14"),
            (ValueKind::Decimal, ".5"),
            (ValueKind::Double, "1.5e10"),
            (ValueKind::Double, "-INF"),
            (ValueKind::DateTime, "2024-05-01T12:30:00Z"),
            (ValueKind::DateTime, "2024-05-01T12:30:00.25"),
            (ValueKind::AnyUri, "http://example.com/a?b=c"),
            (ValueKind::Base64Binary, "aGVsbG8="),
        ];
        for (kind, lexical) in ok {
            assert!(TypedValue::new(kind, lexical).is_ok(), "{kind} {lexical}");
        }
    }

    #[test]
    fn test_invalid_lexical_forms() {
        let bad = [
            (ValueKind::Boolean, "yes"),
            (ValueKind::Integer, "1.0"),
            (ValueKind::Integer, "-"),
            (ValueKind::Decimal, "."),
            (ValueKind::Decimal, "1e3"),
            (ValueKind::Double, "infinity"),
            (ValueKind::DateTime, "yesterday"),
            (ValueKind::AnyUri, "has space"),
            (ValueKind::Base64Binary, "!!!"),
        ];
        for (kind, lexical) in bad {
            match TypedValue::new(kind, lexical) {
                Err(DocumentError::InvalidValue { kind: k, value, .. }) => {
                    assert_eq!(k, kind);
                    assert_eq!(value, lexical);
                }
                other => panic!("{kind} {lexical}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_accessors() {
        assert_eq!(TypedValue::boolean(true).as_bool(), Some(true));
        assert_eq!(TypedValue::integer(-7).as_i64(), Some(-7));
        assert_eq!(TypedValue::double(f64::INFINITY).as_str(), "INF");
        assert_eq!(TypedValue::double(2.5).as_f64(), Some(2.5));
        assert_eq!(TypedValue::string("x").as_i64(), None);

        let dt = TypedValue::new(ValueKind::DateTime, "2024-05-01T12:30:00+02:00").unwrap();
        assert_eq!(dt.as_date_time().map(|d| d.offset().local_minus_utc()), Some(7200));

        let bin = TypedValue::new(ValueKind::Base64Binary, "aGVs bG8=").unwrap();
        assert_eq!(bin.as_binary(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_views() {
        let untyped = MetadataValue::untyped("alice");
        assert!(!untyped.is_typed());
        assert_eq!(untyped.to_typed(), Some(TypedValue::string("alice")));
        assert_eq!(untyped.as_str(), Some("alice"));

        let typed = MetadataValue::from(TypedValue::integer(5));
        assert_eq!(typed.kind(), Some(ValueKind::Integer));
        assert_eq!(typed.to_data(), XmlData::from("5"));

        let binary = MetadataValue::untyped(vec![0xFF, 0xFE]);
        assert_eq!(binary.to_typed(), None);
    }
}
