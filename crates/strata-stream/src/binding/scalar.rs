//! Scalar conversion between field values and stored [`Value`]s.
//!
//! Each field type knows its preferred [`StoreType`] and how to read itself
//! back from any stored representation: text, integer, float, date, or
//! null. Backends that store everything as text (tree and delimited-text
//! backends) go through [`Scalar::from_text`]; typed backends hit the
//! matching `from_*` directly.

use chrono::{NaiveDate, NaiveDateTime};
use strata_types::{StoreType, TypeError, TypeResult, Value};

/// Default textual layout of date-time values.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default textual layout of date values.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-field conversion parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvSpec {
    format: Option<String>,
}

impl ConvSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spec carrying a format string, e.g. a `chrono` date format.
    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
        }
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }
}

/// A field type that can be stored as a single scalar.
pub trait Scalar: Sized {
    /// The representation this type prefers when writing.
    const STORE_TYPE: StoreType;

    fn to_text(&self, spec: &ConvSpec) -> String;

    fn from_text(spec: &ConvSpec, text: &str) -> TypeResult<Self>;

    /// Stored representation. Defaults to text, or null when
    /// [`is_null`](Self::is_null).
    fn to_value(&self, spec: &ConvSpec) -> Value {
        if self.is_null() {
            Value::Null
        } else {
            Value::Text(self.to_text(spec))
        }
    }

    fn from_int(spec: &ConvSpec, i: i64) -> TypeResult<Self> {
        Self::from_text(spec, &i.to_string())
    }

    fn from_float(spec: &ConvSpec, x: f64) -> TypeResult<Self> {
        Self::from_text(spec, &x.to_string())
    }

    fn from_date(spec: &ConvSpec, d: NaiveDateTime) -> TypeResult<Self> {
        let format = spec.format().unwrap_or(DEFAULT_DATETIME_FORMAT);
        Self::from_text(spec, &d.format(format).to_string())
    }

    /// Value of a stored null. Types without a null representation fail.
    fn from_null(spec: &ConvSpec) -> TypeResult<Self> {
        let _ = spec;
        Err(TypeError::NullNotAllowed {
            expected: Self::STORE_TYPE,
        })
    }

    fn is_null(&self) -> bool {
        false
    }

    /// Dispatch on the stored representation.
    fn from_value(spec: &ConvSpec, value: &Value) -> TypeResult<Self> {
        match value {
            Value::Null => Self::from_null(spec),
            Value::Text(s) => Self::from_text(spec, s),
            Value::Int(i) => Self::from_int(spec, *i),
            Value::Float(x) => Self::from_float(spec, *x),
            Value::Date(d) => Self::from_date(spec, *d),
        }
    }
}

fn mismatch(expected: StoreType, found: impl std::fmt::Display) -> TypeError {
    TypeError::Conversion {
        expected,
        found: found.to_string(),
    }
}

impl Scalar for String {
    const STORE_TYPE: StoreType = StoreType::String;

    fn to_text(&self, _spec: &ConvSpec) -> String {
        self.clone()
    }

    fn from_text(_spec: &ConvSpec, text: &str) -> TypeResult<Self> {
        Ok(text.to_owned())
    }

    // A stored null reads as the empty string.
    fn from_null(_spec: &ConvSpec) -> TypeResult<Self> {
        Ok(Self::new())
    }
}

macro_rules! integer_scalar {
    ($($t:ty),* $(,)?) => {$(
        impl Scalar for $t {
            const STORE_TYPE: StoreType = StoreType::Integer;

            fn to_text(&self, _spec: &ConvSpec) -> String {
                self.to_string()
            }

            fn to_value(&self, _spec: &ConvSpec) -> Value {
                Value::Int(i64::from(*self))
            }

            fn from_text(_spec: &ConvSpec, text: &str) -> TypeResult<Self> {
                text.trim()
                    .parse()
                    .map_err(|_| mismatch(Self::STORE_TYPE, format!("text {text:?}")))
            }

            fn from_int(_spec: &ConvSpec, i: i64) -> TypeResult<Self> {
                <$t>::try_from(i).map_err(|_| mismatch(Self::STORE_TYPE, format!("integer {i}")))
            }

            fn from_float(spec: &ConvSpec, x: f64) -> TypeResult<Self> {
                if x.fract() != 0.0 || !x.is_finite() {
                    return Err(mismatch(Self::STORE_TYPE, format!("float {x}")));
                }
                Self::from_int(spec, x as i64)
            }

            fn from_date(_spec: &ConvSpec, d: NaiveDateTime) -> TypeResult<Self> {
                Err(mismatch(Self::STORE_TYPE, format!("date {d}")))
            }
        }
    )*};
}

integer_scalar!(i16, i32, i64, u8, u16, u32);

impl Scalar for f64 {
    const STORE_TYPE: StoreType = StoreType::Float;

    fn to_text(&self, _spec: &ConvSpec) -> String {
        self.to_string()
    }

    fn to_value(&self, _spec: &ConvSpec) -> Value {
        Value::Float(*self)
    }

    fn from_text(_spec: &ConvSpec, text: &str) -> TypeResult<Self> {
        text.trim()
            .parse()
            .map_err(|_| mismatch(Self::STORE_TYPE, format!("text {text:?}")))
    }

    fn from_int(_spec: &ConvSpec, i: i64) -> TypeResult<Self> {
        Ok(i as f64)
    }

    fn from_float(_spec: &ConvSpec, x: f64) -> TypeResult<Self> {
        Ok(x)
    }

    fn from_date(_spec: &ConvSpec, d: NaiveDateTime) -> TypeResult<Self> {
        Err(mismatch(Self::STORE_TYPE, format!("date {d}")))
    }
}

impl Scalar for bool {
    const STORE_TYPE: StoreType = StoreType::Integer;

    fn to_text(&self, _spec: &ConvSpec) -> String {
        let text = if *self { "1" } else { "0" };
        text.to_owned()
    }

    fn to_value(&self, _spec: &ConvSpec) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_text(_spec: &ConvSpec, text: &str) -> TypeResult<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "t" | "y" => Ok(true),
            "0" | "false" | "no" | "f" | "n" | "" => Ok(false),
            _ => Err(mismatch(Self::STORE_TYPE, format!("text {text:?}"))),
        }
    }

    fn from_int(_spec: &ConvSpec, i: i64) -> TypeResult<Self> {
        Ok(i != 0)
    }
}

impl Scalar for NaiveDateTime {
    const STORE_TYPE: StoreType = StoreType::Date;

    fn to_text(&self, spec: &ConvSpec) -> String {
        self.format(spec.format().unwrap_or(DEFAULT_DATETIME_FORMAT))
            .to_string()
    }

    fn to_value(&self, _spec: &ConvSpec) -> Value {
        Value::Date(*self)
    }

    fn from_text(spec: &ConvSpec, text: &str) -> TypeResult<Self> {
        let format = spec.format().unwrap_or(DEFAULT_DATETIME_FORMAT);
        Self::parse_from_str(text.trim(), format)
            .map_err(|_| mismatch(Self::STORE_TYPE, format!("text {text:?}")))
    }

    fn from_date(_spec: &ConvSpec, d: NaiveDateTime) -> TypeResult<Self> {
        Ok(d)
    }
}

impl Scalar for NaiveDate {
    const STORE_TYPE: StoreType = StoreType::Date;

    fn to_text(&self, spec: &ConvSpec) -> String {
        self.format(spec.format().unwrap_or(DEFAULT_DATE_FORMAT))
            .to_string()
    }

    fn to_value(&self, _spec: &ConvSpec) -> Value {
        Value::Date(self.and_time(chrono::NaiveTime::MIN))
    }

    fn from_text(spec: &ConvSpec, text: &str) -> TypeResult<Self> {
        let format = spec.format().unwrap_or(DEFAULT_DATE_FORMAT);
        Self::parse_from_str(text.trim(), format)
            .map_err(|_| mismatch(Self::STORE_TYPE, format!("text {text:?}")))
    }

    fn from_date(_spec: &ConvSpec, d: NaiveDateTime) -> TypeResult<Self> {
        Ok(d.date())
    }
}

impl<T: Scalar> Scalar for Option<T> {
    const STORE_TYPE: StoreType = T::STORE_TYPE;

    fn to_text(&self, spec: &ConvSpec) -> String {
        self.as_ref().map(|v| v.to_text(spec)).unwrap_or_default()
    }

    fn to_value(&self, spec: &ConvSpec) -> Value {
        self.as_ref().map_or(Value::Null, |v| v.to_value(spec))
    }

    fn from_text(spec: &ConvSpec, text: &str) -> TypeResult<Self> {
        T::from_text(spec, text).map(Some)
    }

    fn from_int(spec: &ConvSpec, i: i64) -> TypeResult<Self> {
        T::from_int(spec, i).map(Some)
    }

    fn from_float(spec: &ConvSpec, x: f64) -> TypeResult<Self> {
        T::from_float(spec, x).map(Some)
    }

    fn from_date(spec: &ConvSpec, d: NaiveDateTime) -> TypeResult<Self> {
        T::from_date(spec, d).map(Some)
    }

    fn from_null(_spec: &ConvSpec) -> TypeResult<Self> {
        Ok(None)
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ConvSpec {
        ConvSpec::new()
    }

    #[test]
    fn integers_read_every_numeric_form() {
        assert_eq!(i32::from_value(&spec(), &Value::Int(7)).unwrap(), 7);
        assert_eq!(i32::from_value(&spec(), &Value::from(" 8 ")).unwrap(), 8);
        assert_eq!(i32::from_value(&spec(), &Value::Float(9.0)).unwrap(), 9);
        assert!(i32::from_value(&spec(), &Value::Float(9.5)).is_err());
        assert!(u8::from_value(&spec(), &Value::Int(300)).is_err());
    }

    #[test]
    fn integer_null_is_rejected() {
        let err = i64::from_value(&spec(), &Value::Null).unwrap_err();
        assert_eq!(
            err,
            TypeError::NullNotAllowed {
                expected: StoreType::Integer
            }
        );
    }

    #[test]
    fn string_null_reads_empty() {
        assert_eq!(String::from_value(&spec(), &Value::Null).unwrap(), "");
        assert_eq!(String::from_value(&spec(), &Value::Int(12)).unwrap(), "12");
    }

    #[test]
    fn option_maps_null_both_ways() {
        let none: Option<i32> = None;
        assert_eq!(none.to_value(&spec()), Value::Null);
        assert_eq!(Option::<i32>::from_value(&spec(), &Value::Null).unwrap(), None);
        assert_eq!(
            Option::<i32>::from_value(&spec(), &Value::Int(3)).unwrap(),
            Some(3)
        );
    }

    #[test]
    fn bool_text_forms() {
        assert!(bool::from_value(&spec(), &Value::from("Yes")).unwrap());
        assert!(!bool::from_value(&spec(), &Value::from("0")).unwrap());
        assert!(bool::from_value(&spec(), &Value::from("maybe")).is_err());
        assert_eq!(true.to_value(&spec()), Value::Int(1));
    }

    #[test]
    fn dates_honour_format() {
        let spec = ConvSpec::with_format("%d.%m.%Y");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(date.to_text(&spec), "29.02.2024");
        assert_eq!(NaiveDate::from_text(&spec, "29.02.2024").unwrap(), date);
        assert!(NaiveDate::from_text(&spec, "2024-02-29").is_err());
    }

    #[test]
    fn datetime_from_text_and_date() {
        let dt = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            NaiveDateTime::from_value(&spec(), &Value::from("2023-05-01 12:30:00")).unwrap(),
            dt
        );
        assert_eq!(NaiveDateTime::from_value(&spec(), &Value::Date(dt)).unwrap(), dt);
        assert_eq!(String::from_value(&spec(), &Value::Date(dt)).unwrap(), "2023-05-01 12:30:00");
    }

    #[test]
    fn float_conversions() {
        assert_eq!(f64::from_value(&spec(), &Value::Int(2)).unwrap(), 2.0);
        assert_eq!(f64::from_value(&spec(), &Value::from("2.5")).unwrap(), 2.5);
        assert!(f64::from_value(&spec(), &Value::from("two")).is_err());
    }
}
