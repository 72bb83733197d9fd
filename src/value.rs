//! Option values and the string coercion applied to config file entries.

use std::fmt;

const TRUE_WORDS: [&str; 4] = ["1", "yes", "true", "on"];
const FALSE_WORDS: [&str; 5] = ["0", "no", "false", "none", "off"];

/// A single configuration value.
///
/// `Absent` is the sentinel for "never set". It is distinct from `Bool(false)`,
/// `Int(0)` and `Str("")`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Absent,
    Bool(bool),
    Int(i64),
    /// A binary float. Only about 15 significant digits survive, so a longer
    /// decimal in the config file is rounded and saved back rounded.
    Decimal(f64),
    Str(String),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Loose truthiness: absent, `false`, zero and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Absent => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Convert to a TOML value for typed deserialization. `Absent` has no
    /// TOML counterpart.
    pub(crate) fn to_toml(&self) -> Option<toml::Value> {
        match self {
            Value::Absent => None,
            Value::Bool(b) => Some(toml::Value::Boolean(*b)),
            Value::Int(i) => Some(toml::Value::Integer(*i)),
            Value::Decimal(d) => Some(toml::Value::Float(*d)),
            Value::Str(s) => Some(toml::Value::String(s.clone())),
        }
    }
}

/// Coerce a raw config-file string into a typed value.
///
/// Tries, in order: boolean words (case-insensitive), a digit string with a
/// single decimal point → decimal, a pure digit string → integer. Anything
/// else stays a string. Signs are not recognised, so `-5` stays a string.
pub fn coerce(raw: &str) -> Value {
    let lower = raw.to_ascii_lowercase();
    if TRUE_WORDS.contains(&lower.as_str()) {
        return Value::Bool(true);
    }
    if FALSE_WORDS.contains(&lower.as_str()) {
        return Value::Bool(false);
    }

    let digits = raw.chars().filter(|c| *c != '.').count();
    let dots = raw.len() - digits;
    let all_digits = digits > 0 && raw.chars().all(|c| c == '.' || c.is_ascii_digit());
    if all_digits {
        if dots == 0 {
            if let Ok(i) = raw.parse::<i64>() {
                return Value::Int(i);
            }
        } else if dots == 1
            && let Ok(d) = raw.parse::<f64>()
        {
            return Value::Decimal(d);
        }
    }

    Value::Str(raw.to_string())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            // Keep the point so the value re-reads as a decimal, not an integer.
            Value::Decimal(d) if d.is_finite() && d.fract() == 0.0 => write!(f, "{d:.1}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Absent, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_words_any_case() {
        for word in ["yes", "1", "true", "on", "YES", "True", "On"] {
            assert_eq!(coerce(word), Value::Bool(true), "{word}");
        }
    }

    #[test]
    fn false_words_any_case() {
        for word in ["no", "0", "false", "none", "off", "NO", "None", "OFF"] {
            assert_eq!(coerce(word), Value::Bool(false), "{word}");
        }
    }

    #[test]
    fn decimal_and_integer() {
        let pi: f64 = "3.14".parse().unwrap();
        assert_eq!(coerce("3.14"), Value::Decimal(pi));
        assert_eq!(coerce("42"), Value::Int(42));
    }

    #[test]
    fn everything_else_is_a_string() {
        assert_eq!(coerce("World"), Value::Str("World".into()));
        assert_eq!(coerce("-5"), Value::Str("-5".into()));
        assert_eq!(coerce("1.2.3"), Value::Str("1.2.3".into()));
        assert_eq!(coerce("."), Value::Str(".".into()));
        assert_eq!(coerce(""), Value::Str(String::new()));
    }

    #[test]
    fn oversized_integer_stays_string() {
        let raw = "99999999999999999999999";
        assert_eq!(coerce(raw), Value::Str(raw.into()));
    }

    #[test]
    fn display_keeps_decimal_point() {
        assert_eq!(Value::Decimal(2.0).to_string(), "2.0");
        assert_eq!(Value::Decimal(0.25).to_string(), "0.25");
        assert_eq!(coerce(&Value::Decimal(2.0).to_string()), Value::Decimal(2.0));
    }

    #[test]
    fn decimals_beyond_float_precision_are_rounded() {
        assert_eq!(coerce("1234.5678").to_string(), "1234.5678");

        let long = "12345678901234567890.5";
        let saved = coerce(long).to_string();
        assert_ne!(saved, long);
        assert_eq!(coerce(&saved), coerce(long));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Absent.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(Value::Decimal(0.5).is_truthy());
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Absent);
        assert_eq!(Value::from(Some("x")), Value::Str("x".into()));
    }
}
