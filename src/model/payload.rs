use std::collections::BTreeMap;
use std::collections::HashMap;
use std::str::FromStr;

use crate::ConfigValue;
use crate::DeserializationError;

/// Field view over a payload in the line format.
///
/// Each non-blank line assigns one field:
/// ```text
/// # comment
/// myField "foo"
/// port 8080
/// hosts[0] "a.example.com"
/// hosts[1] "b.example.com"
/// ```
/// Quoted values understand `\"`, `\\`, `\n` and `\t`. Unquoted values are
/// taken verbatim up to the end of the line. Repeated scalar assignments keep
/// the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPayload {
    scalars: HashMap<String, String>,
    arrays: HashMap<String, BTreeMap<usize, String>>,
}

impl ConfigPayload {
    pub fn parse(value: &ConfigValue) -> Result<Self, DeserializationError> {
        let mut payload = ConfigPayload::default();
        for (index, raw) in value.lines().iter().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, rest) = match line.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim()),
                None => {
                    return Err(DeserializationError::Syntax {
                        line: line_no,
                        reason: format!("no value assigned to {line:?}"),
                    })
                }
            };
            let value = parse_value(rest).map_err(|reason| DeserializationError::Syntax {
                line: line_no,
                reason,
            })?;

            match parse_array_name(name).map_err(|reason| DeserializationError::Syntax {
                line: line_no,
                reason,
            })? {
                Some((array, slot)) => {
                    payload.arrays.entry(array.to_string()).or_default().insert(slot, value);
                }
                None => {
                    payload.scalars.insert(name.to_string(), value);
                }
            }
        }
        Ok(payload)
    }

    pub fn contains(
        &self,
        field: &str,
    ) -> bool {
        self.scalars.contains_key(field) || self.arrays.contains_key(field)
    }

    /// Number of distinct fields (arrays count once)
    pub fn len(&self) -> usize {
        self.scalars.len() + self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn string(
        &self,
        field: &str,
    ) -> Result<String, DeserializationError> {
        self.raw(field).map(str::to_string)
    }

    pub fn string_or(
        &self,
        field: &str,
        default: &str,
    ) -> String {
        self.scalars.get(field).cloned().unwrap_or_else(|| default.to_string())
    }

    pub fn i64(
        &self,
        field: &str,
    ) -> Result<i64, DeserializationError> {
        self.typed(field, "integer")
    }

    pub fn i64_or(
        &self,
        field: &str,
        default: i64,
    ) -> Result<i64, DeserializationError> {
        self.typed_or(field, default, "integer")
    }

    pub fn f64(
        &self,
        field: &str,
    ) -> Result<f64, DeserializationError> {
        self.typed(field, "double")
    }

    pub fn bool(
        &self,
        field: &str,
    ) -> Result<bool, DeserializationError> {
        self.typed(field, "boolean")
    }

    pub fn bool_or(
        &self,
        field: &str,
        default: bool,
    ) -> Result<bool, DeserializationError> {
        self.typed_or(field, default, "boolean")
    }

    /// Array entries in index order. A missing array is empty; a gap in the
    /// indices is an error.
    pub fn string_array(
        &self,
        field: &str,
    ) -> Result<Vec<String>, DeserializationError> {
        let Some(entries) = self.arrays.get(field) else {
            return Ok(Vec::new());
        };
        let mut values = Vec::with_capacity(entries.len());
        for (expected, (slot, value)) in entries.iter().enumerate() {
            if *slot != expected {
                return Err(DeserializationError::InvalidValue {
                    field: format!("{field}[{expected}]"),
                    value: String::new(),
                    expected: "contiguous array index",
                });
            }
            values.push(value.clone());
        }
        Ok(values)
    }

    fn raw(
        &self,
        field: &str,
    ) -> Result<&str, DeserializationError> {
        self.scalars
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| DeserializationError::MissingField {
                field: field.to_string(),
            })
    }

    fn typed<T: FromStr>(
        &self,
        field: &str,
        expected: &'static str,
    ) -> Result<T, DeserializationError> {
        let raw = self.raw(field)?;
        raw.parse::<T>().map_err(|_| DeserializationError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            expected,
        })
    }

    fn typed_or<T: FromStr>(
        &self,
        field: &str,
        default: T,
        expected: &'static str,
    ) -> Result<T, DeserializationError> {
        if self.scalars.contains_key(field) {
            self.typed(field, expected)
        } else {
            Ok(default)
        }
    }
}

/// `name[3]` -> `Some(("name", 3))`, `name` -> `None`
fn parse_array_name(name: &str) -> Result<Option<(&str, usize)>, String> {
    let Some(open) = name.find('[') else {
        return Ok(None);
    };
    let Some(inner) = name[open + 1..].strip_suffix(']') else {
        return Err(format!("unterminated array index in {name:?}"));
    };
    let slot = inner
        .parse::<usize>()
        .map_err(|_| format!("invalid array index in {name:?}"))?;
    Ok(Some((&name[..open], slot)))
}

fn parse_value(raw: &str) -> Result<String, String> {
    let Some(quoted) = raw.strip_prefix('"') else {
        return Ok(raw.to_string());
    };

    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let trailing = chars.as_str().trim();
                if !trailing.is_empty() {
                    return Err(format!("unexpected text after closing quote: {trailing:?}"));
                }
                return Ok(out);
            }
            '\\' => match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => return Err(format!("unknown escape sequence \\{other}")),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err("unterminated string".to_string())
}
