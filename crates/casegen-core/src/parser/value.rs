use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::DataMap;

/// A loosely typed record pulled out of a model response.
///
/// Keys are kept exactly as the model wrote them; canonicalization happens
/// in the record normalizer.
pub type RawRecord = BTreeMap<String, RawValue>;

/// The closed value set every format parser produces.
///
/// Numbers and booleans from JSON/YAML are kept as `Literal` text so they can
/// be retyped on the way out; quoted strings stay `String`. Nulls are dropped
/// during conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Literal(String),
    List(Vec<RawValue>),
    Map(RawRecord),
}

impl RawValue {
    /// Text form of a scalar or a list of scalars (joined by newlines).
    ///
    /// Returns `None` for mappings and for values that are blank once trimmed.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            RawValue::String(s) | RawValue::Literal(s) => s.trim().to_string(),
            RawValue::List(items) => items
                .iter()
                .filter_map(RawValue::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            RawValue::Map(_) => return None,
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Flattens the value into a list of non-blank strings.
    ///
    /// A single string is split on commas, which is how models tend to write
    /// tag and requirement lists inline.
    pub fn as_string_list(&self) -> Vec<String> {
        match self {
            RawValue::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            RawValue::Literal(s) => vec![s.clone()],
            RawValue::List(items) => items.iter().filter_map(RawValue::as_text).collect(),
            RawValue::Map(_) => Vec::new(),
        }
    }

    pub fn as_map(&self) -> Option<&RawRecord> {
        match self {
            RawValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Converts to JSON. Only literals are parsed back to numbers and booleans.
    pub fn to_json(&self) -> Value {
        match self {
            RawValue::String(s) => Value::String(s.clone()),
            RawValue::Literal(s) => scalar_to_json(s),
            RawValue::List(items) => Value::Array(items.iter().map(RawValue::to_json).collect()),
            RawValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Converts to a data map.
    ///
    /// Text holding a JSON object (as the Markdown writer emits it) is parsed
    /// back into a map; any other non-map value is wrapped under `value`.
    pub fn to_data_map(&self) -> Option<DataMap> {
        match self {
            RawValue::Map(map) if map.is_empty() => None,
            RawValue::Map(map) => Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            RawValue::String(s) => {
                let text = s.trim();
                if text.starts_with('{') {
                    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
                        return (!map.is_empty()).then(|| map.into_iter().collect());
                    }
                }
                self.wrap_value()
            }
            _ => self.wrap_value(),
        }
    }

    fn wrap_value(&self) -> Option<DataMap> {
        let text = self.as_text()?;
        let value = match self {
            RawValue::String(_) => Value::String(text),
            RawValue::Literal(_) => scalar_to_json(&text),
            _ => self.to_json(),
        };
        Some(DataMap::from([("value".to_string(), value)]))
    }

    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawValue::Literal(b.to_string())),
            Value::Number(n) => Some(RawValue::Literal(n.to_string())),
            Value::String(s) => Some(RawValue::String(s)),
            Value::Array(items) => Some(RawValue::List(
                items.into_iter().filter_map(RawValue::from_json).collect(),
            )),
            Value::Object(map) => Some(RawValue::Map(
                map.into_iter()
                    .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }

    pub fn from_yaml(value: serde_yaml::Value) -> Option<Self> {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => None,
            Yaml::Bool(b) => Some(RawValue::Literal(b.to_string())),
            Yaml::Number(n) => Some(RawValue::Literal(n.to_string())),
            Yaml::String(s) => Some(RawValue::String(s)),
            Yaml::Sequence(items) => Some(RawValue::List(
                items.into_iter().filter_map(RawValue::from_yaml).collect(),
            )),
            Yaml::Mapping(map) => Some(RawValue::Map(
                map.into_iter()
                    .filter_map(|(k, v)| {
                        let key = yaml_key(k)?;
                        RawValue::from_yaml(v).map(|v| (key, v))
                    })
                    .collect(),
            )),
            Yaml::Tagged(tagged) => RawValue::from_yaml(tagged.value),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_to_json(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}
