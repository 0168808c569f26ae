use crate::entity::{Entity, Named};
use crate::error::{ProjectError, Result};
use crate::fragment;
use serde_json::{Number, Value};
use std::fmt::{Display, Formatter};

/// A variable value or list item: a number or a string, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Number(Number),
    Text(String),
}

impl ScalarValue {
    pub fn from_value(value: &Value, field: &str) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(Self::Number(n.clone())),
            Value::String(s) => Ok(Self::Text(s.clone())),
            other => Err(ProjectError::validation(
                field,
                format!("expected a number or string, found {}", other),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

/// `{id: [name, value]}`, or `[name, value, true]` for a cloud variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: String,
    name: String,
    value: ScalarValue,
    is_cloud: bool,
}

impl Variable {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: ScalarValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value,
            is_cloud: false,
        }
    }

    pub fn value(&self) -> &ScalarValue {
        &self.value
    }

    pub fn set_value(&mut self, value: ScalarValue) {
        self.value = value;
    }

    pub fn is_cloud(&self) -> bool {
        self.is_cloud
    }

    pub fn set_cloud(&mut self, is_cloud: bool) {
        self.is_cloud = is_cloud;
    }
}

impl Entity for Variable {
    fn id(&self) -> &str {
        &self.id
    }

    fn output(&self) -> Value {
        let mut out = vec![Value::String(self.name.clone()), self.value.to_value()];
        if self.is_cloud {
            out.push(Value::Bool(true));
        }
        Value::Array(out)
    }

    fn from_fragment(id: &str, raw: &Value) -> Result<Self> {
        let what = format!("variable '{}'", id);
        let parts = fragment::array(raw, &what)?;
        let (name, value) = decode_pair(parts, &what)?;
        let is_cloud = matches!(parts.get(2), Some(Value::Bool(true)));
        Ok(Self {
            id: id.to_string(),
            name,
            value: ScalarValue::from_value(value, &what)?,
            is_cloud,
        })
    }
}

impl Named for Variable {
    fn name(&self) -> &str {
        &self.name
    }
}

/// `{id: [name, [item, ...]]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataList {
    id: String,
    name: String,
    items: Vec<ScalarValue>,
}

impl DataList {
    pub fn new(id: impl Into<String>, name: impl Into<String>, items: Vec<ScalarValue>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items,
        }
    }

    pub fn items(&self) -> &[ScalarValue] {
        &self.items
    }

    pub fn set_items(&mut self, items: Vec<ScalarValue>) {
        self.items = items;
    }

    pub fn push(&mut self, item: ScalarValue) {
        self.items.push(item);
    }
}

impl Entity for DataList {
    fn id(&self) -> &str {
        &self.id
    }

    fn output(&self) -> Value {
        Value::Array(vec![
            Value::String(self.name.clone()),
            Value::Array(self.items.iter().map(ScalarValue::to_value).collect()),
        ])
    }

    fn from_fragment(id: &str, raw: &Value) -> Result<Self> {
        let what = format!("list '{}'", id);
        let (name, value) = decode_pair(fragment::array(raw, &what)?, &what)?;
        let items = fragment::array(value, &what)?
            .iter()
            .map(|item| ScalarValue::from_value(item, &what))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: id.to_string(),
            name,
            items,
        })
    }
}

impl Named for DataList {
    fn name(&self) -> &str {
        &self.name
    }
}

fn decode_pair<'a>(parts: &'a [Value], what: &str) -> Result<(String, &'a Value)> {
    let name = parts
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| ProjectError::validation(what, "first element must be the name string"))?;
    let value = parts
        .get(1)
        .ok_or_else(|| ProjectError::validation(what, "second element (value) is missing"))?;
    Ok((name.to_string(), value))
}
