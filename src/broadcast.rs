use crate::entity::{Entity, Named};
use crate::error::{ProjectError, Result};
use serde_json::Value;

/// `{id: name}`; a message channel blocks refer to by id and name.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    id: String,
    name: String,
}

impl Broadcast {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Entity for Broadcast {
    fn id(&self) -> &str {
        &self.id
    }

    fn output(&self) -> Value {
        Value::String(self.name.clone())
    }

    fn from_fragment(id: &str, raw: &Value) -> Result<Self> {
        let name = raw.as_str().ok_or_else(|| {
            ProjectError::validation(
                format!("broadcast '{}'", id),
                format!("expected a name string, found {}", raw),
            )
        })?;
        Ok(Self::new(id, name))
    }
}

impl Named for Broadcast {
    fn name(&self) -> &str {
        &self.name
    }
}
