use crate::error::{ProjectError, Result};
use crate::fragment;
use serde_json::Value;

/// Ids of the editor extensions a project uses (`"pen"`, `"music"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    ids: Vec<String>,
}

impl ExtensionSet {
    pub fn load(value: Option<&Value>) -> Result<Self> {
        let mut set = Self::default();
        let Some(value) = value else {
            return Ok(set);
        };
        for entry in fragment::array(value, "extensions")? {
            let id = entry.as_str().ok_or_else(|| {
                ProjectError::validation(
                    "extensions",
                    format!("extension ids must be strings, found {}", entry),
                )
            })?;
            set.add(id);
        }
        Ok(set)
    }

    pub fn output(&self) -> Value {
        Value::Array(self.ids.iter().cloned().map(Value::String).collect())
    }

    /// Returns `false` when the id was already present.
    pub fn add(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        let index = self
            .ids
            .iter()
            .position(|x| x == id)
            .ok_or_else(|| ProjectError::not_found("Extension", id))?;
        self.ids.remove(index);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
