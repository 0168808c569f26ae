use crate::error::Result;
use crate::fragment;
use serde_json::{Map, Value};

/// The `meta` object. Informational only; types are checked, values are not.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub semver: String,
    pub vm: String,
    pub agent: String,
    /// Keys other editors add, such as `origin`.
    extra: Map<String, Value>,
}

impl Metadata {
    pub fn load(value: &Value) -> Result<Self> {
        let obj = fragment::object(value, "meta")?;
        let extra = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "semver" | "vm" | "agent"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self {
            semver: fragment::req_str(obj, "semver", "meta")?,
            vm: fragment::req_str(obj, "vm", "meta")?,
            agent: fragment::req_str(obj, "agent", "meta")?,
            extra,
        })
    }

    pub fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("semver".into(), Value::String(self.semver.clone()));
        out.insert("vm".into(), Value::String(self.vm.clone()));
        out.insert("agent".into(), Value::String(self.agent.clone()));
        out.extend(self.extra.clone());
        Value::Object(out)
    }
}
