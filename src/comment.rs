use crate::entity::Entity;
use crate::error::Result;
use crate::fragment;
use serde_json::{json, Number, Value};

/// A code-area note, floating or pinned to a block of the same target.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    id: String,
    pub block_id: Option<String>,
    pub x: Option<Number>,
    pub y: Option<Number>,
    pub width: Number,
    pub height: Number,
    pub minimized: bool,
    pub text: String,
}

impl Comment {
    pub fn floating(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_id: None,
            x: Some(Number::from(0)),
            y: Some(Number::from(0)),
            width: Number::from(200),
            height: Number::from(200),
            minimized: false,
            text: text.into(),
        }
    }
}

impl Entity for Comment {
    fn id(&self) -> &str {
        &self.id
    }

    fn output(&self) -> Value {
        json!({
            "blockId": self.block_id,
            "x": self.x,
            "y": self.y,
            "width": self.width,
            "height": self.height,
            "minimized": self.minimized,
            "text": self.text,
        })
    }

    fn from_fragment(id: &str, raw: &Value) -> Result<Self> {
        let what = format!("comment '{}'", id);
        let obj = fragment::object(raw, &what)?;
        Ok(Self {
            id: id.to_string(),
            block_id: fragment::opt_str(obj, "blockId", &what)?,
            // The editor writes null coordinates for comments it never laid out.
            x: fragment::opt_number(obj, "x", &what)?,
            y: fragment::opt_number(obj, "y", &what)?,
            width: fragment::req_number(obj, "width", &what)?,
            height: fragment::req_number(obj, "height", &what)?,
            minimized: fragment::req_bool(obj, "minimized", &what)?,
            text: fragment::req_str(obj, "text", &what)?,
        })
    }
}
