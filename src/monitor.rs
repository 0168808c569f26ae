use crate::error::{check_range, ProjectError, Result};
use crate::fragment;
use crate::target::{SPRITE_X_LIMIT, SPRITE_Y_LIMIT};
use serde_json::{Map, Number, Value};

/// Extra state only variable monitors carry.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderSettings {
    pub min: Number,
    pub max: Number,
    pub is_discrete: bool,
}

/// On-stage readout of a variable or list, loaded and saved as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    id: String,
    pub mode: String,
    pub opcode: String,
    pub params: Map<String, Value>,
    /// `None` for monitors of stage (global) data.
    pub sprite_name: Option<String>,
    pub value: Value,
    width: Number,
    height: Number,
    x: Number,
    y: Number,
    visible: bool,
    pub slider: Option<SliderSettings>,
}

impl Monitor {
    pub fn from_fragment(raw: &Value) -> Result<Self> {
        let obj = fragment::object(raw, "monitor")?;
        let id = fragment::req_str(obj, "id", "monitor")?;
        let what = format!("monitor '{}'", id);
        let slider = if obj.contains_key("sliderMin") {
            Some(SliderSettings {
                min: fragment::req_number(obj, "sliderMin", &what)?,
                max: fragment::req_number(obj, "sliderMax", &what)?,
                is_discrete: fragment::req_bool(obj, "isDiscrete", &what)?,
            })
        } else {
            None
        };
        Ok(Self {
            mode: fragment::req_str(obj, "mode", &what)?,
            opcode: fragment::req_str(obj, "opcode", &what)?,
            params: fragment::req_object(obj, "params", &what)?,
            sprite_name: fragment::opt_str(obj, "spriteName", &what)?,
            value: obj.get("value").cloned().unwrap_or(Value::Null),
            width: fragment::req_number(obj, "width", &what)?,
            height: fragment::req_number(obj, "height", &what)?,
            x: fragment::req_number(obj, "x", &what)?,
            y: fragment::req_number(obj, "y", &what)?,
            visible: fragment::req_bool(obj, "visible", &what)?,
            slider,
            id,
        })
    }

    pub fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), Value::String(self.id.clone()));
        out.insert("mode".into(), Value::String(self.mode.clone()));
        out.insert("opcode".into(), Value::String(self.opcode.clone()));
        out.insert("params".into(), Value::Object(self.params.clone()));
        out.insert(
            "spriteName".into(),
            self.sprite_name.clone().map(Value::String).unwrap_or(Value::Null),
        );
        out.insert("value".into(), self.value.clone());
        out.insert("width".into(), Value::Number(self.width.clone()));
        out.insert("height".into(), Value::Number(self.height.clone()));
        out.insert("x".into(), Value::Number(self.x.clone()));
        out.insert("y".into(), Value::Number(self.y.clone()));
        out.insert("visible".into(), Value::Bool(self.visible));
        if let Some(slider) = &self.slider {
            out.insert("sliderMin".into(), Value::Number(slider.min.clone()));
            out.insert("sliderMax".into(), Value::Number(slider.max.clone()));
            out.insert("isDiscrete".into(), Value::Bool(slider.is_discrete));
        }
        Value::Object(out)
    }

    /// Id of the watched variable or list.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_variable_monitor(&self) -> bool {
        self.slider.is_some()
    }

    pub fn position(&self) -> (f64, f64) {
        (fragment::to_f64(&self.x), fragment::to_f64(&self.y))
    }

    pub fn set_x(&mut self, value: f64) -> Result<()> {
        check_range("monitor x", value, -SPRITE_X_LIMIT, SPRITE_X_LIMIT)?;
        self.x = fragment::number("monitor x", value)?;
        Ok(())
    }

    pub fn set_y(&mut self, value: f64) -> Result<()> {
        check_range("monitor y", value, -SPRITE_Y_LIMIT, SPRITE_Y_LIMIT)?;
        self.y = fragment::number("monitor y", value)?;
        Ok(())
    }

    pub fn size(&self) -> (f64, f64) {
        (fragment::to_f64(&self.width), fragment::to_f64(&self.height))
    }

    pub fn set_size(&mut self, width: f64, height: f64) -> Result<()> {
        check_range("monitor width", width, 0.0, 2.0 * SPRITE_X_LIMIT)?;
        check_range("monitor height", height, 0.0, 2.0 * SPRITE_Y_LIMIT)?;
        self.width = fragment::number("monitor width", width)?;
        self.height = fragment::number("monitor height", height)?;
        Ok(())
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorManager {
    monitors: Vec<Monitor>,
}

impl MonitorManager {
    pub fn load(value: Option<&Value>) -> Result<Self> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let monitors = fragment::array(value, "monitors")?
            .iter()
            .map(Monitor::from_fragment)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { monitors })
    }

    pub fn output(&self) -> Value {
        Value::Array(self.monitors.iter().map(Monitor::output).collect())
    }

    pub fn for_id(&self, id: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id() == id)
    }

    pub fn for_id_mut(&mut self, id: &str) -> Result<&mut Monitor> {
        self.monitors
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or_else(|| ProjectError::not_found("Monitor", id))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Monitor> {
        self.monitors.iter()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}
