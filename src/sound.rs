use crate::asset::AssetRef;
use crate::costume::{Asset, AssetMeta};
use crate::entity::Named;
use crate::error::Result;
use crate::fragment;
use serde_json::{json, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub meta: AssetMeta,
    /// Encoding hint; empty for plain PCM, `"adpcm"` for compressed wav.
    pub format: String,
    pub rate: Number,
    pub sample_count: Number,
}

impl Sound {
    pub fn new(asset: &AssetRef, name: impl Into<String>, rate: u32, sample_count: u64) -> Self {
        Self {
            meta: AssetMeta::new(asset, name),
            format: String::new(),
            rate: Number::from(rate),
            sample_count: Number::from(sample_count),
        }
    }
}

impl Named for Sound {
    fn name(&self) -> &str {
        &self.meta.name
    }
}

impl Asset for Sound {
    fn meta(&self) -> &AssetMeta {
        &self.meta
    }

    fn output(&self) -> Value {
        json!({
            "assetId": self.meta.asset_id,
            "name": self.meta.name,
            "dataFormat": self.meta.data_format,
            "format": self.format,
            "rate": self.rate,
            "sampleCount": self.sample_count,
            "md5ext": self.meta.md5ext,
        })
    }

    fn from_fragment(raw: &Value) -> Result<Self> {
        let obj = fragment::object(raw, "sound")?;
        let what = format!(
            "sound '{}'",
            obj.get("name").and_then(Value::as_str).unwrap_or("?")
        );
        Ok(Self {
            meta: AssetMeta::from_object(obj, &what)?,
            format: fragment::opt_str(obj, "format", &what)?.unwrap_or_default(),
            rate: fragment::req_number(obj, "rate", &what)?,
            sample_count: fragment::req_number(obj, "sampleCount", &what)?,
        })
    }
}
