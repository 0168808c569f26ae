use crate::asset::AssetRef;
use crate::entity::Named;
use crate::error::{ProjectError, Result};
use crate::fragment;
use serde_json::{Map, Number, Value};

/// Fields every costume and sound share.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetMeta {
    pub asset_id: String,
    pub name: String,
    pub md5ext: String,
    pub data_format: String,
}

impl AssetMeta {
    pub fn new(asset: &AssetRef, name: impl Into<String>) -> Self {
        Self {
            asset_id: asset.asset_id.clone(),
            name: name.into(),
            md5ext: asset.md5ext(),
            data_format: asset.data_format.clone(),
        }
    }

    pub(crate) fn from_object(obj: &Map<String, Value>, what: &str) -> Result<Self> {
        let asset_id = fragment::req_str(obj, "assetId", what)?;
        let data_format = fragment::req_str(obj, "dataFormat", what)?;
        // Very old exports omit md5ext; it is always derivable.
        let md5ext = fragment::opt_str(obj, "md5ext", what)?
            .unwrap_or_else(|| format!("{}.{}", asset_id, data_format));
        Ok(Self {
            asset_id,
            name: fragment::req_str(obj, "name", what)?,
            md5ext,
            data_format,
        })
    }
}

/// An entry of a `costumes` or `sounds` array.
pub trait Asset: Named + Sized {
    fn meta(&self) -> &AssetMeta;
    fn output(&self) -> Value;
    fn from_fragment(raw: &Value) -> Result<Self>;
}

/// Array-backed asset collection with per-target unique names.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetList<T> {
    items: Vec<T>,
    kind: &'static str,
}

impl<T: Asset> AssetList<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            items: Vec::new(),
            kind,
        }
    }

    pub fn load(value: Option<&Value>, kind: &'static str) -> Result<Self> {
        let mut list = Self::new(kind);
        let Some(value) = value else {
            return Ok(list);
        };
        for raw in fragment::array(value, kind)? {
            list.items.push(T::from_fragment(raw)?);
        }
        Ok(list)
    }

    pub fn output(&self) -> Value {
        Value::Array(self.items.iter().map(Asset::output).collect())
    }

    /// Appends `item`, refusing a name already used in this list.
    pub fn push(&mut self, item: T, target: &str) -> Result<()> {
        if self.has_name(item.name()) {
            return Err(ProjectError::duplicate(self.kind, item.name(), target));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name() == name)
    }

    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.items.iter().find(|item| item.name() == name)
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<T> {
        let index = self
            .items
            .iter()
            .position(|item| item.name() == name)
            .ok_or_else(|| ProjectError::not_found(self.kind, name))?;
        Ok(self.items.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn md5exts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.meta().md5ext.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Vector costumes carry no `bitmapResolution`; bitmap costumes do.
#[derive(Debug, Clone, PartialEq)]
pub struct Costume {
    pub meta: AssetMeta,
    pub rotation_center_x: Number,
    pub rotation_center_y: Number,
    pub bitmap_resolution: Option<Number>,
}

impl Costume {
    pub fn vector(asset: &AssetRef, name: impl Into<String>, center: (f64, f64)) -> Result<Self> {
        Ok(Self {
            meta: AssetMeta::new(asset, name),
            rotation_center_x: fragment::number("rotationCenterX", center.0)?,
            rotation_center_y: fragment::number("rotationCenterY", center.1)?,
            bitmap_resolution: None,
        })
    }

    pub fn bitmap(
        asset: &AssetRef,
        name: impl Into<String>,
        center: (f64, f64),
        resolution: u32,
    ) -> Result<Self> {
        let mut costume = Self::vector(asset, name, center)?;
        costume.bitmap_resolution = Some(Number::from(resolution));
        Ok(costume)
    }

    pub fn is_bitmap(&self) -> bool {
        self.bitmap_resolution.is_some()
    }
}

impl Named for Costume {
    fn name(&self) -> &str {
        &self.meta.name
    }
}

impl Asset for Costume {
    fn meta(&self) -> &AssetMeta {
        &self.meta
    }

    fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("assetId".into(), Value::String(self.meta.asset_id.clone()));
        out.insert("name".into(), Value::String(self.meta.name.clone()));
        if let Some(resolution) = &self.bitmap_resolution {
            out.insert("bitmapResolution".into(), Value::Number(resolution.clone()));
        }
        out.insert("md5ext".into(), Value::String(self.meta.md5ext.clone()));
        out.insert("dataFormat".into(), Value::String(self.meta.data_format.clone()));
        out.insert("rotationCenterX".into(), Value::Number(self.rotation_center_x.clone()));
        out.insert("rotationCenterY".into(), Value::Number(self.rotation_center_y.clone()));
        Value::Object(out)
    }

    fn from_fragment(raw: &Value) -> Result<Self> {
        let obj = fragment::object(raw, "costume")?;
        let what = format!(
            "costume '{}'",
            obj.get("name").and_then(Value::as_str).unwrap_or("?")
        );
        Ok(Self {
            meta: AssetMeta::from_object(obj, &what)?,
            rotation_center_x: fragment::req_number(obj, "rotationCenterX", &what)?,
            rotation_center_y: fragment::req_number(obj, "rotationCenterY", &what)?,
            bitmap_resolution: fragment::opt_number(obj, "bitmapResolution", &what)?,
        })
    }
}
