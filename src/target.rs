use crate::block::{Block, BlockManager};
use crate::broadcast::Broadcast;
use crate::comment::Comment;
use crate::costume::{AssetList, Costume};
use crate::entity::{Entity, Manager, Named};
use crate::error::{check_range, ProjectError, Result};
use crate::fragment;
use crate::sound::Sound;
use crate::variable::{DataList, ScalarValue, Variable};
use serde_json::{json, Map, Number, Value};
use std::collections::HashSet;

pub const SPRITE_X_LIMIT: f64 = 240.0;
pub const SPRITE_Y_LIMIT: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStyle {
    AllAround,
    LeftRight,
    DontRotate,
}

impl RotationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllAround => "all around",
            Self::LeftRight => "left-right",
            Self::DontRotate => "don't rotate",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "all around" => Ok(Self::AllAround),
            "left-right" => Ok(Self::LeftRight),
            "don't rotate" => Ok(Self::DontRotate),
            other => Err(ProjectError::validation(
                "rotationStyle",
                format!(
                    "'{}' is not one of 'all around', 'left-right', 'don't rotate'",
                    other
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageProps {
    pub tempo: Number,
    pub video_transparency: Number,
    /// `"on"`, `"off"` or `"on-flipped"`.
    pub video_state: String,
    pub tts_language: Option<String>,
}

impl Default for StageProps {
    fn default() -> Self {
        Self {
            tempo: Number::from(60),
            video_transparency: Number::from(50),
            video_state: "on".to_string(),
            tts_language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteProps {
    visible: bool,
    x: Number,
    y: Number,
    size: Number,
    direction: Number,
    draggable: bool,
    rotation_style: RotationStyle,
}

impl Default for SpriteProps {
    fn default() -> Self {
        Self {
            visible: true,
            x: Number::from(0),
            y: Number::from(0),
            size: Number::from(100),
            direction: Number::from(90),
            draggable: false,
            rotation_style: RotationStyle::AllAround,
        }
    }
}

impl SpriteProps {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn x(&self) -> f64 {
        fragment::to_f64(&self.x)
    }

    pub fn y(&self) -> f64 {
        fragment::to_f64(&self.y)
    }

    pub fn set_x(&mut self, value: f64) -> Result<()> {
        check_range("sprite x", value, -SPRITE_X_LIMIT, SPRITE_X_LIMIT)?;
        self.x = fragment::number("sprite x", value)?;
        Ok(())
    }

    pub fn set_y(&mut self, value: f64) -> Result<()> {
        check_range("sprite y", value, -SPRITE_Y_LIMIT, SPRITE_Y_LIMIT)?;
        self.y = fragment::number("sprite y", value)?;
        Ok(())
    }

    pub fn size(&self) -> f64 {
        fragment::to_f64(&self.size)
    }

    pub fn set_size(&mut self, percent: f64) -> Result<()> {
        check_range("sprite size", percent, 0.0, f64::MAX)?;
        self.size = fragment::number("sprite size", percent)?;
        Ok(())
    }

    pub fn direction(&self) -> f64 {
        fragment::to_f64(&self.direction)
    }

    pub fn set_direction(&mut self, degrees: f64) -> Result<()> {
        check_range("sprite direction", degrees, -180.0, 180.0)?;
        self.direction = fragment::number("sprite direction", degrees)?;
        Ok(())
    }

    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn set_draggable(&mut self, draggable: bool) {
        self.draggable = draggable;
    }

    pub fn rotation_style(&self) -> RotationStyle {
        self.rotation_style
    }

    pub fn set_rotation_style(&mut self, style: RotationStyle) {
        self.rotation_style = style;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetKind {
    Stage(StageProps),
    Sprite(SpriteProps),
}

/// A stage or sprite together with everything scoped to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    name: String,
    kind: TargetKind,
    variables: Manager<Variable>,
    lists: Manager<DataList>,
    broadcasts: Manager<Broadcast>,
    blocks: BlockManager,
    comments: Manager<Comment>,
    /// Zero-based, as stored in `currentCostume`.
    current_costume: usize,
    costumes: AssetList<Costume>,
    sounds: AssetList<Sound>,
    layer_order: i64,
    volume: Number,
}

impl Target {
    fn empty(name: String, kind: TargetKind, layer_order: i64) -> Self {
        Self {
            name,
            kind,
            variables: Manager::new(),
            lists: Manager::new(),
            broadcasts: Manager::new(),
            blocks: BlockManager::default(),
            comments: Manager::new(),
            current_costume: 0,
            costumes: AssetList::new("Costume"),
            sounds: AssetList::new("Sound"),
            layer_order,
            volume: Number::from(100),
        }
    }

    pub fn new_stage() -> Self {
        Self::empty("Stage".to_string(), TargetKind::Stage(StageProps::default()), 0)
    }

    pub fn new_sprite(name: impl Into<String>, layer_order: i64) -> Self {
        Self::empty(
            name.into(),
            TargetKind::Sprite(SpriteProps::default()),
            layer_order,
        )
    }

    pub fn from_fragment(raw: &Value) -> Result<Self> {
        let obj = fragment::object(raw, "target")?;
        let name = fragment::req_str(obj, "name", "target")?;
        let what = format!("target '{}'", name);
        let kind = if fragment::req_bool(obj, "isStage", &what)? {
            TargetKind::Stage(StageProps {
                tempo: fragment::req_number(obj, "tempo", &what)?,
                video_transparency: fragment::req_number(obj, "videoTransparency", &what)?,
                video_state: fragment::req_str(obj, "videoState", &what)?,
                tts_language: fragment::opt_str(obj, "textToSpeechLanguage", &what)?,
            })
        } else {
            TargetKind::Sprite(SpriteProps {
                visible: fragment::req_bool(obj, "visible", &what)?,
                x: fragment::req_number(obj, "x", &what)?,
                y: fragment::req_number(obj, "y", &what)?,
                size: fragment::req_number(obj, "size", &what)?,
                direction: fragment::req_number(obj, "direction", &what)?,
                draggable: fragment::req_bool(obj, "draggable", &what)?,
                rotation_style: RotationStyle::parse(&fragment::req_str(obj, "rotationStyle", &what)?)?,
            })
        };
        let current_costume = fragment::req_number(obj, "currentCostume", &what)?
            .as_u64()
            .ok_or_else(|| {
                ProjectError::validation(
                    format!("{}.currentCostume", what),
                    "expected a non-negative integer",
                )
            })? as usize;
        let layer_order = fragment::req_number(obj, "layerOrder", &what)?
            .as_i64()
            .ok_or_else(|| ProjectError::validation(format!("{}.layerOrder", what), "expected an integer"))?;
        Ok(Self {
            kind,
            variables: Manager::load(obj.get("variables"), &format!("{}.variables", what))?,
            lists: Manager::load(obj.get("lists"), &format!("{}.lists", what))?,
            broadcasts: Manager::load(obj.get("broadcasts"), &format!("{}.broadcasts", what))?,
            blocks: BlockManager::load(obj.get("blocks"), &format!("{}.blocks", what))?,
            comments: Manager::load(obj.get("comments"), &format!("{}.comments", what))?,
            current_costume,
            costumes: AssetList::load(obj.get("costumes"), "Costume")?,
            sounds: AssetList::load(obj.get("sounds"), "Sound")?,
            layer_order,
            volume: fragment::req_number(obj, "volume", &what)?,
            name,
        })
    }

    pub fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("isStage".into(), Value::Bool(self.is_stage()));
        out.insert("name".into(), Value::String(self.name.clone()));
        out.insert("variables".into(), Value::Object(self.variables.output()));
        out.insert("lists".into(), Value::Object(self.lists.output()));
        out.insert("broadcasts".into(), Value::Object(self.broadcasts.output()));
        out.insert("blocks".into(), Value::Object(self.blocks.output()));
        out.insert("comments".into(), Value::Object(self.comments.output()));
        out.insert("currentCostume".into(), Value::from(self.current_costume));
        out.insert("costumes".into(), self.costumes.output());
        out.insert("sounds".into(), self.sounds.output());
        out.insert("volume".into(), Value::Number(self.volume.clone()));
        out.insert("layerOrder".into(), Value::from(self.layer_order));
        let extra = match &self.kind {
            TargetKind::Stage(stage) => json!({
                "tempo": stage.tempo,
                "videoTransparency": stage.video_transparency,
                "videoState": stage.video_state,
                "textToSpeechLanguage": stage.tts_language,
            }),
            TargetKind::Sprite(sprite) => json!({
                "visible": sprite.visible,
                "x": sprite.x,
                "y": sprite.y,
                "size": sprite.size,
                "direction": sprite.direction,
                "draggable": sprite.draggable,
                "rotationStyle": sprite.rotation_style.as_str(),
            }),
        };
        if let Value::Object(extra) = extra {
            out.extend(extra);
        }
        Value::Object(out)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stage(&self) -> bool {
        matches!(self.kind, TargetKind::Stage(_))
    }

    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    pub fn stage_props_mut(&mut self) -> Option<&mut StageProps> {
        match &mut self.kind {
            TargetKind::Stage(stage) => Some(stage),
            TargetKind::Sprite(_) => None,
        }
    }

    pub fn sprite_props(&self) -> Option<&SpriteProps> {
        match &self.kind {
            TargetKind::Sprite(sprite) => Some(sprite),
            TargetKind::Stage(_) => None,
        }
    }

    pub fn sprite_props_mut(&mut self) -> Option<&mut SpriteProps> {
        match &mut self.kind {
            TargetKind::Sprite(sprite) => Some(sprite),
            TargetKind::Stage(_) => None,
        }
    }

    pub fn layer_order(&self) -> i64 {
        self.layer_order
    }

    pub fn volume(&self) -> f64 {
        fragment::to_f64(&self.volume)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        check_range("volume", volume, 0.0, 100.0)?;
        self.volume = fragment::number("volume", volume)?;
        Ok(())
    }

    /// One-based index of the selected costume.
    pub fn current_costume(&self) -> usize {
        self.current_costume + 1
    }

    pub fn set_current_costume(&mut self, number: usize) -> Result<()> {
        let upper = self.costumes.len();
        if number == 0 || number > upper {
            return Err(ProjectError::validation(
                "currentCostume",
                format!("{} is out of range, expected 1 to {} inclusive", number, upper),
            ));
        }
        self.current_costume = number - 1;
        Ok(())
    }

    pub fn variables(&self) -> &Manager<Variable> {
        &self.variables
    }

    pub fn variable_mut(&mut self, id: &str) -> Option<&mut Variable> {
        self.variables.get_mut(id)
    }

    pub fn lists(&self) -> &Manager<DataList> {
        &self.lists
    }

    pub fn list_mut(&mut self, id: &str) -> Option<&mut DataList> {
        self.lists.get_mut(id)
    }

    pub fn broadcasts(&self) -> &Manager<Broadcast> {
        &self.broadcasts
    }

    pub fn blocks(&self) -> &BlockManager {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut BlockManager {
        &mut self.blocks
    }

    pub fn comments(&self) -> &Manager<Comment> {
        &self.comments
    }

    pub fn costumes(&self) -> &AssetList<Costume> {
        &self.costumes
    }

    pub fn sounds(&self) -> &AssetList<Sound> {
        &self.sounds
    }

    pub fn create_variable(&mut self, id: String, name: &str, value: ScalarValue) -> Result<&Variable> {
        if self.variables.has_name(name) {
            return Err(ProjectError::duplicate("Variable", name, &self.name));
        }
        self.variables.insert(Variable::new(id.clone(), name, value))?;
        self.variables.get(&id).ok_or_else(|| ProjectError::not_found("Variable", id))
    }

    pub fn remove_variable(&mut self, name: &str) -> Result<Variable> {
        let id = self
            .variables
            .by_name(name)
            .first()
            .map(|v| v.id().to_string())
            .ok_or_else(|| ProjectError::not_found("Variable", name))?;
        self.variables.remove(&id).ok_or_else(|| ProjectError::not_found("Variable", name))
    }

    pub fn create_list(&mut self, id: String, name: &str, items: Vec<ScalarValue>) -> Result<&DataList> {
        if self.lists.has_name(name) {
            return Err(ProjectError::duplicate("List", name, &self.name));
        }
        self.lists.insert(DataList::new(id.clone(), name, items))?;
        self.lists.get(&id).ok_or_else(|| ProjectError::not_found("List", id))
    }

    pub fn remove_list(&mut self, name: &str) -> Result<DataList> {
        let id = self
            .lists
            .by_name(name)
            .first()
            .map(|l| l.id().to_string())
            .ok_or_else(|| ProjectError::not_found("List", name))?;
        self.lists.remove(&id).ok_or_else(|| ProjectError::not_found("List", name))
    }

    pub fn create_broadcast(&mut self, id: String, name: &str) -> Result<&Broadcast> {
        if self.broadcasts.has_name(name) {
            return Err(ProjectError::duplicate("Broadcast", name, &self.name));
        }
        self.broadcasts.insert(Broadcast::new(id.clone(), name))?;
        self.broadcasts.get(&id).ok_or_else(|| ProjectError::not_found("Broadcast", id))
    }

    pub fn add_block(&mut self, block: Block) -> Result<()> {
        if let Some(parent) = block.parent() {
            if self.blocks.get(parent).is_none() {
                return Err(ProjectError::not_found("Block", parent));
            }
        }
        self.blocks.add(block)
    }

    pub fn add_comment(&mut self, comment: Comment) -> Result<()> {
        if let Some(block_id) = &comment.block_id {
            if !self.blocks.contains(block_id) {
                return Err(ProjectError::not_found("Block", block_id.clone()));
            }
        }
        self.comments.insert(comment)
    }

    /// Deletes unreachable blocks and unpins comments that pointed at them.
    pub fn prune_orphans(&mut self) -> Vec<String> {
        let removed = self.blocks.prune_orphans();
        for comment in self.comments.iter_mut() {
            if comment
                .block_id
                .as_ref()
                .is_some_and(|id| removed.contains(id))
            {
                comment.block_id = None;
            }
        }
        removed
    }

    pub fn add_costume(&mut self, costume: Costume) -> Result<()> {
        self.costumes.push(costume, &self.name)
    }

    pub fn add_sound(&mut self, sound: Sound) -> Result<()> {
        self.sounds.push(sound, &self.name)
    }

    /// Every id this target contributes to the document-wide id space.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.variables
            .ids()
            .chain(self.lists.ids())
            .chain(self.broadcasts.ids())
            .chain(self.blocks.ids())
            .chain(self.comments.ids())
    }

    pub fn validate(&self) -> Result<()> {
        let comment_ids = self.comments.ids().collect::<HashSet<_>>();
        self.blocks.validate(&comment_ids)?;
        for comment in &self.comments {
            if let Some(block_id) = &comment.block_id {
                if !self.blocks.contains(block_id) {
                    return Err(ProjectError::validation(
                        format!("comment '{}'", comment.id()),
                        format!("block '{}' does not exist in target '{}'", block_id, self.name),
                    ));
                }
            }
        }
        if !self.costumes.is_empty() && self.current_costume >= self.costumes.len() {
            return Err(ProjectError::validation(
                format!("target '{}'.currentCostume", self.name),
                format!(
                    "{} is out of range for {} costumes",
                    self.current_costume,
                    self.costumes.len()
                ),
            ));
        }
        Ok(())
    }
}

impl Named for Target {
    fn name(&self) -> &str {
        &self.name
    }
}

/// The `targets` array. Exactly one entry is the stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetManager {
    targets: Vec<Target>,
}

impl TargetManager {
    pub fn load(value: &Value) -> Result<Self> {
        let targets = fragment::array(value, "targets")?
            .iter()
            .map(Target::from_fragment)
            .collect::<Result<Vec<_>>>()?;
        let manager = Self { targets };
        manager.check_stage_count()?;
        Ok(manager)
    }

    pub fn output(&self) -> Value {
        Value::Array(self.targets.iter().map(Target::output).collect())
    }

    fn check_stage_count(&self) -> Result<()> {
        let stages = self.targets.iter().filter(|t| t.is_stage()).count();
        if stages != 1 {
            return Err(ProjectError::validation(
                "targets",
                format!("expected exactly one stage, found {}", stages),
            ));
        }
        Ok(())
    }

    pub fn stage(&self) -> Result<&Target> {
        self.targets
            .iter()
            .find(|t| t.is_stage())
            .ok_or_else(|| ProjectError::not_found("Stage", "Stage"))
    }

    pub fn stage_mut(&mut self) -> Result<&mut Target> {
        self.targets
            .iter_mut()
            .find(|t| t.is_stage())
            .ok_or_else(|| ProjectError::not_found("Stage", "Stage"))
    }

    pub fn sprite_by_name(&self, name: &str) -> Result<&Target> {
        self.targets
            .iter()
            .find(|t| !t.is_stage() && t.name() == name)
            .ok_or_else(|| ProjectError::not_found("Sprite", name))
    }

    pub fn sprite_by_name_mut(&mut self, name: &str) -> Result<&mut Target> {
        self.targets
            .iter_mut()
            .find(|t| !t.is_stage() && t.name() == name)
            .ok_or_else(|| ProjectError::not_found("Sprite", name))
    }

    /// Looks up the stage or a sprite by name.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Target> {
        self.targets
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| ProjectError::not_found("Target", name))
    }

    pub fn next_layer_order(&self) -> i64 {
        self.targets
            .iter()
            .map(Target::layer_order)
            .max()
            .map_or(1, |max| max + 1)
    }

    pub fn push(&mut self, target: Target) -> Result<&mut Target> {
        if self.targets.iter().any(|t| t.name() == target.name()) {
            return Err(ProjectError::duplicate("Target", target.name(), "project"));
        }
        if target.is_stage() && self.targets.iter().any(Target::is_stage) {
            return Err(ProjectError::validation("targets", "project already has a stage"));
        }
        self.targets.push(target);
        let index = self.targets.len() - 1;
        Ok(&mut self.targets[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Target> {
        self.targets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.check_stage_count()?;
        let mut names = HashSet::new();
        let mut layers = HashSet::new();
        for target in &self.targets {
            if !names.insert(target.name()) {
                return Err(ProjectError::validation(
                    "targets",
                    format!("duplicate target name '{}'", target.name()),
                ));
            }
            if !layers.insert(target.layer_order()) {
                return Err(ProjectError::validation(
                    "targets",
                    format!("layer order {} is used twice", target.layer_order()),
                ));
            }
            if target.is_stage() && target.layer_order() != 0 {
                return Err(ProjectError::validation(
                    "targets",
                    format!("stage must be at layer 0, found {}", target.layer_order()),
                ));
            }
            target.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn blank_targets_json() -> Value {
    json!([
        {
            "isStage": true,
            "name": "Stage",
            "variables": {"`jEk@4|i[#Fk?(8x)AV.-my variable": ["my variable", 0]},
            "lists": {},
            "broadcasts": {},
            "blocks": {},
            "comments": {},
            "currentCostume": 0,
            "costumes": [{
                "name": "backdrop1",
                "dataFormat": "svg",
                "assetId": "cd21514d0531fdffb22204e0ec5ed84a",
                "md5ext": "cd21514d0531fdffb22204e0ec5ed84a.svg",
                "rotationCenterX": 240,
                "rotationCenterY": 180
            }],
            "sounds": [],
            "volume": 100,
            "layerOrder": 0,
            "tempo": 60,
            "videoTransparency": 50,
            "videoState": "on",
            "textToSpeechLanguage": null
        },
        {
            "isStage": false,
            "name": "Sprite1",
            "variables": {},
            "lists": {},
            "broadcasts": {},
            "blocks": {},
            "comments": {},
            "currentCostume": 0,
            "costumes": [{
                "name": "costume1",
                "bitmapResolution": 1,
                "dataFormat": "svg",
                "assetId": "bcf454acf82e4504149f7ffe07081dbc",
                "md5ext": "bcf454acf82e4504149f7ffe07081dbc.svg",
                "rotationCenterX": 48,
                "rotationCenterY": 50
            }],
            "sounds": [],
            "volume": 100,
            "layerOrder": 1,
            "visible": true,
            "x": 0,
            "y": 0,
            "size": 100,
            "direction": 90,
            "draggable": false,
            "rotationStyle": "all around"
        }
    ])
}
