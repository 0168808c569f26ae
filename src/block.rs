use crate::entity::{Entity, Manager};
use crate::error::{check_range, ProjectError, Result};
use crate::fragment;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

pub const BLOCK_COORD_LIMIT: f64 = 2000.0;

/// First element of an input array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShadow {
    /// The slot holds its own shadow (a literal or a menu shadow block).
    SameBlockShadow,
    /// A reporter sits in a slot that has no shadow behind it.
    NoShadow,
    /// A reporter covers a shadow that is kept as the last element.
    ObscuredShadow,
}

impl InputShadow {
    fn code(self) -> u64 {
        match self {
            Self::SameBlockShadow => 1,
            Self::NoShadow => 2,
            Self::ObscuredShadow => 3,
        }
    }

    fn from_code(code: u64, what: &str) -> Result<Self> {
        match code {
            1 => Ok(Self::SameBlockShadow),
            2 => Ok(Self::NoShadow),
            3 => Ok(Self::ObscuredShadow),
            _ => Err(ProjectError::validation(
                what,
                format!("unknown input shadow kind {}, expected 1, 2 or 3", code),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// Id of a block nested in the slot.
    Block(String),
    /// Inline primitive such as `[4, "10"]` or `[12, "score", "varId"]`.
    Literal(Vec<Value>),
    Empty,
}

impl InputValue {
    fn from_value(value: &Value, what: &str) -> Result<Self> {
        match value {
            Value::String(id) => Ok(Self::Block(id.clone())),
            Value::Array(items) => Ok(Self::Literal(items.clone())),
            Value::Null => Ok(Self::Empty),
            other => Err(ProjectError::validation(
                what,
                format!("input entries must be a block id, a literal array or null, found {}", other),
            )),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Block(id) => Value::String(id.clone()),
            Self::Literal(items) => Value::Array(items.clone()),
            Self::Empty => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub shadow: InputShadow,
    pub values: Vec<InputValue>,
}

impl Input {
    pub fn literal(shadow_kind: u8, text: impl Into<String>) -> Self {
        Self {
            shadow: InputShadow::SameBlockShadow,
            values: vec![InputValue::Literal(vec![
                Value::from(shadow_kind),
                Value::String(text.into()),
            ])],
        }
    }

    pub fn block(id: impl Into<String>) -> Self {
        Self {
            shadow: InputShadow::SameBlockShadow,
            values: vec![InputValue::Block(id.into())],
        }
    }

    fn from_value(value: &Value, what: &str) -> Result<Self> {
        let parts = fragment::array(value, what)?;
        let code = parts
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| ProjectError::validation(what, "input must start with its shadow kind"))?;
        let values = parts[1..]
            .iter()
            .map(|v| InputValue::from_value(v, what))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            shadow: InputShadow::from_code(code, what)?,
            values,
        })
    }

    fn to_value(&self) -> Value {
        let mut out = Vec::with_capacity(self.values.len() + 1);
        out.push(Value::from(self.shadow.code()));
        out.extend(self.values.iter().map(InputValue::to_value));
        Value::Array(out)
    }

    pub fn block_ids(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|v| match v {
            InputValue::Block(id) => Some(id.as_str()),
            _ => None,
        })
    }
}

/// `[literal, reference]`; the reference names a variable, list or broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub value: Value,
    pub reference: Option<String>,
    bare: bool,
}

impl Field {
    pub fn new(value: impl Into<Value>, reference: Option<String>) -> Self {
        Self {
            value: value.into(),
            reference,
            bare: false,
        }
    }

    fn from_value(value: &Value, what: &str) -> Result<Self> {
        let parts = fragment::array(value, what)?;
        let literal = parts
            .first()
            .cloned()
            .ok_or_else(|| ProjectError::validation(what, "field array is empty"))?;
        let reference = match parts.get(1) {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => {
                return Err(ProjectError::validation(
                    what,
                    format!("field reference must be a string or null, found {}", other),
                ))
            }
        };
        Ok(Self {
            value: literal,
            reference,
            bare: parts.len() == 1,
        })
    }

    fn to_value(&self) -> Value {
        if self.bare && self.reference.is_none() {
            return Value::Array(vec![self.value.clone()]);
        }
        Value::Array(vec![
            self.value.clone(),
            self.reference.clone().map(Value::String).unwrap_or(Value::Null),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    TopLevel { x: Number, y: Number },
    Attached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: String,
    opcode: String,
    next: Option<String>,
    parent: Option<String>,
    inputs: Vec<(String, Input)>,
    fields: Vec<(String, Field)>,
    shadow: bool,
    placement: Placement,
    comment: Option<String>,
    mutation: Option<Value>,
}

impl Block {
    /// A script head at `(x, y)` with no successor yet.
    pub fn top_level(id: impl Into<String>, opcode: impl Into<String>, x: f64, y: f64) -> Result<Self> {
        check_range("block x", x, -BLOCK_COORD_LIMIT, BLOCK_COORD_LIMIT)?;
        check_range("block y", y, -BLOCK_COORD_LIMIT, BLOCK_COORD_LIMIT)?;
        Ok(Self::with_placement(
            id.into(),
            opcode.into(),
            None,
            Placement::TopLevel {
                x: fragment::number("block x", x)?,
                y: fragment::number("block y", y)?,
            },
        ))
    }

    pub fn attached(id: impl Into<String>, opcode: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::with_placement(id.into(), opcode.into(), Some(parent.into()), Placement::Attached)
    }

    fn with_placement(id: String, opcode: String, parent: Option<String>, placement: Placement) -> Self {
        Self {
            id,
            opcode,
            next: None,
            parent,
            inputs: Vec::new(),
            fields: Vec::new(),
            shadow: false,
            placement,
            comment: None,
            mutation: None,
        }
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_top_level(&self) -> bool {
        matches!(self.placement, Placement::TopLevel { .. })
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match &self.placement {
            Placement::TopLevel { x, y } => Some((fragment::to_f64(x), fragment::to_f64(y))),
            Placement::Attached => None,
        }
    }

    pub fn set_x(&mut self, value: f64) -> Result<()> {
        check_range("block x", value, -BLOCK_COORD_LIMIT, BLOCK_COORD_LIMIT)?;
        let number = fragment::number("block x", value)?;
        match &mut self.placement {
            Placement::TopLevel { x, .. } => {
                *x = number;
                Ok(())
            }
            Placement::Attached => Err(self.not_top_level("x")),
        }
    }

    pub fn set_y(&mut self, value: f64) -> Result<()> {
        check_range("block y", value, -BLOCK_COORD_LIMIT, BLOCK_COORD_LIMIT)?;
        let number = fragment::number("block y", value)?;
        match &mut self.placement {
            Placement::TopLevel { y, .. } => {
                *y = number;
                Ok(())
            }
            Placement::Attached => Err(self.not_top_level("y")),
        }
    }

    fn not_top_level(&self, axis: &str) -> ProjectError {
        ProjectError::validation(
            format!("block {}", axis),
            format!("block '{}' is attached and has no position", self.id),
        )
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub fn mutation(&self) -> Option<&Value> {
        self.mutation.as_ref()
    }

    pub fn set_mutation(&mut self, mutation: Option<Value>) {
        self.mutation = mutation;
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.inputs.iter().map(|(name, input)| (name.as_str(), input))
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|(n, _)| n == name).map(|(_, input)| input)
    }

    pub fn set_input(&mut self, name: impl Into<String>, input: Input) {
        let name = name.into();
        match self.inputs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = input,
            None => self.inputs.push((name, input)),
        }
    }

    pub fn remove_input(&mut self, name: &str) -> Option<Input> {
        let index = self.inputs.iter().position(|(n, _)| n == name)?;
        Some(self.inputs.remove(index).1)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, field)| field)
    }

    pub fn set_field(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
    }

    /// Links `next` below this block. An occupied `next` is never replaced.
    pub fn set_next(&mut self, next: impl Into<String>) -> Result<()> {
        let next = next.into();
        if let Some(current) = &self.next {
            return Err(ProjectError::Chain {
                block: self.id.clone(),
                next: current.clone(),
            });
        }
        if next == self.id {
            return Err(ProjectError::validation(
                "block next",
                format!("block '{}' cannot follow itself", self.id),
            ));
        }
        self.next = Some(next);
        Ok(())
    }

    /// Nulls the `next` link and returns the id that was there.
    pub fn remove_next(&mut self) -> Option<String> {
        self.next.take()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    pub(crate) fn attach_under(&mut self, parent: String) {
        self.parent = Some(parent);
        self.placement = Placement::Attached;
    }

    /// Every block id nested inside this block's inputs.
    pub fn referenced_blocks(&self) -> Vec<&str> {
        self.inputs.iter().flat_map(|(_, input)| input.block_ids()).collect()
    }
}

impl Entity for Block {
    fn id(&self) -> &str {
        &self.id
    }

    fn output(&self) -> Value {
        let mut out = Map::new();
        out.insert("opcode".into(), Value::String(self.opcode.clone()));
        out.insert("next".into(), opt_string(&self.next));
        out.insert("parent".into(), opt_string(&self.parent));
        out.insert(
            "inputs".into(),
            Value::Object(
                self.inputs
                    .iter()
                    .map(|(name, input)| (name.clone(), input.to_value()))
                    .collect(),
            ),
        );
        out.insert(
            "fields".into(),
            Value::Object(
                self.fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.to_value()))
                    .collect(),
            ),
        );
        out.insert("shadow".into(), Value::Bool(self.shadow));
        if let Some(comment) = &self.comment {
            out.insert("comment".into(), Value::String(comment.clone()));
        }
        out.insert("topLevel".into(), Value::Bool(self.is_top_level()));
        if let Placement::TopLevel { x, y } = &self.placement {
            out.insert("x".into(), Value::Number(x.clone()));
            out.insert("y".into(), Value::Number(y.clone()));
        }
        if let Some(mutation) = &self.mutation {
            out.insert("mutation".into(), mutation.clone());
        }
        Value::Object(out)
    }

    fn from_fragment(id: &str, raw: &Value) -> Result<Self> {
        let what = format!("block '{}'", id);
        let obj = fragment::object(raw, &what)?;
        let inputs = fragment::req_object(obj, "inputs", &what)?
            .iter()
            .map(|(name, v)| -> Result<(String, Input)> {
                Ok((name.clone(), Input::from_value(v, &format!("{}.inputs.{}", what, name))?))
            })
            .collect::<Result<Vec<_>>>()?;
        let fields = fragment::req_object(obj, "fields", &what)?
            .iter()
            .map(|(name, v)| -> Result<(String, Field)> {
                Ok((name.clone(), Field::from_value(v, &format!("{}.fields.{}", what, name))?))
            })
            .collect::<Result<Vec<_>>>()?;
        // Load keeps whatever position the editor stored; bounds apply to edits.
        let placement = if fragment::req_bool(obj, "topLevel", &what)? {
            Placement::TopLevel {
                x: fragment::opt_number(obj, "x", &what)?.unwrap_or_else(|| Number::from(0)),
                y: fragment::opt_number(obj, "y", &what)?.unwrap_or_else(|| Number::from(0)),
            }
        } else {
            Placement::Attached
        };
        Ok(Self {
            id: id.to_string(),
            opcode: fragment::req_str(obj, "opcode", &what)?,
            next: fragment::opt_str(obj, "next", &what)?,
            parent: fragment::opt_str(obj, "parent", &what)?,
            inputs,
            fields,
            shadow: fragment::req_bool(obj, "shadow", &what)?,
            placement,
            comment: fragment::opt_str(obj, "comment", &what)?,
            mutation: obj.get("mutation").cloned(),
        })
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

/// A loose variable or list reporter stored directly in the blocks mapping as
/// `[12, name, id, x, y]` (variable) or `[13, name, id, x, y]` (list).
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveBlock {
    id: String,
    raw: Vec<Value>,
}

impl PrimitiveBlock {
    pub fn kind(&self) -> u64 {
        self.raw.first().and_then(Value::as_u64).unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.raw.get(1).and_then(Value::as_str)
    }

    pub fn target_id(&self) -> Option<&str> {
        self.raw.get(2).and_then(Value::as_str)
    }
}

impl Entity for PrimitiveBlock {
    fn id(&self) -> &str {
        &self.id
    }

    fn output(&self) -> Value {
        Value::Array(self.raw.clone())
    }

    fn from_fragment(id: &str, raw: &Value) -> Result<Self> {
        let what = format!("block '{}'", id);
        let parts = fragment::array(raw, &what)?;
        if parts.len() < 2 || parts.first().and_then(Value::as_u64).is_none() {
            return Err(ProjectError::validation(
                what,
                "primitive blocks must be [kind, value, ...]",
            ));
        }
        Ok(Self {
            id: id.to_string(),
            raw: parts.clone(),
        })
    }
}

/// The `blocks` mapping of one target, plus the chain operations that need to
/// look at more than one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockManager {
    blocks: Manager<Block>,
    primitives: Manager<PrimitiveBlock>,
}

impl BlockManager {
    pub fn load(value: Option<&Value>, what: &str) -> Result<Self> {
        let mut blocks = Manager::new();
        let mut primitives = Manager::new();
        if let Some(value) = value {
            for (id, raw) in fragment::object(value, what)? {
                if raw.is_array() {
                    primitives.insert(PrimitiveBlock::from_fragment(id, raw)?)?;
                } else {
                    blocks.insert(Block::from_fragment(id, raw)?)?;
                }
            }
        }
        Ok(Self { blocks, primitives })
    }

    /// Regular blocks first, then loose primitives.
    pub fn output(&self) -> Map<String, Value> {
        let mut out = self.blocks.output();
        out.extend(self.primitives.output());
        out
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains(id) || self.primitives.contains(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn primitives(&self) -> &Manager<PrimitiveBlock> {
        &self.primitives
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.blocks.ids().chain(self.primitives.ids())
    }

    pub fn len(&self) -> usize {
        self.blocks.len() + self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, block: Block) -> Result<()> {
        if self.primitives.contains(block.id()) {
            return Err(ProjectError::validation(
                "id",
                format!("'{}' is already used in this collection", block.id()),
            ));
        }
        self.blocks.insert(block)
    }

    fn require(&self, id: &str) -> Result<&Block> {
        self.blocks.get(id).ok_or_else(|| ProjectError::not_found("Block", id))
    }

    /// Hangs `child` below `parent`. Fails without touching either block if
    /// `parent` already has a successor or the link would form a cycle.
    pub fn attach(&mut self, parent_id: &str, child_id: &str) -> Result<()> {
        let parent = self.require(parent_id)?;
        let child = self.require(child_id)?;
        if let Some(next) = parent.next() {
            return Err(ProjectError::Chain {
                block: parent_id.to_string(),
                next: next.to_string(),
            });
        }
        if let Some(owner) = child.parent() {
            return Err(ProjectError::validation(
                "block parent",
                format!("block '{}' is already attached to '{}'", child_id, owner),
            ));
        }
        if self.ancestors(parent_id).any(|id| id == child_id) || parent_id == child_id {
            return Err(ProjectError::validation(
                "block next",
                format!("attaching '{}' below '{}' would form a cycle", child_id, parent_id),
            ));
        }
        if let Some(parent) = self.blocks.get_mut(parent_id) {
            parent.set_next(child_id)?;
        }
        if let Some(child) = self.blocks.get_mut(child_id) {
            child.attach_under(parent_id.to_string());
        }
        Ok(())
    }

    /// Cuts the chain below `id`. The detached block keeps its own successors
    /// and stays in the mapping, but nothing points at it any more.
    pub fn detach_next(&mut self, id: &str) -> Result<Option<String>> {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| ProjectError::not_found("Block", id))?;
        let detached = block.remove_next();
        if let Some(next_id) = &detached {
            if let Some(next) = self.blocks.get_mut(next_id) {
                next.set_parent(None);
            }
        }
        Ok(detached)
    }

    fn ancestors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut seen = HashSet::new();
        let mut cursor = self.blocks.get(id).and_then(Block::parent);
        std::iter::from_fn(move || {
            let current = cursor?;
            if !seen.insert(current) {
                return None;
            }
            cursor = self.blocks.get(current).and_then(Block::parent);
            Some(current)
        })
    }

    /// The script starting at `head`, following `next` links.
    pub fn chain(&self, head: &str) -> Vec<&Block> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.blocks.get(head);
        while let Some(block) = cursor {
            if !seen.insert(block.id()) {
                break;
            }
            out.push(block);
            cursor = block.next().and_then(|next| self.blocks.get(next));
        }
        out
    }

    /// Attached blocks whose parent link has been cut.
    pub fn orphans(&self) -> Vec<&Block> {
        self.blocks
            .iter()
            .filter(|b| !b.is_top_level() && b.parent().is_none())
            .collect()
    }

    fn reachable(&self) -> HashSet<String> {
        let mut reached = HashSet::new();
        let mut pending = self
            .blocks
            .iter()
            .filter(|b| b.is_top_level())
            .map(|b| b.id().to_string())
            .collect::<Vec<_>>();
        while let Some(id) = pending.pop() {
            if !reached.insert(id.clone()) {
                continue;
            }
            if let Some(block) = self.blocks.get(&id) {
                pending.extend(block.next().map(ToString::to_string));
                pending.extend(block.referenced_blocks().into_iter().map(ToString::to_string));
            }
        }
        reached
    }

    /// Deletes every block no script head can reach and returns their ids.
    pub fn prune_orphans(&mut self) -> Vec<String> {
        let reached = self.reachable();
        let removed = self
            .blocks
            .ids()
            .filter(|id| !reached.contains(*id))
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        self.blocks.retain(|b| reached.contains(b.id()));
        removed
    }

    /// Checks that every `next`, `parent` and nested input id resolves inside
    /// this target and that every block comment exists in `comment_ids`.
    pub fn validate(&self, comment_ids: &HashSet<&str>) -> Result<()> {
        for block in &self.blocks {
            let what = format!("block '{}'", block.id());
            if let Some(next) = block.next() {
                if !self.blocks.contains(next) {
                    return Err(ProjectError::validation(what, format!("next '{}' does not exist", next)));
                }
            }
            if let Some(parent) = block.parent() {
                if !self.blocks.contains(parent) {
                    return Err(ProjectError::validation(what, format!("parent '{}' does not exist", parent)));
                }
            }
            for nested in block.referenced_blocks() {
                if !self.contains(nested) {
                    return Err(ProjectError::validation(
                        what,
                        format!("input references missing block '{}'", nested),
                    ));
                }
            }
            if let Some(comment) = block.comment() {
                if !comment_ids.contains(comment) {
                    return Err(ProjectError::validation(
                        what,
                        format!("comment '{}' does not exist", comment),
                    ));
                }
            }
        }
        Ok(())
    }
}
