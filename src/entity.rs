use crate::error::{ProjectError, Result};
use crate::fragment;
use serde_json::{Map, Value};

/// An id-keyed piece of `project.json`.
///
/// `from_fragment` consumes the value stored under the id and `output` must
/// produce the same shape again, so a manager can rebuild the `{id: fragment}`
/// mapping without knowing anything about the entity.
pub trait Entity: Sized {
    fn id(&self) -> &str;
    fn output(&self) -> Value;
    fn from_fragment(id: &str, fragment: &Value) -> Result<Self>;
}

pub trait Named {
    fn name(&self) -> &str;
}

/// Ordered collection behind every `{id: fragment}` mapping of a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Manager<E> {
    items: Vec<E>,
}

impl<E> Default for Manager<E> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<E: Entity> Manager<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut items = Vec::with_capacity(map.len());
        for (id, fragment) in map {
            items.push(E::from_fragment(id, fragment)?);
        }
        Ok(Self { items })
    }

    /// Absent keys load as an empty manager; anything but an object is an error.
    pub fn load(value: Option<&Value>, what: &str) -> Result<Self> {
        match value {
            None => Ok(Self::new()),
            Some(v) => Self::from_map(fragment::object(v, what)?),
        }
    }

    pub fn output(&self) -> Map<String, Value> {
        self.items
            .iter()
            .map(|item| (item.id().to_string(), item.output()))
            .collect()
    }

    pub fn insert(&mut self, item: E) -> Result<()> {
        if self.contains(item.id()) {
            return Err(ProjectError::validation(
                "id",
                format!("'{}' is already used in this collection", item.id()),
            ));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<E> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn retain<F: FnMut(&E) -> bool>(&mut self, keep: F) {
        self.items.retain(keep);
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut E> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Entity::id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, E> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E: Entity + Named> Manager<E> {
    /// Every entity carrying `name`, not only the first.
    pub fn by_name(&self, name: &str) -> Vec<&E> {
        self.items.iter().filter(|item| item.name() == name).collect()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name() == name)
    }
}

impl<'a, E> IntoIterator for &'a Manager<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
