use core::fmt;
use core::num::NonZeroU32;
use std::collections::{BTreeMap, HashMap};

use crate::{CoreError, CoreResult};

/// Compact, stable identifier for simulation entities.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    ///
    /// Returns `None` for `u32::MAX`, the one index that has no slot.
    pub fn from_index(index: u32) -> Option<Self> {
        index.checked_add(1).and_then(NonZeroU32::new).map(Self)
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// A named participant of a run: generator, regulator or plant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: Id,
    pub name: String,
}

/// Identity bookkeeping for one simulation run.
///
/// Ids are handed out in increasing order and never reused, even after
/// `release`. Names are unique among live entities only; a released name can
/// be registered again.
#[derive(Debug, Default)]
pub struct Registry {
    next_index: u32,
    exhausted: bool,
    live: BTreeMap<Id, Option<String>>,
    names: HashMap<String, Id>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id that is not bound to any name.
    pub fn next_unique_id(&mut self) -> CoreResult<Id> {
        let id = self.allocate()?;
        self.live.insert(id, None);
        Ok(id)
    }

    /// Register `candidate` verbatim; fails if a live entity already owns it.
    pub fn register_unique_name(&mut self, candidate: &str) -> CoreResult<Entity> {
        let name = normalize(candidate)?;
        if self.names.contains_key(name) {
            return Err(CoreError::NameCollision {
                name: name.to_string(),
            });
        }
        self.bind(name.to_string())
    }

    /// Register `base`, or the first free `base1`, `base2`, ... if it is taken.
    pub fn register_suffixed_name(&mut self, base: &str) -> CoreResult<Entity> {
        let base = normalize(base)?;
        if !self.names.contains_key(base) {
            return self.bind(base.to_string());
        }
        let mut suffix: u64 = 1;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.names.contains_key(&candidate) {
                return self.bind(candidate);
            }
            suffix += 1;
        }
    }

    /// Release a live id together with its name, if it has one.
    pub fn release(&mut self, id: Id) -> CoreResult<()> {
        match self.live.remove(&id) {
            Some(name) => {
                if let Some(name) = name {
                    self.names.remove(&name);
                }
                Ok(())
            }
            None => Err(CoreError::UnknownId { id }),
        }
    }

    pub fn id_of(&self, name: &str) -> Option<Id> {
        self.names.get(name).copied()
    }

    pub fn name_of(&self, id: Id) -> Option<&str> {
        self.live.get(&id).and_then(|n| n.as_deref())
    }

    pub fn is_live(&self, id: Id) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live entities (named or not).
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live named entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live.iter().filter_map(|(id, name)| {
            name.as_ref().map(|name| Entity {
                id: *id,
                name: name.clone(),
            })
        })
    }

    /// Drop every live entity. Id allocation keeps counting upward.
    pub fn clear(&mut self) {
        self.live.clear();
        self.names.clear();
    }

    fn bind(&mut self, name: String) -> CoreResult<Entity> {
        let id = self.allocate()?;
        self.live.insert(id, Some(name.clone()));
        self.names.insert(name.clone(), id);
        Ok(Entity { id, name })
    }

    fn allocate(&mut self) -> CoreResult<Id> {
        if self.exhausted {
            return Err(CoreError::IdExhausted);
        }
        let id = Id::from_index(self.next_index).ok_or(CoreError::IdExhausted)?;
        match self.next_index.checked_add(1) {
            Some(next) => self.next_index = next,
            None => self.exhausted = true,
        }
        Ok(id)
    }
}

fn normalize(candidate: &str) -> CoreResult<&str> {
    let name = candidate.trim();
    if name.is_empty() {
        return Err(CoreError::invalid("entity name must not be empty"));
    }
    Ok(name)
}
