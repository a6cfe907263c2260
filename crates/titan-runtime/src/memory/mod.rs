//! Runtime memory
//!
//! Memory maps names to [`Space`]s. Every file or REPL session gets its own
//! space, and an alias table lets a space be reached under more than one
//! name (an imported module is addressed by its scope name).

mod space;

pub use space::Space;

use crate::object::Object;
use std::collections::HashMap;

/// All spaces of one running program
#[derive(Debug, Clone, Default)]
pub struct Memory {
    spaces: HashMap<String, Space>,
    /// Alias -> physical space name
    aliases: HashMap<String, String>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a space with a unique name; false if it already exists
    pub fn new_space(&mut self, name: &str) -> bool {
        if self.spaces.contains_key(name) {
            return false;
        }
        tracing::trace!(space = name, "new space");
        self.spaces.insert(name.to_string(), Space::new());
        self.associate_space_with_name(name, name)
    }

    /// Let `alias` refer to the physical space `space`
    pub fn associate_space_with_name(&mut self, space: &str, alias: &str) -> bool {
        if !self.spaces.contains_key(space) {
            return false;
        }
        tracing::trace!(space, alias, "associate space");
        self.aliases.insert(alias.to_string(), space.to_string());
        true
    }

    /// Whether `name` resolves to a space
    pub fn has_space(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn space(&self, name: &str) -> Option<&Space> {
        let physical = self.aliases.get(name)?;
        self.spaces.get(physical)
    }

    pub fn space_mut(&mut self, name: &str) -> Option<&mut Space> {
        let physical = self.aliases.get(name)?;
        self.spaces.get_mut(physical)
    }

    /// Store a variable in the active frame of a space
    ///
    /// False if the space is unknown or the name is taken in that frame.
    pub fn new_variable(&mut self, space: &str, name: &str, object: Object) -> bool {
        tracing::trace!(space, name, "new variable");
        match self.space_mut(space) {
            Some(target) => target.new_var(name, object),
            None => false,
        }
    }

    /// Find a variable visible from the active frame of a space
    pub fn get_variable(&self, space: &str, name: &str) -> Option<&Object> {
        tracing::trace!(space, name, "get variable");
        self.space(space)?.get_variable(name)
    }

    pub fn get_variable_mut(&mut self, space: &str, name: &str) -> Option<&mut Object> {
        self.space_mut(space)?.get_variable_mut(name)
    }

    /// Delete a variable; true iff both the space and the variable existed
    pub fn delete_variable(&mut self, space: &str, name: &str) -> bool {
        tracing::trace!(space, name, "delete variable");
        match self.space_mut(space) {
            Some(target) => target.delete_var(name),
            None => false,
        }
    }
}
