//! Scoped variable storage for one space
//!
//! Frames live in an arena. Frame 0 is the space's global scope. Calls push
//! top-level frames whose parent is the global frame; blocks push sub-scope
//! frames under the active frame. Frames are always released in reverse
//! order, so leaving a frame truncates the arena at its index. Popping a
//! top-level frame makes the frame that was active at the push active again.

use crate::object::Object;
use std::collections::HashMap;

const GLOBAL_FRAME: usize = 0;

#[derive(Debug, Clone, Default)]
struct Frame {
    parent: Option<usize>,
    members: HashMap<String, Object>,
}

#[derive(Debug, Clone, Copy)]
struct TopLevel {
    frame: usize,
    caller: usize,
}

/// Variable storage for a file or REPL session
#[derive(Debug, Clone)]
pub struct Space {
    frames: Vec<Frame>,
    active: usize,
    /// Pushed top-level frames, innermost last, each with the frame that
    /// was active when it was pushed
    top_levels: Vec<TopLevel>,
}

impl Space {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            active: GLOBAL_FRAME,
            top_levels: Vec::new(),
        }
    }

    /// Push a frame that sees only itself and the global frame
    pub fn push_top_level_scope(&mut self) {
        let caller = self.active;
        let frame = self.push_frame(Some(GLOBAL_FRAME));
        self.top_levels.push(TopLevel { frame, caller });
        self.active = frame;
    }

    /// Pop the innermost top-level frame and everything beneath it, then
    /// resume in the frame that was active when it was pushed
    pub fn pop_scope(&mut self) {
        let Some(top) = self.top_levels.pop() else {
            return;
        };
        self.frames.truncate(top.frame);
        self.active = top.caller;
    }

    /// Push a block frame under the active frame
    pub fn sub_scope(&mut self) {
        self.active = self.push_frame(Some(self.active));
    }

    /// Leave the active block frame
    ///
    /// Does nothing when the active frame is the global frame or a
    /// top-level frame; those are released by [`Space::pop_scope`].
    pub fn leave_scope(&mut self) {
        let top_level = self.top_levels.last().map(|top| top.frame);
        if self.active == GLOBAL_FRAME || top_level == Some(self.active) {
            return;
        }
        let parent = self.frames[self.active].parent.unwrap_or(GLOBAL_FRAME);
        self.frames.truncate(self.active);
        self.active = parent;
    }

    /// Find a variable in the active frame or its ancestors
    pub fn get_variable(&self, name: &str) -> Option<&Object> {
        let index = self.find_frame(name)?;
        self.frames[index].members.get(name)
    }

    pub fn get_variable_mut(&mut self, name: &str) -> Option<&mut Object> {
        let index = self.find_frame(name)?;
        self.frames[index].members.get_mut(name)
    }

    /// Store a variable in the active frame; false if the name is taken there
    pub fn new_var(&mut self, name: impl Into<String>, object: Object) -> bool {
        let members = &mut self.frames[self.active].members;
        let name = name.into();
        if members.contains_key(&name) {
            return false;
        }
        members.insert(name, object);
        true
    }

    /// Delete the nearest visible variable of that name
    pub fn delete_var(&mut self, name: &str) -> bool {
        match self.find_frame(name) {
            Some(index) => self.frames[index].members.remove(name).is_some(),
            None => false,
        }
    }

    /// Number of live frames, including the global frame
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_global_active(&self) -> bool {
        self.active == GLOBAL_FRAME
    }

    fn push_frame(&mut self, parent: Option<usize>) -> usize {
        self.frames.push(Frame {
            parent,
            members: HashMap::new(),
        });
        self.frames.len() - 1
    }

    fn find_frame(&self, name: &str) -> Option<usize> {
        let mut frame = Some(self.active);
        while let Some(index) = frame {
            if self.frames[index].members.contains_key(name) {
                return Some(index);
            }
            frame = self.frames[index].parent;
        }
        None
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}
