//! Symbol table and name binding
//!
//! Scopes form a rooted tree stored in an arena. Index 0 is the global
//! scope; module scopes, function scopes and block scopes hang beneath it.
//! Lookups walk from the active scope toward the root, so inner scopes
//! shadow outer ones.

use crate::ast::GLOBAL_SCOPE;
use crate::span::Span;
use crate::types::{Variable, Vtd};
use std::collections::HashMap;

/// Index of a scope in the arena
pub type ScopeId = usize;

const GLOBAL_ID: ScopeId = 0;

/// Symbol information
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Symbol name
    pub name: String,
    /// Symbol kind
    pub kind: SymbolKind,
    /// Declaration location
    pub span: Span,
    /// File the symbol was declared in
    pub file: String,
}

/// Symbol classification
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// User function with its signature
    Function(FunctionSignature),
    /// Function parameter
    Parameter(Vtd),
    /// Variable introduced by `let`
    Variable(Vtd),
    /// Host function from the native bridge
    External,
}

/// Declared shape of a user function
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub return_type: Vtd,
    pub parameters: Vec<Variable>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            file: String::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Type of a parameter or variable symbol
    pub fn vtd(&self) -> Option<&Vtd> {
        match &self.kind {
            SymbolKind::Parameter(vtd) | SymbolKind::Variable(vtd) => Some(vtd),
            SymbolKind::Function(_) | SymbolKind::External => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    entries: HashMap<String, Symbol>,
    children: Vec<ScopeId>,
}

impl Scope {
    fn new(name: impl Into<String>, parent: Option<ScopeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            entries: HashMap::new(),
            children: Vec::new(),
        }
    }
}

/// Symbol table for name resolution
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
    /// Function name -> the function's own scope
    function_scopes: HashMap<String, ScopeId>,
}

impl SymbolTable {
    /// Create a table holding only the global scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(GLOBAL_SCOPE, None)],
            current: GLOBAL_ID,
            function_scopes: HashMap::new(),
        }
    }

    /// Add a symbol to the current scope; false if the name is already taken there
    pub fn add_symbol(&mut self, symbol: Symbol) -> bool {
        let entries = &mut self.scopes[self.current].entries;
        if entries.contains_key(&symbol.name) {
            return false;
        }
        entries.insert(symbol.name.clone(), symbol);
        true
    }

    /// Look up a symbol, walking the parent chain unless `current_only`
    pub fn lookup(&self, name: &str, current_only: bool) -> Option<&Symbol> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            if let Some(symbol) = self.scopes[id].entries.get(name) {
                return Some(symbol);
            }
            if current_only {
                return None;
            }
            scope = self.scopes[id].parent;
        }
        None
    }

    /// Create a child of the current scope and make it current
    pub fn add_scope_and_enter(&mut self, name: impl Into<String>) -> ScopeId {
        let id = self.new_child(self.current, name.into());
        self.current = id;
        id
    }

    /// Return to the parent scope; the global scope has none and stays active
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Enter the global child scope named `name`, creating it if needed
    pub fn activate_top_level_scope(&mut self, name: &str) -> ScopeId {
        if name == GLOBAL_SCOPE {
            self.current = GLOBAL_ID;
            return GLOBAL_ID;
        }
        let existing = self.scopes[GLOBAL_ID]
            .children
            .iter()
            .copied()
            .find(|&id| self.scopes[id].name == name);
        let id = match existing {
            Some(id) => id,
            None => self.new_child(GLOBAL_ID, name.to_string()),
        };
        self.current = id;
        id
    }

    /// Make the global scope current
    pub fn activate_global_scope(&mut self) {
        self.current = GLOBAL_ID;
    }

    /// Register a function in the global scope
    ///
    /// The function's own scope is created beneath the current scope, so
    /// functions parsed from an import live under that module's scope.
    /// Returns false if a function (or any global) of that name exists.
    pub fn add_function(&mut self, symbol: Symbol) -> bool {
        let name = symbol.name.clone();
        let globals = &mut self.scopes[GLOBAL_ID].entries;
        if globals.contains_key(&name) {
            return false;
        }
        globals.insert(name.clone(), symbol);
        let scope = self.new_child(self.current, name.clone());
        self.function_scopes.insert(name, scope);
        true
    }

    /// Make a registered function's scope current
    pub fn enter_function_scope(&mut self, name: &str) -> bool {
        match self.function_scopes.get(name) {
            Some(&id) => {
                self.current = id;
                true
            }
            None => false,
        }
    }

    /// Register a host function in the global scope
    pub fn add_external(&mut self, name: &str) -> bool {
        let globals = &mut self.scopes[GLOBAL_ID].entries;
        if globals.contains_key(name) {
            return false;
        }
        globals.insert(
            name.to_string(),
            Symbol::new(name, SymbolKind::External, Span::dummy()),
        );
        true
    }

    /// Drop every entry and child of the current scope, then pop it
    pub fn discard_current_scope(&mut self) {
        let scope = &mut self.scopes[self.current];
        scope.entries.clear();
        scope.children.clear();
        self.pop_scope();
    }

    /// Names from the root to the current scope, joined with `::`
    pub fn scope_path(&self) -> String {
        let mut names = Vec::new();
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            names.push(self.scopes[id].name.as_str());
            scope = self.scopes[id].parent;
        }
        names.reverse();
        names.join("::")
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn current_scope_name(&self) -> &str {
        &self.scopes[self.current].name
    }

    /// Check if in global scope
    pub fn is_global_scope(&self) -> bool {
        self.current == GLOBAL_ID
    }

    /// Number of scopes ever created
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn new_child(&mut self, parent: ScopeId, name: String) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(name, Some(parent)));
        self.scopes[parent].children.push(id);
        id
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
