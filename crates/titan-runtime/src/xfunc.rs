//! Native function bridge
//!
//! An xfunc is a host function callable from Titan code by name. The
//! executor fills [`XFuncContext::parameters`] with the evaluated arguments,
//! runs [`XFunc::execute`], and reads [`XFuncContext::result`] back as the
//! value of the call.

use crate::object::Object;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

/// Failure raised by a host function
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct XFuncError {
    pub message: String,
}

impl XFuncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parameter, result and output slots for one xfunc call
pub struct XFuncContext<'a> {
    pub parameters: Vec<Object>,
    /// Value of the call; `Nil` unless the xfunc sets it
    pub result: Object,
    /// Program output
    pub out: &'a mut dyn Write,
}

impl<'a> XFuncContext<'a> {
    pub fn new(parameters: Vec<Object>, out: &'a mut dyn Write) -> Self {
        Self {
            parameters,
            result: Object::Nil,
            out,
        }
    }
}

/// A host function callable from Titan code
pub trait XFunc {
    /// Name the function is called by
    fn name(&self) -> &str;

    /// Run the function against the context's parameters
    fn execute(&mut self, ctx: &mut XFuncContext<'_>) -> Result<(), XFuncError>;
}

/// Registered xfuncs by name
#[derive(Default)]
pub struct XFuncRegistry {
    funcs: HashMap<String, Box<dyn XFunc>>,
}

impl XFuncRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in xfuncs
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.add_xfunc(Box::new(Puts));
        registry
    }

    /// Register an xfunc; false if the name is already taken
    pub fn add_xfunc(&mut self, xfunc: Box<dyn XFunc>) -> bool {
        let name = xfunc.name().to_string();
        if self.funcs.contains_key(&name) {
            return false;
        }
        self.funcs.insert(name, xfunc);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run `name` with the given arguments; `None` if it is not registered
    pub fn call(
        &mut self,
        name: &str,
        parameters: Vec<Object>,
        out: &mut dyn Write,
    ) -> Option<Result<Object, XFuncError>> {
        let xfunc = self.funcs.get_mut(name)?;
        tracing::debug!(xfunc = name, args = parameters.len(), "calling xfunc");
        let mut ctx = XFuncContext::new(parameters, out);
        Some(xfunc.execute(&mut ctx).map(|()| ctx.result))
    }
}

impl std::fmt::Debug for XFuncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XFuncRegistry")
            .field("funcs", &self.names())
            .finish()
    }
}

/// Built-in `puts`: writes its arguments followed by a newline
///
/// The result is `I64(1)` when every argument could be displayed and
/// `I64(0)` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct Puts;

impl XFunc for Puts {
    fn name(&self) -> &str {
        "puts"
    }

    fn execute(&mut self, ctx: &mut XFuncContext<'_>) -> Result<(), XFuncError> {
        let mut displayed = true;
        for param in &ctx.parameters {
            if matches!(param.inner(), Object::UserDefined { .. }) {
                displayed = false;
                continue;
            }
            write!(ctx.out, "{}", param).map_err(|e| XFuncError::new(format!("puts: {}", e)))?;
        }
        writeln!(ctx.out).map_err(|e| XFuncError::new(format!("puts: {}", e)))?;
        ctx.result = Object::I64(displayed as i64);
        Ok(())
    }
}
