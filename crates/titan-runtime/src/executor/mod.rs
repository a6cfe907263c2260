//! Tree-walking execution
//!
//! The executor runs a parsed program against a [`Memory`] and an
//! [`XFuncRegistry`]. Values live in named spaces: `ScopeChange` retargets
//! the current space, calls push a top-level frame in the callee's home
//! space, and blocks push sub-scope frames.

mod expr;
mod ops;

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::memory::Memory;
use crate::object::Object;
use crate::span::Span;
use crate::xfunc::XFuncRegistry;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use thiserror::Error;

/// Nested calls allowed before execution is abandoned
pub const MAX_CALL_DEPTH: usize = 512;

/// Remaining host stack below which a call switches to a fresh segment
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each additional stack segment
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Runtime error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Undefined variable
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String, span: Span },
    /// Operation applied to values of the wrong kind
    #[error("Type error: {msg}")]
    TypeError { msg: String, span: Span },
    /// Division or modulo by zero
    #[error("Division by zero")]
    DivideByZero { span: Span },
    /// Array index out of bounds
    #[error("Array index {index} out of bounds for length {len}")]
    OutOfBounds { index: i128, len: u64, span: Span },
    /// Non-integer index
    #[error("Invalid index: {msg}")]
    InvalidIndex { msg: String, span: Span },
    /// No user function or xfunc of that name
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String, span: Span },
    /// Call with the wrong number of arguments
    #[error("Function {name} expects {expected} arguments but received {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    /// Construct the executor cannot run
    #[error("{msg}")]
    Unsupported { msg: String, span: Span },
    /// Host function failed
    #[error("xfunc {name} failed: {msg}")]
    XFuncFailure { name: String, msg: String, span: Span },
    /// Variable declared twice in one frame
    #[error("Variable {name} already exists in this scope")]
    DuplicateVariable { name: String, span: Span },
}

impl RuntimeError {
    /// Get the source span for this error
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::TypeError { span, .. }
            | RuntimeError::DivideByZero { span }
            | RuntimeError::OutOfBounds { span, .. }
            | RuntimeError::InvalidIndex { span, .. }
            | RuntimeError::UnknownFunction { span, .. }
            | RuntimeError::ArgumentCount { span, .. }
            | RuntimeError::Unsupported { span, .. }
            | RuntimeError::XFuncFailure { span, .. }
            | RuntimeError::DuplicateVariable { span, .. } => *span,
        }
    }

    /// Stable error code
    pub fn code(&self) -> u32 {
        match self {
            RuntimeError::UndefinedVariable { .. } => error_codes::UNDEFINED_VARIABLE,
            RuntimeError::TypeError { .. } => error_codes::RUNTIME_TYPE_ERROR,
            RuntimeError::DivideByZero { .. } => error_codes::DIVIDE_BY_ZERO,
            RuntimeError::OutOfBounds { .. } => error_codes::INDEX_OUT_OF_BOUNDS,
            RuntimeError::InvalidIndex { .. } => error_codes::INVALID_INDEX,
            RuntimeError::UnknownFunction { .. } => error_codes::UNKNOWN_FUNCTION,
            RuntimeError::ArgumentCount { .. } => error_codes::ARGUMENT_COUNT,
            RuntimeError::Unsupported { .. } => error_codes::UNSUPPORTED,
            RuntimeError::XFuncFailure { .. } => error_codes::XFUNC_FAILURE,
            RuntimeError::DuplicateVariable { .. } => error_codes::DUPLICATE_VARIABLE,
        }
    }

    /// Convert into a diagnostic reported against `file`
    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        Diagnostic::error_with_code(self.code(), self.to_string(), self.span())
            .with_file(file)
            .with_label("runtime error")
    }

    pub(super) fn type_error(msg: impl Into<String>, span: Span) -> Self {
        RuntimeError::TypeError {
            msg: msg.into(),
            span,
        }
    }

    pub(super) fn unsupported(msg: impl Into<String>, span: Span) -> Self {
        RuntimeError::Unsupported {
            msg: msg.into(),
            span,
        }
    }
}

/// Control flow signal for handling break and return
#[derive(Debug, Clone, PartialEq)]
pub(super) enum ControlFlow {
    None,
    Break,
    Return(Object),
}

/// A function recorded with the space it was declared in
#[derive(Debug)]
pub(super) struct UserFunction {
    pub(super) decl: FunctionDecl,
    pub(super) home: String,
}

/// Executor state
pub struct Executor {
    pub(super) memory: Memory,
    pub(super) xfuncs: XFuncRegistry,
    pub(super) functions: HashMap<String, Rc<UserFunction>>,
    /// Space that names currently resolve in
    pub(super) current_space: String,
    pub(super) out: Box<dyn Write>,
    pub(super) call_depth: usize,
    max_call_depth: usize,
}

impl Executor {
    /// Create an executor writing program output to stdout
    pub fn new() -> Self {
        let mut memory = Memory::new();
        memory.new_space(GLOBAL_SCOPE);
        Self {
            memory,
            xfuncs: XFuncRegistry::with_builtins(),
            functions: HashMap::new(),
            current_space: GLOBAL_SCOPE.to_string(),
            out: Box::new(std::io::stdout()),
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    /// Store the root unit in a space named `name`, reachable as `GLOBAL`
    pub fn with_root_space(mut self, name: &str) -> Self {
        let mut memory = Memory::new();
        memory.new_space(name);
        memory.associate_space_with_name(name, GLOBAL_SCOPE);
        self.memory = memory;
        self.current_space = GLOBAL_SCOPE.to_string();
        self
    }

    /// Redirect program output
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// Replace the xfunc registry
    pub fn with_xfuncs(mut self, xfuncs: XFuncRegistry) -> Self {
        self.xfuncs = xfuncs;
        self
    }

    /// Limit the number of nested calls
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn xfuncs(&self) -> &XFuncRegistry {
        &self.xfuncs
    }

    pub fn xfuncs_mut(&mut self) -> &mut XFuncRegistry {
        &mut self.xfuncs
    }

    pub fn current_space(&self) -> &str {
        &self.current_space
    }

    /// Whether a user function of that name has been recorded
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Run a unit's top-level instructions
    ///
    /// Every function in the unit is recorded first, so top-level code may
    /// call functions defined further down.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        tracing::debug!(items = program.items.len(), "executing unit");
        self.record_functions(program);

        for item in &program.items {
            match self.exec_instruction(item)? {
                ControlFlow::None => {}
                ControlFlow::Break => {
                    return Err(RuntimeError::unsupported(
                        "'break' outside of a loop",
                        item.span(),
                    ))
                }
                ControlFlow::Return(_) => {
                    return Err(RuntimeError::unsupported(
                        "'return' outside of a function",
                        item.span(),
                    ))
                }
            }
        }
        self.out.flush().map_err(|e| {
            RuntimeError::unsupported(format!("Unable to flush output: {}", e), Span::dummy())
        })?;
        Ok(())
    }

    /// Call a recorded function with no arguments
    pub fn run_entry(&mut self, name: &str) -> Result<Object, RuntimeError> {
        tracing::debug!(entry = name, "running entry function");
        let result = self.call_function(name, Vec::new(), Span::dummy());
        if let Err(e) = self.out.flush() {
            tracing::warn!(error = %e, "unable to flush program output");
        }
        result
    }

    fn record_functions(&mut self, program: &Program) {
        let mut space = self.current_space.clone();
        for item in &program.items {
            match item {
                Instruction::ScopeChange { scope, .. } => space = scope.clone(),
                Instruction::Function(decl) => {
                    tracing::debug!(function = %decl.name, space = %space, "recording function");
                    self.functions.insert(
                        decl.name.clone(),
                        Rc::new(UserFunction {
                            decl: decl.clone(),
                            home: space.clone(),
                        }),
                    );
                }
                _ => {}
            }
        }
    }

    pub(super) fn exec_block(&mut self, body: &[Instruction]) -> Result<ControlFlow, RuntimeError> {
        for instruction in body {
            let flow = self.exec_instruction(instruction)?;
            if flow != ControlFlow::None {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::None)
    }

    /// Run `body` in a fresh sub-scope of the current space
    fn exec_scoped(&mut self, body: &[Instruction]) -> Result<ControlFlow, RuntimeError> {
        self.sub_scope();
        let flow = self.exec_block(body);
        self.leave_scope();
        flow
    }

    fn exec_instruction(&mut self, instruction: &Instruction) -> Result<ControlFlow, RuntimeError> {
        match instruction {
            Instruction::Function(_) => Ok(ControlFlow::None),
            Instruction::ScopeChange { scope, .. } => {
                tracing::debug!(scope = %scope, "switching space");
                if !self.memory.has_space(scope) {
                    self.memory.new_space(scope);
                }
                self.current_space = scope.clone();
                Ok(ControlFlow::None)
            }
            Instruction::Assignment(assignment) => {
                self.exec_assignment(assignment)?;
                Ok(ControlFlow::None)
            }
            Instruction::Expression(expr) => {
                self.eval(expr)?;
                Ok(ControlFlow::None)
            }
            Instruction::If(chain) => {
                for segment in &chain.segments {
                    if self.eval(&segment.condition)?.is_truthy() {
                        return self.exec_scoped(&segment.body);
                    }
                }
                Ok(ControlFlow::None)
            }
            Instruction::While(w) => {
                while self.eval(&w.condition)?.is_truthy() {
                    match self.exec_scoped(&w.body)? {
                        ControlFlow::None => {}
                        ControlFlow::Break => break,
                        flow @ ControlFlow::Return(_) => return Ok(flow),
                    }
                }
                Ok(ControlFlow::None)
            }
            Instruction::For(f) => {
                self.sub_scope();
                let flow = self.exec_for(f);
                self.leave_scope();
                flow
            }
            Instruction::Return { value, .. } => {
                let result = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Object::Nil,
                };
                Ok(ControlFlow::Return(result))
            }
            Instruction::Break(_) => Ok(ControlFlow::Break),
            Instruction::Import { target, span } => Err(RuntimeError::unsupported(
                format!("Unresolved import \"{}\" reached the executor", target),
                *span,
            )),
            Instruction::DefineUserStruct { name, span } => Err(RuntimeError::unsupported(
                format!("User defined structure \"{}\" is not supported", name),
                *span,
            )),
        }
    }

    fn exec_for(&mut self, f: &ForInstruction) -> Result<ControlFlow, RuntimeError> {
        self.exec_assignment(&f.init)?;
        while self.eval(&f.condition)?.is_truthy() {
            match self.exec_scoped(&f.body)? {
                ControlFlow::None => {}
                ControlFlow::Break => break,
                flow @ ControlFlow::Return(_) => return Ok(flow),
            }
            self.eval(&f.step)?;
        }
        Ok(ControlFlow::None)
    }

    fn exec_assignment(&mut self, assignment: &Assignment) -> Result<(), RuntimeError> {
        let value = self.eval(&assignment.init)?;
        let variable = &assignment.variable;
        let mut slot = Object::zeroed(&variable.vtd);
        if !slot.copy_to(&value) {
            return Err(RuntimeError::type_error(
                format!(
                    "Unable to store '{}' value in variable \"{}\" of type '{}'",
                    value.base_type(),
                    variable.name,
                    variable.vtd
                ),
                assignment.init.span(),
            ));
        }
        if !self
            .memory
            .new_variable(&self.current_space, &variable.name, slot)
        {
            return Err(RuntimeError::DuplicateVariable {
                name: variable.name.clone(),
                span: assignment.span,
            });
        }
        Ok(())
    }

    /// Call a user function by name with evaluated arguments
    pub(super) fn call_function(
        &mut self,
        name: &str,
        args: Vec<Object>,
        span: Span,
    ) -> Result<Object, RuntimeError> {
        let Some(function) = self.functions.get(name).cloned() else {
            return Err(RuntimeError::UnknownFunction {
                name: name.to_string(),
                span,
            });
        };
        let decl = &function.decl;

        if decl.parameters.len() != args.len() {
            return Err(RuntimeError::ArgumentCount {
                name: name.to_string(),
                expected: decl.parameters.len(),
                found: args.len(),
                span,
            });
        }
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::unsupported(
                format!(
                    "Maximum call depth of {} exceeded in \"{}\"",
                    self.max_call_depth, name
                ),
                span,
            ));
        }

        tracing::debug!(function = name, home = %function.home, "calling function");
        let caller_space = std::mem::replace(&mut self.current_space, function.home.clone());
        if !self.memory.has_space(&function.home) {
            self.memory.new_space(&function.home);
        }
        self.push_frame();
        self.call_depth += 1;

        // Each nested call recurses on the host stack
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.invoke(decl, args, span)
        });

        self.call_depth -= 1;
        self.pop_frame();
        self.current_space = caller_space;
        result
    }

    /// Bind parameters, run the body and coerce the returned value
    fn invoke(&mut self, decl: &FunctionDecl, args: Vec<Object>, span: Span) -> Result<Object, RuntimeError> {
        for (param, arg) in decl.parameters.iter().zip(args) {
            let mut slot = Object::zeroed(&param.vtd);
            if !slot.copy_to(&arg) {
                return Err(RuntimeError::type_error(
                    format!(
                        "Unable to pass '{}' value as parameter \"{}\" of type '{}'",
                        arg.base_type(),
                        param.name,
                        param.vtd
                    ),
                    span,
                ));
            }
            if !self.memory.new_variable(&self.current_space, &param.name, slot) {
                return Err(RuntimeError::DuplicateVariable {
                    name: param.name.clone(),
                    span,
                });
            }
        }

        let returned = match self.exec_block(&decl.body)? {
            ControlFlow::Return(value) => value,
            ControlFlow::None => Object::Nil,
            ControlFlow::Break => {
                return Err(RuntimeError::unsupported("'break' outside of a loop", span))
            }
        };

        if decl.return_type.is_nil() {
            return Ok(Object::Nil);
        }
        let mut result = Object::zeroed(&decl.return_type);
        if returned.is_nil() || !result.copy_to(&returned) {
            return Err(RuntimeError::type_error(
                format!(
                    "Function \"{}\" returned '{}' where '{}' was declared",
                    decl.name,
                    returned.base_type(),
                    decl.return_type
                ),
                span,
            ));
        }
        Ok(result)
    }

    fn push_frame(&mut self) {
        if let Some(space) = self.memory.space_mut(&self.current_space) {
            space.push_top_level_scope();
        }
    }

    fn pop_frame(&mut self) {
        if let Some(space) = self.memory.space_mut(&self.current_space) {
            space.pop_scope();
        }
    }

    fn sub_scope(&mut self) {
        if let Some(space) = self.memory.space_mut(&self.current_space) {
            space.sub_scope();
        }
    }

    fn leave_scope(&mut self) {
        if let Some(space) = self.memory.space_mut(&self.current_space) {
            space.leave_scope();
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
