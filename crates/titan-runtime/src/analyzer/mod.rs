//! Semantic analysis
//!
//! The analyzer walks a parsed program once, resolving every identifier
//! against the symbol table and checking that calls, returns and
//! initializers respect the implicit cast rules:
//! - Functions are registered in a pre-pass, so they may be called before
//!   their definition and may recurse
//! - Names are unique per scope; inner scopes may shadow outer ones
//! - `return` must agree with the declared return type
//!
//! Analysis keeps going after an error and gives up once
//! [`MAX_ERRORS`] have been reported.

mod expr;

use crate::ast::*;
use crate::diagnostic::{error_codes, DisplayConfig, Diagnostic};
use crate::span::Span;
use crate::symbol::{FunctionSignature, Symbol, SymbolKind, SymbolTable};
use crate::types::{check_cast, Vtd};
use std::collections::HashSet;

/// Errors reported before analysis gives up
pub const MAX_ERRORS: usize = 10;

/// Name of the function run in batch mode
pub const ENTRY_FUNCTION: &str = "main";

/// Semantic analyzer state
///
/// The symbol table persists across calls to [`Analyzer::analyze`], so a
/// REPL can analyze one line at a time.
pub struct Analyzer {
    pub(super) table: SymbolTable,
    pub(super) diagnostics: Vec<Diagnostic>,
    error_count: usize,
    /// Suffix for generated block scope names
    uid: u64,
    /// Return type of the function being analyzed
    current_return: Option<Vtd>,
    /// File of the function being analyzed
    current_file: Option<String>,
    loop_depth: usize,
    source_name: String,
    check_entry: bool,
}

impl Analyzer {
    /// Create an analyzer with an empty global scope
    pub fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            diagnostics: Vec::new(),
            error_count: 0,
            uid: 0,
            current_return: None,
            current_file: None,
            loop_depth: 0,
            source_name: "<input>".to_string(),
            check_entry: false,
        }
    }

    /// Register host functions that calls may resolve to
    pub fn with_externals<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self.table.add_external(name);
        }
        self
    }

    /// Set the file reported for top-level statements
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Require a valid `main` once the program has been walked
    pub fn with_entry_check(mut self, enabled: bool) -> Self {
        self.check_entry = enabled;
        self
    }

    /// Register one host function after construction
    pub fn add_external(&mut self, name: &str) -> bool {
        self.table.add_external(name)
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    /// Take the diagnostics reported so far
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Analyze a program; true iff no error was reported
    pub fn analyze(&mut self, program: &Program) -> bool {
        tracing::debug!(items = program.items.len(), "starting semantic analysis");
        self.error_count = 0;

        let duplicates = self.register_functions(program);

        for (index, item) in program.items.iter().enumerate() {
            if self.aborted() {
                tracing::debug!("error limit reached, aborting analysis");
                return false;
            }
            match item {
                Instruction::Function(func) if duplicates.contains(&index) => {
                    tracing::debug!(function = %func.name, "skipping duplicate function");
                }
                Instruction::Function(func) => self.analyze_function(func),
                _ => self.analyze_instruction(item),
            }
        }

        if self.check_entry && !self.aborted() {
            self.check_entry_point();
        }

        tracing::debug!(errors = self.error_count, "semantic analysis complete");
        self.error_count == 0
    }

    /// Register every function up front so calls resolve regardless of order
    ///
    /// Returns the item indices of functions that failed to register.
    fn register_functions(&mut self, program: &Program) -> HashSet<usize> {
        let start_scope = self.table.current_scope_name().to_string();
        let mut duplicates = HashSet::new();

        for (index, item) in program.items.iter().enumerate() {
            match item {
                Instruction::ScopeChange { scope, .. } => {
                    self.table.activate_top_level_scope(scope);
                }
                Instruction::Function(func) => {
                    let symbol = Symbol::new(
                        func.name.clone(),
                        SymbolKind::Function(FunctionSignature {
                            return_type: func.return_type.clone(),
                            parameters: func.parameters.clone(),
                        }),
                        func.span,
                    )
                    .with_file(func.source_file.clone());

                    if !self.table.add_function(symbol) {
                        let mut message = format!("Duplicate function \"{}\"", func.name);
                        if let Some(first) = self.table.lookup(&func.name, false) {
                            message.push_str(&format!(
                                ". First occurrence at ({}, line : {})",
                                first.file, first.span.line
                            ));
                        }
                        self.report_in(
                            error_codes::DUPLICATE_FUNCTION_DEF,
                            message,
                            func.span,
                            &func.source_file,
                        );
                        duplicates.insert(index);
                    }
                }
                _ => {}
            }
        }

        self.table.activate_top_level_scope(&start_scope);
        duplicates
    }

    fn analyze_function(&mut self, func: &FunctionDecl) {
        tracing::debug!(function = %func.name, "analyzing function");
        let outer_scope = self.table.current_scope_name().to_string();
        if !self.table.enter_function_scope(&func.name) {
            self.report(
                error_codes::INTERNAL_ANALYZER_FAILURE,
                format!("Function \"{}\" was not registered", func.name),
                func.span,
            );
            return;
        }

        self.current_file = Some(func.source_file.clone());

        for param in &func.parameters {
            let symbol = Symbol::new(
                param.name.clone(),
                SymbolKind::Parameter(param.vtd.clone()),
                func.span,
            );
            if !self.table.add_symbol(symbol) {
                self.report(
                    error_codes::DUPLICATE_PARAMETER,
                    format!(
                        "Duplicate parameter \"{}\" in function \"{}\"",
                        param.name, func.name
                    ),
                    func.span,
                );
                self.table.discard_current_scope();
                self.table.activate_top_level_scope(&outer_scope);
                self.current_file = None;
                return;
            }
        }

        self.current_return = Some(func.return_type.clone());
        let outer_loops = std::mem::take(&mut self.loop_depth);

        self.analyze_body(&func.body);

        self.loop_depth = outer_loops;
        self.current_return = None;
        self.current_file = None;
        self.table.activate_top_level_scope(&outer_scope);
    }

    fn analyze_body(&mut self, body: &[Instruction]) {
        for instruction in body {
            if self.aborted() {
                return;
            }
            self.analyze_instruction(instruction);
        }
    }

    fn analyze_instruction(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::Import { span, .. } => {
                self.report(
                    error_codes::INTERNAL_ANALYZER_FAILURE,
                    "Import statement made its way to the analyzer",
                    *span,
                );
            }
            Instruction::DefineUserStruct { span, .. } => {
                self.report(
                    error_codes::INTERNAL_ANALYZER_FAILURE,
                    "User defined structures are not supported",
                    *span,
                );
            }
            Instruction::Function(func) => {
                self.report(
                    error_codes::INVALID_EXPRESSION,
                    format!("Function \"{}\" must be defined at the top level", func.name),
                    func.span,
                );
            }
            Instruction::ScopeChange { scope, .. } => {
                tracing::debug!(scope = %scope, "scope change");
                self.table.activate_top_level_scope(scope);
            }
            Instruction::Assignment(assignment) => self.analyze_assignment(assignment),
            Instruction::Expression(expr) => {
                self.analyze_expression(expr);
            }
            Instruction::If(chain) => {
                for segment in &chain.segments {
                    let scope = self.next_scope_name("if_instruction");
                    self.table.add_scope_and_enter(scope);
                    self.analyze_expression(&segment.condition);
                    self.analyze_body(&segment.body);
                    self.table.pop_scope();
                }
            }
            Instruction::While(w) => {
                let scope = self.next_scope_name("while_instruction");
                self.table.add_scope_and_enter(scope);
                self.analyze_expression(&w.condition);
                self.loop_depth += 1;
                self.analyze_body(&w.body);
                self.loop_depth -= 1;
                self.table.pop_scope();
            }
            Instruction::For(f) => {
                let scope = self.next_scope_name("for_instruction");
                self.table.add_scope_and_enter(scope);
                self.analyze_assignment(&f.init);
                self.analyze_expression(&f.condition);
                self.analyze_expression(&f.step);
                self.loop_depth += 1;
                self.analyze_body(&f.body);
                self.loop_depth -= 1;
                self.table.pop_scope();
            }
            Instruction::Return { value, span } => self.analyze_return(value.as_ref(), *span),
            Instruction::Break(span) => {
                if self.loop_depth == 0 {
                    self.report(
                        error_codes::INVALID_EXPRESSION,
                        "'break' outside of a loop",
                        *span,
                    );
                }
            }
        }
    }

    fn analyze_assignment(&mut self, assignment: &Assignment) {
        let name = &assignment.variable.name;
        if let Some(existing) = self.table.lookup(name, true) {
            let message = format!(
                "Duplicate variable name \"{}\". Item first defined on line {}",
                name, existing.span.line
            );
            self.report(error_codes::DUPLICATE_VARIABLE_DEF, message, assignment.span);
            return;
        }

        let actual = self.analyze_expression(&assignment.init);
        self.check_implicit_cast(
            &assignment.variable.vtd,
            &actual,
            error_codes::IMPLICIT_CAST_FAIL,
            assignment.init.span(),
        );

        self.table.add_symbol(Symbol::new(
            name.clone(),
            SymbolKind::Variable(assignment.variable.vtd.clone()),
            assignment.span,
        ));
    }

    fn analyze_return(&mut self, value: Option<&Expr>, span: Span) {
        let Some(expected) = self.current_return.clone() else {
            self.report(
                error_codes::INVALID_EXPRESSION,
                "'return' outside of a function",
                span,
            );
            return;
        };

        match (value, expected.is_nil()) {
            (Some(expr), false) => {
                let actual = self.analyze_expression(expr);
                self.check_implicit_cast(&expected, &actual, error_codes::IMPLICIT_CAST_FAIL, expr.span());
            }
            (Some(expr), true) => {
                self.analyze_expression(expr);
                self.report(
                    error_codes::RETURN_EXPECTED_EXPRESSION,
                    "Unexpected expression for return in function with nil return type",
                    span,
                );
            }
            (None, false) => {
                self.report(
                    error_codes::RETURN_EXPECTED_EXPRESSION,
                    "Expected expression for return in function with non-nil return type",
                    span,
                );
            }
            (None, true) => {}
        }
    }

    /// Verify that `main` exists and returns a scalar integer
    fn check_entry_point(&mut self) {
        let entry = self
            .table
            .lookup(ENTRY_FUNCTION, false)
            .map(|symbol| (symbol.kind.clone(), symbol.span, symbol.file.clone()));

        match entry {
            Some((SymbolKind::Function(signature), span, file)) => {
                let ret = &signature.return_type;
                if ret.is_array() || !ret.base.is_integer() {
                    self.report_in(
                        error_codes::INCORRECT_ENTRY_RETURN,
                        format!(
                            "Entry function \"{}\" must return an integer type, found '{}'",
                            ENTRY_FUNCTION, ret
                        ),
                        span,
                        &file,
                    );
                }
            }
            _ => {
                let message = format!("No entry function \"{}\" found", ENTRY_FUNCTION);
                self.report(error_codes::ENTRY_NOT_FOUND, message, Span::dummy());
            }
        }
    }

    /// Report `code` when `actual` may not be stored in a slot of type `expected`
    ///
    /// An undefined actual type comes from an expression that already failed.
    pub(super) fn check_implicit_cast(&mut self, expected: &Vtd, actual: &Vtd, code: u32, span: Span) -> bool {
        if *actual == Vtd::undef() {
            return false;
        }
        match check_cast(expected, actual) {
            Ok(()) => true,
            Err(refusal) => {
                let message = format!(
                    "{} (expected '{}', found '{}')",
                    refusal.message(),
                    expected,
                    actual
                );
                self.report(code, message, span);
                false
            }
        }
    }

    fn next_scope_name(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.uid);
        self.uid += 1;
        name
    }

    fn aborted(&self) -> bool {
        self.error_count >= MAX_ERRORS
    }

    /// Record a semantic error in the current file
    pub(super) fn report(&mut self, code: u32, message: impl Into<String>, span: Span) {
        let file = self
            .current_file
            .clone()
            .unwrap_or_else(|| self.source_name.clone());
        self.report_in(code, message, span, &file);
    }

    fn report_in(&mut self, code: u32, message: impl Into<String>, span: Span, file: &str) {
        // Only the first error shows its source window
        let display = DisplayConfig {
            show_source_chunk: self.error_count == 0,
            show_line_number: span.line != 0,
            ..DisplayConfig::default()
        };
        self.diagnostics.push(
            Diagnostic::error_with_code(code, message, span)
                .with_file(file)
                .with_label("semantic error")
                .with_display(display),
        );
        self.error_count += 1;
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
