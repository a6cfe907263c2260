//! Titan Runtime - Core language implementation
//!
//! This library provides the complete Titan language core:
//! - Lexical analysis and parsing, with import resolution
//! - Scope-aware symbol tables and semantic analysis
//! - Tree-walking execution over a scoped object store
//! - The native function (xfunc) bridge

/// Titan runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod analyzer;
pub mod ast;
pub mod diagnostic;
pub mod executor;
pub mod imports;
pub mod lexer;
pub mod memory;
pub mod object;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod span;
pub mod symbol;
pub mod token;
pub mod types;
pub mod xfunc;

// Re-export commonly used types
pub use analyzer::Analyzer;
pub use ast::{Expr, Instruction, Program, GLOBAL_SCOPE};
pub use diagnostic::formatter::{ColorMode, DiagnosticFormatter};
pub use diagnostic::{error_codes, sort_diagnostics, Diagnostic, DisplayConfig, DIAG_VERSION};
pub use executor::{Executor, RuntimeError};
pub use imports::{FsLoader, ImportContext, MemoryLoader, SourceLoader};
pub use lexer::Lexer;
pub use memory::{Memory, Space};
pub use object::Object;
pub use parser::Parser;
pub use repl::ReplCore;
pub use runtime::{RunOptions, RuntimeResult, Titan};
pub use span::Span;
pub use symbol::{Symbol, SymbolKind, SymbolTable};
pub use token::{Token, TokenKind};
pub use types::{BaseType, Vtd};
pub use xfunc::{XFunc, XFuncContext, XFuncError, XFuncRegistry};
