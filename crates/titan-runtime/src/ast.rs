//! Abstract Syntax Tree (AST) definitions
//!
//! A program is an ordered list of top-level instructions. Expressions and
//! instructions are closed sum types; every node carries its source span.

use crate::span::Span;
use crate::token::TokenKind;
use crate::types::{classify_integer_literal, IntClass, Variable, Vtd};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// Name of the root scope / space
pub const GLOBAL_SCOPE: &str = "GLOBAL";

/// Top-level program containing all items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Instruction>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a top-level function by name
    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.items.iter().find_map(|item| match item {
            Instruction::Function(f) if f.name == name => Some(f),
            _ => None,
        })
    }
}

/// Instruction (statement or declaration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// `import "path";` (resolved and replaced by the parser)
    Import { target: String, span: Span },
    Function(FunctionDecl),
    /// `let name: type = init;`
    Assignment(Assignment),
    /// Expression statement
    Expression(Expr),
    If(IfInstruction),
    While(WhileInstruction),
    For(ForInstruction),
    Return { value: Option<Expr>, span: Span },
    Break(Span),
    /// Switch the active module scope (emitted around spliced imports)
    ScopeChange { scope: String, span: Span },
    /// Reserved for user-defined structures
    DefineUserStruct { name: String, span: Span },
}

/// Function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// File the function was parsed from
    pub source_file: String,
    pub return_type: Vtd,
    pub parameters: Vec<Variable>,
    pub body: Vec<Instruction>,
    pub span: Span,
}

/// Variable declaration with initializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub variable: Variable,
    pub init: Expr,
    pub span: Span,
}

/// `if` / `else if` / `else` chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfInstruction {
    pub segments: Vec<ConditionalSegment>,
    pub span: Span,
}

/// One branch of an `if` chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalSegment {
    pub condition: Expr,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileInstruction {
    pub condition: Expr,
    pub body: Vec<Instruction>,
    pub span: Span,
}

/// `for (let ...; condition; step) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInstruction {
    pub init: Assignment,
    pub condition: Expr,
    pub step: Expr,
    pub body: Vec<Instruction>,
    pub span: Span,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Id {
        name: String,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    ArrayIndex {
        array: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Infix {
        op: TokenKind,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Prefix {
        op: TokenKind,
        right: Box<Expr>,
        span: Span,
    },
    RawInt(RawInt),
    RawFloat {
        text: String,
        span: Span,
    },
    RawString {
        text: String,
        span: Span,
    },
    ArrayLiteral {
        elements: Vec<Expr>,
        span: Span,
    },
}

/// Integer literal with its lazily computed classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInt {
    pub text: String,
    pub span: Span,
    #[serde(skip)]
    classified: OnceCell<Option<IntClass>>,
}

impl RawInt {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
            classified: OnceCell::new(),
        }
    }

    /// Smallest fitting kind and value, computed once per node
    pub fn classify(&self) -> Option<IntClass> {
        *self
            .classified
            .get_or_init(|| classify_integer_literal(&self.text))
    }
}

// The cache is derived data and never affects equality
impl PartialEq for RawInt {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.span == other.span
    }
}

impl Expr {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Id { span, .. }
            | Expr::Call { span, .. }
            | Expr::ArrayIndex { span, .. }
            | Expr::Infix { span, .. }
            | Expr::Prefix { span, .. }
            | Expr::RawFloat { span, .. }
            | Expr::RawString { span, .. }
            | Expr::ArrayLiteral { span, .. } => *span,
            Expr::RawInt(raw) => raw.span,
        }
    }

    /// Shorthand for an integer literal node
    pub fn raw_int(text: impl Into<String>, span: Span) -> Self {
        Expr::RawInt(RawInt::new(text, span))
    }
}

impl Instruction {
    /// Get the span of this instruction
    pub fn span(&self) -> Span {
        match self {
            Instruction::Import { span, .. }
            | Instruction::Return { span, .. }
            | Instruction::ScopeChange { span, .. }
            | Instruction::DefineUserStruct { span, .. } => *span,
            Instruction::Break(span) => *span,
            Instruction::Function(f) => f.span,
            Instruction::Assignment(a) => a.span,
            Instruction::Expression(e) => e.span(),
            Instruction::If(i) => i.span,
            Instruction::While(w) => w.span,
            Instruction::For(f) => f.span,
        }
    }
}
