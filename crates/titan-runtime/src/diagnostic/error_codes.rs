//! Error code registry with descriptions and help text
//!
//! Codes are stable numeric identifiers grouped by the stage that raises them:
//! - 100-199: source loading and lexing
//! - 200-299: parser internal errors
//! - 300-399: parser user errors
//! - 1000-1099: analyzer internal errors
//! - 1100-1199: analyzer user errors
//! - 2000-2099: execution errors

use serde::{Deserialize, Serialize};
use std::fmt;

// === Error Code Constants ===

// 1xx - Source loading
pub const TARGET_NOT_FILE: u32 = 100;
pub const TARGET_CANT_OPEN: u32 = 101;
pub const UNEXPECTED_CHARACTER: u32 = 102;
pub const UNTERMINATED_STRING: u32 = 103;

// 2xx - Parser internal
pub const INTERNAL_MARK_UNSET: u32 = 200;
pub const INTERNAL_NO_FN_FOR_TOKEN: u32 = 201;
pub const INTERNAL_NON_NUMERIC_REACHED: u32 = 202;

// 3xx - Parser user
pub const UNABLE_TO_LOCATE_IMPORT: u32 = 300;
pub const INVALID_TOP_LEVEL_ITEM: u32 = 301;
pub const EXPECTED_CONDITIONAL: u32 = 302;
pub const EXPECTED_ASSIGNMENT: u32 = 303;
pub const UNEXPECTED_TOKEN: u32 = 304;

// 10xx - Analyzer internal
pub const INTERNAL_ANALYZER_FAILURE: u32 = 1000;

// 11xx - Analyzer user
pub const DUPLICATE_FUNCTION_DEF: u32 = 1100;
pub const DUPLICATE_VARIABLE_DEF: u32 = 1101;
pub const ENTRY_NOT_FOUND: u32 = 1102;
pub const RETURN_EXPECTED_EXPRESSION: u32 = 1103;
pub const UNKNOWN_ID: u32 = 1104;
pub const UNMATCHED_CALL: u32 = 1105;
pub const EXPECTED_VARIABLE: u32 = 1106;
pub const PARAM_SIZE_MISMATCH: u32 = 1107;
pub const PARAM_TYPE_MISMATCH: u32 = 1108;
pub const INCORRECT_ENTRY_RETURN: u32 = 1109;
pub const INVALID_EXPRESSION: u32 = 1110;
pub const IMPLICIT_CAST_FAIL: u32 = 1111;
pub const INVALID_ARRAY_IDX: u32 = 1112;
pub const DUPLICATE_PARAMETER: u32 = 1113;

// 20xx - Execution
pub const UNDEFINED_VARIABLE: u32 = 2000;
pub const RUNTIME_TYPE_ERROR: u32 = 2001;
pub const DIVIDE_BY_ZERO: u32 = 2002;
pub const INDEX_OUT_OF_BOUNDS: u32 = 2003;
pub const INVALID_INDEX: u32 = 2004;
pub const UNKNOWN_FUNCTION: u32 = 2005;
pub const ARGUMENT_COUNT: u32 = 2006;
pub const UNSUPPORTED: u32 = 2007;
pub const XFUNC_FAILURE: u32 = 2008;
pub const DUPLICATE_VARIABLE: u32 = 2009;

/// Presentation tier of an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorTier {
    /// A front-end invariant was violated (a bug in Titan itself)
    Internal,
    /// Malformed program text or an unloadable source
    Syntax,
    /// Type, identifier or arity violations
    Semantic,
    /// Failure while executing
    Runtime,
}

impl fmt::Display for ErrorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTier::Internal => write!(f, "internal error"),
            ErrorTier::Syntax | ErrorTier::Semantic => write!(f, "error"),
            ErrorTier::Runtime => write!(f, "runtime error"),
        }
    }
}

/// Classify a code into its tier
pub fn tier_of(code: u32) -> ErrorTier {
    match code {
        200..=299 | 1000..=1099 => ErrorTier::Internal,
        1100..=1999 => ErrorTier::Semantic,
        2000..=2999 => ErrorTier::Runtime,
        _ => ErrorTier::Syntax,
    }
}

// === Error Code Info Registry ===

/// Error code descriptor with code, description, and optional help text
#[derive(Debug, Clone)]
pub struct ErrorCodeInfo {
    /// The numeric code
    pub code: u32,
    /// Human-readable description
    pub description: &'static str,
    /// Optional contextual help text
    pub help: Option<&'static str>,
}

/// Get info for an error code, if known
pub fn lookup(code: u32) -> Option<ErrorCodeInfo> {
    ERROR_CODES.iter().find(|e| e.code == code).cloned()
}

/// Get help text for an error code
pub fn help_for(code: u32) -> Option<&'static str> {
    lookup(code).and_then(|e| e.help)
}

/// Get description for an error code
pub fn description_for(code: u32) -> Option<&'static str> {
    lookup(code).map(|e| e.description)
}

/// All known error codes with descriptions and help
pub static ERROR_CODES: &[ErrorCodeInfo] = &[
    // === 1xx: Source loading ===
    ErrorCodeInfo {
        code: 100,
        description: "Given item is not a file",
        help: Some("Pass the path of a Titan source file."),
    },
    ErrorCodeInfo {
        code: 101,
        description: "Unable to open given file",
        help: Some("Check that the file exists and is readable."),
    },
    ErrorCodeInfo {
        code: 102,
        description: "Unexpected character",
        help: Some("Remove the character or place it inside a string literal."),
    },
    ErrorCodeInfo {
        code: 103,
        description: "Unterminated string literal",
        help: Some("Add a closing '\"' to the string."),
    },
    // === 2xx: Parser internal ===
    ErrorCodeInfo {
        code: 200,
        description: "Attempt to reset with unset mark",
        help: Some("This is a bug in the parser. Please report it."),
    },
    ErrorCodeInfo {
        code: 201,
        description: "No prefix function for given token",
        help: Some("An expression was expected here."),
    },
    ErrorCodeInfo {
        code: 202,
        description: "Non numerical item reached in number conversion",
        help: Some("Array sizes must be non-negative integer literals."),
    },
    // === 3xx: Parser user ===
    ErrorCodeInfo {
        code: 300,
        description: "Unable to locate import target",
        help: Some("Check the import path or add its directory with --include."),
    },
    ErrorCodeInfo {
        code: 301,
        description: "Invalid top level item",
        help: Some("Only imports, functions and statements may appear at the top level."),
    },
    ErrorCodeInfo {
        code: 302,
        description: "Expected conditional",
        help: Some("Wrap the condition in parentheses: if (x < 10) { ... }"),
    },
    ErrorCodeInfo {
        code: 303,
        description: "Expected assignment",
        help: Some("A for loop starts with a declaration: for (let i: u8 = 0; ...; ...)"),
    },
    ErrorCodeInfo {
        code: 304,
        description: "Unexpected token",
        help: Some("Check your syntax for typos or missing tokens."),
    },
    // === 10xx: Analyzer internal ===
    ErrorCodeInfo {
        code: 1000,
        description: "Unable to analyze instruction",
        help: Some("This is a bug in the analyzer. Please report it."),
    },
    // === 11xx: Analyzer user ===
    ErrorCodeInfo {
        code: 1100,
        description: "Duplicate function definition",
        help: Some("Rename one of the functions."),
    },
    ErrorCodeInfo {
        code: 1101,
        description: "Duplicate variable definition",
        help: Some("Rename the variable or move it into a nested block."),
    },
    ErrorCodeInfo {
        code: 1102,
        description: "No entry function present in program",
        help: Some("Add an entry function: fn main() -> i32 { return 0; }"),
    },
    ErrorCodeInfo {
        code: 1103,
        description: "Return expression does not match function return type",
        help: Some("Non-nil functions must return a value; nil functions must not."),
    },
    ErrorCodeInfo {
        code: 1104,
        description: "Unknown identifier",
        help: Some("Declare the item before using it."),
    },
    ErrorCodeInfo {
        code: 1105,
        description: "Call to non function type",
        help: None,
    },
    ErrorCodeInfo {
        code: 1106,
        description: "Expected variable item is of non-variable type",
        help: None,
    },
    ErrorCodeInfo {
        code: 1107,
        description: "Invalid parameter list size",
        help: Some("Pass exactly as many arguments as the function declares."),
    },
    ErrorCodeInfo {
        code: 1108,
        description: "Parameter type mismatch",
        help: None,
    },
    ErrorCodeInfo {
        code: 1109,
        description: "Incorrect return type for entry function",
        help: Some("The entry function must return an integer type."),
    },
    ErrorCodeInfo {
        code: 1110,
        description: "Invalid expression",
        help: None,
    },
    ErrorCodeInfo {
        code: 1111,
        description: "Unable to implicitly cast types",
        help: Some("Strings never convert implicitly, and array depths must fit."),
    },
    ErrorCodeInfo {
        code: 1112,
        description: "Invalid non-integer type for array index",
        help: None,
    },
    ErrorCodeInfo {
        code: 1113,
        description: "Duplicate parameter name",
        help: None,
    },
    // === 20xx: Execution ===
    ErrorCodeInfo {
        code: 2000,
        description: "Undefined variable",
        help: Some("Run with --analyze to catch this before execution."),
    },
    ErrorCodeInfo {
        code: 2001,
        description: "Type error",
        help: None,
    },
    ErrorCodeInfo {
        code: 2002,
        description: "Division by zero",
        help: None,
    },
    ErrorCodeInfo {
        code: 2003,
        description: "Array index out of bounds",
        help: None,
    },
    ErrorCodeInfo {
        code: 2004,
        description: "Invalid index",
        help: Some("Indexes must be non-negative integers."),
    },
    ErrorCodeInfo {
        code: 2005,
        description: "Unknown function",
        help: None,
    },
    ErrorCodeInfo {
        code: 2006,
        description: "Argument count mismatch",
        help: None,
    },
    ErrorCodeInfo {
        code: 2007,
        description: "Unsupported construct",
        help: Some("User defined types are not yet supported."),
    },
    ErrorCodeInfo {
        code: 2008,
        description: "External function failed",
        help: None,
    },
    ErrorCodeInfo {
        code: 2009,
        description: "Duplicate variable in scope",
        help: Some("Run with --analyze to catch this before execution."),
    },
];
