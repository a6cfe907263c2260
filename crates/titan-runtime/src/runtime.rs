//! Titan runtime API for embedding
//!
//! [`Titan`] drives one program through the pipeline: lex, parse (resolving
//! imports), optionally analyze, then execute. Analyzer and executor state
//! persist between calls, so a host can feed a program in pieces.

use crate::analyzer::{Analyzer, ENTRY_FUNCTION};
use crate::ast::Program;
use crate::diagnostic::Diagnostic;
use crate::executor::Executor;
use crate::imports::{ImportContext, SourceLoader};
use crate::lexer::Lexer;
use crate::object::Object;
use crate::parser::Parser;
use crate::xfunc::XFunc;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, Vec<Diagnostic>>;

/// Which stages run for each unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub analyze: bool,
    pub execute: bool,
    /// Function called after a unit's top level has run, when defined
    pub entry: Option<String>,
    /// Report a missing or malformed entry function during analysis
    pub require_entry: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            analyze: false,
            execute: true,
            entry: Some(ENTRY_FUNCTION.to_string()),
            require_entry: false,
        }
    }
}

impl RunOptions {
    /// Options for a batch run of whole files
    pub fn batch(analyze: bool, execute: bool) -> Self {
        Self {
            analyze,
            execute,
            entry: Some(ENTRY_FUNCTION.to_string()),
            require_entry: analyze,
        }
    }

    /// Options for line-by-line evaluation
    pub fn interactive(analyze: bool) -> Self {
        Self {
            analyze,
            execute: true,
            entry: None,
            require_entry: false,
        }
    }
}

/// Titan runtime instance
///
/// # Examples
///
/// ```
/// use titan_runtime::Titan;
///
/// let mut titan = Titan::new().with_output(Box::new(std::io::sink()));
/// let result = titan.run_source("demo.tn", "fn main() -> u8 { return 2 * 21; }");
/// assert_eq!(result, Ok(Some(titan_runtime::Object::U8(42))));
/// ```
pub struct Titan {
    imports: ImportContext,
    analyzer: Option<Analyzer>,
    executor: Executor,
    options: RunOptions,
}

impl Titan {
    /// Create a runtime that loads imports from the filesystem and writes
    /// program output to stdout
    pub fn new() -> Self {
        Self {
            imports: ImportContext::filesystem(),
            analyzer: None,
            executor: Executor::new(),
            options: RunOptions::default(),
        }
    }

    /// Resolve imports through `loader` instead of the filesystem
    pub fn with_loader(mut self, loader: Box<dyn SourceLoader>) -> Self {
        let dirs = self.imports.include_dirs().to_vec();
        self.imports = ImportContext::new(loader).with_include_dirs(dirs);
        self
    }

    pub fn with_include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.imports = self.imports.with_include_dirs(dirs);
        self
    }

    /// Redirect program output
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.executor = self.executor.with_output(out);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Store the root unit's globals in a space named `name`
    pub fn with_root_space(mut self, name: &str) -> Self {
        self.executor = self.executor.with_root_space(name);
        self
    }

    /// Register a host function; false if the name is taken
    pub fn add_xfunc(&mut self, xfunc: Box<dyn XFunc>) -> bool {
        let name = xfunc.name().to_string();
        if !self.executor.xfuncs_mut().add_xfunc(xfunc) {
            return false;
        }
        if let Some(analyzer) = self.analyzer.as_mut() {
            analyzer.add_external(&name);
        }
        true
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The analyzer, once a unit has been analyzed
    pub fn analyzer(&self) -> Option<&Analyzer> {
        self.analyzer.as_ref()
    }

    /// Load and parse a file as the root of a program
    pub fn parse_file(&mut self, path: &Path) -> RuntimeResult<Program> {
        tracing::debug!(file = %path.display(), "loading unit");
        let tokens = self.imports.load(path)?;
        self.imports.mark_imported(path);
        self.parse_tokens(tokens, &path.display().to_string())
    }

    /// Parse source text given under `name`
    pub fn parse_source(&mut self, name: &str, source: &str) -> RuntimeResult<Program> {
        let (tokens, diagnostics) = Lexer::new(source).with_file(name).tokenize();
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }
        self.parse_tokens(tokens, name)
    }

    fn parse_tokens(&mut self, tokens: Vec<crate::token::Token>, name: &str) -> RuntimeResult<Program> {
        let (program, diagnostics) = Parser::new(tokens)
            .with_source_name(name)
            .with_imports(&mut self.imports)
            .parse();
        if diagnostics.is_empty() {
            Ok(program)
        } else {
            Err(diagnostics)
        }
    }

    /// Run semantic analysis over a parsed unit
    pub fn analyze(&mut self, program: &Program, name: &str) -> RuntimeResult<()> {
        let require_entry = self.options.require_entry;
        let xfuncs = self.executor.xfuncs();
        let analyzer = self.analyzer.get_or_insert_with(|| {
            Analyzer::new()
                .with_externals(xfuncs.names())
                .with_source_name(name)
                .with_entry_check(require_entry)
        });
        if analyzer.analyze(program) {
            Ok(())
        } else {
            Err(analyzer.take_diagnostics())
        }
    }

    /// Execute a parsed unit, then its entry function if one is defined
    ///
    /// Returns the entry function's result.
    pub fn execute(&mut self, program: &Program, name: &str) -> RuntimeResult<Option<Object>> {
        self.executor
            .run(program)
            .map_err(|e| vec![e.to_diagnostic(name)])?;

        match &self.options.entry {
            Some(entry) if self.executor.has_function(entry) => self
                .executor
                .run_entry(entry)
                .map(Some)
                .map_err(|e| vec![e.to_diagnostic(name)]),
            _ => Ok(None),
        }
    }

    /// Run every enabled stage over a parsed unit
    pub fn run_program(&mut self, program: &Program, name: &str) -> RuntimeResult<Option<Object>> {
        if self.options.analyze {
            self.analyze(program, name)?;
        }
        if !self.options.execute {
            return Ok(None);
        }
        self.execute(program, name)
    }

    /// Load, parse and run a file
    pub fn run_file(&mut self, path: &Path) -> RuntimeResult<Option<Object>> {
        let program = self.parse_file(path)?;
        self.run_program(&program, &path.display().to_string())
    }

    /// Parse and run source text given under `name`
    pub fn run_source(&mut self, name: &str, source: &str) -> RuntimeResult<Option<Object>> {
        let program = self.parse_source(name, source)?;
        self.run_program(&program, name)
    }
}

impl Default for Titan {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::error_codes;
    use crate::imports::MemoryLoader;

    fn quiet() -> Titan {
        Titan::new().with_output(Box::new(std::io::sink()))
    }

    #[test]
    fn test_runtime_default() {
        let titan = Titan::default();
        assert_eq!(titan.options(), &RunOptions::default());
        assert!(titan.analyzer().is_none());
    }

    #[test]
    fn test_run_source_calls_main() {
        let mut titan = quiet();
        let result = titan.run_source("t.tn", "fn main() -> i32 { return -4; }");
        assert_eq!(result, Ok(Some(Object::I32(-4))));
    }

    #[test]
    fn test_without_main_nothing_is_returned() {
        let mut titan = quiet();
        assert_eq!(titan.run_source("t.tn", "let a: u8 = 1;"), Ok(None));
    }

    #[test]
    fn test_lex_errors_are_reported() {
        let mut titan = quiet();
        let errors = titan.run_source("t.tn", "let a: u8 = `;").unwrap_err();
        assert_eq!(errors[0].code, error_codes::UNEXPECTED_CHARACTER);
    }

    #[test]
    fn test_parse_errors_stop_the_pipeline() {
        let mut titan = quiet();
        let errors = titan.run_source("t.tn", "let a: u8 = ;").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, error_codes::INTERNAL_NO_FN_FOR_TOKEN);
    }

    #[test]
    fn test_analysis_blocks_execution() {
        let mut titan = quiet().with_options(RunOptions::batch(true, true));
        let errors = titan
            .run_source("t.tn", "fn main() -> u8 { return missing; }")
            .unwrap_err();
        assert_eq!(errors[0].code, error_codes::UNKNOWN_ID);
        assert!(!titan.executor().has_function("main"));
    }

    #[test]
    fn test_batch_analysis_requires_entry() {
        let mut titan = quiet().with_options(RunOptions::batch(true, false));
        let errors = titan.run_source("t.tn", "let a: u8 = 1;").unwrap_err();
        assert_eq!(errors[0].code, error_codes::ENTRY_NOT_FOUND);
    }

    #[test]
    fn test_analyze_only_does_not_execute() {
        let mut titan = quiet().with_options(RunOptions::batch(true, false));
        let result = titan.run_source("t.tn", "fn main() -> u8 { return 1; }");
        assert_eq!(result, Ok(None));
        assert!(!titan.executor().has_function("main"));
    }

    #[test]
    fn test_runtime_errors_become_diagnostics() {
        let mut titan = quiet();
        let errors = titan
            .run_source("calc.tn", "fn main() -> u8 { return 1 / 0; }")
            .unwrap_err();
        assert_eq!(errors[0].code, error_codes::DIVIDE_BY_ZERO);
        assert_eq!(errors[0].file, "calc.tn");
    }

    #[test]
    fn test_missing_file() {
        let mut titan = quiet();
        let errors = titan.run_file(Path::new("nonexistent.tn")).unwrap_err();
        assert_eq!(errors[0].code, error_codes::TARGET_NOT_FILE);
    }

    #[test]
    fn test_imports_through_loader() {
        let loader = MemoryLoader::new()
            .with_file("main.tn", "import \"lib/math.tn\";\nfn main() -> i32 { return sq(7); }")
            .with_file("lib/math.tn", "fn sq(x: i32) -> i32 { return x * x; }");
        let mut titan = quiet()
            .with_loader(Box::new(loader))
            .with_options(RunOptions::batch(true, true));
        let result = titan.run_file(Path::new("main.tn"));
        assert_eq!(result, Ok(Some(Object::I32(49))));
    }

    #[test]
    fn test_root_file_is_not_imported_again() {
        let loader = MemoryLoader::new()
            .with_file("a.tn", "import \"a.tn\";\nfn main() -> u8 { return 3; }");
        let mut titan = quiet().with_loader(Box::new(loader));
        assert_eq!(titan.run_file(Path::new("a.tn")), Ok(Some(Object::U8(3))));
    }
}
