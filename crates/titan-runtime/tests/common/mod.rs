//! Shared test utilities
//!
//! Helpers for running Titan source through each pipeline stage with the
//! program output captured in memory.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use titan_runtime::{
    Analyzer, Diagnostic, Lexer, Object, Parser, Program, RunOptions, Titan, GLOBAL_SCOPE,
};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Output sink that stays readable after the runtime takes ownership
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Parse source that is expected to be valid
pub fn parse(source: &str) -> Program {
    let (tokens, lex_diags) = Lexer::new(source).tokenize();
    assert!(lex_diags.is_empty(), "lexer errors: {:?}", lex_diags);
    let (program, diagnostics) = Parser::new(tokens).parse();
    assert!(diagnostics.is_empty(), "parse errors: {:?}", diagnostics);
    program
}

/// Parse source and return only the diagnostics
pub fn parse_errors(source: &str) -> Vec<Diagnostic> {
    let (tokens, mut diagnostics) = Lexer::new(source).tokenize();
    if !diagnostics.is_empty() {
        return diagnostics;
    }
    let (_, parse_diags) = Parser::new(tokens).parse();
    diagnostics.extend(parse_diags);
    diagnostics
}

/// Analyze valid source; returns the analyzer diagnostics
pub fn analyze(source: &str) -> Vec<Diagnostic> {
    let program = parse(source);
    let mut analyzer = Analyzer::new().with_externals(["puts"]);
    analyzer.analyze(&program);
    analyzer.take_diagnostics()
}

/// Error codes reported by the analyzer, in order
pub fn analyzer_codes(source: &str) -> Vec<u32> {
    analyze(source).iter().map(|d| d.code).collect()
}

/// A runtime with captured output and the given options
pub fn runtime(options: RunOptions) -> (Titan, SharedBuffer) {
    let out = SharedBuffer::default();
    let titan = Titan::new()
        .with_output(Box::new(out.clone()))
        .with_options(options);
    (titan, out)
}

/// Run source in batch mode with analysis; panics on any diagnostic
pub fn run_ok(source: &str) -> (Titan, String) {
    let (mut titan, out) = runtime(RunOptions::batch(true, true));
    if let Err(diagnostics) = titan.run_source("test.tn", source) {
        panic!("unexpected diagnostics: {:#?}", diagnostics);
    }
    (titan, out.contents())
}

/// Read a global variable after a run
pub fn global(titan: &Titan, name: &str) -> Option<Object> {
    titan
        .executor()
        .memory()
        .get_variable(GLOBAL_SCOPE, name)
        .cloned()
}
