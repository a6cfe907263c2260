//! Import resolution
//!
//! The parser resolves `import "path";` through an [`ImportContext`], which
//! owns a pluggable [`SourceLoader`], the include directories, and the
//! caches that keep each file from being spliced in more than once.

use crate::diagnostic::{error_codes, Diagnostic};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::Token;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Source of importable files
pub trait SourceLoader {
    /// Whether `path` names a loadable file
    fn is_file(&self, path: &Path) -> bool;

    /// Read and tokenize `path`
    fn load(&self, path: &Path) -> Result<Vec<Token>, Vec<Diagnostic>>;
}

/// Loads files from the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn load(&self, path: &Path) -> Result<Vec<Token>, Vec<Diagnostic>> {
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(vec![Diagnostic::error_with_code(
                error_codes::TARGET_NOT_FILE,
                format!("Given item is not a file: {}", display),
                Span::dummy(),
            )
            .with_file(display)]);
        }
        let source = std::fs::read_to_string(path).map_err(|e| {
            vec![Diagnostic::error_with_code(
                error_codes::TARGET_CANT_OPEN,
                format!("Unable to open file {}: {}", display, e),
                Span::dummy(),
            )
            .with_file(display.clone())]
        })?;
        lex_source(&source, &display)
    }
}

/// Serves sources from memory, keyed by path
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `path`
    pub fn with_file(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.files.insert(path.into(), source.into());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn load(&self, path: &Path) -> Result<Vec<Token>, Vec<Diagnostic>> {
        let display = path.display().to_string();
        match self.files.get(path) {
            Some(source) => lex_source(source, &display),
            None => Err(vec![Diagnostic::error_with_code(
                error_codes::TARGET_CANT_OPEN,
                format!("Unable to open file {}", display),
                Span::dummy(),
            )
            .with_file(display)]),
        }
    }
}

fn lex_source(source: &str, file: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let (tokens, diagnostics) = Lexer::new(source).with_file(file).tokenize();
    if diagnostics.is_empty() {
        Ok(tokens)
    } else {
        Err(diagnostics)
    }
}

/// Shared import state for one program
pub struct ImportContext {
    loader: Box<dyn SourceLoader>,
    include_dirs: Vec<PathBuf>,
    /// Import target -> path found in an include directory
    resolved: HashMap<String, PathBuf>,
    /// Files already spliced into the program
    imported: HashSet<PathBuf>,
}

impl ImportContext {
    pub fn new(loader: Box<dyn SourceLoader>) -> Self {
        Self {
            loader,
            include_dirs: Vec::new(),
            resolved: HashMap::new(),
            imported: HashSet::new(),
        }
    }

    /// Context backed by the filesystem
    pub fn filesystem() -> Self {
        Self::new(Box::new(FsLoader))
    }

    pub fn with_include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// Locate an import target
    ///
    /// Checks the target as given (relative to the working directory), then
    /// previously resolved targets, then each include directory in order.
    pub fn locate(&mut self, target: &str) -> Option<PathBuf> {
        let local = PathBuf::from(target);
        if self.loader.is_file(&local) {
            tracing::debug!(target_path = %local.display(), "import resolved locally");
            return Some(local);
        }

        if let Some(found) = self.resolved.get(target) {
            return Some(found.clone());
        }

        for dir in &self.include_dirs {
            let candidate = dir.join(target);
            if self.loader.is_file(&candidate) {
                tracing::debug!(
                    target_path = %candidate.display(),
                    include_dir = %dir.display(),
                    "import resolved through include directory"
                );
                self.resolved.insert(target.to_string(), candidate.clone());
                return Some(candidate);
            }
        }

        None
    }

    /// Tokenize a located file
    pub fn load(&self, path: &Path) -> Result<Vec<Token>, Vec<Diagnostic>> {
        self.loader.load(path)
    }

    /// Record `path` as spliced in; false if it already was
    pub fn mark_imported(&mut self, path: &Path) -> bool {
        self.imported.insert(path.to_path_buf())
    }

    pub fn is_imported(&self, path: &Path) -> bool {
        self.imported.contains(path)
    }
}

impl Default for ImportContext {
    fn default() -> Self {
        Self::filesystem()
    }
}

/// Derive a module scope name from an import target
///
/// `a/b.tn` becomes `a::b`; backslashes are treated as separators.
pub fn scope_name_from_target(target: &str) -> String {
    let normalized = target.replace('\\', "/");
    let stem = match normalized.rfind('.') {
        Some(dot) if dot > normalized.rfind('/').map_or(0, |slash| slash + 1) => &normalized[..dot],
        _ => normalized.as_str(),
    };
    stem.trim_start_matches("./").replace('/', "::")
}
