//! Function extraction from source buffers, one implementation per language.

pub mod python;
pub mod rust;

use anyhow::Result;
use std::collections::HashMap;

use crate::core::{FunctionSpan, Scope};
use crate::errors::NabazError;

pub use python::PythonParser;
pub use rust::RustParser;

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
}

impl Language {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rust" => Some(Self::Rust),
            "python" => Some(Self::Python),
            _ => None,
        }
    }
}

/// Extracts function declarations from source text.
///
/// Free functions and methods alike are keyed by bare name; two types sharing
/// a method name collide in the map. Known limitation, kept as-is.
pub trait LanguageParser: Send + Sync {
    /// Every function declaration in `source`, name to span.
    fn functions(&self, source: &str) -> Result<HashMap<String, FunctionSpan>>;

    /// Name of the function whose span contains the starting line of `scope`.
    fn find_function(&self, source: &str, scope: &Scope) -> Result<String> {
        let functions = self.functions(source)?;
        functions
            .iter()
            .find(|(_, span)| span.contains_line(scope.start_line))
            .map(|(name, _)| name.clone())
            .ok_or_else(|| {
                NabazError::not_found(format!(
                    "no function encloses {}:{}",
                    scope.path, scope.start_line
                ))
                .into()
            })
    }
}

/// Build the parser for a language.
pub fn new_parser(language: Language) -> Box<dyn LanguageParser> {
    match language {
        Language::Rust => Box::new(RustParser),
        Language::Python => Box::new(PythonParser),
    }
}
