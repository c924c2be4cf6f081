//! Rust function extraction via syn.
//!
//! Spans come from proc-macro2 with the `span-locations` feature, translated
//! to plain [`FunctionSpan`] records right here.

use anyhow::Result;
use std::collections::HashMap;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};

use super::LanguageParser;
use crate::core::FunctionSpan;
use crate::errors::NabazError;

pub struct RustParser;

impl LanguageParser for RustParser {
    fn functions(&self, source: &str) -> Result<HashMap<String, FunctionSpan>> {
        let file = syn::parse_file(source)
            .map_err(|e| NabazError::parse("<buffer>", e.to_string()))?;

        let mut visitor = FunctionVisitor {
            functions: HashMap::new(),
        };
        visitor.visit_file(&file);
        Ok(visitor.functions)
    }
}

struct FunctionVisitor {
    functions: HashMap<String, FunctionSpan>,
}

impl FunctionVisitor {
    fn record(&mut self, name: String, span: proc_macro2::Span) {
        let start = span.start();
        let end = span.end();
        let bytes = span.byte_range();
        self.functions.insert(
            name,
            FunctionSpan {
                start_line: start.line,
                start_col: start.column,
                end_line: end.line,
                end_col: end.column,
                start_byte: bytes.start,
                end_byte: bytes.end,
            },
        );
    }
}

impl<'ast> Visit<'ast> for FunctionVisitor {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.record(node.sig.ident.to_string(), node.span());
        visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.record(node.sig.ident.to_string(), node.span());
        visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        // Only default bodies carry comparable source text.
        if node.default.is_some() {
            self.record(node.sig.ident.to_string(), node.span());
        }
        visit::visit_trait_item_fn(self, node);
    }
}
