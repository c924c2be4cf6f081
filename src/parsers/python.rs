//! Python function extraction via tree-sitter.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tree_sitter::{Node, Parser};

use super::LanguageParser;
use crate::core::FunctionSpan;
use crate::errors::NabazError;

pub struct PythonParser;

impl LanguageParser for PythonParser {
    fn functions(&self, source: &str) -> Result<HashMap<String, FunctionSpan>> {
        // A fresh tree-sitter parser per call keeps this type Sync.
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .context("failed to load python grammar")?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| NabazError::parse("<buffer>", "tree-sitter returned no tree"))?;

        let mut functions = HashMap::new();
        collect_functions(tree.root_node(), source.as_bytes(), &mut functions);
        Ok(functions)
    }
}

fn collect_functions(node: Node<'_>, source: &[u8], out: &mut HashMap<String, FunctionSpan>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "function_definition" {
            if let Some(name) = child
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(source).ok())
            {
                out.insert(name.to_string(), node_span(&child));
            }
        }
        collect_functions(child, source, out);
    }
}

fn node_span(node: &Node<'_>) -> FunctionSpan {
    FunctionSpan {
        start_line: node.start_position().row + 1,
        start_col: node.start_position().column,
        end_line: node.end_position().row + 1,
        end_col: node.end_position().column,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}
