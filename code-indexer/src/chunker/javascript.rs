//! JavaScript/TypeScript extraction rules (spec.md §4.2): function
//! declarations, arrow functions bound to `const`/`let`, class declarations.
//!
//! Uses the TSX grammar for all of `.js`/`.jsx`/`.ts`/`.tsx`/`.mjs`/`.cjs`,
//! matching the original's grammar-selection preference (TSX is a superset
//! that parses plain JS too).

use crate::errors::{Error, Result};
use crate::types::{Chunk, ChunkKind, SymbolInfo};
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

fn language() -> Language {
    tree_sitter_typescript::LANGUAGE_TSX.into()
}

pub struct JavascriptExtractor {
    parser: Parser,
}

impl JavascriptExtractor {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&language())
            .expect("tsx grammar is statically linked");
        Self { parser }
    }

    pub fn extract(&mut self, path: &Path, rel_path: &str) -> Result<(Vec<Chunk>, Vec<SymbolInfo>)> {
        let content = std::fs::read_to_string(path)?;
        let tree = self
            .parser
            .parse(&content, None)
            .ok_or(Error::TreeSitterParse)?;

        let mut chunks = Vec::new();
        let mut symbols = Vec::new();
        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            process_node(child, &content, rel_path, &mut chunks, &mut symbols);
        }
        Ok((chunks, symbols))
    }
}

fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// Header truncated before the opening brace, with a trailing `{` appended.
fn get_signature(node: Node, src: &str) -> String {
    let text = node_text(node, src);
    let first_line = text.split('\n').next().unwrap_or("");
    if let Some(idx) = first_line.find('{') {
        format!("{} {{", first_line[..idx].trim())
    } else {
        first_line.to_string()
    }
}

fn extract_calls(node: Node, src: &str) -> Vec<String> {
    let mut calls = Vec::new();
    walk_calls(node, src, &mut calls);
    calls
}

fn walk_calls(node: Node, src: &str, calls: &mut Vec<String>) {
    if node.kind() == "call_expression" {
        if let Some(func) = node.child_by_field_name("function") {
            let mut name = node_text(func, src).to_string();
            if let Some(idx) = name.rfind('.') {
                name = name[idx + 1..].to_string();
            }
            calls.push(name);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_calls(child, src, calls);
    }
}

fn process_node(
    node: Node,
    src: &str,
    rel_path: &str,
    chunks: &mut Vec<Chunk>,
    symbols: &mut Vec<SymbolInfo>,
) {
    match node.kind() {
        "function_declaration" | "function" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, src).to_string();
                let content = node_text(node, src).to_string();
                let id = format!("{rel_path}:{name}");
                let signature = get_signature(node, src);
                let line_start = node.start_position().row + 1;
                let line_end = node.end_position().row + 1;

                chunks.push(Chunk {
                    id: id.clone(),
                    file: rel_path.to_string(),
                    kind: ChunkKind::Function,
                    name: name.clone(),
                    signature: signature.clone(),
                    content: content.clone(),
                    line_start,
                    line_end,
                    tokens: crate::tokenizer::tokenize(&content),
                    parent: None,
                });
                symbols.push(SymbolInfo {
                    id,
                    name,
                    kind: "function".to_string(),
                    file: rel_path.to_string(),
                    line: line_start,
                    signature,
                    calls: extract_calls(node, src),
                    ..Default::default()
                });
            }
        }
        "lexical_declaration" => {
            let mut cursor = node.walk();
            for decl in node.children(&mut cursor) {
                if decl.kind() != "variable_declarator" {
                    continue;
                }
                let (Some(name_node), Some(value_node)) = (
                    decl.child_by_field_name("name"),
                    decl.child_by_field_name("value"),
                ) else {
                    continue;
                };
                if value_node.kind() != "arrow_function" {
                    continue;
                }
                let name = node_text(name_node, src).to_string();
                let content = node_text(node, src).to_string();
                let id = format!("{rel_path}:{name}");
                let signature = get_signature(node, src);
                let line_start = node.start_position().row + 1;
                let line_end = node.end_position().row + 1;

                chunks.push(Chunk {
                    id: id.clone(),
                    file: rel_path.to_string(),
                    kind: ChunkKind::Function,
                    name: name.clone(),
                    signature: signature.clone(),
                    content: content.clone(),
                    line_start,
                    line_end,
                    tokens: crate::tokenizer::tokenize(&content),
                    parent: None,
                });
                symbols.push(SymbolInfo {
                    id,
                    name,
                    kind: "function".to_string(),
                    file: rel_path.to_string(),
                    line: line_start,
                    signature,
                    calls: extract_calls(value_node, src),
                    ..Default::default()
                });
            }
        }
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let class_name = node_text(name_node, src).to_string();
                let content = node_text(node, src).to_string();
                let id = format!("{rel_path}:{class_name}");
                let signature = get_signature(node, src);
                let line_start = node.start_position().row + 1;
                let line_end = node.end_position().row + 1;

                chunks.push(Chunk {
                    id: id.clone(),
                    file: rel_path.to_string(),
                    kind: ChunkKind::Class,
                    name: class_name.clone(),
                    signature: signature.clone(),
                    content: content.clone(),
                    line_start,
                    line_end,
                    tokens: crate::tokenizer::tokenize(&content),
                    parent: None,
                });
                symbols.push(SymbolInfo {
                    id,
                    name: class_name,
                    kind: "class".to_string(),
                    file: rel_path.to_string(),
                    line: line_start,
                    signature,
                    ..Default::default()
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        process_node(child, src, rel_path, chunks, symbols);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_and_arrow_and_class() {
        let src = "function greet() { return 1; }\nconst add = (a, b) => a + b;\nclass Foo {}\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, src).unwrap();

        let mut ex = JavascriptExtractor::new();
        let (chunks, _symbols) = ex.extract(&path, "a.js").unwrap();
        let names: Vec<_> = chunks.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"greet"));
        assert!(names.contains(&"add"));
        assert!(names.contains(&"Foo"));
    }
}
