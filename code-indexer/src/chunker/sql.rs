//! SQL extraction rules (spec.md §4.2): CREATE TABLE/VIEW/FUNCTION/
//! PROCEDURE/INDEX/TRIGGER statements. Falls back to a module chunk when no
//! CREATE-shaped statement is found.

use crate::errors::{Error, Result};
use crate::types::{Chunk, ChunkKind, SymbolInfo};
use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

fn language() -> Language {
    tree_sitter_sequel::LANGUAGE.into()
}

pub struct SqlExtractor {
    parser: Parser,
}

impl SqlExtractor {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&language())
            .expect("sql grammar is statically linked");
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
        walk(tree.root_node(), &content, rel_path, &mut chunks, &mut symbols);

        if chunks.is_empty() {
            return super::chunk_as_module(path, rel_path);
        }
        Ok((chunks, symbols))
    }
}

fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn extract_identifier(node: Option<Node>, src: &str) -> Option<String> {
    let node = node?;
    if node.kind() == "identifier" {
        return Some(node_text(node, src).to_string());
    }
    if node.kind() == "object_reference" {
        let mut parts = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "identifier" {
                parts.push(node_text(child, src).to_string());
            }
        }
        return if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        };
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "identifier" {
            return Some(node_text(child, src).to_string());
        }
        if child.kind() == "object_reference" {
            return extract_identifier(Some(child), src);
        }
    }
    None
}

fn extract_table_refs(node: Node, src: &str) -> Vec<String> {
    let mut refs = BTreeSet::new();
    walk_table_refs(node, src, &mut refs);
    refs.into_iter().collect()
}

fn walk_table_refs(node: Node, src: &str, refs: &mut BTreeSet<String>) {
    if matches!(node.kind(), "object_reference" | "table_reference") {
        if let Some(name) = extract_identifier(Some(node), src) {
            refs.insert(name);
        }
    } else if node.kind() == "identifier" {
        if let Some(parent) = node.parent() {
            if matches!(parent.kind(), "from_clause" | "join_clause" | "table_expression") {
                refs.insert(node_text(node, src).to_string());
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_table_refs(child, src, refs);
    }
}

fn first_identifier_like(node: Node, src: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(child.kind(), "object_reference" | "identifier") {
            if let Some(name) = extract_identifier(Some(child), src) {
                return Some(name);
            }
        }
    }
    None
}

fn process_statement(node: Node, src: &str, rel_path: &str, chunks: &mut Vec<Chunk>, symbols: &mut Vec<SymbolInfo>) {
    let node_type = node.kind().to_ascii_lowercase();
    let content = node_text(node, src).to_string();
    let line_start = node.start_position().row + 1;
    let line_end = node.end_position().row + 1;

    let mut push = |id: String, kind: ChunkKind, name: String, signature: String, imports: Vec<String>| {
        chunks.push(Chunk {
            id: id.clone(),
            file: rel_path.to_string(),
            kind,
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
            kind: kind.as_str().to_string(),
            file: rel_path.to_string(),
            line: line_start,
            signature,
            imports,
            ..Default::default()
        });
    };

    if node_type.contains("create") && node_type.contains("table") {
        if let Some(name) = first_identifier_like(node, src) {
            let mut columns = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "column_definitions" {
                    let mut c2 = child.walk();
                    for col in child.children(&mut c2) {
                        if col.kind() == "column_definition" {
                            if let Some(n) = extract_identifier(Some(col), src) {
                                columns.push(n);
                            }
                        }
                    }
                }
            }
            let mut signature = format!("CREATE TABLE {name}");
            if !columns.is_empty() {
                let shown = columns.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
                signature.push_str(&format!(
                    " ({shown}{})",
                    if columns.len() > 5 { "..." } else { "" }
                ));
            }
            push(format!("{rel_path}:table:{name}"), ChunkKind::Table, name, signature, vec![]);
        }
    } else if node_type.contains("create") && node_type.contains("view") {
        if let Some(name) = first_identifier_like(node, src) {
            let table_refs = extract_table_refs(node, src);
            let signature = format!("CREATE VIEW {name}");
            push(format!("{rel_path}:view:{name}"), ChunkKind::View, name, signature, table_refs);
        }
    } else if node_type.contains("create") && (node_type.contains("function") || node_type.contains("procedure")) {
        let is_proc = node_type.contains("procedure");
        if let Some(name) = first_identifier_like(node, src) {
            let table_refs = extract_table_refs(node, src);
            let obj = if is_proc { "PROCEDURE" } else { "FUNCTION" };
            let signature = format!("CREATE {obj} {name}()");
            let kind = if is_proc { ChunkKind::Procedure } else { ChunkKind::FunctionSql };
            push(format!("{rel_path}:{}:{name}", obj.to_lowercase()), kind, name, signature, table_refs);
        }
    } else if node_type.contains("create") && node_type.contains("index") {
        let mut cursor = node.walk();
        let mut index_name = None;
        let mut table_name = None;
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "object_reference" | "identifier") {
                if index_name.is_none() {
                    index_name = extract_identifier(Some(child), src);
                } else {
                    table_name = extract_identifier(Some(child), src);
                    break;
                }
            }
        }
        if let Some(name) = index_name {
            let mut signature = format!("CREATE INDEX {name}");
            if let Some(t) = &table_name {
                signature.push_str(&format!(" ON {t}"));
            }
            push(
                format!("{rel_path}:index:{name}"),
                ChunkKind::Index,
                name,
                signature,
                table_name.into_iter().collect(),
            );
        }
    } else if node_type.contains("create") && node_type.contains("trigger") {
        let mut cursor = node.walk();
        let mut trigger_name = None;
        let mut table_name = None;
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "object_reference" | "identifier") {
                if trigger_name.is_none() {
                    trigger_name = extract_identifier(Some(child), src);
                } else {
                    table_name = extract_identifier(Some(child), src);
                    break;
                }
            }
        }
        if let Some(name) = trigger_name {
            let mut signature = format!("CREATE TRIGGER {name}");
            if let Some(t) = &table_name {
                signature.push_str(&format!(" ON {t}"));
            }
            push(
                format!("{rel_path}:trigger:{name}"),
                ChunkKind::Trigger,
                name,
                signature,
                table_name.into_iter().collect(),
            );
        }
    }
}

fn walk(node: Node, src: &str, rel_path: &str, chunks: &mut Vec<Chunk>, symbols: &mut Vec<SymbolInfo>) {
    let node_type = node.kind().to_ascii_lowercase();
    if node_type.contains("create") || node.kind() == "statement" {
        process_statement(node, src, rel_path, chunks, symbols);
    } else {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk(child, src, rel_path, chunks, symbols);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_create_statements_falls_back_to_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        std::fs::write(&path, "SELECT * FROM users;\n").unwrap();
        let mut ex = SqlExtractor::new();
        let (chunks, _symbols) = ex.extract(&path, "q.sql").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Module);
    }

    #[test]
    fn create_table_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        std::fs::write(&path, "CREATE TABLE users (id INT, name TEXT);\n").unwrap();
        let mut ex = SqlExtractor::new();
        let (chunks, _symbols) = ex.extract(&path, "schema.sql").unwrap();
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Table && c.name == "users"));
    }
}
