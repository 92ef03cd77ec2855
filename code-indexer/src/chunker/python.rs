//! Python extraction rules (spec.md §4.2): functions, classes (with method
//! summaries), methods, module-level imports.

use crate::errors::{Error, Result};
use crate::types::{Chunk, ChunkKind, SymbolInfo};
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

fn language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

pub struct PythonExtractor {
    parser: Parser,
}

impl PythonExtractor {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&language())
            .expect("python grammar is statically linked");
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

        let module_imports = extract_imports(tree.root_node(), &content);

        let mut cursor = tree.root_node().walk();
        for child in tree.root_node().children(&mut cursor) {
            process_node(child, &content, rel_path, None, &mut chunks, &mut symbols);
        }

        if !module_imports.is_empty() {
            let name = Path::new(rel_path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| rel_path.to_string());
            symbols.push(SymbolInfo {
                id: format!("{rel_path}:module"),
                name,
                kind: "module".to_string(),
                file: rel_path.to_string(),
                line: 1,
                signature: format!("# {rel_path}"),
                imports: module_imports,
                ..Default::default()
            });
        }

        Ok((chunks, symbols))
    }
}

fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn get_signature(node: Node, src: &str) -> String {
    let text = node_text(node, src);
    text.split('\n').next().unwrap_or("").trim_end().to_string()
}

fn extract_calls(node: Node, src: &str) -> Vec<String> {
    let mut calls = Vec::new();
    walk_calls(node, src, &mut calls);
    calls
}

fn walk_calls(node: Node, src: &str, calls: &mut Vec<String>) {
    if node.kind() == "call" {
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

/// Module-level imports: walks the tree but does not descend into nested
/// function/class bodies (those are not module scope).
fn extract_imports(node: Node, src: &str) -> Vec<String> {
    let mut imports = Vec::new();
    walk_imports(node, src, &mut imports);
    imports
}

fn walk_imports(node: Node, src: &str, imports: &mut Vec<String>) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "dotted_name" {
                    imports.push(node_text(child, src).to_string());
                }
            }
            return;
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                imports.push(node_text(module, src).to_string());
            }
            return;
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !matches!(child.kind(), "function_definition" | "class_definition") {
            walk_imports(child, src, imports);
        }
    }
}

fn process_node(
    node: Node,
    src: &str,
    rel_path: &str,
    parent_class: Option<&str>,
    chunks: &mut Vec<Chunk>,
    symbols: &mut Vec<SymbolInfo>,
) {
    match node.kind() {
        "function_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = node_text(name_node, src).to_string();
            let content = node_text(node, src).to_string();
            let kind = if parent_class.is_some() {
                ChunkKind::Method
            } else {
                ChunkKind::Function
            };
            let id = match parent_class {
                Some(p) => format!("{rel_path}:{p}.{name}"),
                None => format!("{rel_path}:{name}"),
            };
            let signature = get_signature(node, src);
            let line_start = node.start_position().row + 1;
            let line_end = node.end_position().row + 1;

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
                parent: parent_class.map(|s| s.to_string()),
            });

            symbols.push(SymbolInfo {
                id,
                name,
                kind: kind.as_str().to_string(),
                file: rel_path.to_string(),
                line: line_start,
                signature,
                calls: extract_calls(node, src),
                parent_class: parent_class.map(|s| s.to_string()),
                ..Default::default()
            });
        }
        "class_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let class_name = node_text(name_node, src).to_string();
            let class_sig = get_signature(node, src);
            let id = format!("{rel_path}:{class_name}");
            let summary = class_summary(node, src);
            let line_start = node.start_position().row + 1;
            let line_end = node.end_position().row + 1;

            chunks.push(Chunk {
                id: id.clone(),
                file: rel_path.to_string(),
                kind: ChunkKind::Class,
                name: class_name.clone(),
                signature: class_sig.clone(),
                content: summary.clone(),
                line_start,
                line_end,
                tokens: crate::tokenizer::tokenize(&summary),
                parent: None,
            });

            let mut superclasses = Vec::new();
            if let Some(args) = node.child_by_field_name("superclasses") {
                let mut cursor = args.walk();
                for arg in args.children(&mut cursor) {
                    if arg.kind() == "identifier" {
                        superclasses.push(node_text(arg, src).to_string());
                    }
                }
            }

            symbols.push(SymbolInfo {
                id,
                name: class_name.clone(),
                kind: "class".to_string(),
                file: rel_path.to_string(),
                line: line_start,
                signature: class_sig,
                imports: superclasses,
                ..Default::default()
            });

            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    process_node(child, src, rel_path, Some(&class_name), chunks, symbols);
                }
            }
        }
        _ => {}
    }
}

/// Class header, docstring verbatim (if the first body statement is a
/// string literal), then one indented signature + `...` placeholder line
/// per method — not the method bodies.
fn class_summary(class_node: Node, src: &str) -> String {
    let mut lines = Vec::new();
    let first_line = node_text(class_node, src)
        .split('\n')
        .next()
        .unwrap_or("")
        .to_string();
    lines.push(first_line);

    let body = class_node.child_by_field_name("body");
    if let Some(body) = body {
        let mut cursor = body.walk();
        let mut body_children = body.children(&mut cursor);
        if let Some(first_child) = body_children.next() {
            if first_child.kind() == "expression_statement" {
                let mut c2 = first_child.walk();
                if let Some(expr) = first_child.children(&mut c2).next() {
                    if expr.kind() == "string" {
                        for doc_line in node_text(expr, src).split('\n') {
                            lines.push(format!("    {doc_line}"));
                        }
                    }
                }
            }
        }
    }

    if let Some(body) = body {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            if child.kind() == "function_definition" {
                let sig = node_text(child, src).split('\n').next().unwrap_or("");
                lines.push(format!("    {sig}"));
                lines.push("        ...".to_string());
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_with_method_and_function() {
        let src = "class A:\n    def m(self): return f()\ndef f(): return 1\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        std::fs::write(&path, src).unwrap();

        let mut ex = PythonExtractor::new();
        let (chunks, symbols) = ex.extract(&path, "a.py").unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "a.py:A");
        assert_eq!(chunks[0].kind, ChunkKind::Class);
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[0].line_end, 2);
        assert_eq!(chunks[1].id, "a.py:A.m");
        assert_eq!(chunks[1].kind, ChunkKind::Method);
        assert_eq!(chunks[1].parent.as_deref(), Some("A"));
        assert_eq!(chunks[2].id, "a.py:f");
        assert_eq!(chunks[2].kind, ChunkKind::Function);

        let m_symbol = symbols.iter().find(|s| s.id == "a.py:A.m").unwrap();
        assert_eq!(m_symbol.calls, vec!["f".to_string()]);
    }

    #[test]
    fn class_with_no_methods_produces_one_chunk() {
        let src = "class Empty:\n    pass\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.py");
        std::fs::write(&path, src).unwrap();

        let mut ex = PythonExtractor::new();
        let (chunks, _symbols) = ex.extract(&path, "e.py").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Class);
    }

    #[test]
    fn module_level_imports_attach_to_synthetic_symbol() {
        let src = "import os\nfrom collections import OrderedDict\n\ndef f():\n    pass\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.py");
        std::fs::write(&path, src).unwrap();

        let mut ex = PythonExtractor::new();
        let (_chunks, symbols) = ex.extract(&path, "m.py").unwrap();
        let module_symbol = symbols.iter().find(|s| s.id == "m.py:module").unwrap();
        assert_eq!(module_symbol.imports, vec!["os", "collections"]);
    }
}
