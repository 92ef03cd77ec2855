//! AST-based code chunker using tree-sitter.
//!
//! Dispatches by file extension to a language-specific extractor; anything
//! unsupported, unparseable, or oversized degrades to a single `module`
//! chunk covering the whole file (or is skipped outright).

mod javascript;
mod python;
mod sql;

use crate::errors::Result;
use crate::types::{Chunk, ChunkKind, SymbolInfo};
use std::path::Path;

/// Files larger than this are skipped entirely (chunk_file returns empty).
pub const MAX_FILE_SIZE: u64 = 100 * 1024;
/// Chunks (module fallback) longer than this are truncated with a marker.
pub const MAX_CHUNK_LINES: usize = 200;

/// Parses source files into `(Chunk, SymbolInfo)` pairs.
///
/// Tree-sitter parsers are constructed once per `Chunker` instance and
/// reused across files, rather than cached in a process-global — one
/// `Chunker` is built per indexing run.
pub struct Chunker {
    python: python::PythonExtractor,
    javascript: javascript::JavascriptExtractor,
    sql: sql::SqlExtractor,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker {
    pub fn new() -> Self {
        Self {
            python: python::PythonExtractor::new(),
            javascript: javascript::JavascriptExtractor::new(),
            sql: sql::SqlExtractor::new(),
        }
    }

    /// Parse a file and extract chunks and symbol info.
    ///
    /// `file_path` is absolute; `project_root` is used to compute the
    /// repo-relative path stored on every emitted `Chunk`/`SymbolInfo`.
    pub fn chunk_file(
        &mut self,
        file_path: &Path,
        project_root: &Path,
    ) -> Result<(Vec<Chunk>, Vec<SymbolInfo>)> {
        let rel_path = file_path
            .strip_prefix(project_root)
            .unwrap_or(file_path)
            .to_string_lossy()
            .replace('\\', "/");

        let meta = match std::fs::metadata(file_path) {
            Ok(m) => m,
            Err(_) => return Ok((vec![], vec![])),
        };
        if meta.len() > MAX_FILE_SIZE {
            return Ok((vec![], vec![]));
        }

        let ext = file_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let result = match ext.as_str() {
            "py" | "pyw" => self.python.extract(file_path, &rel_path),
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => {
                self.javascript.extract(file_path, &rel_path)
            }
            "sql" => self.sql.extract(file_path, &rel_path),
            _ => return chunk_as_module(file_path, &rel_path),
        };

        match result {
            Ok(out) => Ok(out),
            Err(err) => {
                tracing::warn!(file = %rel_path, error = %err, "parse failed, degrading to module fallback");
                chunk_as_module(file_path, &rel_path)
            }
        }
    }
}

/// Treat the entire file as a single `module` chunk. Used for unsupported
/// extensions and as the graceful-degradation path when a parser is
/// unavailable or fails.
fn chunk_as_module(file_path: &Path, rel_path: &str) -> Result<(Vec<Chunk>, Vec<SymbolInfo>)> {
    let content = match std::fs::read_to_string(file_path) {
        Ok(c) => c,
        Err(_) => return Ok((vec![], vec![])),
    };

    let lines: Vec<&str> = content.lines().collect();
    let (content, line_end) = if lines.len() > MAX_CHUNK_LINES {
        let mut truncated = lines[..MAX_CHUNK_LINES].join("\n");
        truncated.push_str("\n... (truncated)");
        (truncated, lines.len())
    } else {
        (content.clone(), lines.len().max(1))
    };

    if content.is_empty() {
        return Ok((vec![], vec![]));
    }

    let name = Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string());
    let id = format!("{rel_path}:module");
    let signature = format!("# {rel_path}");

    let chunk = Chunk {
        id: id.clone(),
        file: rel_path.to_string(),
        kind: ChunkKind::Module,
        name: name.clone(),
        signature: signature.clone(),
        content: content.clone(),
        line_start: 1,
        line_end,
        tokens: crate::tokenizer::tokenize(&content),
        parent: None,
    };

    let symbol = SymbolInfo {
        id,
        name,
        kind: "module".to_string(),
        file: rel_path.to_string(),
        line: 1,
        signature,
        ..Default::default()
    };

    Ok((vec![chunk], vec![symbol]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn oversized_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![b'x'; MAX_FILE_SIZE as usize + 1]).unwrap();
        let mut chunker = Chunker::new();
        let (chunks, symbols) = chunker.chunk_file(&path, dir.path()).unwrap();
        assert!(chunks.is_empty());
        assert!(symbols.is_empty());
    }

    #[test]
    fn exact_max_size_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![b'x'; MAX_FILE_SIZE as usize]).unwrap();
        let mut chunker = Chunker::new();
        let (chunks, _symbols) = chunker.chunk_file(&path, dir.path()).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_file_produces_zero_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.py");
        std::fs::File::create(&path).unwrap();
        let mut chunker = Chunker::new();
        let (chunks, symbols) = chunker.chunk_file(&path, dir.path()).unwrap();
        assert!(chunks.is_empty());
        assert!(symbols.is_empty());
    }

    #[test]
    fn unsupported_extension_falls_back_to_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.md");
        std::fs::write(&path, "# Title\n\nbody text\n").unwrap();
        let mut chunker = Chunker::new();
        let (chunks, _symbols) = chunker.chunk_file(&path, dir.path()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Module);
        assert_eq!(chunks[0].name, "readme");
    }
}
