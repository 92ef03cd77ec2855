//! Chunk and SymbolInfo: the two data products the Chunker emits per file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A semantic code unit produced by the Chunker.
///
/// Invariant: `line_start <= line_end`; `id` is unique within an index;
/// `content` is exactly the source substring spanning `[line_start, line_end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub file: String,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub name: String,
    pub signature: String,
    pub content: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Chunk {
    /// 16-hex-char prefix of SHA-256(content); used only for change detection.
    pub fn hash(&self) -> String {
        let mut h = Sha256::new();
        h.update(self.content.as_bytes());
        format!("{:x}", h.finalize())[..16].to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Module,
    Table,
    View,
    Procedure,
    FunctionSql,
    Trigger,
    Index,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
            ChunkKind::Module => "module",
            ChunkKind::Table => "table",
            ChunkKind::View => "view",
            ChunkKind::Procedure => "procedure",
            ChunkKind::FunctionSql => "function-sql",
            ChunkKind::Trigger => "trigger",
            ChunkKind::Index => "index",
        }
    }
}

/// Chunker's emission consumed by the Symbol Graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: String,
    pub line: usize,
    pub signature: String,
    #[serde(default)]
    pub calls: Vec<String>,
    /// Module names or parent-class names, overloaded by `kind`.
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
}
