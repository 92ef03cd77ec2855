//! The nine tools available to a running task: read-only inspection
//! (`list_files`, `read_file`, `search_files`, `search_code`,
//! `get_file_info`) and mutating operations (`write_file`, `edit_file`,
//! `delete_file`, `shell`) that the caller is expected to gate behind an
//! [`crate::approval::ApprovalPolicy`] before invoking.

use crate::errors::{Error, Result};
use crate::sandbox;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use walkdir::WalkDir;

const MAX_READ_FILE_BYTES: u64 = 100 * 1024;
const MAX_STDOUT_BYTES: usize = 5 * 1024;
const MAX_STDERR_BYTES: usize = 2 * 1024;

/// Tools that mutate the filesystem or run arbitrary commands — always
/// routed through the approval policy regardless of caller-supplied flags.
pub const MUTATING_TOOLS: &[&str] = &["write_file", "edit_file", "delete_file", "shell"];

#[derive(Debug, Clone, Serialize)]
pub struct ListFilesResult {
    pub files: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadFileResult {
    pub content: String,
    pub lines: usize,
    pub total_lines: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub file: String,
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFilesResult {
    pub matches: Vec<SearchMatch>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetFileInfoResult {
    pub exists: bool,
    pub size: Option<u64>,
    pub modified: Option<u64>,
    pub is_directory: Option<bool>,
    pub is_file: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteFileResult {
    pub success: bool,
    pub created: bool,
    pub lines_written: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditFileResult {
    pub success: bool,
    pub replacements: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteFileResult {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShellResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
}

fn glob_match(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    name == pattern
}

fn truncate_to_bytes(s: &mut String, cap: usize) {
    if s.len() <= cap {
        return;
    }
    let mut idx = cap;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    s.truncate(idx);
}

pub struct ToolExecutor {
    project_root: PathBuf,
}

impl ToolExecutor {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self { project_root: project_root.into() }
    }

    pub fn project_root(&self) -> &std::path::Path {
        &self.project_root
    }

    pub fn list_files(
        &self,
        path: &str,
        pattern: Option<&str>,
        recursive: bool,
        max_files: usize,
    ) -> Result<ListFilesResult> {
        let base = sandbox::resolve(&self.project_root, path)?;
        let max_depth = if recursive { usize::MAX } else { 1 };

        let walker = WalkDir::new(&base).max_depth(max_depth).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !project_index::fs_scan::should_ignore_dir(&entry.file_name().to_string_lossy())
        });

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if project_index::fs_scan::should_ignore_file(&name) {
                continue;
            }
            if let Some(pat) = pattern {
                if !glob_match(pat, &name) {
                    continue;
                }
            }
            let rel = entry
                .path()
                .strip_prefix(&self.project_root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            files.push(rel);
            if files.len() >= max_files {
                break;
            }
        }
        files.sort();
        let count = files.len();
        Ok(ListFilesResult { files, count })
    }

    pub fn read_file(
        &self,
        file_path: &str,
        max_lines: usize,
        start_line: Option<usize>,
        end_line: Option<usize>,
    ) -> Result<ReadFileResult> {
        let path = sandbox::resolve(&self.project_root, file_path)?;
        let meta = std::fs::metadata(&path)?;
        if meta.len() > MAX_READ_FILE_BYTES {
            return Err(Error::FileTooLarge(file_path.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        let all_lines: Vec<&str> = content.lines().collect();
        let total_lines = all_lines.len();

        let ranged = start_line.is_some() || end_line.is_some();
        let selected: Vec<&str> = if ranged {
            let start = start_line.unwrap_or(1).max(1);
            let end = end_line.unwrap_or(total_lines).min(total_lines);
            if start > end || start > total_lines {
                Vec::new()
            } else {
                all_lines[(start - 1)..end].to_vec()
            }
        } else {
            all_lines
        };

        let truncated = selected.len() > max_lines;
        let final_lines = if truncated { &selected[..max_lines] } else { &selected[..] };

        Ok(ReadFileResult {
            content: final_lines.join("\n"),
            lines: final_lines.len(),
            total_lines,
            truncated,
        })
    }

    pub fn search_files(
        &self,
        pattern: &str,
        path: &str,
        file_pattern: Option<&str>,
        max_results: usize,
    ) -> Result<SearchFilesResult> {
        let base = sandbox::resolve(&self.project_root, path)?;
        let regex = Regex::new(&format!("(?i){pattern}")).ok();
        let needle = pattern.to_lowercase();

        let walker = WalkDir::new(&base).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !project_index::fs_scan::should_ignore_dir(&entry.file_name().to_string_lossy())
        });

        let mut matches = Vec::new();
        'walk: for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if !project_index::fs_scan::is_supported_extension(entry.path()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if project_index::fs_scan::should_ignore_file(&name) {
                continue;
            }
            if let Some(fp) = file_pattern {
                if !glob_match(fp, &name) {
                    continue;
                }
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            let rel = entry
                .path()
                .strip_prefix(&self.project_root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            for (i, line) in content.lines().enumerate() {
                let hit = match &regex {
                    Some(re) => re.is_match(line),
                    None => line.to_lowercase().contains(&needle),
                };
                if hit {
                    matches.push(SearchMatch { file: rel.clone(), line: i + 1, content: line.to_string() });
                    if matches.len() >= max_results {
                        break 'walk;
                    }
                }
            }
        }
        let count = matches.len();
        Ok(SearchFilesResult { matches, count })
    }

    /// Requires a project previously built by `project-index`; loads it
    /// fresh from disk on every call rather than caching it on the executor.
    pub fn search_code(&self, query: &str, hops: usize, max_chunks: usize) -> Result<Value> {
        let indexer = project_index::ProjectIndexer::new(&self.project_root);
        if !indexer.exists() {
            return Err(Error::NotIndexed);
        }
        let loaded = indexer.load().map_err(|e| Error::Retrieval(e.to_string()))?;
        let retriever = retriever::Retriever::new(loaded.bm25, loaded.graph);
        let result = retriever.retrieve(query, hops, max_chunks, max_chunks * 2);
        Ok(result.to_context_dict())
    }

    pub fn get_file_info(&self, file_path: &str) -> Result<GetFileInfoResult> {
        let path = sandbox::resolve(&self.project_root, file_path)?;
        match std::fs::metadata(&path) {
            Ok(meta) => Ok(GetFileInfoResult {
                exists: true,
                size: Some(meta.len()),
                modified: meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs()),
                is_directory: Some(meta.is_dir()),
                is_file: Some(meta.is_file()),
            }),
            Err(_) => Ok(GetFileInfoResult { exists: false, size: None, modified: None, is_directory: None, is_file: None }),
        }
    }

    pub fn write_file(&self, file_path: &str, content: &str) -> Result<WriteFileResult> {
        let path = sandbox::resolve(&self.project_root, file_path)?;
        let created = !path.exists();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(WriteFileResult { success: true, created, lines_written: content.lines().count() })
    }

    /// Rejects an empty search term, a search/replace pair that's identical
    /// once trimmed (`Stagnation` — the edit would be a no-op), and a search
    /// term absent from the file (`SearchNotFound`, which asks the caller to
    /// re-read the file rather than guess at its current contents).
    pub fn edit_file(&self, file_path: &str, search: &str, replace: &str) -> Result<EditFileResult> {
        if search.is_empty() {
            return Err(Error::EmptySearch);
        }
        if search.trim() == replace.trim() {
            return Err(Error::Stagnation);
        }
        let path = sandbox::resolve(&self.project_root, file_path)?;
        let content = std::fs::read_to_string(&path)?;
        if !content.contains(search) {
            return Err(Error::SearchNotFound);
        }
        let replacements = content.matches(search).count();
        let updated = content.replace(search, replace);
        std::fs::write(&path, updated)?;
        Ok(EditFileResult { success: true, replacements })
    }

    pub fn delete_file(&self, file_path: &str) -> Result<DeleteFileResult> {
        let path = sandbox::resolve(&self.project_root, file_path)?;
        std::fs::remove_file(&path)?;
        Ok(DeleteFileResult { success: true })
    }

    pub async fn shell(&self, command: &str, cwd: Option<&str>, timeout_secs: u64) -> Result<ShellResult> {
        let work_dir = sandbox::resolve(&self.project_root, cwd.unwrap_or("."))?;
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(&work_dir);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let child = cmd.spawn()?;
        match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                truncate_to_bytes(&mut stdout, MAX_STDOUT_BYTES);
                truncate_to_bytes(&mut stderr, MAX_STDERR_BYTES);
                Ok(ShellResult { exit_code: output.status.code().unwrap_or(-1), stdout, stderr, error: None })
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Ok(ShellResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: String::new(),
                error: Some(format!("command timed out after {timeout_secs}s")),
            }),
        }
    }

    /// Dispatches a tool call by name with JSON arguments, collapsing any
    /// error into `{"error": ...}` rather than propagating it — tool calls
    /// never abort the task that issued them.
    pub async fn execute(&self, tool: &str, args: &Value) -> Value {
        match self.dispatch(tool, args).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool, error = %e, "tool call failed");
                let mut obj = json!({ "error": e.to_string() });
                if matches!(e, Error::Stagnation) {
                    obj["stagnation"] = json!(true);
                }
                obj
            }
        }
    }

    async fn dispatch(&self, tool: &str, args: &Value) -> Result<Value> {
        let str_arg = |key: &str| args.get(key).and_then(Value::as_str);
        let u64_arg = |key: &str| args.get(key).and_then(Value::as_u64);

        match tool {
            "list_files" => {
                let path = str_arg("path").unwrap_or(".");
                let recursive = args.get("recursive").and_then(Value::as_bool).unwrap_or(true);
                let max_files = u64_arg("max_files").unwrap_or(500) as usize;
                Ok(serde_json::to_value(self.list_files(path, str_arg("pattern"), recursive, max_files)?)?)
            }
            "read_file" => {
                let file_path = str_arg("file_path").unwrap_or_default();
                let max_lines = u64_arg("max_lines").unwrap_or(500) as usize;
                let start_line = u64_arg("start_line").map(|v| v as usize);
                let end_line = u64_arg("end_line").map(|v| v as usize);
                Ok(serde_json::to_value(self.read_file(file_path, max_lines, start_line, end_line)?)?)
            }
            "search_files" => {
                let pattern = str_arg("pattern").unwrap_or_default();
                let path = str_arg("path").unwrap_or(".");
                let max_results = u64_arg("max_results").unwrap_or(100) as usize;
                Ok(serde_json::to_value(self.search_files(pattern, path, str_arg("file_pattern"), max_results)?)?)
            }
            "search_code" => {
                let query = str_arg("query").unwrap_or_default();
                let hops = u64_arg("hops").unwrap_or(1) as usize;
                let max_chunks = u64_arg("max_chunks").unwrap_or(10) as usize;
                self.search_code(query, hops, max_chunks)
            }
            "get_file_info" => {
                let file_path = str_arg("file_path").unwrap_or_default();
                Ok(serde_json::to_value(self.get_file_info(file_path)?)?)
            }
            "write_file" => {
                let file_path = str_arg("file_path").unwrap_or_default();
                let content = str_arg("content").unwrap_or_default();
                Ok(serde_json::to_value(self.write_file(file_path, content)?)?)
            }
            "edit_file" => {
                let file_path = str_arg("file_path").unwrap_or_default();
                let search = str_arg("search").unwrap_or_default();
                let replace = str_arg("replace").unwrap_or_default();
                Ok(serde_json::to_value(self.edit_file(file_path, search, replace)?)?)
            }
            "delete_file" => {
                let file_path = str_arg("file_path").unwrap_or_default();
                Ok(serde_json::to_value(self.delete_file(file_path)?)?)
            }
            "shell" => {
                let command = str_arg("command").unwrap_or_default();
                let timeout_secs = u64_arg("timeout").unwrap_or(60);
                Ok(serde_json::to_value(self.shell(command, str_arg("cwd"), timeout_secs).await?)?)
            }
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, ToolExecutor) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.py"), "def f(): pass\n").unwrap();
        let executor = ToolExecutor::new(dir.path());
        (dir, executor)
    }

    #[test]
    fn list_files_respects_max_files_and_ignores_dot_git() {
        let (dir, executor) = project();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();

        let result = executor.list_files(".", None, true, 100).unwrap();
        assert_eq!(result.count, 2);
        assert!(result.files.iter().all(|f| !f.starts_with(".git")));
    }

    #[test]
    fn read_file_rejects_escaping_path() {
        let (_dir, executor) = project();
        let err = executor.read_file("../outside.py", 500, None, None).unwrap_err();
        assert!(matches!(err, Error::PathEscape(_)));
    }

    #[test]
    fn read_file_honors_line_range() {
        let (dir, executor) = project();
        std::fs::write(dir.path().join("multi.py"), "a\nb\nc\nd\n").unwrap();
        let result = executor.read_file("multi.py", 500, Some(2), Some(3)).unwrap();
        assert_eq!(result.content, "b\nc");
        assert_eq!(result.total_lines, 4);
    }

    #[test]
    fn search_files_falls_back_to_substring_on_bad_regex() {
        let (_dir, executor) = project();
        let result = executor.search_files("print(", ".", None, 10).unwrap();
        assert_eq!(result.count, 1);
        assert!(result.matches[0].file.ends_with("main.py"));
    }

    #[test]
    fn write_then_edit_then_delete_round_trip() {
        let (_dir, executor) = project();
        executor.write_file("new.txt", "hello world").unwrap();
        let edit = executor.edit_file("new.txt", "hello", "goodbye").unwrap();
        assert_eq!(edit.replacements, 1);
        assert_eq!(std::fs::read_to_string(executor.project_root().join("new.txt")).unwrap(), "goodbye world");
        executor.delete_file("new.txt").unwrap();
        assert!(!executor.project_root().join("new.txt").exists());
    }

    #[test]
    fn edit_file_rejects_noop_and_missing_search() {
        let (_dir, executor) = project();
        executor.write_file("f.txt", "abc").unwrap();
        assert!(matches!(executor.edit_file("f.txt", "abc", "abc"), Err(Error::Stagnation)));
        assert!(matches!(executor.edit_file("f.txt", "zzz", "yyy"), Err(Error::SearchNotFound)));
    }

    #[test]
    fn search_code_without_an_index_returns_not_indexed() {
        let (_dir, executor) = project();
        assert!(matches!(executor.search_code("anything", 1, 10), Err(Error::NotIndexed)));
    }

    #[tokio::test]
    async fn shell_runs_and_captures_stdout() {
        let (_dir, executor) = project();
        let result = executor.shell("echo hi", None, 5).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hi");
    }

    #[tokio::test]
    async fn execute_collapses_errors_into_a_value() {
        let (_dir, executor) = project();
        let out = executor.execute("read_file", &json!({"file_path": "../x"})).await;
        assert!(out.get("error").is_some());
    }
}
