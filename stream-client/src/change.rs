//! Applies a `change` event's file-change directive via the tool layer:
//! `create` becomes a `write_file` call, `edit` becomes an `edit_file` call.

use crate::client::{ChangeDirective, ChangeKind};
use crate::errors::Result;
use serde_json::Value;
use tool_executor::ToolExecutor;

pub async fn apply_change(executor: &ToolExecutor, directive: &ChangeDirective) -> Result<Value> {
    let value = match directive.kind {
        ChangeKind::Create => {
            let content = directive.content.as_deref().unwrap_or_default();
            serde_json::to_value(executor.write_file(&directive.path, content)?)?
        }
        ChangeKind::Edit => {
            let search = directive.search.as_deref().unwrap_or_default();
            let replace = directive.replace.as_deref().unwrap_or_default();
            serde_json::to_value(executor.edit_file(&directive.path, search, replace)?)?
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_directive_writes_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ToolExecutor::new(dir.path());
        let directive = ChangeDirective {
            kind: ChangeKind::Create,
            path: "new.txt".to_string(),
            content: Some("hello".to_string()),
            search: None,
            replace: None,
        };
        apply_change(&executor, &directive).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("new.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn edit_directive_replaces_matched_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        let executor = ToolExecutor::new(dir.path());
        let directive = ChangeDirective {
            kind: ChangeKind::Edit,
            path: "a.txt".to_string(),
            content: None,
            search: Some("world".to_string()),
            replace: Some("tarang".to_string()),
        };
        apply_change(&executor, &directive).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hello tarang");
    }
}
