//! Routes a `tool_call` event to the local [`ToolExecutor`], gates it
//! through the [`ApprovalPolicy`] when the server asked for approval, and
//! posts the result back to the callback endpoint.

use crate::client::{StreamClient, ToolCallPayload};
use crate::errors::Result;
use serde_json::json;
use tool_executor::{ApprovalDecision, ApprovalPolicy, ToolExecutor};

pub async fn handle_tool_call(
    client: &StreamClient,
    task_id: &str,
    executor: &ToolExecutor,
    approval: &dyn ApprovalPolicy,
    call: &ToolCallPayload,
) -> Result<()> {
    let result = if approval.decide(&call.tool, call.require_approval, &call.description) == ApprovalDecision::Reject {
        json!({ "skipped": true, "message": "User rejected operation" })
    } else {
        executor.execute(&call.tool, &call.args).await
    };

    client.callback(task_id, &call.call_id, result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json as j;
    use tool_executor::AutoApprovePolicy;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct AlwaysReject;
    impl ApprovalPolicy for AlwaysReject {
        fn decide(&self, _tool: &str, _require_approval: bool, _description: &str) -> ApprovalDecision {
            ApprovalDecision::Reject
        }
    }

    #[tokio::test]
    async fn approved_call_runs_the_tool_and_posts_its_result() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let executor = ToolExecutor::new(dir.path());

        Mock::given(method("POST"))
            .and(path("/v3/callback"))
            .and(body_partial_json(j!({"task_id": "t1", "call_id": "c1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = StreamClient::new(server.uri(), "tok", "key");
        let call = ToolCallPayload {
            call_id: "c1".to_string(),
            tool: "read_file".to_string(),
            args: j!({"file_path": "a.txt"}),
            require_approval: false,
            description: "read a.txt".to_string(),
        };

        handle_tool_call(&client, "t1", &executor, &AutoApprovePolicy, &call).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_call_never_runs_the_tool_and_posts_skipped() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let executor = ToolExecutor::new(dir.path());

        Mock::given(method("POST"))
            .and(path("/v3/callback"))
            .and(body_partial_json(j!({
                "task_id": "t1",
                "call_id": "c2",
                "result": {"skipped": true, "message": "User rejected operation"},
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = StreamClient::new(server.uri(), "tok", "key");
        let call = ToolCallPayload {
            call_id: "c2".to_string(),
            tool: "delete_file".to_string(),
            args: j!({"file_path": "a.txt"}),
            require_approval: true,
            description: "delete a.txt".to_string(),
        };

        handle_tool_call(&client, "t1", &executor, &AlwaysReject, &call).await.unwrap();
    }
}
