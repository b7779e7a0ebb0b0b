//! The JSON payload a run is invoked with.

use gramflow_core_types::Account;
use gramflow_runner::RunOptions;
use gramflow_workflow::WorkflowGraph;
use serde::{Deserialize, Serialize};

/// One account entry in the payload's filter list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSpec {
    pub username: String,
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Everything the front-end hands the subprocess: the workflow graph, the
/// accounts to run it for, and option overrides.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunPayload {
    pub workflow: WorkflowGraph,
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    #[serde(default)]
    pub options: Option<RunOptions>,
}

impl RunPayload {
    pub fn from_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|spec| {
                let mut account = Account::new(spec.username.clone());
                account.proxy = spec.proxy.clone();
                account
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gramflow_workflow::NodeKind;

    #[test]
    fn parses_full_payload() {
        let payload = RunPayload::from_str(
            r#"{
                "workflow": {
                    "nodes": [
                        {"id": "n1", "type": "start"},
                        {"id": "n2", "type": "activity",
                         "data": {"activity": "scroll_feed", "config": {"min_scrolls": 3}}}
                    ],
                    "edges": [{"source": "n1", "target": "n2"}]
                },
                "accounts": [
                    {"username": "alpha"},
                    {"username": "beta", "proxy": "user:pass@10.0.0.1:8080"}
                ],
                "options": {"parallelism": 3}
            }"#,
        )
        .unwrap();

        assert_eq!(payload.workflow.nodes[0].kind, NodeKind::Start);
        let accounts = payload.accounts();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].proxy.as_deref(), Some("user:pass@10.0.0.1:8080"));
        assert_eq!(payload.options.unwrap().parallelism, 3);
    }

    #[test]
    fn accounts_and_options_are_optional() {
        let payload = RunPayload::from_str(
            r#"{"workflow": {"nodes": [{"id": "n1", "type": "start"}], "edges": []}}"#,
        )
        .unwrap();
        assert!(payload.accounts.is_empty());
        assert!(payload.options.is_none());
    }
}
