//! The `index_repo` command.

use std::sync::Arc;

use aptdex_registry::{RepositoryIndexer, RepositorySpec};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    command::{timestamp, Command, Responder},
    error::{Result, ServerError},
};

pub const STATUS_REPOSITORY_COMPLETED: &str = "Repository Completed";

const MIN_RANKING: f64 = 1.0;
const MAX_RANKING: f64 = 5.0;

/// One element of an `index_repo` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryRequest {
    pub uri: String,
    pub slug: String,
    pub ranking: f64,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub dist: Option<String>,
    #[serde(default)]
    pub suite: Option<String>,
}

impl RepositoryRequest {
    pub fn to_spec(&self) -> RepositorySpec {
        RepositorySpec {
            base_url: self.uri.clone(),
            dist: self.dist.clone(),
            suite: self.suite.clone(),
        }
    }

    fn repository_url(&self) -> Value {
        match (&self.dist, &self.suite) {
            (Some(dist), Some(suite)) => {
                json!({
                    "uri": self.uri,
                    "dist": dist,
                    "suite": suite,
                })
            }
            _ => Value::String(self.uri.clone()),
        }
    }
}

/// Parses and checks an `index_repo` payload.
pub fn parse_payload(payload: &Value) -> Result<Vec<RepositoryRequest>> {
    let items = payload.as_array().ok_or_else(|| {
        ServerError::Validation("payload must be an array of repositories".to_string())
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let request = RepositoryRequest::deserialize(item)
                .map_err(|err| ServerError::Validation(format!("repository {i}: {err}")))?;

            if !(MIN_RANKING..=MAX_RANKING).contains(&request.ranking) {
                return Err(ServerError::Validation(format!(
                    "repository {i}: ranking {} is outside {MIN_RANKING}..={MAX_RANKING}",
                    request.ranking
                )));
            }
            Ok(request)
        })
        .collect()
}

/// Indexes each repository in the payload, replying once per repository.
pub struct IndexRepoCommand {
    indexer: Arc<RepositoryIndexer>,
}

impl IndexRepoCommand {
    pub fn new(indexer: Arc<RepositoryIndexer>) -> Self {
        Self {
            indexer,
        }
    }
}

impl Command for IndexRepoCommand {
    fn name(&self) -> &'static str {
        "index_repo"
    }

    fn validate(&self, payload: &Value) -> Result<()> {
        parse_payload(payload).map(|_| ())
    }

    fn execute(&self, payload: Value, responder: &Responder) -> Result<()> {
        let requests = parse_payload(&payload)?;
        debug!(repositories = requests.len(), "index_repo");

        for request in requests {
            let outcome = self.indexer.index(&request.to_spec());
            let package_count = outcome.record_count();
            info!(
                slug = %request.slug,
                uri = %request.uri,
                package_count = package_count,
                "repository completed"
            );

            responder.send(json!({
                "status": STATUS_REPOSITORY_COMPLETED,
                "date": timestamp(),
                "package_count": package_count,
                "repository_url": request.repository_url(),
            }));
        }
        Ok(())
    }
}
