//! Read-only access to the remote orchestration service.
//!
//! Every call takes the endpoint explicitly. A poll timer captures its endpoint at
//! start, so a fetch already running when the user switches context still talks to
//! the old server, and its result is discarded by the cache.

pub mod graphql;
pub mod parser;

use crate::context::Context;
use crate::error::ErrorKind;
use crate::model::{Payload, Pipeline, PipelineDetail, Run, RunDetail};
use crate::view::View;
use async_trait::async_trait;

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Most recent runs, newest first, optionally narrowed to one pipeline.
    async fn fetch_runs(&self, endpoint: &Context, pipeline: Option<&str>) -> Result<Vec<Run>, ErrorKind>;
    async fn fetch_pipelines(&self, endpoint: &Context) -> Result<Vec<Pipeline>, ErrorKind>;
    async fn fetch_run_detail(&self, endpoint: &Context, run_id: &str) -> Result<RunDetail, ErrorKind>;

    async fn fetch_pipeline_detail(
        &self,
        endpoint: &Context,
        name: &str,
    ) -> Result<PipelineDetail, ErrorKind> {
        let runs = self.fetch_runs(endpoint, Some(name)).await?;
        Ok(PipelineDetail {
            name: name.to_string(),
            runs,
        })
    }
}

/// What a view needs from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Runs,
    Pipelines,
    RunDetail(String),
    PipelineDetail(String),
}

impl FetchRequest {
    /// `None` for views without a remote resource.
    pub fn for_view(view: &View) -> Option<Self> {
        match view {
            View::RunsList => Some(Self::Runs),
            View::PipelinesList => Some(Self::Pipelines),
            View::RunDetail(id) => Some(Self::RunDetail(id.clone())),
            View::PipelineDetail(name) => Some(Self::PipelineDetail(name.clone())),
            View::ContextManager | View::CommandOverlay => None,
        }
    }
}

/// Run one request. Every list is cut to the endpoint's runs limit, since the
/// server may ignore it (and the pipelines query takes no limit at all).
pub async fn fetch(
    client: &dyn RemoteClient,
    endpoint: &Context,
    request: &FetchRequest,
) -> Result<Payload, ErrorKind> {
    let limit = endpoint.runs_limit;
    match request {
        FetchRequest::Runs => {
            let mut runs = client.fetch_runs(endpoint, None).await?;
            runs.truncate(limit);
            Ok(Payload::Runs(runs))
        }
        FetchRequest::Pipelines => {
            let mut pipelines = client.fetch_pipelines(endpoint).await?;
            pipelines.truncate(limit);
            Ok(Payload::Pipelines(pipelines))
        }
        FetchRequest::RunDetail(id) => client.fetch_run_detail(endpoint, id).await.map(Payload::RunDetail),
        FetchRequest::PipelineDetail(name) => {
            let mut detail = client.fetch_pipeline_detail(endpoint, name).await?;
            detail.runs.truncate(limit);
            Ok(Payload::PipelineDetail(detail))
        }
    }
}
