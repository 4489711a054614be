//! Dagster-style GraphQL transport over reqwest.

use super::parser;
use super::RemoteClient;
use crate::context::Context;
use crate::error::ErrorKind;
use crate::model::{Pipeline, Run, RunDetail};
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result, WrapErr};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const RUN_FIELDS: &str = "runId jobName status startTime endTime";

fn runs_query() -> String {
    format!(
        "query RunsQuery($limit: Int, $filter: RunsFilter) {{
  runsOrError(limit: $limit, filter: $filter) {{
    __typename
    ... on Runs {{ results {{ {RUN_FIELDS} }} }}
    ... on InvalidPipelineRunsFilterError {{ message }}
    ... on PythonError {{ message }}
  }}
}}"
    )
}

fn run_query() -> String {
    format!(
        "query RunQuery($runId: ID!) {{
  runOrError(runId: $runId) {{
    __typename
    ... on Run {{ {RUN_FIELDS} mode runConfigYaml tags {{ key value }} }}
    ... on RunNotFoundError {{ message }}
    ... on PythonError {{ message }}
  }}
}}"
    )
}

const PIPELINES_QUERY: &str = "query PipelinesQuery {
  repositoriesOrError {
    __typename
    ... on RepositoryConnection {
      nodes {
        name
        location { name }
        pipelines { name isAssetJob runs(limit: 1) { status } }
      }
    }
    ... on PythonError { message }
  }
}";

pub struct GraphqlClient {
    http: Client,
}

impl GraphqlClient {
    /// `timeout` bounds a whole request; the scheduler applies its own fetch timeout on top.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("plw/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    async fn post(&self, url: &str, query: &str, variables: Value) -> Result<String> {
        tracing::debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| eyre!("request to {url} failed: {e}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| eyre!("reading response from {url} failed: {e}"))?;
        check_status(url, status, body)
    }
}

/// A non-2xx reply is only worth parsing when it carries a GraphQL envelope
/// (servers report query errors that way). Anything else, such as a proxy's
/// HTML 502 page, is reported by its status.
fn check_status(url: &str, status: StatusCode, body: String) -> Result<String> {
    if status.is_success() {
        return Ok(body);
    }
    let is_graphql = serde_json::from_str::<Value>(&body)
        .is_ok_and(|v| v.get("data").is_some() || v.get("errors").is_some());
    if is_graphql {
        Ok(body)
    } else {
        Err(eyre!("{url} returned HTTP {status}"))
    }
}

fn network(e: &color_eyre::eyre::Report) -> ErrorKind {
    ErrorKind::Network(e.to_string())
}

#[async_trait]
impl RemoteClient for GraphqlClient {
    async fn fetch_runs(&self, endpoint: &Context, pipeline: Option<&str>) -> Result<Vec<Run>, ErrorKind> {
        let filter = pipeline.map(|name| json!({ "pipelineName": name }));
        let variables = json!({ "limit": endpoint.runs_limit, "filter": filter });
        let body = self
            .post(&endpoint.url, &runs_query(), variables)
            .await
            .map_err(|e| network(&e))?;
        parser::parse_runs(&body).map_err(|e| network(&e))
    }

    async fn fetch_pipelines(&self, endpoint: &Context) -> Result<Vec<Pipeline>, ErrorKind> {
        let body = self
            .post(&endpoint.url, PIPELINES_QUERY, json!({}))
            .await
            .map_err(|e| network(&e))?;
        parser::parse_pipelines(&body).map_err(|e| network(&e))
    }

    async fn fetch_run_detail(&self, endpoint: &Context, run_id: &str) -> Result<RunDetail, ErrorKind> {
        let body = self
            .post(&endpoint.url, &run_query(), json!({ "runId": run_id }))
            .await
            .map_err(|e| network(&e))?;
        parser::parse_run_detail(&body).map_err(|e| network(&e))
    }
}
