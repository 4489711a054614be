use crate::model::{Pipeline, Run, RunDetail, RunStatus};
use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Deserialize)]
struct Response<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTag {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRun {
    run_id: String,
    job_name: String,
    status: RunStatus,
    start_time: Option<f64>,
    end_time: Option<f64>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    tags: Vec<WireTag>,
    #[serde(default)]
    run_config_yaml: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum RunsOrError {
    Runs { results: Vec<WireRun> },
    InvalidPipelineRunsFilterError { message: String },
    PythonError { message: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunsData {
    runs_or_error: RunsOrError,
}

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum RunOrError {
    Run(WireRun),
    RunNotFoundError { message: String },
    PythonError { message: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    run_or_error: RunOrError,
}

#[derive(Deserialize)]
struct WireLocation {
    name: String,
}

#[derive(Deserialize)]
struct WireLastRun {
    status: RunStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePipeline {
    name: String,
    #[serde(default)]
    is_asset_job: bool,
    #[serde(default)]
    runs: Vec<WireLastRun>,
}

#[derive(Deserialize)]
struct WireRepository {
    name: String,
    location: WireLocation,
    #[serde(default)]
    pipelines: Vec<WirePipeline>,
}

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum RepositoriesOrError {
    RepositoryConnection { nodes: Vec<WireRepository> },
    PythonError { message: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoriesData {
    repositories_or_error: RepositoriesOrError,
}

/// Epoch seconds (float) as sent by the server.
fn epoch_to_utc(secs: Option<f64>) -> Option<DateTime<Utc>> {
    let secs = secs.filter(|s| s.is_finite())?;
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

impl From<WireRun> for Run {
    fn from(w: WireRun) -> Self {
        Self {
            run_id: w.run_id,
            pipeline_name: w.job_name,
            status: w.status,
            started_at: epoch_to_utc(w.start_time),
            ended_at: epoch_to_utc(w.end_time),
        }
    }
}

fn envelope<T: DeserializeOwned>(json: &str) -> Result<T> {
    let resp: Response<T> = serde_json::from_str(json)?;
    if let Some(first) = resp.errors.as_ref().and_then(|e| e.first()) {
        return Err(eyre!("{}", first.message));
    }
    resp.data.ok_or_else(|| eyre!("response carried no data"))
}

pub fn parse_runs(json: &str) -> Result<Vec<Run>> {
    match envelope::<RunsData>(json)?.runs_or_error {
        RunsOrError::Runs { results } => Ok(results.into_iter().map(Run::from).collect()),
        RunsOrError::InvalidPipelineRunsFilterError { message }
        | RunsOrError::PythonError { message } => Err(eyre!(message)),
    }
}

pub fn parse_run_detail(json: &str) -> Result<RunDetail> {
    match envelope::<RunData>(json)?.run_or_error {
        RunOrError::Run(mut wire) => {
            let tags = std::mem::take(&mut wire.tags)
                .into_iter()
                .map(|t| (t.key, t.value))
                .collect();
            let mode = wire.mode.take();
            let run_config_yaml = wire.run_config_yaml.take().unwrap_or_default();
            Ok(RunDetail {
                run: Run::from(wire),
                mode,
                tags,
                run_config_yaml,
            })
        }
        RunOrError::RunNotFoundError { message } | RunOrError::PythonError { message } => {
            Err(eyre!(message))
        }
    }
}

/// Asset jobs are skipped: they are an implementation detail of asset materialization.
pub fn parse_pipelines(json: &str) -> Result<Vec<Pipeline>> {
    match envelope::<RepositoriesData>(json)?.repositories_or_error {
        RepositoriesOrError::RepositoryConnection { nodes } => Ok(nodes
            .into_iter()
            .flat_map(|repo| {
                let repository = repo.name;
                let location = repo.location.name;
                repo.pipelines
                    .into_iter()
                    .filter(|p| !p.is_asset_job)
                    .map(move |p| Pipeline {
                        name: p.name,
                        repository: repository.clone(),
                        location: location.clone(),
                        last_run_status: p.runs.first().map(|r| r.status),
                    })
            })
            .collect()),
        RepositoriesOrError::PythonError { message } => Err(eyre!(message)),
    }
}
