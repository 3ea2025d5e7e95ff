pub mod align;
pub mod config;
pub mod panoramic;
pub mod raw;
pub mod scan;
pub mod stack;
pub mod timelapse;
pub mod tools;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use photonic_core::config::PhotonicConfig;
use photonic_core::pipeline::{
    wait_for_result, Job, JobId, JobKind, JobResult, JobType, MemoryJobStore, OptionMap, OptionValue,
    Pipeline, Router,
};

use crate::summary::print_job_result;

/// Read `path` as TOML, or use the defaults.
pub fn load_config(path: Option<&Path>) -> Result<PhotonicConfig> {
    let Some(path) = path else {
        return Ok(PhotonicConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
}

/// Builder for the loose option map handed to `JobKind::from_options`.
#[derive(Default)]
pub struct Options(OptionMap);

impl Options {
    pub fn text(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), OptionValue::Text(v.to_string()));
        }
        self
    }

    pub fn number(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), OptionValue::Number(v));
        }
        self
    }

    /// Only set flags are recorded.
    pub fn flag(&mut self, key: &str, value: bool) -> &mut Self {
        if value {
            self.0.insert(key.to_string(), OptionValue::Bool(true));
        }
        self
    }

    pub fn list(&mut self, key: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.0.insert(key.to_string(), OptionValue::List(values.to_vec()));
        }
        self
    }

    pub fn map(&self) -> &OptionMap {
        &self.0
    }
}

/// Submit one job through a fresh pipeline and wait for its result.
///
/// Prints the result summary and fails when the job failed.
pub fn run_job(
    config: &PhotonicConfig,
    job_type: JobType,
    options: &Options,
    input: &Path,
    output: &Path,
) -> Result<JobResult> {
    let kind = JobKind::from_options(job_type, options.map()).context("Invalid job options")?;
    let router = Router::new(config.clone()).context("Failed to set up processors")?;
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = Pipeline::new(&config.processing, Arc::new(router), Some(store))
        .context("Failed to start pipeline")?;

    let (stream, unsubscribe) = pipeline.subscribe();
    let job = Job::new(JobId::generate(), kind, input, output);
    let id = job.id.clone();
    pipeline.submit(job)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("{job_type} {}", input.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = wait_for_result(&stream, &id, None);
    spinner.finish_and_clear();
    unsubscribe.unsubscribe();
    pipeline.stop();

    let result = result?;
    print_job_result(&result);
    if let Some(e) = &result.error {
        bail!("{job_type} job {id} failed: {e}");
    }
    Ok(result)
}
