//! Resolved pipeline settings
//!
//! Every setting is resolved once at startup, in priority order:
//! command-line flag → environment variable → TOML file → built-in default.
//! The result is an immutable [`PipelineSettings`] passed to the components.

use crate::features::{MissingFieldPolicy, StageSchema};
use crate::io::source::{RecordFilter, DEFAULT_EXCLUDED_AIRLINES};
use crate::io::DEFAULT_TOPIC;
use crate::join::{JoinConfig, TieBreak, DEFAULT_TOLERANCE_MINUTES};
use crate::models::Stage;
use crate::services::scoring_client::{
    ScoringEndpoints, DEFAULT_BASE_URL, DEFAULT_STAGE1_PATH, DEFAULT_STAGE2_PATH,
    DEFAULT_TIMEOUT_SECS,
};
use crate::services::{DEFAULT_CONCURRENCY, DEFAULT_WINDOW_SIZE};
use crate::utils::retry::{BackoffSchedule, RetryPolicy};
use flybeta_common::config::TomlConfig;
use flybeta_common::time::millis_to_duration;
use flybeta_common::{Error, Result};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const SERVICE_NAME: &str = "flybeta-predict";
pub const ENV_CONFIG: &str = "FLYBETA_CONFIG";
pub const ENV_SCORING_URL: &str = "FLYBETA_SCORING_URL";
pub const ENV_CONCURRENCY: &str = "FLYBETA_CONCURRENCY";
pub const ENV_WINDOW_SIZE: &str = "FLYBETA_WINDOW_SIZE";

pub const DEFAULT_SINK_PATH: &str = "predictions.jsonl";
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 1500;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub flights_path: Option<PathBuf>,
    pub weather_path: Option<PathBuf>,
    pub sink_path: Option<PathBuf>,
    pub scoring_url: Option<String>,
    pub concurrency: Option<usize>,
    pub window_size: Option<usize>,
}

/// Everything the pipeline needs, fully resolved and validated
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub flights_path: PathBuf,
    pub weather_path: PathBuf,
    pub sink_path: PathBuf,
    pub topic: String,
    pub filter: RecordFilter,
    pub join: JoinConfig,
    pub endpoints: ScoringEndpoints,
    pub retry: RetryPolicy,
    pub concurrency: usize,
    pub window_size: usize,
    pub missing_field_policy: MissingFieldPolicy,
    pub stage1_schema: StageSchema,
    pub stage2_schema: StageSchema,
}

impl PipelineSettings {
    pub fn resolve(toml: &TomlConfig, cli: &CliOverrides) -> Result<Self> {
        let flights_path = cli
            .flights_path
            .clone()
            .or_else(|| toml.source.flights_path.clone())
            .ok_or_else(|| {
                Error::Config(
                    "Flights input not configured (--flights or [source] flights_path)".to_string(),
                )
            })?;
        let weather_path = cli
            .weather_path
            .clone()
            .or_else(|| toml.source.weather_path.clone())
            .ok_or_else(|| {
                Error::Config(
                    "Weather input not configured (--weather or [source] weather_path)".to_string(),
                )
            })?;
        let sink_path = cli
            .sink_path
            .clone()
            .or_else(|| toml.sink.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SINK_PATH));
        let topic = toml
            .sink
            .topic
            .clone()
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        let filter = RecordFilter::new(
            toml.source.exclude_airlines.clone().unwrap_or_else(|| {
                DEFAULT_EXCLUDED_AIRLINES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            toml.source.allowed_airports.clone(),
        );

        let join = resolve_join(toml)?;
        let endpoints = resolve_endpoints(toml, cli)?;
        let retry = resolve_retry(toml)?;

        let concurrency = resolve_setting(
            "concurrency",
            cli.concurrency,
            ENV_CONCURRENCY,
            toml.pipeline.concurrency,
            DEFAULT_CONCURRENCY,
        )?;
        if concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }

        let window_size = resolve_setting(
            "window_size",
            cli.window_size,
            ENV_WINDOW_SIZE,
            toml.pipeline.window_size,
            DEFAULT_WINDOW_SIZE,
        )?;
        if window_size == 0 {
            return Err(Error::Config("window_size must be at least 1".to_string()));
        }

        let missing_field_policy = match &toml.features.missing_field_policy {
            Some(raw) => raw.parse::<MissingFieldPolicy>().map_err(Error::Config)?,
            None => MissingFieldPolicy::default(),
        };
        let stage1_schema = match &toml.features.stage1 {
            Some(entries) => StageSchema::from_entries(Stage::One, entries)?,
            None => StageSchema::default_for(Stage::One),
        };
        let stage2_schema = match &toml.features.stage2 {
            Some(entries) => StageSchema::from_entries(Stage::Two, entries)?,
            None => StageSchema::default_for(Stage::Two),
        };

        let settings = Self {
            flights_path,
            weather_path,
            sink_path,
            topic,
            filter,
            join,
            endpoints,
            retry,
            concurrency,
            window_size,
            missing_field_policy,
            stage1_schema,
            stage2_schema,
        };

        info!(
            scoring_url = %settings.endpoints.base_url,
            concurrency = settings.concurrency,
            window_size = settings.window_size,
            max_retries = settings.retry.max_retries,
            tolerance_minutes = settings.join.tolerance.num_minutes(),
            "Pipeline settings resolved"
        );
        Ok(settings)
    }
}

/// CLI → ENV → TOML → default for one value
fn resolve_setting<T>(
    name: &str,
    cli: Option<T>,
    env_var: &str,
    toml: Option<T>,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(value) = cli {
        debug!(setting = name, "Loaded from command line");
        return Ok(value);
    }

    if let Ok(raw) = std::env::var(env_var) {
        if !raw.trim().is_empty() {
            let value = raw.trim().parse::<T>().map_err(|e| {
                Error::Config(format!("Invalid {} value '{}': {}", env_var, raw, e))
            })?;
            debug!(setting = name, env_var, "Loaded from environment variable");
            return Ok(value);
        }
    }

    if let Some(value) = toml {
        debug!(setting = name, "Loaded from TOML config");
        return Ok(value);
    }

    Ok(default)
}

fn resolve_join(toml: &TomlConfig) -> Result<JoinConfig> {
    let minutes = toml
        .join
        .tolerance_minutes
        .unwrap_or(DEFAULT_TOLERANCE_MINUTES);
    if minutes < 0 {
        return Err(Error::Config(format!(
            "tolerance_minutes must not be negative (got {})",
            minutes
        )));
    }

    let tie_break = match &toml.join.tie_break {
        Some(raw) => raw.parse::<TieBreak>().map_err(Error::Config)?,
        None => TieBreak::default(),
    };

    let tolerance = chrono::Duration::try_minutes(minutes).ok_or_else(|| {
        Error::Config(format!("tolerance_minutes out of range (got {})", minutes))
    })?;

    Ok(JoinConfig {
        tolerance,
        tie_break,
    })
}

fn resolve_endpoints(toml: &TomlConfig, cli: &CliOverrides) -> Result<ScoringEndpoints> {
    let base_url = resolve_setting(
        "scoring_url",
        cli.scoring_url.clone(),
        ENV_SCORING_URL,
        toml.scoring.base_url.clone(),
        DEFAULT_BASE_URL.to_string(),
    )?;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Scoring URL must start with http:// or https:// (got '{}')",
            base_url
        )));
    }

    let timeout_secs = toml.scoring.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(Error::Config("timeout_secs must be at least 1".to_string()));
    }

    Ok(ScoringEndpoints {
        base_url,
        stage1_path: toml
            .scoring
            .stage1_path
            .clone()
            .unwrap_or_else(|| DEFAULT_STAGE1_PATH.to_string()),
        stage2_path: toml
            .scoring
            .stage2_path
            .clone()
            .unwrap_or_else(|| DEFAULT_STAGE2_PATH.to_string()),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn resolve_retry(toml: &TomlConfig) -> Result<RetryPolicy> {
    let section = &toml.retry;
    let delay = millis_to_duration(section.delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS));

    let schedule = match section.schedule.as_deref().map(str::trim) {
        None | Some("fixed") => BackoffSchedule::Fixed,
        Some("exponential") => {
            let multiplier = section.multiplier.unwrap_or(DEFAULT_BACKOFF_MULTIPLIER);
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(Error::Config(format!(
                    "retry multiplier must be a finite number >= 1.0 (got {})",
                    multiplier
                )));
            }
            BackoffSchedule::Exponential {
                multiplier,
                max_delay: millis_to_duration(section.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS)),
            }
        }
        Some(other) => {
            return Err(Error::Config(format!(
                "unknown retry schedule '{}' (expected fixed or exponential)",
                other
            )))
        }
    };

    Ok(RetryPolicy {
        max_retries: section.max_retries.unwrap_or(DEFAULT_RETRIES),
        delay,
        schedule,
    })
}
