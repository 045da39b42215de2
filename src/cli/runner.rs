//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::Config;
use crate::engine::{FindOptions, MemoryEngine, QueryEngine};
use crate::error::{Result, ResultExt};
use crate::http::ParseClient;
use crate::pagination::{QueryStitcher, StitchLimits, StitchOptions, StitchOutcome};
use crate::query::Query;
use crate::types::{JsonObject, JsonValue};
use futures::future::try_join_all;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                classes,
                where_json,
                super_stitch,
                use_master_key,
                session_token,
                input,
            } => {
                let constraints = parse_where(where_json.as_deref())?;
                let config = self.load_config()?;
                let options = build_options(
                    *super_stitch || config.stitch.super_stitch,
                    *use_master_key,
                    session_token.as_deref(),
                );
                self.fetch(&config, classes, &constraints, &options, input.as_deref())
                    .await
            }
            Commands::Check { class } => self.check(class.as_deref()).await,
        }
    }

    /// Load configuration file (if any) and apply environment overrides
    fn load_config(&self) -> Result<Config> {
        let config = match &self.cli.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        Ok(config.with_env())
    }

    /// Stitch every requested class and print the results
    async fn fetch(
        &self,
        config: &Config,
        classes: &[String],
        constraints: &JsonObject,
        options: &StitchOptions,
        input: Option<&Path>,
    ) -> Result<()> {
        let limits = config.stitch.limits();

        let outcomes = if let Some(path) = input {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let value: JsonValue = serde_json::from_str(&contents)?;
            let engine = MemoryEngine::from_json(&value)?;
            stitch_all(&engine, limits, classes, constraints, options).await?
        } else {
            let engine = ParseClient::new(config.parse.clone())?;
            stitch_all(&engine, limits, classes, constraints, options).await?
        };

        for (class, outcome) in &outcomes {
            for line in render_outcome(self.cli.format, class, outcome)? {
                println!("{line}");
            }
        }
        Ok(())
    }

    /// Validate config and optionally run a one-record probe
    async fn check(&self, class: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let server = config.parse.validate()?;
        info!("Configuration OK for {server}");

        let mut status = json!({
            "status": "SUCCEEDED",
            "server": server.as_str(),
        });

        if let Some(class) = class {
            let client = ParseClient::new(config.parse.clone())?;
            let sample = client
                .find(&Query::new(class).limit(1), &FindOptions::new())
                .await?;
            status["class"] = json!(class);
            status["sample"] = json!(sample.len());
        }

        self.output_message(&status)
    }

    fn output_message(&self, msg: &JsonValue) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json | OutputFormat::Jsonl => println!("{}", serde_json::to_string(msg)?),
            OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(msg)?),
        }
        Ok(())
    }
}

/// Stitch several classes concurrently against one engine
async fn stitch_all<E: QueryEngine + ?Sized>(
    engine: &E,
    limits: StitchLimits,
    classes: &[String],
    constraints: &JsonObject,
    options: &StitchOptions,
) -> Result<Vec<(String, StitchOutcome)>> {
    let stitcher = QueryStitcher::new(engine).with_limits(limits);
    let stitcher = &stitcher;

    try_join_all(classes.iter().map(|class| async move {
        let query = Query::new(class.clone()).with_constraints(constraints.clone());
        stitcher
            .stitch_with_outcome(query, options)
            .await
            .map(|outcome| (class.clone(), outcome))
    }))
    .await
}

/// Parse the `--where` argument
fn parse_where(where_json: Option<&str>) -> Result<JsonObject> {
    match where_json {
        Some(raw) => serde_json::from_str::<JsonObject>(raw).context("Invalid --where JSON"),
        None => Ok(JsonObject::new()),
    }
}

/// Build stitch options from command-line flags
fn build_options(
    super_stitch: bool,
    use_master_key: bool,
    session_token: Option<&str>,
) -> StitchOptions {
    let mut options = StitchOptions::new().with_super_stitch(super_stitch);
    if use_master_key {
        options = options.with_option("useMasterKey", true);
    }
    if let Some(token) = session_token {
        options = options.with_option("sessionToken", token);
    }
    options
}

/// Render one class's outcome in the requested format
fn render_outcome(
    format: OutputFormat,
    class: &str,
    outcome: &StitchOutcome,
) -> Result<Vec<String>> {
    if format == OutputFormat::Jsonl {
        return outcome
            .records
            .iter()
            .map(|record| Ok(serde_json::to_string(record)?))
            .collect();
    }

    let summary = json!({
        "class": class,
        "count": outcome.records.len(),
        "pages": outcome.pages_fetched,
        "truncated": outcome.is_truncated(),
        "stop_reason": outcome.stop_reason,
        "results": outcome.records,
    });

    let line = if format == OutputFormat::Pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    Ok(vec![line])
}
