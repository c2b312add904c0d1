use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slowatch::config::Settings;
use slowatch::data::timerange::format_timestamp_full;
use slowatch::{label_badges, App, DetailView, FileApi, Queries, StatusState, Subscription};
use slowatch_types::{format_duration, parse_duration, Milliseconds};

#[derive(Parser, Debug)]
#[command(name = "slowatch")]
#[command(about = "Resolve service level objective status from a backend")]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Format a number of milliseconds as a duration string (e.g. 129600000 -> 1d12h)
    Format { millis: u64 },

    /// Parse a duration string (e.g. "1d12h") into milliseconds
    Parse { duration: String },

    /// Resolve the detail page for an objective
    Detail {
        /// Path to a responses.json file (overrides the configured one)
        #[arg(short, long)]
        responses: Option<PathBuf>,

        /// Selector expression of the objective
        #[arg(short, long)]
        expr: String,

        /// Grouping expression
        #[arg(short, long, default_value = "")]
        grouping: String,

        /// Time range of the graphs (e.g. "1d", "4w")
        #[arg(short, long)]
        timerange: Option<String>,

        /// Export the resolved page to a JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Print the PromQL queries for an objective
    Queries {
        /// Path to a responses.json file (overrides the configured one)
        #[arg(short, long)]
        responses: Option<PathBuf>,

        /// Selector expression of the objective
        #[arg(short, long)]
        expr: String,

        /// Time range of the range queries (e.g. "1d", "4w")
        #[arg(short, long)]
        timerange: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    init_tracing(&settings.log_filter);

    match args.command {
        Command::Format { millis } => {
            println!("{}", format_duration(Milliseconds::from_millis(millis)));
            Ok(())
        }
        Command::Parse { duration } => {
            let parsed = parse_duration(&duration)?;
            println!("{}", parsed.as_millis());
            Ok(())
        }
        Command::Detail {
            responses,
            expr,
            grouping,
            timerange,
            export,
        } => {
            let responses = responses_path(responses, &settings)?;
            let subscription = Subscription::from_query(
                Some(&expr),
                Some(&grouping),
                timerange.as_deref(),
                settings.default_time_range(),
            );
            let app = resolve(&responses, subscription)?;

            if let Some(export_path) = export {
                return export_to_file(&app, &export_path);
            }
            print_detail(&app)
        }
        Command::Queries {
            responses,
            expr,
            timerange,
        } => {
            let responses = responses_path(responses, &settings)?;
            let subscription =
                Subscription::from_query(Some(&expr), None, timerange.as_deref(), settings.default_time_range());
            let app = resolve(&responses, subscription)?;
            print_queries(&app)
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn responses_path(arg: Option<PathBuf>, settings: &Settings) -> Result<PathBuf> {
    arg.or_else(|| settings.responses.clone())
        .ok_or_else(|| anyhow!("No responses file: pass --responses or set SLOWATCH_RESPONSES"))
}

/// Subscribe to the page and wait for both fetches
fn resolve(responses: &Path, subscription: Subscription) -> Result<App> {
    let rt = tokio::runtime::Runtime::new()?;

    let app = rt.block_on(async {
        let mut app = App::new(Arc::new(FileApi::new(responses)));
        info!("Resolving {} from {}", subscription.expr, app.source_description());
        app.subscribe(subscription);
        app.settle().await;
        app
    });
    Ok(app)
}

fn print_detail(app: &App) -> Result<()> {
    let time_range = app.subscription().map(|s| s.time_range).unwrap_or_default();

    match app.view() {
        DetailView::ErrorPage(message) => bail!("{}", message),
        DetailView::Loading => println!("Loading"),
        DetailView::Ready { objective, status } => {
            println!("{}", objective.name);
            if !objective.description.is_empty() {
                println!("  {}", objective.description);
            }
            let badges = label_badges(&objective.labels, &BTreeMap::new());
            if !badges.is_empty() {
                println!("  {}", badges.join(" "));
            }
            println!(
                "  Objective:     {:.3}% in {}",
                objective.target * 100.0,
                objective.window
            );

            match status {
                StatusState::Success {
                    availability,
                    budget,
                } => {
                    let availability_health = status
                        .availability_health(objective.target)
                        .map(|h| h.symbol())
                        .unwrap_or_default();
                    let budget_health = status.budget_health().map(|h| h.symbol()).unwrap_or_default();
                    println!(
                        "  Availability:  {:.3}% ({}, {} errors of {})",
                        availability.percentage * 100.0,
                        availability_health,
                        availability.errors,
                        availability.total
                    );
                    println!("  Error budget:  {:.3}% ({})", budget.remaining * 100.0, budget_health);
                }
                other => {
                    println!("  Availability:  {}", other.label());
                    println!("  Error budget:  {}", other.label());
                }
            }
            println!("  Time range:    {}", time_range);
        }
    }
    Ok(())
}

fn print_queries(app: &App) -> Result<()> {
    let objective = match app.view() {
        DetailView::ErrorPage(message) => bail!("{}", message),
        DetailView::Loading => bail!("Objective lookup did not match exactly one objective"),
        DetailView::Ready { objective, .. } => objective,
    };
    let time_range = app.subscription().map(|s| s.time_range).unwrap_or_default();

    let queries = Queries::new(objective);
    let rows = [
        ("total", queries.total(objective.window)),
        ("errors", queries.errors(objective.window)),
        ("error_budget", queries.error_budget()),
        ("request_range", queries.request_range(time_range)),
        ("errors_range", queries.errors_range(time_range)),
    ];
    for (name, query) in rows {
        let query = query.ok_or_else(|| anyhow!("Objective {} has no indicator", objective.name))?;
        println!("{:<14} {}", name, query);
    }
    Ok(())
}

/// Export the resolved detail page to a JSON file
fn export_to_file(app: &App, export_path: &Path) -> Result<()> {
    use std::io::Write;

    let mut export = serde_json::Map::new();

    if let Some(subscription) = app.subscription() {
        export.insert(
            "subscription".to_string(),
            serde_json::json!({
                "expr": subscription.expr,
                "grouping": subscription.grouping,
                "timerange": subscription.timerange_param(),
            }),
        );
    }

    let page = match app.view() {
        DetailView::ErrorPage(message) => serde_json::json!({ "view": "error", "error": message }),
        DetailView::Loading => serde_json::json!({ "view": "loading" }),
        DetailView::Ready { objective, status } => serde_json::json!({
            "view": "ready",
            "objective": objective,
            "badges": label_badges(&objective.labels, &BTreeMap::new()),
            "status": status,
            "availability_health": status.availability_health(objective.target),
            "budget_health": status.budget_health(),
        }),
    };
    export.insert("page".to_string(), page);

    let exported_at = chrono::Utc::now().timestamp();
    export.insert(
        "exported_at".to_string(),
        serde_json::json!(format_timestamp_full(exported_at)),
    );

    let json = serde_json::to_string_pretty(&serde_json::Value::Object(export))?;
    let mut file = std::fs::File::create(export_path)?;
    file.write_all(json.as_bytes())?;

    println!("Exported to {}", export_path.display());
    Ok(())
}
