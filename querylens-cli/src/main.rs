use std::env;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use querylens_client::{ApiClient, ClientError, SlowQuerySource, StatementSource};
use querylens_controller::url_state::parse_query_string;
use querylens_controller::{
    available_columns, ColumnVisibilityStore, DataSource, LocalStorage, MemoryParamStore,
    ParamStore, PreferenceStore, QueryCache, ResultController, StatePatch, UrlParamStore,
    ViewConfig,
};
use querylens_core::logging::{init_tracing, verbosity_directive};
use querylens_core::serde_utils::to_pretty_json;
use querylens_core::CoreConfig;
use querylens_protocol::list::{FilterKind, OrderOptions};
use tracing::debug;

mod error;
mod render;

use error::CliError;

#[derive(Parser)]
#[command(name = "querylens")]
#[command(about = "Browse slow queries and statement summaries from the terminal", long_about = None)]
struct Cli {
    /// Base URL of the diagnostics API
    #[arg(long, global = true, env = "QUERYLENS_API_URL")]
    api_url: Option<String>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Slow-query log, ordered by the server
    #[command(subcommand, name = "slow-queries")]
    SlowQueries(ViewCommands),
    /// Statement summaries, ordered locally
    #[command(subcommand)]
    Statements(ViewCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ViewCommands {
    /// List one page of results
    List(ListArgs),
    /// Download the current result set as CSV
    Export(ExportArgs),
    /// Inspect or change which columns are shown
    #[command(subcommand)]
    Columns(ColumnCommands),
    /// Candidate values for a filter
    Values {
        #[arg(value_enum)]
        kind: FilterArg,
    },
}

#[derive(Args, Clone, Default)]
struct StateArgs {
    /// Saved view state: a query string (`dbs=a&order=-query_time`) or a full link
    #[arg(long)]
    state: Option<String>,
    /// Database filter (repeatable)
    #[arg(long = "db")]
    dbs: Vec<String>,
    /// Resource group filter (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,
    /// Statement kind filter (repeatable)
    #[arg(long = "kind")]
    kinds: Vec<String>,
    /// Free-text search
    #[arg(long)]
    term: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
    /// Sort token: `column` ascending or `-column` descending
    #[arg(long)]
    order: Option<String>,
    /// Clear every filter before applying the ones given here; keeps the sort
    #[arg(long)]
    reset_filters: bool,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    state: StateArgs,
    /// One-based page number
    #[arg(long)]
    page: Option<usize>,
    /// Bypass the cached result
    #[arg(long)]
    refresh: bool,
    /// Print the raw controller state as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    state: StateArgs,
    /// Destination file, defaults to `<view>.csv`
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ColumnCommands {
    /// Show available columns and which are visible
    Show,
    /// Show or hide columns
    Set {
        #[arg(long)]
        show: Vec<String>,
        #[arg(long)]
        hide: Vec<String>,
    },
    /// Restore the default columns
    Reset,
    /// Show complete SQL text instead of a preview
    FullSql {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Databases,
    ResourceGroups,
    StatementKinds,
}

impl From<FilterArg> for FilterKind {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::Databases => FilterKind::Databases,
            FilterArg::ResourceGroups => FilterKind::ResourceGroups,
            FilterArg::StatementKinds => FilterKind::StatementKinds,
        }
    }
}

/// Sources whose download tokens can be redeemed for CSV.
#[async_trait]
trait CsvExport: DataSource {
    async fn fetch_csv(&self, token: &str) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
impl CsvExport for SlowQuerySource {
    async fn fetch_csv(&self, token: &str) -> Result<Vec<u8>, ClientError> {
        self.download(token).await
    }
}

#[async_trait]
impl CsvExport for StatementSource {
    async fn fetch_csv(&self, token: &str) -> Result<Vec<u8>, ClientError> {
        self.download(token).await
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(Some(verbosity_directive(cli.verbose))) {
        eprintln!("failed to initialise logging: {err}");
    }

    if let Err(err) = run(cli).await {
        if !matches!(err, CliError::Reported) {
            eprintln!("{} {err}", "error:".red().bold());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Version = cli.command {
        println!("QueryLens v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(cli.api_url.as_deref())?;
    let client = ApiClient::from_config(&config)?;
    let storage = LocalStorage::open(&config.storage_dir)?;
    debug!(api = %client.base_url(), storage = %storage.dir().display(), "configured");

    match cli.command {
        Commands::SlowQueries(command) => {
            let view = ViewConfig::slow_queries().with_core_config(&config);
            run_view(SlowQuerySource::new(client), view, &config, storage, command).await
        }
        Commands::Statements(command) => {
            let view = ViewConfig::statements().with_core_config(&config);
            run_view(StatementSource::new(client), view, &config, storage, command).await
        }
        Commands::Version => Ok(()),
    }
}

fn load_config(api_url: Option<&str>) -> Result<CoreConfig, CliError> {
    dotenvy::dotenv().ok();
    let config = CoreConfig::from_lookup("QUERYLENS_", |key| match (key, api_url) {
        ("QUERYLENS_API_URL", Some(url)) => Some(url.to_string()),
        _ => env::var(key).ok(),
    })?;
    Ok(config)
}

async fn run_view<S: CsvExport>(
    source: S,
    view: ViewConfig,
    config: &CoreConfig,
    storage: LocalStorage,
    command: ViewCommands,
) -> Result<(), CliError> {
    let columns = ColumnVisibilityStore::new(storage.clone(), &view.key, view.default_columns.clone());
    let full_sql = PreferenceStore::show_full_sql(storage, &view.key);
    let cache = QueryCache::from_capacity(config.cache_capacity);

    match command {
        ViewCommands::List(args) => {
            let state = args.state.state.clone().unwrap_or_default();
            if state.starts_with("http://") || state.starts_with("https://") {
                let params = UrlParamStore::parse(&state)
                    .map_err(|err| CliError::Validation(format!("invalid state link: {err}")))?;
                let controller = ResultController::new(source, params, view)
                    .with_cache(cache)
                    .with_visible_columns(&columns.get());
                list(&controller, &args, full_sql.get()).await?;
                controller.with_param_store(|store| println!("{}", store.url().as_str().dimmed()));
                Ok(())
            } else {
                let params = MemoryParamStore::with_params(parse_query_string(&state));
                let controller = ResultController::new(source, params, view)
                    .with_cache(cache)
                    .with_visible_columns(&columns.get());
                list(&controller, &args, full_sql.get()).await?;
                let query = controller.query_string();
                if !query.is_empty() {
                    println!("{}", format!("state: ?{query}").dimmed());
                }
                Ok(())
            }
        }
        ViewCommands::Export(args) => {
            let state = args.state.state.clone().unwrap_or_default();
            let params = MemoryParamStore::with_params(parse_query_string(&state));
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.csv", view.key)));
            let controller = ResultController::new(source, params, view)
                .with_cache(cache)
                .with_visible_columns(&columns.get());
            apply_state_args(&controller, &args.state)?;

            let token = controller.download_token().await;
            let Some(token) = token else {
                report_errors(&controller.snapshot().errors);
                return Err(CliError::Reported);
            };
            let csv = controller.source().fetch_csv(&token).await?;
            fs::write(&output, &csv).map_err(|source| CliError::Write {
                path: output.display().to_string(),
                source,
            })?;
            println!(
                "{} {} ({} bytes)",
                "✔ Exported".green().bold(),
                output.display(),
                csv.len()
            );
            Ok(())
        }
        ViewCommands::Columns(command) => {
            match command {
                ColumnCommands::Show => {
                    let controller = ResultController::new(source, MemoryParamStore::new(), view)
                        .with_cache(cache);
                    let advertised = controller.load_available_fields().await;
                    let descriptors = available_columns::<S::Row>(&[], advertised.as_deref());
                    let visibility = columns.get();
                    render::print_columns(&descriptors, &visibility);
                    for (column, _) in visibility.iter().filter(|(id, visible)| {
                        **visible && !descriptors.iter().any(|d| &d.id == *id)
                    }) {
                        println!("{} {}", "●".green(), format!("{column} (unknown to server)").dimmed());
                    }
                    report_errors(&controller.snapshot().errors);
                }
                ColumnCommands::Set { show, hide } => {
                    let mut visibility = columns.get();
                    for column in show {
                        visibility.insert(column, true);
                    }
                    for column in hide {
                        visibility.insert(column, false);
                    }
                    columns.set(&visibility)?;
                    println!("{} {}", "✔ Visible:".green().bold(), columns.visible_columns().join(", "));
                }
                ColumnCommands::Reset => {
                    let visibility = columns.reset_to_default()?;
                    println!(
                        "{} {}",
                        "✔ Columns reset:".green().bold(),
                        querylens_controller::visible_columns(&visibility).join(", ")
                    );
                }
                ColumnCommands::FullSql { enabled } => {
                    full_sql.set(enabled)?;
                    println!("{} {}", "✔ Full SQL:".green().bold(), enabled);
                }
            }
            Ok(())
        }
        ViewCommands::Values { kind } => {
            let controller = ResultController::new(source, MemoryParamStore::new(), view);
            match controller.filter_values(kind.into()).await {
                Some(values) => {
                    for value in values {
                        println!("{value}");
                    }
                    Ok(())
                }
                None => {
                    report_errors(&controller.snapshot().errors);
                    Err(CliError::Reported)
                }
            }
        }
    }
}

async fn list<S: DataSource, P: ParamStore>(
    controller: &ResultController<S, P>,
    args: &ListArgs,
    full_sql: bool,
) -> Result<(), CliError> {
    apply_state_args(controller, &args.state)?;
    if let Some(page) = args.page {
        controller.set_page(page.saturating_sub(1));
    }

    if args.refresh {
        controller.refresh().await;
    } else {
        controller.load().await;
    }

    let snapshot = controller.snapshot();
    if args.json {
        println!("{}", to_pretty_json(&snapshot)?);
    } else {
        render::print_list(
            &snapshot,
            &controller.page_rows(),
            &controller.visible_columns(),
            controller.page_count(),
            full_sql,
        );
    }

    if snapshot.errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::Reported)
    }
}

/// Applies command-line filters on top of the saved state without fetching.
fn apply_state_args<S: DataSource, P: ParamStore>(
    controller: &ResultController<S, P>,
    args: &StateArgs,
) -> Result<(), CliError> {
    let mut patch = if args.reset_filters {
        StatePatch::reset()
    } else {
        StatePatch::default()
    };
    if !args.dbs.is_empty() {
        patch.dbs = Some(args.dbs.iter().cloned().collect());
    }
    if !args.groups.is_empty() {
        patch.groups = Some(args.groups.iter().cloned().collect());
    }
    if !args.kinds.is_empty() {
        patch.kinds = Some(args.kinds.iter().cloned().collect());
    }
    patch.term = args.term.clone();
    patch.limit = args.limit;

    if let Some(token) = &args.order {
        let order = OrderOptions::from_token(token)
            .ok_or_else(|| CliError::Validation(format!("invalid order token '{token}'")))?;
        let visible = controller.visible_columns();
        if !visible.contains(&order.column) {
            return Err(CliError::Validation(format!(
                "cannot sort by hidden column '{}'; visible: {}",
                order.column,
                visible.join(", ")
            )));
        }
        patch.order = Some(order);
    }

    controller.stage(&patch);
    Ok(())
}

fn report_errors(errors: &[String]) {
    for error in errors {
        eprintln!("{} {}", "✖".red().bold(), error.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_list_filters() {
        let cli = Cli::try_parse_from([
            "querylens",
            "slow-queries",
            "list",
            "--db",
            "app",
            "--db",
            "billing",
            "--order",
            "-query_time",
            "--page",
            "2",
        ])
        .unwrap();
        let Commands::SlowQueries(ViewCommands::List(args)) = cli.command else {
            panic!("expected slow-queries list");
        };
        assert_eq!(args.state.dbs, vec!["app", "billing"]);
        assert_eq!(args.state.order.as_deref(), Some("-query_time"));
        assert_eq!(args.page, Some(2));
    }
}
