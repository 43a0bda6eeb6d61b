use std::io::{self, Write as _};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use time::{Date, OffsetDateTime, UtcOffset};

use exorvia::config::{ApiConfig, ConfigError};
use exorvia::net::api::{ApiError, DashboardApi, HttpDashboardApi};
use exorvia::state::analysis::AnalysisStrategy;
use exorvia::state::conversation::{Conversation, SendOutcome, ThreadStrategy};
use exorvia::state::filters::{Dashboard, Facet, LoadStatus, TimeWindow};
use exorvia::state::graphs::GraphStrategy;
use exorvia::state::message::local_offset;
use exorvia::view;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("dashboard data unavailable")]
    DashboardUnavailable,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "exorvia", about = "E-commerce analytics dashboard and chat CLI")]
struct Cli {
    /// API base URL, e.g. `http://localhost:5000/api`.
    #[arg(long, global = true, env = "EXORVIA_API_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check backend and database connectivity.
    Health,
    /// Fetch and print the dashboard for a set of filters.
    Dashboard(DashboardArgs),
    /// Ask the analysis chat one question.
    Ask { question: String },
    /// Ask the chart chat for charts answering one question.
    Chart { question: String },
    /// Print persisted chat history.
    History {
        #[arg(long, default_value_t = false)]
        graphs: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Interactive chat over stdin. `exit` or EOF ends the session.
    Chat {
        #[arg(long, default_value_t = false)]
        graphs: bool,
    },
}

#[derive(Args, Debug)]
struct DashboardArgs {
    #[arg(long = "region")]
    regions: Vec<String>,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "tenure")]
    tenure: Vec<String>,
    #[arg(long = "recency")]
    recency: Vec<String>,
    #[arg(long)]
    transactions_min: Option<f64>,
    #[arg(long)]
    transactions_max: Option<f64>,
    #[arg(long)]
    discount_min: Option<f64>,
    #[arg(long)]
    discount_max: Option<f64>,
    /// One of 1m, 3m, 6m, 1y, all.
    #[arg(long, default_value = "all")]
    time: TimeWindow,
}

// Single-threaded: the local UTC offset can only be read while no other threads exist.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let offset = local_offset();
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ApiConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    let http = HttpDashboardApi::new(&config)?;
    tracing::debug!(base_url = http.base_url(), %offset, "api client ready");
    let api: Arc<dyn DashboardApi> = Arc::new(http);

    let analysis = AnalysisStrategy { history_limit: config.history_limit };
    let graphs = GraphStrategy { history_limit: config.history_limit };

    match cli.command {
        Command::Health => run_health(api.as_ref()).await,
        Command::Dashboard(args) => run_dashboard(api, args).await,
        Command::Ask { question } => run_ask(thread(api, analysis, offset), question).await,
        Command::Chart { question } => run_ask(thread(api, graphs, offset), question).await,
        Command::History { graphs: false, limit } => {
            let strategy = AnalysisStrategy { history_limit: limit.unwrap_or(config.history_limit) };
            run_history(thread(api, strategy, offset)).await
        }
        Command::History { graphs: true, limit } => {
            let strategy = GraphStrategy { history_limit: limit.unwrap_or(config.history_limit) };
            run_history(thread(api, strategy, offset)).await
        }
        Command::Chat { graphs: false } => run_chat(thread(api, analysis, offset)).await,
        Command::Chat { graphs: true } => run_chat(thread(api, graphs, offset)).await,
    }
}

fn thread<S: ThreadStrategy>(api: Arc<dyn DashboardApi>, strategy: S, offset: UtcOffset) -> Conversation<S> {
    Conversation::new(api, strategy).with_utc_offset(offset)
}

async fn run_health(api: &dyn DashboardApi) -> Result<(), CliError> {
    let health = api.health().await?;
    println!("{}", view::render_health(&health));
    Ok(())
}

async fn run_dashboard(api: Arc<dyn DashboardApi>, args: DashboardArgs) -> Result<(), CliError> {
    let mut dashboard = Dashboard::new(api);
    // The unfiltered load supplies the slider ceilings the range flags are clamped to.
    dashboard.sync().await;

    let state = dashboard.state_mut();
    for (facet, values) in [
        (Facet::Regions, args.regions),
        (Facet::Categories, args.categories),
        (Facet::Tenure, args.tenure),
        (Facet::Recency, args.recency),
    ] {
        state.filters.facet_mut(facet).extend(values);
    }
    if args.transactions_min.is_some() || args.transactions_max.is_some() {
        let range = state.filters.transactions;
        let max = args.transactions_max.unwrap_or(range.upper(state.transactions_ceiling));
        state.set_transactions(args.transactions_min.unwrap_or(range.min), max);
    }
    if args.discount_min.is_some() || args.discount_max.is_some() {
        let range = state.filters.discount;
        let max = args.discount_max.unwrap_or(range.upper(state.discount_ceiling));
        state.set_discount(args.discount_min.unwrap_or(range.min), max);
    }
    state.set_time_window(args.time);
    dashboard.sync().await;

    println!("{}", view::render_dashboard(dashboard.state()));
    if dashboard.state().status == LoadStatus::Failed {
        return Err(CliError::DashboardUnavailable);
    }
    Ok(())
}

async fn run_ask<S: ThreadStrategy>(thread: Conversation<S>, question: String) -> Result<(), CliError> {
    thread.activate().await;
    let mut input = question;
    send_and_print(&thread, &mut input).await;
    Ok(())
}

async fn run_history<S: ThreadStrategy>(thread: Conversation<S>) -> Result<(), CliError> {
    thread.activate().await;
    let state = thread.snapshot();
    tracing::debug!(thread = thread.strategy().name(), loaded = state.history_loaded, "history hydrated");
    if state.messages.is_empty() {
        println!("No history yet.");
    } else {
        print!("{}", view::render_transcript(&state.messages, today(thread.utc_offset())));
    }
    Ok(())
}

async fn run_chat<S: ThreadStrategy>(thread: Conversation<S>) -> Result<(), CliError> {
    thread.activate().await;
    print!("{}", view::render_transcript(&thread.messages(), today(thread.utc_offset())));

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "exit" | "quit" => break,
            "/reset" => {
                thread.reset();
                thread.activate().await;
                print!("{}", view::render_transcript(&thread.messages(), today(thread.utc_offset())));
            }
            _ => send_and_print(&thread, &mut line).await,
        }
    }
    Ok(())
}

/// Send one question and print every message it appended.
async fn send_and_print<S: ThreadStrategy>(thread: &Conversation<S>, input: &mut String) {
    let before = thread.messages().len();
    let outcome = thread.send(input).await;
    tracing::debug!(thread = thread.strategy().name(), ?outcome, "send finished");
    if outcome == SendOutcome::Ignored {
        return;
    }
    for message in thread.messages().iter().skip(before) {
        print!("{}", view::render_message(message));
    }
}

fn today(offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(offset).date()
}
