use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quote_core::AnswerValue;
use quote_core::QuoteRepository;
use quote_core::calculations::{AddOns, Quote};
use quote_core::db::CachedQuoteRepository;
use tracing::debug;

use quote_wizard::answers_file;
use quote_wizard::app::{self, LoadedContext};
use quote_wizard::buffer::{AutoSaver, SessionBuffer};
use quote_wizard::config::AppConfig;
use quote_wizard::logging;
use quote_wizard::state::WizardState;
use quote_wizard::utils::{format_money, opt_decimal_display, parse_assignment};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Battery storage, solar and generator quotes for commercial sites.
///
/// Reads use cases, questions, equipment and pricing from the configured
/// database, sizes a system from your answers and prices three tiers.
#[derive(Debug, Parser)]
#[command(name = "quote-wizard", version)]
struct Cli {
    /// Config file. Defaults to `quote-wizard.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend, overriding the config file.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string, overriding the config file.
    /// For SQLite this is a file path (e.g. `quotes.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log level or filter directive, overriding the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Suppress log output on stderr.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List use cases.
    UseCases {
        /// Include inactive use cases.
        #[arg(long)]
        all: bool,
    },

    /// Show the questions asked for a use case.
    Questions { slug: String },

    /// Size and price a system.
    Quote(QuoteArgs),

    /// List saved quotes, newest first.
    Quotes {
        #[arg(long)]
        use_case: Option<String>,
    },

    /// Inspect or reset a stored wizard session.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Debug, Args)]
struct QuoteArgs {
    /// Use case slug. Optional when the answers file or session names one.
    #[arg(long)]
    use_case: Option<String>,

    /// TOML answers file.
    #[arg(long)]
    answers: Option<PathBuf>,

    /// Answer a question, e.g. `--set tunnelLength=150`. Repeatable.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, AnswerValue)>,

    /// Add the solar option.
    #[arg(long)]
    solar: bool,

    /// Add the backup generator option.
    #[arg(long)]
    generator: bool,

    /// Pricing scenario name.
    #[arg(long)]
    pricing: Option<String>,

    /// Resume and autosave this wizard session.
    #[arg(long)]
    session: Option<String>,

    /// Store the recommended proposal.
    #[arg(long)]
    save: bool,

    /// Print the full quote as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum SessionAction {
    /// Print the stored session state as JSON.
    Show { id: String },
    /// Delete the stored session.
    Clear { id: String },
    /// Restore the session as it was before its last format migration.
    Rollback { id: String },
}

// ─── commands ────────────────────────────────────────────────────────────────

async fn list_use_cases(
    repo: &dyn QuoteRepository,
    all: bool,
) -> Result<()> {
    let use_cases = repo.list_use_cases(!all).await?;
    for use_case in &use_cases {
        let marker = if use_case.is_active { "" } else { " (inactive)" };
        println!(
            "{:<16} {:<20} {}{}",
            use_case.slug,
            use_case.name,
            use_case.industry.as_str(),
            marker
        );
    }
    debug!(count = use_cases.len(), "use cases listed");
    Ok(())
}

async fn list_questions(
    repo: &dyn QuoteRepository,
    slug: &str,
) -> Result<()> {
    let loaded = app::load_quote_context(repo, slug, None)
        .await
        .with_context(|| format!("cannot load use case '{slug}'"))?;
    for question in &loaded.context.questions {
        let required = if question.is_required { "*" } else { " " };
        let default = question.default_value.as_deref().unwrap_or("");
        let unit = question.unit.as_deref().unwrap_or("");
        println!(
            "{required} {:<18} {:<40} default: {default} {unit}",
            question.field_name, question.question_text
        );
        for option in &question.options {
            println!("      {:<16} {}", option.value, option.label);
        }
    }
    Ok(())
}

fn print_quote(
    loaded: &LoadedContext,
    quote: &Quote,
) {
    let ctx = &loaded.context;
    println!("{} ({})", ctx.use_case.name, ctx.use_case.slug);
    println!(
        "peak demand {} kW, annual energy {} kWh, pricing '{}'{}",
        quote.load.estimated_peak_kw.round_dp(1),
        quote.load.annual_kwh.round(),
        ctx.pricing.name,
        if loaded.pricing_fallback { " (fallback)" } else { "" }
    );
    println!();
    println!(
        "{:<11} {:>9} {:>10} {:>9} {:>8} {:>12} {:>12} {:>11} {:>8}",
        "tier", "bess kW", "bess kWh", "solar kW", "gen kW", "total", "net", "savings/yr", "payback"
    );
    for proposal in &quote.tiers {
        let system = &proposal.system;
        let money = &proposal.financials;
        println!(
            "{:<11} {:>9} {:>10} {:>9} {:>8} {:>12} {:>12} {:>11} {:>8}",
            proposal.tier.as_str(),
            system.bess_kw.round_dp(1),
            system.bess_kwh.round_dp(1),
            system.solar_kw.round_dp(1),
            system.generator_kw.round_dp(1),
            format_money(money.costs.total_cost),
            format_money(money.net_cost),
            format_money(money.annual_savings),
            opt_decimal_display(&money.payback_years.map(|p| p.round_dp(1))),
        );
    }
    println!();

    let failures = quote.validation.failures();
    if failures.is_empty() {
        println!("validation: all checks passed");
    } else {
        println!("validation: {} check(s) failed", failures.len());
        for failure in failures {
            let tier = failure.tier.map(|t| t.as_str()).unwrap_or("base");
            println!("  {tier}: {} ({})", failure.check, failure.detail);
        }
    }
}

async fn run_quote_command(
    repo: &dyn QuoteRepository,
    config: &AppConfig,
    args: QuoteArgs,
) -> Result<()> {
    let buffer = Arc::new(SessionBuffer::new(config.session.dir.clone()));

    let mut state = match &args.session {
        Some(id) => buffer
            .load(id)
            .with_context(|| format!("cannot resume session '{id}'"))?
            .unwrap_or_default(),
        None => WizardState::new(),
    };

    let mut pricing = config.pricing.scenario.clone();
    if let Some(path) = &args.answers {
        let file = answers_file::load_from_file(path)?;
        file.apply_to(&mut state);
        if file.pricing.is_some() {
            pricing = file.pricing;
        }
    }
    if let Some(slug) = &args.use_case {
        state.select_industry(slug);
    }
    for (field, value) in args.set {
        state.set_answer(&field, value);
    }
    if args.solar || args.generator {
        let add_ons = AddOns {
            solar: state.add_ons.solar || args.solar,
            generator: state.add_ons.generator || args.generator,
        };
        let solar = state.solar.clone();
        state.set_add_ons(add_ons, solar);
    }
    if args.pricing.is_some() {
        pricing = args.pricing;
    }

    let autosaver = args
        .session
        .as_ref()
        .map(|id| AutoSaver::spawn(buffer.clone(), id.clone(), config.autosave_debounce()));
    if let Some(saver) = &autosaver {
        saver.schedule(&state);
    }

    let result = app::run_quote(repo, &mut state, pricing.as_deref()).await;

    if let Some(saver) = autosaver {
        saver.schedule(&state);
        let writes = saver.finish().await;
        debug!(writes, "session autosaved");
    }

    let (loaded, quote) = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        print_quote(&loaded, &quote);
    }

    if args.save {
        let saved = app::save_quote(repo, &loaded.context, &state, &quote).await?;
        println!("saved quote #{}", saved.id);
    }
    Ok(())
}

async fn list_quotes(
    repo: &dyn QuoteRepository,
    use_case: Option<&str>,
) -> Result<()> {
    let use_case_id = match use_case {
        Some(slug) => Some(
            repo.get_use_case(slug)
                .await
                .with_context(|| format!("unknown use case '{slug}'"))?
                .id,
        ),
        None => None,
    };
    for quote in repo.list_quotes(use_case_id).await? {
        println!(
            "#{:<5} {} {:>9} kWh {:>12} payback {} yr",
            quote.id,
            quote.updated_at.format("%Y-%m-%d %H:%M"),
            quote.bess_kwh.round_dp(1),
            format_money(quote.net_cost),
            opt_decimal_display(&quote.payback_years.map(|p| p.round_dp(1))),
        );
    }
    Ok(())
}

fn run_session_command(
    config: &AppConfig,
    action: SessionAction,
) -> Result<()> {
    let buffer = SessionBuffer::new(config.session.dir.clone());
    match action {
        SessionAction::Show { id } => match buffer.load(&id)? {
            Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
            None => println!("no session '{id}'"),
        },
        SessionAction::Clear { id } => {
            if buffer.clear(&id)? {
                println!("session '{id}' cleared");
            } else {
                println!("no session '{id}'");
            }
        }
        SessionAction::Rollback { id } => match buffer.rollback(&id)? {
            Some(version) => println!("session '{id}' restored to format v{version}"),
            None => println!("session '{id}' has no backup to restore"),
        },
    }
    Ok(())
}

async fn connect(config: &AppConfig) -> Result<CachedQuoteRepository> {
    debug!(backend = %config.database.backend, "connecting");
    app::open_repository(config)
        .await
        .context("cannot open the quote database")
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }
    if let Some(db) = cli.db {
        config.database.connection_string = db;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    logging::init_logging(&config.logging)?;
    if cli.quiet {
        logging::log_task_error("silence console", logging::set_console_enabled(false));
    }

    match cli.command {
        Command::UseCases { all } => list_use_cases(&connect(&config).await?, all).await,
        Command::Questions { slug } => list_questions(&connect(&config).await?, &slug).await,
        Command::Quote(args) => run_quote_command(&connect(&config).await?, &config, args).await,
        Command::Quotes { use_case } => {
            list_quotes(&connect(&config).await?, use_case.as_deref()).await
        }
        Command::Session { action } => run_session_command(&config, action),
    }
}
