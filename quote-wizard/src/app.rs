//! Wizard orchestration: repository lookups, the quote engine and the
//! session state, wired together for the CLI.

use quote_core::calculations::{Quote, QuoteContext, QuoteEngine, QuoteError, QuoteRequest};
use quote_core::db::{CachedQuoteRepository, RepositoryRegistry};
use quote_core::{
    IndustryTemplate, NewAnalyticsEvent, NewSavedQuote, PricingScenario, QuoteRepository,
    RepositoryError, SavedQuote, with_universal_questions,
};
use quote_db_sqlite::SqliteRepositoryFactory;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::state::{Goal, WizardError, WizardState, WizardStep};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no industry selected for this session")]
    NoIndustry,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Quote(#[from] QuoteError),
}

/// Every backend this binary knows how to open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Opens the configured backend behind the lookup cache.
pub async fn open_repository(config: &AppConfig) -> Result<CachedQuoteRepository, RepositoryError> {
    build_registry()
        .open(&config.db_config(), config.cache_ttl())
        .await
}

/// A quote context plus whether pricing came from the built-in constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContext {
    pub context: QuoteContext,
    pub pricing_fallback: bool,
}

/// Fetches everything a quote for `slug` needs.
///
/// The use case itself must exist. Configuration, questions, equipment and
/// pricing are fetched concurrently and each one degrades on failure: no
/// configuration overlay, no industry questions, no catalog equipment, or the
/// built-in pricing constants.
pub async fn load_quote_context(
    repo: &dyn QuoteRepository,
    slug: &str,
    pricing: Option<&str>,
) -> Result<LoadedContext, RepositoryError> {
    let use_case = repo.get_use_case(slug).await?;

    let pricing_lookup = async {
        match pricing {
            Some(name) => repo.get_pricing_scenario(name).await,
            None => repo.get_default_pricing().await,
        }
    };
    let (configuration, questions, equipment, pricing_result) = tokio::join!(
        repo.get_default_configuration(use_case.id),
        repo.list_questions(use_case.id),
        repo.list_use_case_equipment(use_case.id),
        pricing_lookup,
    );

    let builtin = IndustryTemplate::builtin(use_case.industry);
    let template = match configuration {
        Ok(configuration) => {
            debug!(config = %configuration.config_name, "applying use case configuration");
            configuration.apply_to(&builtin)
        }
        Err(e) => {
            warn!(use_case = slug, error = %e, "no configuration, using industry defaults");
            builtin
        }
    };

    let questions = questions.unwrap_or_else(|e| {
        warn!(use_case = slug, error = %e, "questions unavailable, universal questions only");
        Vec::new()
    });

    let equipment = equipment.unwrap_or_else(|e| {
        warn!(use_case = slug, error = %e, "equipment unavailable");
        Vec::new()
    });

    let (pricing, pricing_fallback) = match pricing_result {
        Ok(scenario) => (scenario, false),
        Err(e) => {
            warn!(scenario = ?pricing, error = %e, "pricing unavailable, using fallback constants");
            (PricingScenario::fallback(), true)
        }
    };

    Ok(LoadedContext {
        context: QuoteContext {
            use_case,
            template,
            questions: with_universal_questions(questions),
            equipment,
            pricing,
        },
        pricing_fallback,
    })
}

/// Builds a quote for the session's industry and stores the recommended
/// sizing and financials in `state`.
///
/// Unanswered questions take their declared defaults. Without confirmed
/// goals the session defaults to reducing demand charges. Each wizard step is
/// validated in order, so a failure leaves `state` on the offending step with
/// its error message set.
pub async fn run_quote(
    repo: &dyn QuoteRepository,
    state: &mut WizardState,
    pricing: Option<&str>,
) -> Result<(LoadedContext, Quote), AppError> {
    let slug = state.industry.clone().ok_or(AppError::NoIndustry)?;

    state.begin_loading();
    let loaded = match load_quote_context(repo, &slug, pricing).await {
        Ok(loaded) => loaded,
        Err(e) => {
            state.fail(e.to_string());
            return Err(e.into());
        }
    };
    let ctx = &loaded.context;

    state.apply_defaults(&ctx.questions);
    if !state.goals_confirmed {
        state.confirm_goals(vec![Goal::ReduceDemandCharges]);
    }
    while state.current_step != WizardStep::Results {
        if let Err(e) = state.advance(&ctx.questions) {
            state.fail(e.to_string());
            return Err(e.into());
        }
    }

    let request = QuoteRequest {
        answers: state.answers.clone(),
        add_ons: state.add_ons,
        solar: state.solar.clone(),
    };
    let quote = match QuoteEngine::new(ctx).build(&request) {
        Ok(quote) => quote,
        Err(e) => {
            state.back();
            state.fail(e.to_string());
            return Err(e.into());
        }
    };
    state.finish_quote(&quote, loaded.pricing_fallback);

    info!(
        use_case = %slug,
        bess_kwh = %quote.recommended.system.bess_kwh,
        authenticated = quote.validation.is_authenticated(),
        "quote generated"
    );
    record_event(
        repo,
        NewAnalyticsEvent {
            event_type: "quote_generated".to_string(),
            use_case_slug: Some(slug),
            payload: json!({
                "bess_kw": quote.recommended.system.bess_kw,
                "bess_kwh": quote.recommended.system.bess_kwh,
                "total_cost": quote.recommended.financials.costs.total_cost,
                "authenticated": quote.validation.is_authenticated(),
                "pricing_fallback": loaded.pricing_fallback,
            }),
        },
    )
    .await;

    Ok((loaded, quote))
}

/// Persists the recommended proposal of `quote`.
pub async fn save_quote(
    repo: &dyn QuoteRepository,
    context: &QuoteContext,
    state: &WizardState,
    quote: &Quote,
) -> Result<SavedQuote, RepositoryError> {
    let system = &quote.recommended.system;
    let financials = &quote.recommended.financials;
    let saved = repo
        .create_quote(NewSavedQuote {
            use_case_id: context.use_case.id,
            answers: state.answers.clone(),
            bess_kw: system.bess_kw,
            bess_kwh: system.bess_kwh,
            solar_kw: system.solar_kw,
            generator_kw: system.generator_kw,
            total_cost: financials.costs.total_cost,
            net_cost: financials.net_cost,
            annual_savings: financials.annual_savings,
            payback_years: financials.payback_years,
        })
        .await?;
    info!(id = saved.id, use_case = %context.use_case.slug, "quote saved");

    record_event(
        repo,
        NewAnalyticsEvent {
            event_type: "quote_saved".to_string(),
            use_case_slug: Some(context.use_case.slug.clone()),
            payload: json!({ "quote_id": saved.id }),
        },
    )
    .await;
    Ok(saved)
}

/// Records an analytics event. Failures are logged and otherwise ignored.
pub async fn record_event(
    repo: &dyn QuoteRepository,
    event: NewAnalyticsEvent,
) {
    let event_type = event.event_type.clone();
    if let Err(e) = repo.record_event(event).await {
        warn!(event = %event_type, error = %e, "analytics event dropped");
    }
}
