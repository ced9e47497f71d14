use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quote_core::{
    CategoryEntry, CustomQuestion, EquipmentTemplate, IndustryKey, NewAnalyticsEvent,
    NewSavedQuote, PricingScenario, QuestionType, QuoteRepository, RepositoryError, SavedQuote,
    UseCase, UseCaseConfiguration, UseCaseEquipment,
};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use tracing::{debug, info};

use crate::decimal::{decimal_to_f64, get_decimal, get_json, get_optional_decimal, to_json};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url`, creating the file if it does not exist.
    /// Accepts `sqlite:` URLs, bare paths and `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite:{}", database_url)
        };
        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        debug!(url = %url, "connected to sqlite");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Executes each `.sql` file in `seeds_dir` in filename order, once per
    /// database. Applied files are recorded in `applied_seeds` in the same
    /// transaction as their statements, so later runs skip them and catalog
    /// edits made since are kept.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();

            let applied: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM applied_seeds WHERE file_name = ?")
                    .bind(&file_name)
                    .fetch_optional(&self.pool)
                    .await
                    .context("Failed to read applied seeds")?;
            if applied.is_some() {
                debug!(file = %file_name, "seed already applied");
                continue;
            }

            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            let mut tx = self.pool.begin().await.context("Failed to begin seed transaction")?;
            let outcome = match sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&sql)).await {
                Ok(_) => sqlx::query("INSERT INTO applied_seeds (file_name) VALUES (?)")
                    .bind(&file_name)
                    .execute(&mut *tx)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                tx.rollback().await.context("Failed to roll back seed transaction")?;
                return Err(e)
                    .with_context(|| format!("Failed to execute seed file '{}'", path.display()));
            }
            tx.commit()
                .await
                .with_context(|| format!("Failed to commit seed file '{}'", path.display()))?;
            info!(file = %path.display(), "seed applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get<'r, T>(
    row: &'r SqliteRow,
    column: &str,
) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(db_err)
}

const USE_CASE_COLUMNS: &str = "id, slug, name, description, industry, is_active";

fn row_to_use_case(row: &SqliteRow) -> Result<UseCase, RepositoryError> {
    let industry: String = get(row, "industry")?;
    Ok(UseCase {
        id: get(row, "id")?,
        slug: get(row, "slug")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        industry: IndustryKey::parse(&industry)
            .ok_or_else(|| RepositoryError::Database(format!("Invalid industry: {}", industry)))?,
        is_active: get(row, "is_active")?,
    })
}

const CONFIGURATION_COLUMNS: &str = "id, use_case_id, config_name, is_default, typical_load_kw, \
     peak_load_kw, preferred_duration_hours, operating_hours_per_day, operating_days_per_year";

fn row_to_configuration(row: &SqliteRow) -> Result<UseCaseConfiguration, RepositoryError> {
    Ok(UseCaseConfiguration {
        id: get(row, "id")?,
        use_case_id: get(row, "use_case_id")?,
        config_name: get(row, "config_name")?,
        is_default: get(row, "is_default")?,
        typical_load_kw: get_decimal(row, "typical_load_kw")?,
        peak_load_kw: get_decimal(row, "peak_load_kw")?,
        preferred_duration_hours: get_decimal(row, "preferred_duration_hours")?,
        operating_hours_per_day: get_decimal(row, "operating_hours_per_day")?,
        operating_days_per_year: get_decimal(row, "operating_days_per_year")?,
    })
}

fn row_to_question(row: &SqliteRow) -> Result<CustomQuestion, RepositoryError> {
    let kind: String = get(row, "question_type")?;
    Ok(CustomQuestion {
        id: get(row, "id")?,
        use_case_id: get(row, "use_case_id")?,
        field_name: get(row, "field_name")?,
        question_text: get(row, "question_text")?,
        question_type: QuestionType::parse(&kind)
            .ok_or_else(|| RepositoryError::Database(format!("Invalid question type: {}", kind)))?,
        default_value: get(row, "default_value")?,
        unit: get(row, "unit")?,
        options: get_json(row, "options")?,
        help_text: get(row, "help_text")?,
        is_required: get(row, "is_required")?,
        display_order: get(row, "display_order")?,
    })
}

const TEMPLATE_COLUMNS: &str = "id, name, category, nameplate_kw, duty_cycle, description";

fn row_to_template(row: &SqliteRow) -> Result<EquipmentTemplate, RepositoryError> {
    Ok(EquipmentTemplate {
        id: get(row, "id")?,
        name: get(row, "name")?,
        category: get(row, "category")?,
        nameplate_kw: get_decimal(row, "nameplate_kw")?,
        duty_cycle: get_decimal(row, "duty_cycle")?,
        description: get(row, "description")?,
    })
}

const PRICING_COLUMNS: &str = "id, name, bess_cost_per_kwh, solar_cost_per_watt, \
     generator_cost_per_kw, installation_factor, electricity_rate, demand_charge_per_kw, \
     peak_offpeak_spread, annual_cycles, round_trip_efficiency, itc_rate, is_default";

fn row_to_pricing(row: &SqliteRow) -> Result<PricingScenario, RepositoryError> {
    Ok(PricingScenario {
        id: get(row, "id")?,
        name: get(row, "name")?,
        bess_cost_per_kwh: get_decimal(row, "bess_cost_per_kwh")?,
        solar_cost_per_watt: get_decimal(row, "solar_cost_per_watt")?,
        generator_cost_per_kw: get_decimal(row, "generator_cost_per_kw")?,
        installation_factor: get_decimal(row, "installation_factor")?,
        electricity_rate: get_decimal(row, "electricity_rate")?,
        demand_charge_per_kw: get_decimal(row, "demand_charge_per_kw")?,
        peak_offpeak_spread: get_decimal(row, "peak_offpeak_spread")?,
        annual_cycles: get_decimal(row, "annual_cycles")?,
        round_trip_efficiency: get_decimal(row, "round_trip_efficiency")?,
        itc_rate: get_decimal(row, "itc_rate")?,
        is_default: get(row, "is_default")?,
    })
}

const QUOTE_COLUMNS: &str = "id, use_case_id, answers, bess_kw, bess_kwh, solar_kw, \
     generator_kw, total_cost, net_cost, annual_savings, payback_years, created_at, updated_at";

fn row_to_saved_quote(row: &SqliteRow) -> Result<SavedQuote, RepositoryError> {
    Ok(SavedQuote {
        id: get(row, "id")?,
        use_case_id: get(row, "use_case_id")?,
        answers: get_json(row, "answers")?,
        bess_kw: get_decimal(row, "bess_kw")?,
        bess_kwh: get_decimal(row, "bess_kwh")?,
        solar_kw: get_decimal(row, "solar_kw")?,
        generator_kw: get_decimal(row, "generator_kw")?,
        total_cost: get_decimal(row, "total_cost")?,
        net_cost: get_decimal(row, "net_cost")?,
        annual_savings: get_decimal(row, "annual_savings")?,
        payback_years: get_optional_decimal(row, "payback_years")?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

/// Delete-then-insert for one category on a single connection. Returns the
/// number of templates removed and the inserted ones.
async fn replace_category_in(
    conn: &mut SqliteConnection,
    category: &str,
    entries: &[CategoryEntry],
) -> Result<(u64, Vec<EquipmentTemplate>), RepositoryError> {
    let removed = sqlx::query("DELETE FROM equipment_templates WHERE category = ?")
        .bind(category)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?
        .rows_affected();

    let mut inserted = Vec::with_capacity(entries.len());
    for entry in entries {
        let template = &entry.template;
        let id = sqlx::query(
            "INSERT INTO equipment_templates (name, category, nameplate_kw, duty_cycle, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&template.name)
        .bind(category)
        .bind(decimal_to_f64(template.nameplate_kw))
        .bind(decimal_to_f64(template.duty_cycle))
        .bind(&template.description)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        if let Some(attach) = entry.attach_to {
            sqlx::query(
                "INSERT INTO use_case_equipment (use_case_id, template_id, quantity) VALUES (?, ?, ?)",
            )
            .bind(attach.use_case_id)
            .bind(id)
            .bind(decimal_to_f64(attach.quantity))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM equipment_templates WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_err)?;
        inserted.push(row_to_template(&row)?);
    }

    Ok((removed, inserted))
}

#[async_trait]
impl QuoteRepository for SqliteRepository {
    async fn list_use_cases(
        &self,
        active_only: bool,
    ) -> Result<Vec<UseCase>, RepositoryError> {
        let sql = if active_only {
            format!("SELECT {USE_CASE_COLUMNS} FROM use_cases WHERE is_active = 1 ORDER BY name")
        } else {
            format!("SELECT {USE_CASE_COLUMNS} FROM use_cases ORDER BY name")
        };
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_use_case).collect()
    }

    async fn get_use_case(
        &self,
        slug: &str,
    ) -> Result<UseCase, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USE_CASE_COLUMNS} FROM use_cases WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_use_case(&row)
    }

    async fn list_configurations(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseConfiguration>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM use_case_configurations
             WHERE use_case_id = ? ORDER BY id"
        ))
        .bind(use_case_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_configuration).collect()
    }

    async fn get_default_configuration(
        &self,
        use_case_id: i64,
    ) -> Result<UseCaseConfiguration, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM use_case_configurations
             WHERE use_case_id = ? ORDER BY is_default DESC, id LIMIT 1"
        ))
        .bind(use_case_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_configuration(&row)
    }

    async fn list_questions(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<CustomQuestion>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, use_case_id, field_name, question_text, question_type, default_value,
                    unit, options, help_text, is_required, display_order
             FROM custom_questions WHERE use_case_id = ? ORDER BY display_order, id",
        )
        .bind(use_case_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_question).collect()
    }

    async fn list_equipment_templates(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError> {
        let rows = match category {
            Some(category) => {
                sqlx::query(&format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM equipment_templates
                     WHERE category = ? ORDER BY name"
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM equipment_templates ORDER BY category, name"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_template).collect()
    }

    async fn replace_equipment_category(
        &self,
        category: &str,
        entries: &[CategoryEntry],
    ) -> Result<Vec<EquipmentTemplate>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        match replace_category_in(&mut tx, category, entries).await {
            Ok((removed, inserted)) => {
                tx.commit().await.map_err(db_err)?;
                debug!(category, removed, inserted = inserted.len(), "equipment category replaced");
                Ok(inserted)
            }
            Err(e) => {
                tx.rollback().await.map_err(db_err)?;
                Err(e)
            }
        }
    }

    async fn list_use_case_equipment(
        &self,
        use_case_id: i64,
    ) -> Result<Vec<UseCaseEquipment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT e.id AS equipment_id, e.use_case_id, e.quantity,
                    t.id, t.name, t.category, t.nameplate_kw, t.duty_cycle, t.description
             FROM use_case_equipment e
             JOIN equipment_templates t ON t.id = e.template_id
             WHERE e.use_case_id = ?
             ORDER BY t.name",
        )
        .bind(use_case_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok(UseCaseEquipment {
                    id: get(row, "equipment_id")?,
                    use_case_id: get(row, "use_case_id")?,
                    template: row_to_template(row)?,
                    quantity: get_decimal(row, "quantity")?,
                })
            })
            .collect()
    }

    async fn get_pricing_scenario(
        &self,
        name: &str,
    ) -> Result<PricingScenario, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRICING_COLUMNS} FROM pricing_scenarios WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_pricing(&row)
    }

    async fn get_default_pricing(&self) -> Result<PricingScenario, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRICING_COLUMNS} FROM pricing_scenarios
             WHERE is_default = 1 ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_pricing(&row)
    }

    async fn list_pricing_scenarios(&self) -> Result<Vec<PricingScenario>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRICING_COLUMNS} FROM pricing_scenarios ORDER BY is_default DESC, name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_pricing).collect()
    }

    async fn create_quote(
        &self,
        quote: NewSavedQuote,
    ) -> Result<SavedQuote, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO saved_quotes (
                use_case_id, answers, bess_kw, bess_kwh, solar_kw, generator_kw,
                total_cost, net_cost, annual_savings, payback_years, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(quote.use_case_id)
        .bind(to_json(&quote.answers)?)
        .bind(decimal_to_f64(quote.bess_kw))
        .bind(decimal_to_f64(quote.bess_kwh))
        .bind(decimal_to_f64(quote.solar_kw))
        .bind(decimal_to_f64(quote.generator_kw))
        .bind(decimal_to_f64(quote.total_cost))
        .bind(decimal_to_f64(quote.net_cost))
        .bind(decimal_to_f64(quote.annual_savings))
        .bind(quote.payback_years.map(decimal_to_f64))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_quote(result.last_insert_rowid()).await
    }

    async fn get_quote(
        &self,
        id: i64,
    ) -> Result<SavedQuote, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {QUOTE_COLUMNS} FROM saved_quotes WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_saved_quote(&row)
    }

    async fn update_quote(
        &self,
        quote: &SavedQuote,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE saved_quotes SET
                use_case_id = ?, answers = ?, bess_kw = ?, bess_kwh = ?, solar_kw = ?,
                generator_kw = ?, total_cost = ?, net_cost = ?, annual_savings = ?,
                payback_years = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(quote.use_case_id)
        .bind(to_json(&quote.answers)?)
        .bind(decimal_to_f64(quote.bess_kw))
        .bind(decimal_to_f64(quote.bess_kwh))
        .bind(decimal_to_f64(quote.solar_kw))
        .bind(decimal_to_f64(quote.generator_kw))
        .bind(decimal_to_f64(quote.total_cost))
        .bind(decimal_to_f64(quote.net_cost))
        .bind(decimal_to_f64(quote.annual_savings))
        .bind(quote.payback_years.map(decimal_to_f64))
        .bind(Utc::now())
        .bind(quote.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_quote(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM saved_quotes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_quotes(
        &self,
        use_case_id: Option<i64>,
    ) -> Result<Vec<SavedQuote>, RepositoryError> {
        let rows = match use_case_id {
            Some(id) => {
                sqlx::query(&format!(
                    "SELECT {QUOTE_COLUMNS} FROM saved_quotes
                     WHERE use_case_id = ? ORDER BY updated_at DESC, id DESC"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {QUOTE_COLUMNS} FROM saved_quotes ORDER BY updated_at DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        rows.iter().map(row_to_saved_quote).collect()
    }

    async fn record_event(
        &self,
        event: NewAnalyticsEvent,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO analytics_events (event_type, use_case_slug, payload, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&event.event_type)
        .bind(&event.use_case_slug)
        .bind(to_json(&event.payload)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
