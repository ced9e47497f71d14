use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use quote_core::{
    CategoryEntry, EquipmentAttachment, NewEquipmentTemplate, QuoteRepository, RepositoryError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid record '{name}': {reason}")]
    InvalidRecord { name: String, reason: String },

    #[error("Use case '{0}' not found in database (have you run the seeds?)")]
    UseCaseNotFound(String),

    #[error("Equipment '{0}' appears more than once in the catalog")]
    DuplicateName(String),

    #[error("Equipment '{name}' already exists in category '{existing}'")]
    NameInOtherCategory { name: String, existing: String },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for CatalogLoaderError {
    fn from(err: csv::Error) -> Self {
        CatalogLoaderError::CsvParse(err.to_string())
    }
}

/// One row of an equipment catalog CSV.
///
/// `use_case` is a use case slug; when present the template is attached to
/// that use case with `quantity` units (default 1). `duty_cycle` defaults to 1.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EquipmentRecord {
    pub name: String,
    pub category: String,
    pub nameplate_kw: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub duty_cycle: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub use_case: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub quantity: Option<Decimal>,
}

impl EquipmentRecord {
    fn validate(&self) -> Result<(), CatalogLoaderError> {
        let invalid = |reason: &str| CatalogLoaderError::InvalidRecord {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.category.trim().is_empty() {
            return Err(invalid("category is empty"));
        }
        if self.nameplate_kw <= Decimal::ZERO {
            return Err(invalid("nameplate_kw must be positive"));
        }
        if let Some(duty) = self.duty_cycle
            && (duty <= Decimal::ZERO || duty > Decimal::ONE)
        {
            return Err(invalid("duty_cycle must be in (0, 1]"));
        }
        if let Some(quantity) = self.quantity
            && quantity <= Decimal::ZERO
        {
            return Err(invalid("quantity must be positive"));
        }
        Ok(())
    }

    fn to_template(&self) -> NewEquipmentTemplate {
        NewEquipmentTemplate {
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            nameplate_kw: self.nameplate_kw,
            duty_cycle: self.duty_cycle.unwrap_or(Decimal::ONE),
            description: self.description.clone(),
        }
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub categories: usize,
    pub templates: usize,
    pub attachments: usize,
}

/// Loads equipment templates from CSV through any [`QuoteRepository`].
pub struct EquipmentCatalogLoader;

impl EquipmentCatalogLoader {
    /// Parses and validates every record. Fails on the first bad row.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<EquipmentRecord>, CatalogLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: EquipmentRecord = result?;
            record.validate()?;
            records.push(record);
        }

        Ok(records)
    }

    /// Replaces each category present in `records`.
    ///
    /// Use cases and template names are checked before anything is written.
    /// Each category is then swapped in one repository call, so a failure
    /// leaves that category as it was. Loading the same file twice yields the
    /// same catalog.
    pub async fn load<R: QuoteRepository + ?Sized>(
        repo: &R,
        records: &[EquipmentRecord],
    ) -> Result<LoadSummary, CatalogLoaderError> {
        let mut summary = LoadSummary::default();

        let mut groups: BTreeMap<&str, Vec<&EquipmentRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.category.trim()).or_default().push(record);
        }

        let mut use_case_ids: BTreeMap<&str, i64> = BTreeMap::new();
        for slug in records.iter().filter_map(|r| r.use_case.as_deref()) {
            if use_case_ids.contains_key(slug) {
                continue;
            }
            let use_case = repo.get_use_case(slug).await.map_err(|e| match e {
                RepositoryError::NotFound => CatalogLoaderError::UseCaseNotFound(slug.to_string()),
                other => CatalogLoaderError::Repository(other),
            })?;
            use_case_ids.insert(slug, use_case.id);
        }

        Self::check_names(repo, records).await?;

        for (category, group) in groups {
            let entries: Vec<CategoryEntry> = group
                .iter()
                .map(|record| CategoryEntry {
                    template: record.to_template(),
                    attach_to: record
                        .use_case
                        .as_deref()
                        .and_then(|slug| use_case_ids.get(slug))
                        .map(|&use_case_id| EquipmentAttachment {
                            use_case_id,
                            quantity: record.quantity.unwrap_or(Decimal::ONE),
                        }),
                })
                .collect();

            let inserted = repo.replace_equipment_category(category, &entries).await?;
            debug!(category, templates = inserted.len(), "replaced equipment category");

            summary.categories += 1;
            summary.templates += inserted.len();
            summary.attachments += entries.iter().filter(|e| e.attach_to.is_some()).count();
        }

        info!(
            categories = summary.categories,
            templates = summary.templates,
            attachments = summary.attachments,
            "equipment catalog loaded"
        );
        Ok(summary)
    }

    /// Template names are unique across the catalog: within the file, and
    /// against existing templates of any other category. A template cannot
    /// move between categories in one load.
    async fn check_names<R: QuoteRepository + ?Sized>(
        repo: &R,
        records: &[EquipmentRecord],
    ) -> Result<(), CatalogLoaderError> {
        let mut categories: HashMap<&str, &str> = HashMap::new();
        for record in records {
            if categories
                .insert(record.name.trim(), record.category.trim())
                .is_some()
            {
                return Err(CatalogLoaderError::DuplicateName(record.name.trim().to_string()));
            }
        }

        for existing in repo.list_equipment_templates(None).await? {
            if let Some(&category) = categories.get(existing.name.as_str())
                && category != existing.category
            {
                return Err(CatalogLoaderError::NameInOtherCategory {
                    name: existing.name,
                    existing: existing.category,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const HEADER: &str = "name,category,nameplate_kw,duty_cycle,description,use_case,quantity";

    fn parse(rows: &str) -> Result<Vec<EquipmentRecord>, CatalogLoaderError> {
        EquipmentCatalogLoader::parse(format!("{HEADER}\n{rows}").as_bytes())
    }

    #[test]
    fn test_parse_full_record() {
        let records = parse("ice_machine,kitchen,3.5,0.6,Ice machine,hotel,4").unwrap();

        assert_eq!(
            records,
            vec![EquipmentRecord {
                name: "ice_machine".to_string(),
                category: "kitchen".to_string(),
                nameplate_kw: dec!(3.5),
                duty_cycle: Some(dec!(0.6)),
                description: Some("Ice machine".to_string()),
                use_case: Some("hotel".to_string()),
                quantity: Some(dec!(4)),
            }]
        );
    }

    #[test]
    fn test_parse_optional_columns_blank() {
        let records = parse("air_compressor, shop ,7.5,,,,").unwrap();

        assert_eq!(records[0].category, "shop");
        assert_eq!(records[0].duty_cycle, None);
        assert_eq!(records[0].description, None);
        assert_eq!(records[0].use_case, None);
        assert_eq!(records[0].to_template().duty_cycle, dec!(1));
    }

    #[test]
    fn test_parse_header_only() {
        let records = parse("").unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_missing_column() {
        let err = EquipmentCatalogLoader::parse("name,category\nx,y".as_bytes())
            .expect_err("Should fail for missing column");

        let CatalogLoaderError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "got: {}", msg);
    }

    #[test]
    fn test_parse_bad_decimal() {
        let err = parse("pump,process,abc,1,,,").expect_err("Should fail for bad decimal");

        assert!(matches!(err, CatalogLoaderError::CsvParse(_)));
    }

    #[test]
    fn test_parse_rejects_non_positive_nameplate() {
        let err = parse("pump,process,0,1,,,").expect_err("Should reject zero kW");

        assert_eq!(
            err.to_string(),
            "Invalid record 'pump': nameplate_kw must be positive"
        );
    }

    #[test]
    fn test_parse_rejects_duty_cycle_above_one() {
        let err = parse("pump,process,5,1.2,,,").expect_err("Should reject duty > 1");

        assert_eq!(
            err.to_string(),
            "Invalid record 'pump': duty_cycle must be in (0, 1]"
        );
    }

    #[test]
    fn test_parse_rejects_zero_quantity() {
        let err = parse("pump,process,5,1,,hotel,0").expect_err("Should reject zero quantity");

        assert!(matches!(err, CatalogLoaderError::InvalidRecord { .. }));
    }
}
