//! Equipment catalog loading against a migrated and seeded SQLite database.

use std::path::Path;

use pretty_assertions::assert_eq;
use quote_core::QuoteRepository;
use quote_data::{CatalogLoaderError, EquipmentCatalogLoader, LoadSummary};
use quote_db_sqlite::SqliteRepository;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const CATALOG_CSV: &str = include_str!("../test-data/equipment_catalog.csv");

async fn setup_test_db_without_seeds() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    repo
}

async fn setup_test_db() -> SqliteRepository {
    let repo = setup_test_db_without_seeds().await;
    repo.run_seeds(Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../quote-db-sqlite/seeds"
    )))
    .await
    .expect("Failed to run seeds");
    repo
}

async fn use_case_id(
    repo: &SqliteRepository,
    slug: &str,
) -> i64 {
    repo.get_use_case(slug)
        .await
        .expect("use case should be seeded")
        .id
}

#[tokio::test]
async fn test_load_catalog_summary() {
    let repo = setup_test_db().await;

    let records = EquipmentCatalogLoader::parse(CATALOG_CSV.as_bytes()).expect("Failed to parse CSV");
    let summary = EquipmentCatalogLoader::load(&repo, &records)
        .await
        .expect("Failed to load catalog");

    assert_eq!(
        summary,
        LoadSummary {
            categories: 2,
            templates: 6,
            attachments: 5,
        }
    );
}

#[tokio::test]
async fn test_load_replaces_existing_category() {
    let repo = setup_test_db().await;
    let retail = use_case_id(&repo, "retail").await;

    let records = EquipmentCatalogLoader::parse(CATALOG_CSV.as_bytes()).unwrap();
    EquipmentCatalogLoader::load(&repo, &records).await.unwrap();

    let refrigeration = repo
        .list_equipment_templates(Some("refrigeration"))
        .await
        .unwrap();
    assert_eq!(refrigeration.len(), 3);

    let equipment = repo.list_use_case_equipment(retail).await.unwrap();
    assert_eq!(equipment.len(), 2);
    assert_eq!(equipment[0].template.name, "walk_in_cooler");
    assert_eq!(equipment[0].template.nameplate_kw, dec!(6.5));
    assert_eq!(equipment[0].quantity, dec!(3));
}

#[tokio::test]
async fn test_load_leaves_other_categories_alone() {
    let repo = setup_test_db().await;
    let warehouse = use_case_id(&repo, "warehouse").await;

    let records = EquipmentCatalogLoader::parse(CATALOG_CSV.as_bytes()).unwrap();
    EquipmentCatalogLoader::load(&repo, &records).await.unwrap();

    let names: Vec<String> = repo
        .list_use_case_equipment(warehouse)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.template.name)
        .collect();
    assert_eq!(names, vec!["blast_freezer", "dock_leveler", "forklift_charger"]);
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let repo = setup_test_db().await;
    let hotel = use_case_id(&repo, "hotel").await;
    let records = EquipmentCatalogLoader::parse(CATALOG_CSV.as_bytes()).unwrap();

    EquipmentCatalogLoader::load(&repo, &records).await.unwrap();
    let first = repo.list_use_case_equipment(hotel).await.unwrap();
    EquipmentCatalogLoader::load(&repo, &records).await.unwrap();
    let second = repo.list_use_case_equipment(hotel).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(
        first.iter().map(|e| e.connected_kw()).collect::<Vec<_>>(),
        second.iter().map(|e| e.connected_kw()).collect::<Vec<_>>()
    );
    assert_eq!(repo.list_equipment_templates(None).await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_unattached_template_is_still_inserted() {
    let repo = setup_test_db().await;

    let records = EquipmentCatalogLoader::parse(CATALOG_CSV.as_bytes()).unwrap();
    EquipmentCatalogLoader::load(&repo, &records).await.unwrap();

    let kitchen = repo.list_equipment_templates(Some("kitchen")).await.unwrap();
    let hood = kitchen
        .iter()
        .find(|t| t.name == "exhaust_hood")
        .expect("exhaust hood should be loaded");
    assert_eq!(hood.duty_cycle, dec!(0.8));
}

#[tokio::test]
async fn test_unknown_use_case_fails_before_any_change() {
    let repo = setup_test_db().await;
    let csv = "name,category,nameplate_kw,duty_cycle,description,use_case,quantity\n\
               cooler,refrigeration,5,0.5,,bakery,1\n";

    let records = EquipmentCatalogLoader::parse(csv.as_bytes()).unwrap();
    let err = EquipmentCatalogLoader::load(&repo, &records)
        .await
        .expect_err("Should fail for unknown use case");

    match err {
        CatalogLoaderError::UseCaseNotFound(slug) => assert_eq!(slug, "bakery"),
        other => panic!("expected UseCaseNotFound, got {other:?}"),
    }
    let refrigeration = repo
        .list_equipment_templates(Some("refrigeration"))
        .await
        .unwrap();
    assert_eq!(refrigeration.len(), 2);
}

#[tokio::test]
async fn test_load_without_seeds_needs_use_cases() {
    let repo = setup_test_db_without_seeds().await;

    let records = EquipmentCatalogLoader::parse(CATALOG_CSV.as_bytes()).unwrap();
    let result = EquipmentCatalogLoader::load(&repo, &records).await;

    assert!(matches!(result, Err(CatalogLoaderError::UseCaseNotFound(_))));
}

#[tokio::test]
async fn test_name_clash_across_categories_fails_before_any_change() {
    let repo = setup_test_db().await;
    let retail = use_case_id(&repo, "retail").await;
    let csv = "name,category,nameplate_kw,duty_cycle,description,use_case,quantity\n\
               new_cooler,refrigeration,7,0.5,,retail,2\n\
               forklift_charger,refrigeration,12,0.4,,retail,1\n";

    let records = EquipmentCatalogLoader::parse(csv.as_bytes()).unwrap();
    let err = EquipmentCatalogLoader::load(&repo, &records)
        .await
        .expect_err("Should fail for a name owned by another category");

    assert_eq!(
        err.to_string(),
        "Equipment 'forklift_charger' already exists in category 'material_handling'"
    );
    let names: Vec<String> = repo
        .list_equipment_templates(Some("refrigeration"))
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["walk_in_cooler", "walk_in_freezer"]);
    assert_eq!(repo.list_use_case_equipment(retail).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_name_in_file_is_rejected() {
    let repo = setup_test_db().await;
    let csv = "name,category,nameplate_kw,duty_cycle,description,use_case,quantity\n\
               fryer,kitchen,14,0.5,,,\n\
               fryer,kitchen,10,0.5,,,\n";

    let records = EquipmentCatalogLoader::parse(csv.as_bytes()).unwrap();
    let result = EquipmentCatalogLoader::load(&repo, &records).await;

    assert!(matches!(result, Err(CatalogLoaderError::DuplicateName(ref name)) if name == "fryer"));
    assert!(repo.list_equipment_templates(Some("kitchen")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replaced_category_survives_another_seed_run() {
    let repo = setup_test_db().await;
    let retail = use_case_id(&repo, "retail").await;
    let csv = "name,category,nameplate_kw,duty_cycle,description,use_case,quantity\n\
               blast_freezer,refrigeration,22,0.7,,retail,1\n";

    let records = EquipmentCatalogLoader::parse(csv.as_bytes()).unwrap();
    EquipmentCatalogLoader::load(&repo, &records).await.unwrap();
    repo.run_seeds(Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../quote-db-sqlite/seeds"
    )))
    .await
    .expect("Seeds should run again");

    let names: Vec<String> = repo
        .list_equipment_templates(Some("refrigeration"))
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["blast_freezer"]);
    assert_eq!(repo.list_use_case_equipment(retail).await.unwrap().len(), 1);
}
