// AlertRepository against a real database; skipped when DATABASE_URL is unset

mod common;

use chrono::NaiveDate;
use meteo_alert_service::db::{AlertFilter, AlertRepository, InsertOutcome, NewAlert, SOURCE_MANUAL};
use serial_test::serial;
use sqlx::PgPool;

const TEST_REGION: &str = "Région de test";

mod alert_fixtures {
    use super::*;

    pub async fn cleanup(pool: &PgPool) {
        sqlx::query("DELETE FROM alerts WHERE region = $1")
            .bind(TEST_REGION)
            .execute(pool)
            .await
            .ok();
    }

    pub fn new_alert(type_label: &str, day: u32) -> NewAlert {
        NewAlert {
            type_label: type_label.to_string(),
            region: TEST_REGION.to_string(),
            department_code: None,
            description: format!("{type_label} en test"),
            date_alert: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            source: SOURCE_MANUAL.to_string(),
        }
    }
}

use alert_fixtures::*;

#[tokio::test]
#[serial]
async fn test_insert_twice_reports_existing() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    cleanup(&pool).await;
    let repo = AlertRepository::new(pool.clone());

    let alert = new_alert("Fortes pluies", 1);
    assert_eq!(repo.insert_if_absent(&alert).await.unwrap(), InsertOutcome::Created);
    assert_eq!(
        repo.insert_if_absent(&alert).await.unwrap(),
        InsertOutcome::AlreadyExists
    );

    let stored = repo
        .find_filtered(&AlertFilter {
            region: Some(TEST_REGION.to_string()),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].alert_type, "Fortes pluies");
    assert!(stored[0].active);

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_insert_many_skips_duplicates() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    cleanup(&pool).await;
    let repo = AlertRepository::new(pool.clone());

    let alerts = vec![
        new_alert("Canicule", 2),
        new_alert("Canicule", 2),
        new_alert("Canicule", 3),
        new_alert("Gel", 2),
    ];
    assert_eq!(repo.insert_many(&alerts).await.unwrap(), 3);
    assert_eq!(repo.insert_many(&alerts).await.unwrap(), 0);

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_filter_by_type_and_dates() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    cleanup(&pool).await;
    let repo = AlertRepository::new(pool.clone());

    repo.insert_many(&[
        new_alert("Brouillard", 5),
        new_alert("Brouillard", 10),
        new_alert("Vent fort", 10),
    ])
    .await
    .unwrap();

    let filter = AlertFilter {
        region: Some(TEST_REGION.to_string()),
        alert_type: Some("Brouillard".to_string()),
        date_from: NaiveDate::from_ymd_opt(2025, 3, 6),
        ..AlertFilter::default()
    };
    let found = repo.find_filtered(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].date_alert, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

    let since = repo
        .find_active_for_region(TEST_REGION, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(since.len(), 3);
    // newest first
    assert!(since[0].date_alert >= since[2].date_alert);

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_long_description_is_truncated() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    cleanup(&pool).await;
    let repo = AlertRepository::new(pool.clone());

    let mut alert = new_alert("Grand froid", 20);
    alert.description = "é".repeat(400);
    repo.insert_if_absent(&alert).await.unwrap();

    let stored = repo
        .find_active_for_region(TEST_REGION, NaiveDate::from_ymd_opt(2025, 3, 20).unwrap())
        .await
        .unwrap();
    assert_eq!(stored[0].description.chars().count(), 255);

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_replace_all_rolls_back_on_failed_insert() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    cleanup(&pool).await;
    let repo = AlertRepository::new(pool.clone());

    repo.insert_if_absent(&new_alert("Canicule", 12)).await.unwrap();
    let before = repo.count().await.unwrap();

    // source is VARCHAR(32)
    let mut broken = new_alert("Orages", 13);
    broken.source = "s".repeat(40);
    let result = repo
        .replace_all(&[new_alert("Fortes pluies", 13), broken])
        .await;

    assert!(result.is_err());
    assert_eq!(repo.count().await.unwrap(), before);
    let kept = repo
        .find_active_for_region(TEST_REGION, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].alert_type, "Canicule");

    cleanup(&pool).await;
}

#[tokio::test]
#[serial]
async fn test_replace_all_swaps_every_alert() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    cleanup(&pool).await;
    let repo = AlertRepository::new(pool.clone());

    repo.insert_if_absent(&new_alert("Canicule", 14)).await.unwrap();
    let before = repo.count().await.unwrap() as u64;

    let (deleted, inserted) = repo
        .replace_all(&[new_alert("Fortes pluies", 15), new_alert("Orages", 15)])
        .await
        .unwrap();

    assert_eq!(deleted, before);
    assert_eq!(inserted, 2);
    assert_eq!(repo.count().await.unwrap(), 2);

    cleanup(&pool).await;
}
