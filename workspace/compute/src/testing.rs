//! Fixtures shared by the service tests: an in-memory database with migrations applied
//! and raw inserts that bypass service-level validation.

use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use model::entities::{
    budget::{self, BudgetPeriod},
    transaction::{self, TransactionKind},
    user,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub async fn setup_db() -> DatabaseConnection {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await.unwrap();
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

pub async fn insert_user(db: &DatabaseConnection, email: &str) -> user::Model {
    let now = Utc::now().naive_utc();
    user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        is_verified: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_transaction(
    db: &DatabaseConnection,
    user_id: i32,
    category_id: i32,
    kind: TransactionKind,
    amount: &str,
    on: NaiveDate,
) -> transaction::Model {
    let now = Utc::now().naive_utc();
    transaction::ActiveModel {
        title: Set(format!("{} on {}", kind.as_str(), on)),
        amount: Set(dec(amount)),
        category_id: Set(category_id),
        kind: Set(kind),
        description: Set(None),
        date: Set(on),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Inserts a monthly budget directly, skipping amount validation. Returns its id.
pub async fn insert_budget(
    db: &DatabaseConnection,
    user_id: i32,
    category_id: i32,
    amount: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> i32 {
    let now = Utc::now().naive_utc();
    budget::ActiveModel {
        category_id: Set(category_id),
        user_id: Set(user_id),
        amount: Set(dec(amount)),
        period: Set(BudgetPeriod::Monthly),
        start_date: Set(start),
        end_date: Set(end),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}
