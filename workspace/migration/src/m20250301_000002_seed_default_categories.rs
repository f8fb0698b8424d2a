use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_table::Categories;

/// System categories visible to every user: (name, description, color, icon).
const DEFAULT_CATEGORIES: [(&str, &str, &str, &str); 10] = [
    ("Food & Dining", "Restaurants, groceries, and food delivery", "#ff6b6b", "🍽️"),
    ("Transportation", "Gas, public transport, rideshare, parking", "#4ecdc4", "🚗"),
    ("Shopping", "Clothing, electronics, and general shopping", "#45b7d1", "🛍️"),
    ("Entertainment", "Movies, games, subscriptions, hobbies", "#96ceb4", "🎬"),
    ("Bills & Utilities", "Rent, electricity, water, internet, phone", "#feca57", "💡"),
    ("Healthcare", "Medical expenses, pharmacy, insurance", "#ff9ff3", "🏥"),
    ("Education", "Books, courses, tuition, training", "#54a0ff", "📚"),
    ("Travel", "Hotels, flights, vacation expenses", "#5f27cd", "✈️"),
    ("Income", "Salary, freelance, investments, other income", "#00d2d3", "💰"),
    ("Other", "Miscellaneous expenses", "#c7ecee", "📦"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert.into_table(Categories::Table).columns([
            Categories::Name,
            Categories::Description,
            Categories::Color,
            Categories::Icon,
            Categories::IsDefault,
        ]);

        for (name, description, color, icon) in DEFAULT_CATEGORIES {
            insert.values_panic([
                name.into(),
                description.into(),
                color.into(),
                icon.into(),
                true.into(),
            ]);
        }

        manager.exec_stmt(insert.to_owned()).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Categories::Table)
            .and_where(Expr::col(Categories::IsDefault).eq(true))
            .and_where(Expr::col(Categories::UserId).is_null())
            .to_owned();

        manager.exec_stmt(delete).await
    }
}
