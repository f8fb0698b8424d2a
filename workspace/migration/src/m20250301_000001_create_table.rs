use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string(Users::FirstName))
                    .col(string(Users::LastName))
                    .col(boolean(Users::IsVerified).default(false))
                    .col(string_null(Users::VerificationToken))
                    .col(string_null(Users::ResetToken))
                    .col(date_time_null(Users::ResetTokenExpires))
                    .col(date_time(Users::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Users::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Create sessions table
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(pk_auto(Sessions::Id))
                    .col(integer(Sessions::UserId))
                    .col(string(Sessions::TokenHash).unique_key())
                    .col(date_time(Sessions::ExpiresAt))
                    .col(date_time(Sessions::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_user")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create categories table
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string_len(Categories::Name, 100))
                    .col(text_null(Categories::Description))
                    .col(string_len(Categories::Color, 7).default("#007bff"))
                    .col(string_len(Categories::Icon, 50).default("📦"))
                    .col(integer_null(Categories::UserId))
                    .col(boolean(Categories::IsDefault).default(false))
                    .col(date_time(Categories::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Categories::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_user")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Category names are unique per owner; defaults (NULL owner) never collide with user rows
        manager
            .create_index(
                Index::create()
                    .name("idx_categories_user_id_name_unique")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(string_len(Transactions::Title, 255))
                    .col(decimal_len(Transactions::Amount, 10, 2))
                    .col(integer(Transactions::CategoryId))
                    .col(string_len(Transactions::Kind, 10).default("expense"))
                    .col(text_null(Transactions::Description))
                    .col(date(Transactions::Date))
                    .col(integer(Transactions::UserId))
                    .col(date_time(Transactions::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Transactions::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_category")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_user")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_user_id_date")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_category_id")
                    .table(Transactions::Table)
                    .col(Transactions::CategoryId)
                    .to_owned(),
            )
            .await?;

        // Create budgets table
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(pk_auto(Budgets::Id))
                    .col(integer(Budgets::CategoryId))
                    .col(integer(Budgets::UserId))
                    .col(decimal_len(Budgets::Amount, 10, 2))
                    .col(string_len(Budgets::Period, 10).default("monthly"))
                    .col(date(Budgets::StartDate))
                    .col(date(Budgets::EndDate))
                    .col(boolean(Budgets::IsActive).default(true))
                    .col(date_time(Budgets::CreatedAt).default(Expr::current_timestamp()))
                    .col(date_time(Budgets::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_category")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_user")
                            .from(Budgets::Table, Budgets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The end date is deliberately not part of the key
        manager
            .create_index(
                Index::create()
                    .name("idx_budgets_user_category_period_start_unique")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::CategoryId)
                    .col(Budgets::Period)
                    .col(Budgets::StartDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order of creation to respect foreign key constraints
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    IsVerified,
    VerificationToken,
    ResetToken,
    ResetTokenExpires,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Categories {
    Table,
    Id,
    Name,
    Description,
    Color,
    Icon,
    UserId,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    Title,
    Amount,
    CategoryId,
    Kind,
    Description,
    Date,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Budgets {
    Table,
    Id,
    CategoryId,
    UserId,
    Amount,
    Period,
    StartDate,
    EndDate,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
