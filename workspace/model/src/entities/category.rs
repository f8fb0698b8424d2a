use sea_orm::entity::prelude::*;

pub const DEFAULT_COLOR: &str = "#007bff";
pub const DEFAULT_ICON: &str = "📦";

/// A grouping for transactions and budgets.
/// Either a system default (`user_id` is null, `is_default` is set) or owned by exactly one user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Hex color, e.g. `#ff6b6b`.
    pub color: String,
    pub icon: String,
    pub user_id: Option<i32>,
    #[sea_orm(default_value = "false")]
    pub is_default: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
    #[sea_orm(has_many = "super::budget::Entity")]
    Budget,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `user_id` may see this category.
    pub fn is_visible_to(&self, user_id: i32) -> bool {
        self.is_default || self.user_id == Some(user_id)
    }

    /// Whether `user_id` may modify or delete this category. Defaults are immutable.
    pub fn is_owned_by(&self, user_id: i32) -> bool {
        !self.is_default && self.user_id == Some(user_id)
    }
}
