use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique only among rows where `soft_deleted_at` is NULL; enforced by a
    /// partial index, not by the column.
    #[sea_orm(indexed)]
    pub login_identifier: String,

    pub display_name: Option<String>,

    pub email: Option<String>,

    /// Argon2id PHC string
    pub secret_hash: String,

    pub is_admin: bool,

    pub is_enabled: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,

    pub soft_deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
