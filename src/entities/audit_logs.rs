use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub action: String,
    pub actor_account_id: Option<i32>,
    pub target_account_id: Option<i32>,
    /// Identifier at the time of the event, kept for accounts purged later.
    pub login_identifier: Option<String>,
    pub request_id: Option<String>,
    /// JSON document
    pub changes: Option<String>,
    pub success: bool,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
