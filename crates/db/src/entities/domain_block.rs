//! Domain block entity: one account blocking an entire domain.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "domain_blocks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub blocker_id: i64,

    pub domain: String,

    /// SHA-256 of the lowercased domain.
    #[sea_orm(indexed)]
    pub domain_hash: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::BlockerId",
        to = "super::account::Column::Id"
    )]
    Blocker,
}

impl ActiveModelBehavior for ActiveModel {}
