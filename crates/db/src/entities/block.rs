//! Block entity: one account blocking another.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blocks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub blocker_id: i64,

    #[sea_orm(indexed)]
    pub blocked_id: i64,

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

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::BlockedId",
        to = "super::account::Column::Id"
    )]
    Blocked,
}

impl ActiveModelBehavior for ActiveModel {}
