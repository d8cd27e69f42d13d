//! Outbox entity: one row per activity surfaced in an account's outbox.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::post::PostType;

/// What kind of outbox entry this is.
///
/// Reply entries are kept for bookkeeping but excluded from collection GETs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OutboxType {
    #[sea_orm(string_value = "Original")]
    Original,
    #[sea_orm(string_value = "Reply")]
    Reply,
    #[sea_orm(string_value = "Repost")]
    Repost,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outboxes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub account_id: i64,

    #[sea_orm(indexed)]
    pub post_id: i64,

    pub post_type: PostType,

    pub outbox_type: OutboxType,

    pub author_id: i64,

    pub published_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
