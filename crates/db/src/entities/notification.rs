//! Notification entity.
//!
//! Rows are written by the inbox handlers; the listing surface lives in the
//! admin API, outside this service.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum NotificationKind {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "repost")]
    Repost,
    #[sea_orm(string_value = "reply")]
    Reply,
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "mention")]
    Mention,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// The internal user being notified.
    #[sea_orm(indexed)]
    pub user_id: i64,

    /// The account that triggered the notification.
    pub account_id: i64,

    pub kind: NotificationKind,

    #[sea_orm(nullable)]
    pub post_id: Option<i64>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
