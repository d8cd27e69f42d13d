//! Feed entity: one row per post visible in a user's materialized feed.
//!
//! `id` is the pagination cursor; the feed is read in descending id order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::post::{Audience, PostType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feeds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub user_id: i64,

    #[sea_orm(indexed)]
    pub post_id: i64,

    pub post_type: PostType,

    pub audience: Audience,

    pub author_id: i64,

    /// Set when the post entered the feed via a repost.
    #[sea_orm(nullable)]
    pub reposted_by_id: Option<i64>,

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
