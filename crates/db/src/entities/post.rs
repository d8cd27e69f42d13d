//! Post entity: authored content, local or remote.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `ActivityPub` object type of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PostType {
    #[sea_orm(string_value = "Article")]
    Article,
    #[sea_orm(string_value = "Note")]
    Note,
    #[sea_orm(string_value = "Tombstone")]
    Tombstone,
}

/// Who a post is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Audience {
    #[sea_orm(string_value = "Public")]
    Public,
    #[sea_orm(string_value = "FollowersOnly")]
    FollowersOnly,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub uuid: String,

    #[sea_orm(column_name = "type")]
    pub kind: PostType,

    pub audience: Audience,

    #[sea_orm(nullable)]
    pub title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub excerpt: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    #[sea_orm(nullable)]
    pub url: Option<String>,

    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    pub published_at: DateTimeUtc,

    /// Canonical `ActivityPub` IRI.
    #[sea_orm(column_type = "Text")]
    pub ap_id: String,

    /// SHA-256 of the lowercased `ap_id`; unique index column.
    #[sea_orm(unique, indexed)]
    pub ap_id_hash: String,

    #[sea_orm(indexed)]
    pub author_id: i64,

    /// Local id of the post this replies to.
    #[sea_orm(nullable, indexed)]
    pub in_reply_to: Option<i64>,

    /// Local id of the root of the reply thread.
    #[sea_orm(nullable, indexed)]
    pub thread_root: Option<i64>,

    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    #[sea_orm(default_value = 0)]
    pub repost_count: i32,

    #[sea_orm(default_value = 0)]
    pub reply_count: i32,

    #[sea_orm(default_value = 0)]
    pub reading_time_minutes: i32,

    /// Ordered list of `{type, mediaType, name, url}` attachments.
    #[sea_orm(column_type = "Json")]
    pub attachments: Json,

    #[sea_orm(column_type = "Json", nullable)]
    pub metadata: Option<Json>,

    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AuthorId",
        to = "super::account::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::InReplyTo",
        to = "Column::Id"
    )]
    ReplyTarget,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this post has been tombstoned.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this post is a reply.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.in_reply_to.is_some()
    }
}
