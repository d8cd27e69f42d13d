//! Account entity: a fediverse actor, local or remote.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Stable public identifier.
    pub uuid: String,

    pub username: String,

    #[sea_orm(nullable)]
    pub name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    #[sea_orm(nullable)]
    pub url: Option<String>,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    #[sea_orm(nullable)]
    pub banner_image_url: Option<String>,

    /// Canonical `ActivityPub` IRI.
    #[sea_orm(column_type = "Text")]
    pub ap_id: String,

    /// SHA-256 of the lowercased `ap_id`; unique index column.
    #[sea_orm(unique, indexed)]
    pub ap_id_hash: String,

    #[sea_orm(nullable)]
    pub ap_inbox: Option<String>,

    #[sea_orm(nullable)]
    pub ap_shared_inbox: Option<String>,

    #[sea_orm(nullable)]
    pub ap_outbox: Option<String>,

    #[sea_orm(nullable)]
    pub ap_followers: Option<String>,

    #[sea_orm(nullable)]
    pub ap_following: Option<String>,

    #[sea_orm(nullable)]
    pub ap_liked: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub public_key: Option<String>,

    /// Present for internal accounts only.
    #[sea_orm(column_type = "Text", nullable)]
    pub private_key: Option<String>,

    pub domain: String,

    /// SHA-256 of the lowercased domain.
    #[sea_orm(indexed)]
    pub domain_hash: String,

    /// Extra profile fields carried through Update(Actor).
    #[sea_orm(column_type = "Json", nullable)]
    pub custom_fields: Option<Json>,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_one = "super::user::Entity")]
    User,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
