//! Follow entity: a follower edge between accounts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub follower_id: i64,

    #[sea_orm(indexed)]
    pub following_id: i64,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::FollowerId",
        to = "super::account::Column::Id"
    )]
    Follower,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::FollowingId",
        to = "super::account::Column::Id"
    )]
    Following,
}

impl ActiveModelBehavior for ActiveModel {}
