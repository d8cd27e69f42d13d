//! Create feeds table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Feed::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Feed::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Feed::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Feed::PostId).big_integer().not_null())
                    .col(ColumnDef::new(Feed::PostType).string_len(16).not_null())
                    .col(ColumnDef::new(Feed::Audience).string_len(16).not_null())
                    .col(ColumnDef::new(Feed::AuthorId).big_integer().not_null())
                    .col(ColumnDef::new(Feed::RepostedById).big_integer().null())
                    .col(
                        ColumnDef::new(Feed::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeds_user")
                            .from(Feed::Table, Feed::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeds_post")
                            .from(Feed::Table, Feed::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Idempotent fan-out: duplicate inserts are ignored on this key
        manager
            .create_index(
                Index::create()
                    .name("idx_feeds_user_post_reposter")
                    .table(Feed::Table)
                    .col(Feed::UserId)
                    .col(Feed::PostId)
                    .col(Feed::RepostedById)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Read path: (user_id, post_type, id DESC)
        manager
            .create_index(
                Index::create()
                    .name("idx_feeds_user_type_id")
                    .table(Feed::Table)
                    .col(Feed::UserId)
                    .col(Feed::PostType)
                    .col((Feed::Id, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Feed::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Feed {
    #[iden = "feeds"]
    Table,
    Id,
    UserId,
    PostId,
    PostType,
    Audience,
    AuthorId,
    RepostedById,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    #[iden = "users"]
    Table,
    Id,
}

#[derive(Iden)]
enum Post {
    #[iden = "posts"]
    Table,
    Id,
}
