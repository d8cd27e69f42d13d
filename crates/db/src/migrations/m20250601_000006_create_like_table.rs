//! Create likes table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LikeTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LikeTable::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LikeTable::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LikeTable::PostId).big_integer().not_null())
                    .col(
                        ColumnDef::new(LikeTable::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_account")
                            .from(LikeTable::Table, LikeTable::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_post")
                            .from(LikeTable::Table, LikeTable::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_likes_account_post")
                    .table(LikeTable::Table)
                    .col(LikeTable::AccountId)
                    .col(LikeTable::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_likes_post_id")
                    .table(LikeTable::Table)
                    .col(LikeTable::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LikeTable::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LikeTable {
    #[iden = "likes"]
    Table,
    Id,
    AccountId,
    PostId,
    CreatedAt,
}

#[derive(Iden)]
enum Account {
    #[iden = "accounts"]
    Table,
    Id,
}

#[derive(Iden)]
enum Post {
    #[iden = "posts"]
    Table,
    Id,
}
