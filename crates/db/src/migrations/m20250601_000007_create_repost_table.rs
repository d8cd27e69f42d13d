//! Create reposts table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repost::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repost::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repost::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Repost::PostId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Repost::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reposts_account")
                            .from(Repost::Table, Repost::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reposts_post")
                            .from(Repost::Table, Repost::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reposts_account_post")
                    .table(Repost::Table)
                    .col(Repost::AccountId)
                    .col(Repost::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reposts_post_id")
                    .table(Repost::Table)
                    .col(Repost::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Repost::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Repost {
    #[iden = "reposts"]
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
