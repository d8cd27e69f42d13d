//! Create mentions table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Mention::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Mention::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Mention::PostId).big_integer().not_null())
                    .col(ColumnDef::new(Mention::AccountId).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mentions_post")
                            .from(Mention::Table, Mention::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mentions_account")
                            .from(Mention::Table, Mention::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mentions_post_account")
                    .table(Mention::Table)
                    .col(Mention::PostId)
                    .col(Mention::AccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Mention::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Mention {
    #[iden = "mentions"]
    Table,
    Id,
    PostId,
    AccountId,
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
