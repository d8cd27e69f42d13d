//! Create outboxes table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Outbox::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Outbox::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Outbox::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Outbox::PostId).big_integer().not_null())
                    .col(ColumnDef::new(Outbox::PostType).string_len(16).not_null())
                    .col(ColumnDef::new(Outbox::OutboxType).string_len(16).not_null())
                    .col(ColumnDef::new(Outbox::AuthorId).big_integer().not_null())
                    .col(ColumnDef::new(Outbox::PublishedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_outboxes_account")
                            .from(Outbox::Table, Outbox::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_outboxes_post")
                            .from(Outbox::Table, Outbox::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One outbox row per (account, post): an author who also reposts
        // their own post does not get a second row
        manager
            .create_index(
                Index::create()
                    .name("idx_outboxes_account_post")
                    .table(Outbox::Table)
                    .col(Outbox::AccountId)
                    .col(Outbox::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Collection reads: published_at cursor, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_outboxes_account_published")
                    .table(Outbox::Table)
                    .col(Outbox::AccountId)
                    .col((Outbox::PublishedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Outbox::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Outbox {
    #[iden = "outboxes"]
    Table,
    Id,
    AccountId,
    PostId,
    PostType,
    OutboxType,
    AuthorId,
    PublishedAt,
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
