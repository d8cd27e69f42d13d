//! Create blocks and domain_blocks tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Block::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Block::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Block::BlockerId).big_integer().not_null())
                    .col(ColumnDef::new(Block::BlockedId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Block::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blocks_blocker")
                            .from(Block::Table, Block::BlockerId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blocks_blocked")
                            .from(Block::Table, Block::BlockedId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_blocker_blocked")
                    .table(Block::Table)
                    .col(Block::BlockerId)
                    .col(Block::BlockedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_blocked_id")
                    .table(Block::Table)
                    .col(Block::BlockedId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DomainBlock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DomainBlock::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::BlockerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::Domain)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::DomainHash)
                            .char_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_domain_blocks_blocker")
                            .from(DomainBlock::Table, DomainBlock::BlockerId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_domain_blocks_blocker_domain")
                    .table(DomainBlock::Table)
                    .col(DomainBlock::BlockerId)
                    .col(DomainBlock::DomainHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DomainBlock::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Block::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Block {
    #[iden = "blocks"]
    Table,
    Id,
    BlockerId,
    BlockedId,
    CreatedAt,
}

#[derive(Iden)]
enum DomainBlock {
    #[iden = "domain_blocks"]
    Table,
    Id,
    BlockerId,
    Domain,
    DomainHash,
    CreatedAt,
}

#[derive(Iden)]
enum Account {
    #[iden = "accounts"]
    Table,
    Id,
}
