//! Create accounts table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Account::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Account::Uuid).string_len(36).not_null())
                    .col(ColumnDef::new(Account::Username).string_len(255).not_null())
                    .col(ColumnDef::new(Account::Name).string_len(512).null())
                    .col(ColumnDef::new(Account::Bio).text().null())
                    .col(ColumnDef::new(Account::Url).string_len(1024).null())
                    .col(ColumnDef::new(Account::AvatarUrl).string_len(1024).null())
                    .col(
                        ColumnDef::new(Account::BannerImageUrl)
                            .string_len(1024)
                            .null(),
                    )
                    .col(ColumnDef::new(Account::ApId).text().not_null())
                    .col(
                        ColumnDef::new(Account::ApIdHash)
                            .char_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Account::ApInbox).string_len(1024).null())
                    .col(
                        ColumnDef::new(Account::ApSharedInbox)
                            .string_len(1024)
                            .null(),
                    )
                    .col(ColumnDef::new(Account::ApOutbox).string_len(1024).null())
                    .col(ColumnDef::new(Account::ApFollowers).string_len(1024).null())
                    .col(ColumnDef::new(Account::ApFollowing).string_len(1024).null())
                    .col(ColumnDef::new(Account::ApLiked).string_len(1024).null())
                    .col(ColumnDef::new(Account::PublicKey).text().null())
                    .col(ColumnDef::new(Account::PrivateKey).text().null())
                    .col(ColumnDef::new(Account::Domain).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Account::DomainHash)
                            .char_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Account::CustomFields).json().null())
                    .col(
                        ColumnDef::new(Account::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Account::UpdatedAt).date_time().null())
                    .to_owned(),
            )
            .await?;

        // Unique index: canonical ap_id (hashed, IRIs exceed key length limits)
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_ap_id_hash")
                    .table(Account::Table)
                    .col(Account::ApIdHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: domain_hash (for domain block checks)
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_domain_hash")
                    .table(Account::Table)
                    .col(Account::DomainHash)
                    .to_owned(),
            )
            .await?;

        // Index: username (actor dispatcher lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_username")
                    .table(Account::Table)
                    .col(Account::Username)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Account::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Account {
    #[iden = "accounts"]
    Table,
    Id,
    Uuid,
    Username,
    Name,
    Bio,
    Url,
    AvatarUrl,
    BannerImageUrl,
    ApId,
    ApIdHash,
    ApInbox,
    ApSharedInbox,
    ApOutbox,
    ApFollowers,
    ApFollowing,
    ApLiked,
    PublicKey,
    PrivateKey,
    Domain,
    DomainHash,
    CustomFields,
    CreatedAt,
    UpdatedAt,
}
