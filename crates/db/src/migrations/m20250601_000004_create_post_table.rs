//! Create posts table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Post::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Post::Uuid).string_len(36).not_null())
                    .col(ColumnDef::new(Post::Type).string_len(16).not_null())
                    .col(ColumnDef::new(Post::Audience).string_len(16).not_null())
                    .col(ColumnDef::new(Post::Title).string_len(1024).null())
                    .col(ColumnDef::new(Post::Excerpt).text().null())
                    .col(ColumnDef::new(Post::Summary).text().null())
                    .col(ColumnDef::new(Post::Content).text().null())
                    .col(ColumnDef::new(Post::Url).string_len(1024).null())
                    .col(ColumnDef::new(Post::ImageUrl).string_len(1024).null())
                    .col(ColumnDef::new(Post::PublishedAt).date_time().not_null())
                    .col(ColumnDef::new(Post::ApId).text().not_null())
                    .col(ColumnDef::new(Post::ApIdHash).char_len(64).not_null())
                    .col(ColumnDef::new(Post::AuthorId).big_integer().not_null())
                    .col(ColumnDef::new(Post::InReplyTo).big_integer().null())
                    .col(ColumnDef::new(Post::ThreadRoot).big_integer().null())
                    .col(
                        ColumnDef::new(Post::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::RepostCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::ReplyCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::ReadingTimeMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Post::Attachments).json().not_null())
                    .col(ColumnDef::new(Post::Metadata).json().null())
                    .col(ColumnDef::new(Post::DeletedAt).date_time().null())
                    .col(
                        ColumnDef::new(Post::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Post::UpdatedAt).date_time().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_author")
                            .from(Post::Table, Post::AuthorId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_ap_id_hash")
                    .table(Post::Table)
                    .col(Post::ApIdHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_id")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_in_reply_to")
                    .table(Post::Table)
                    .col(Post::InReplyTo)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    #[iden = "posts"]
    Table,
    Id,
    Uuid,
    Type,
    Audience,
    Title,
    Excerpt,
    Summary,
    Content,
    Url,
    ImageUrl,
    PublishedAt,
    ApId,
    ApIdHash,
    AuthorId,
    InReplyTo,
    ThreadRoot,
    LikeCount,
    RepostCount,
    ReplyCount,
    ReadingTimeMinutes,
    Attachments,
    Metadata,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Account {
    #[iden = "accounts"]
    Table,
    Id,
}
