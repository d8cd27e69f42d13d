//! Create key_value table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KeyValue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KeyValue::Key)
                            .string_len(768)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(KeyValue::Value).json().not_null())
                    .col(
                        ColumnDef::new(KeyValue::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(KeyValue::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum KeyValue {
    #[iden = "key_value"]
    Table,
    Key,
    Value,
    UpdatedAt,
}
