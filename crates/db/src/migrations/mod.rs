//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_account_table;
mod m20250601_000002_create_site_table;
mod m20250601_000003_create_user_table;
mod m20250601_000004_create_post_table;
mod m20250601_000005_create_follow_table;
mod m20250601_000006_create_like_table;
mod m20250601_000007_create_repost_table;
mod m20250601_000008_create_mention_table;
mod m20250601_000009_create_block_tables;
mod m20250601_000010_create_feed_table;
mod m20250601_000011_create_outbox_table;
mod m20250601_000012_create_notification_table;
mod m20250601_000013_create_key_value_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_account_table::Migration),
            Box::new(m20250601_000002_create_site_table::Migration),
            Box::new(m20250601_000003_create_user_table::Migration),
            Box::new(m20250601_000004_create_post_table::Migration),
            Box::new(m20250601_000005_create_follow_table::Migration),
            Box::new(m20250601_000006_create_like_table::Migration),
            Box::new(m20250601_000007_create_repost_table::Migration),
            Box::new(m20250601_000008_create_mention_table::Migration),
            Box::new(m20250601_000009_create_block_tables::Migration),
            Box::new(m20250601_000010_create_feed_table::Migration),
            Box::new(m20250601_000011_create_outbox_table::Migration),
            Box::new(m20250601_000012_create_notification_table::Migration),
            Box::new(m20250601_000013_create_key_value_table::Migration),
        ]
    }
}
