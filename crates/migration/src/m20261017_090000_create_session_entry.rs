use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionEntry::Table)
                    .if_not_exists()
                    .col(string(SessionEntry::SessionKey).primary_key())
                    .col(blob(SessionEntry::Value).not_null())
                    .col(timestamp_with_time_zone_null(SessionEntry::ExpiresAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_entry_expires_at")
                    .table(SessionEntry::Table)
                    .col(SessionEntry::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionEntry::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SessionEntry {
    Table,
    SessionKey,
    Value,
    ExpiresAt,
}
