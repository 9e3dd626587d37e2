//! Server-side wallet store: one opaque JSON document per wallet id.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum WalletBlobs {
    Table,
    Id,
    PasswordHash,
    Document,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WalletBlobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletBlobs::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WalletBlobs::PasswordHash)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletBlobs::Document).text().not_null())
                    .col(
                        ColumnDef::new(WalletBlobs::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletBlobs::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WalletBlobs::Table).to_owned())
            .await
    }
}
