//! Create emoticon table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Emoticon::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Emoticon::EmoticonId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Emoticon::Name).string().not_null())
                    .col(
                        ColumnDef::new(Emoticon::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Emoticon::Icon).string().not_null())
                    .col(
                        ColumnDef::new(Emoticon::ArchiveUrl)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Emoticon::ArchiveSize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Emoticon::Animated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Emoticon::Images).json().not_null())
                    .col(ColumnDef::new(Emoticon::Metadata).json().not_null())
                    .to_owned(),
            )
            .await?;

        // Catalog search filters on name
        manager
            .create_index(
                Index::create()
                    .name("idx_emoticon_name")
                    .table(Emoticon::Table)
                    .col(Emoticon::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Emoticon::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Emoticon {
    Table,
    EmoticonId,
    Name,
    Description,
    Icon,
    ArchiveUrl,
    ArchiveSize,
    Animated,
    Images,
    Metadata,
}
