use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackupCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BackupCodes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BackupCodes::UserId).uuid().not_null())
                    .col(ColumnDef::new(BackupCodes::CodeHash).string().not_null())
                    .col(
                        ColumnDef::new(BackupCodes::Used)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BackupCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(BackupCodes::Table, BackupCodes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(BackupCodes::Table)
                    .col(BackupCodes::UserId)
                    .name("idx_backup_codes_user_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BackupCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BackupCodes {
    Table,
    Id,
    UserId,
    CodeHash,
    Used,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
