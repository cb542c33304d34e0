use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Miners check in on their own; the harvester only reads them and
        // raises the offline notice flag.
        manager
            .create_table(
                Table::create()
                    .table(Miner::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Miner::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Miner::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Miner::LastCheckIn)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Miner::OfflineNoticeSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Miner::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Miner {
    Table,
    Id,
    Name,
    LastCheckIn,
    OfflineNoticeSent,
}
