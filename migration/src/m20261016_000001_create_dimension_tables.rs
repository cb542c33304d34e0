use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Provider::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Provider::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Provider::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Provider::Website).string().not_null())
                    .col(
                        ColumnDef::new(Provider::Fee)
                            .decimal_len(10, 4)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Algorithm::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Algorithm::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Algorithm::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        // URL, port and mh_factor are written once when the pool is first seen
        manager
            .create_table(
                Table::create()
                    .table(Pool::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Pool::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Pool::ProviderId).integer().not_null())
                    .col(ColumnDef::new(Pool::AlgorithmId).integer().not_null())
                    .col(ColumnDef::new(Pool::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Pool::Url).string().not_null())
                    .col(ColumnDef::new(Pool::Port).integer().not_null())
                    .col(ColumnDef::new(Pool::MhFactor).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pool_provider_id")
                            .from(Pool::Table, Pool::ProviderId)
                            .to(Provider::Table, Provider::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pool_algorithm_id")
                            .from(Pool::Table, Pool::AlgorithmId)
                            .to(Algorithm::Table, Algorithm::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One pool per provider/algorithm pair
        manager
            .create_index(
                Index::create()
                    .name("idx_pool_provider_algorithm")
                    .table(Pool::Table)
                    .col(Pool::ProviderId)
                    .col(Pool::AlgorithmId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Coin::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coin::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Coin::CoinGeckoId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Coin::Name).string().not_null())
                    .col(ColumnDef::new(Coin::Symbol).string().not_null())
                    .col(
                        ColumnDef::new(Coin::Added)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_coin_symbol")
                    .table(Coin::Table)
                    .col(Coin::Symbol)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Coin::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pool::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Algorithm::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Provider::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Provider {
    Table,
    Id,
    Name,
    Website,
    Fee,
}

#[derive(DeriveIden)]
pub(crate) enum Algorithm {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub(crate) enum Pool {
    Table,
    Id,
    ProviderId,
    AlgorithmId,
    Name,
    Url,
    Port,
    MhFactor,
}

#[derive(DeriveIden)]
pub(crate) enum Coin {
    Table,
    Id,
    CoinGeckoId,
    Name,
    Symbol,
    Added,
}
