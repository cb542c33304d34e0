use sea_orm_migration::prelude::*;

use crate::m20261016_000001_create_dimension_tables::{Coin, Pool};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CoinPrice::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CoinPrice::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CoinPrice::CoinId).integer().not_null())
                    .col(
                        ColumnDef::new(CoinPrice::Instant)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CoinPrice::Price)
                            .decimal_len(16, 8)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coin_price_coin_id")
                            .from(CoinPrice::Table, CoinPrice::CoinId)
                            .to(Coin::Table, Coin::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_coin_price_coin_instant")
                    .table(CoinPrice::Table)
                    .col(CoinPrice::CoinId)
                    .col(CoinPrice::Instant)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoolStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoolStats::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PoolStats::PoolId).integer().not_null())
                    .col(
                        ColumnDef::new(PoolStats::Instant)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PoolStats::CurrentHashrate)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoolStats::Workers).integer().not_null())
                    .col(
                        ColumnDef::new(PoolStats::ProfitEstimate)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PoolStats::ProfitActual)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoolStats::CoinPriceId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pool_stats_pool_id")
                            .from(PoolStats::Table, PoolStats::PoolId)
                            .to(Pool::Table, Pool::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pool_stats_coin_price_id")
                            .from(PoolStats::Table, PoolStats::CoinPriceId)
                            .to(CoinPrice::Table, CoinPrice::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Time-series reads are per pool, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_pool_stats_pool_instant")
                    .table(PoolStats::Table)
                    .col(PoolStats::PoolId)
                    .col(PoolStats::Instant)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PoolStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CoinPrice::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CoinPrice {
    Table,
    Id,
    CoinId,
    Instant,
    Price,
}

#[derive(DeriveIden)]
enum PoolStats {
    Table,
    Id,
    PoolId,
    Instant,
    CurrentHashrate,
    Workers,
    ProfitEstimate,
    ProfitActual,
    CoinPriceId,
}
