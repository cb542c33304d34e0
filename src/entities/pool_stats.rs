//! SeaORM Entity for pool statistics time-series storage

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pool_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub pool_id: i32,
    pub instant: DateTimeWithTimeZone,
    /// Current shared hashrate, in the pool's own unit (see `pool.mh_factor`)
    pub current_hashrate: i64,
    /// Workers currently sharing the pool
    pub workers: i32,
    /// Forward-looking profit estimate per day
    pub profit_estimate: f64,
    /// Actual profit over the trailing 24 hours for shared mining
    pub profit_actual: f64,
    /// Price row used to contextualize the estimates (usually Bitcoin)
    pub coin_price_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pool::Entity",
        from = "Column::PoolId",
        to = "super::pool::Column::Id"
    )]
    Pool,
    #[sea_orm(
        belongs_to = "super::coin_price::Entity",
        from = "Column::CoinPriceId",
        to = "super::coin_price::Column::Id"
    )]
    CoinPrice,
}

impl Related<super::pool::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pool.def()
    }
}

impl Related<super::coin_price::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CoinPrice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
