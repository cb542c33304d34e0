//! SeaORM Entity for coin price observations. This is a spot price, not OHLC.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_price")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub coin_id: i32,
    pub instant: DateTimeWithTimeZone,
    /// Price in the reference currency (USD)
    #[sea_orm(column_type = "Decimal(Some((16, 8)))")]
    pub price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::coin::Entity",
        from = "Column::CoinId",
        to = "super::coin::Column::Id"
    )]
    Coin,
}

impl Related<super::coin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coin.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
