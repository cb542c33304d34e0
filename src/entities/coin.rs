//! SeaORM Entity for the CoinGecko coin catalog

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "coin")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// CoinGecko identifier (e.g. "bitcoin")
    #[sea_orm(unique)]
    pub coin_gecko_id: String,
    pub name: String,
    pub symbol: String,
    /// When the coin was first seen; can be used to track new listings
    pub added: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
