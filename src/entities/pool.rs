//! SeaORM Entity for mining pools
//!
//! A pool is unique per (provider_id, algorithm_id). Connection details are
//! captured on first sighting and are not refreshed afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pool")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub provider_id: i32,
    /// The pool name will not necessarily match the algorithm precisely
    pub algorithm_id: i32,
    pub name: String,
    /// Full stratum host, e.g. "scrypt.na.mine.zergpool.com"
    pub url: String,
    pub port: i32,
    /// Hashrate unit scale: 1 = Mh/s, 0.001 = Kh/s, 1000 = Gh/s
    pub mh_factor: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::provider::Entity",
        from = "Column::ProviderId",
        to = "super::provider::Column::Id"
    )]
    Provider,
    #[sea_orm(
        belongs_to = "super::algorithm::Entity",
        from = "Column::AlgorithmId",
        to = "super::algorithm::Column::Id"
    )]
    Algorithm,
}

impl Related<super::provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl Related<super::algorithm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Algorithm.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
