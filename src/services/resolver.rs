//! Entity resolver / upsert engine
//!
//! Maps natural keys to dimension rows, creating a row the first time a key
//! is seen. Lookups go cache -> database -> insert. Inserts run inside a
//! savepoint so that a unique-constraint collision (another run created the
//! same key in the meantime) can be rolled back and re-fetched without
//! poisoning the run's transaction.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, Set, TransactionTrait, TryInsertResult,
};
use std::collections::{HashMap, HashSet};

use crate::config::ProviderConfig;
use crate::entities::{algorithm, coin, pool, prelude::*, provider};
use crate::error::{is_unique_violation, IngestError, Result};
use crate::services::coingecko::CoinListEntry;

/// Rows per multi-row insert when syncing the coin catalog
const CATALOG_CHUNK_SIZE: usize = 1000;

/// Values a new pool row is created with. Ignored when the pool exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolDefaults {
    pub name: String,
    pub url: String,
    pub port: i32,
    pub mh_factor: f64,
}

pub struct Resolver<'a> {
    txn: &'a DatabaseTransaction,
    algorithms: HashMap<String, i32>,
    pools: HashMap<(i32, i32), pool::Model>,
    coins: HashMap<String, i32>,
}

impl<'a> Resolver<'a> {
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self {
            txn,
            algorithms: HashMap::new(),
            pools: HashMap::new(),
            coins: HashMap::new(),
        }
    }

    /// Provider keyed by name. Website and fee are only used on creation.
    pub async fn resolve_provider(&mut self, config: &ProviderConfig) -> Result<provider::Model> {
        if let Some(existing) = self.find_provider(&config.name).await? {
            return Ok(existing);
        }

        let model = provider::ActiveModel {
            name: Set(config.name.clone()),
            website: Set(config.website.clone()),
            fee: Set(config.fee),
            ..Default::default()
        };

        match insert_unique(self.txn, model).await? {
            Some(created) => {
                tracing::info!(provider = %created.name, "Created provider");
                Ok(created)
            }
            None => self
                .find_provider(&config.name)
                .await?
                .ok_or_else(|| vanished("provider", &config.name)),
        }
    }

    pub async fn resolve_algorithm(&mut self, name: &str) -> Result<i32> {
        if let Some(id) = self.algorithms.get(name) {
            return Ok(*id);
        }

        let id = match self.find_algorithm(name).await? {
            Some(existing) => existing.id,
            None => {
                let model = algorithm::ActiveModel {
                    name: Set(name.to_string()),
                    ..Default::default()
                };
                match insert_unique(self.txn, model).await? {
                    Some(created) => {
                        tracing::info!(algorithm = name, "Created algorithm");
                        created.id
                    }
                    None => {
                        self.find_algorithm(name)
                            .await?
                            .ok_or_else(|| vanished("algorithm", name))?
                            .id
                    }
                }
            }
        };

        self.algorithms.insert(name.to_string(), id);
        Ok(id)
    }

    /// Pool keyed by (provider, algorithm). An existing pool is returned as
    /// stored, even if the upstream port or scale factor has since changed.
    pub async fn resolve_pool(
        &mut self,
        provider_id: i32,
        algorithm_id: i32,
        defaults: PoolDefaults,
    ) -> Result<pool::Model> {
        let key = (provider_id, algorithm_id);
        if let Some(cached) = self.pools.get(&key) {
            return Ok(cached.clone());
        }

        let resolved = match self.find_pool(provider_id, algorithm_id).await? {
            Some(existing) => {
                if existing.port != defaults.port || existing.mh_factor != defaults.mh_factor {
                    tracing::debug!(
                        pool = %existing.name,
                        stored_port = existing.port,
                        reported_port = defaults.port,
                        stored_mh_factor = existing.mh_factor,
                        reported_mh_factor = defaults.mh_factor,
                        "Pool metadata differs from upstream, keeping stored values"
                    );
                }
                existing
            }
            None => {
                let model = pool::ActiveModel {
                    provider_id: Set(provider_id),
                    algorithm_id: Set(algorithm_id),
                    name: Set(defaults.name.clone()),
                    url: Set(defaults.url.clone()),
                    port: Set(defaults.port),
                    mh_factor: Set(defaults.mh_factor),
                    ..Default::default()
                };
                match insert_unique(self.txn, model).await? {
                    Some(created) => {
                        tracing::info!(
                            pool = %created.name,
                            url = %created.url,
                            port = created.port,
                            "Created pool"
                        );
                        created
                    }
                    None => self
                        .find_pool(provider_id, algorithm_id)
                        .await?
                        .ok_or_else(|| vanished("pool", &defaults.name))?,
                }
            }
        };

        self.pools.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Coin keyed by CoinGecko id; `now` becomes the first-seen timestamp
    pub async fn resolve_coin(&mut self, entry: &CoinListEntry, now: DateTime<Utc>) -> Result<i32> {
        if let Some(id) = self.find_coin_id(&entry.id).await? {
            return Ok(id);
        }

        let model = coin::ActiveModel {
            coin_gecko_id: Set(entry.id.clone()),
            name: Set(entry.name.clone()),
            symbol: Set(entry.symbol.clone()),
            added: Set(now.into()),
            ..Default::default()
        };

        let id = match insert_unique(self.txn, model).await? {
            Some(created) => {
                tracing::info!(coin = %entry.id, "Created coin");
                created.id
            }
            None => self
                .find_coin_id(&entry.id)
                .await?
                .ok_or_else(|| vanished("coin", &entry.id))?,
        };

        self.coins.insert(entry.id.clone(), id);
        Ok(id)
    }

    /// Id of an already stored coin, if any
    pub async fn find_coin_id(&mut self, coin_gecko_id: &str) -> Result<Option<i32>> {
        if let Some(id) = self.coins.get(coin_gecko_id) {
            return Ok(Some(*id));
        }

        let found = Coin::find()
            .filter(coin::Column::CoinGeckoId.eq(coin_gecko_id))
            .one(self.txn)
            .await?;

        if let Some(model) = &found {
            self.coins.insert(model.coin_gecko_id.clone(), model.id);
        }

        Ok(found.map(|model| model.id))
    }

    /// Resolve-or-create every coin in the catalog.
    ///
    /// Existing keys are loaded in one query; the missing ones are inserted in
    /// chunks with `ON CONFLICT DO NOTHING`. Returns how many coins were written.
    pub async fn sync_coin_catalog(
        &mut self,
        entries: &[CoinListEntry],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let existing: Vec<(String, i32)> = Coin::find()
            .select_only()
            .column(coin::Column::CoinGeckoId)
            .column(coin::Column::Id)
            .into_tuple()
            .all(self.txn)
            .await?;

        tracing::debug!("{} coins already stored", existing.len());
        self.coins.extend(existing);

        let added: DateTimeWithTimeZone = now.into();
        let mut seen = HashSet::new();
        let missing: Vec<coin::ActiveModel> = entries
            .iter()
            .filter(|entry| !self.coins.contains_key(&entry.id) && seen.insert(entry.id.as_str()))
            .map(|entry| coin::ActiveModel {
                coin_gecko_id: Set(entry.id.clone()),
                name: Set(entry.name.clone()),
                symbol: Set(entry.symbol.clone()),
                added: Set(added),
                ..Default::default()
            })
            .collect();

        let inserted = insert_missing_coins(self.txn, missing).await?;

        if inserted > 0 {
            tracing::info!("Added {} new coins to the catalog", inserted);
        }

        Ok(inserted)
    }

    async fn find_provider(&self, name: &str) -> Result<Option<provider::Model>> {
        Ok(Provider::find()
            .filter(provider::Column::Name.eq(name))
            .one(self.txn)
            .await?)
    }

    async fn find_algorithm(&self, name: &str) -> Result<Option<algorithm::Model>> {
        Ok(Algorithm::find()
            .filter(algorithm::Column::Name.eq(name))
            .one(self.txn)
            .await?)
    }

    async fn find_pool(&self, provider_id: i32, algorithm_id: i32) -> Result<Option<pool::Model>> {
        Ok(Pool::find()
            .filter(pool::Column::ProviderId.eq(provider_id))
            .filter(pool::Column::AlgorithmId.eq(algorithm_id))
            .one(self.txn)
            .await?)
    }
}

/// Insert `model` in a savepoint.
///
/// Returns `Ok(None)` when the row collides with an existing natural key; the
/// savepoint is rolled back and the outer transaction stays usable.
pub async fn insert_unique<A>(
    txn: &DatabaseTransaction,
    model: A,
) -> Result<Option<<A::Entity as EntityTrait>::Model>>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let savepoint = txn.begin().await?;

    match model.insert(&savepoint).await {
        Ok(created) => {
            savepoint.commit().await?;
            Ok(Some(created))
        }
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(error = %err, "Natural key already exists, re-fetching");
            savepoint.rollback().await?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Bulk insert coins in chunks, ignoring rows whose CoinGecko id already
/// exists. Returns how many rows were actually written.
pub async fn insert_missing_coins(
    txn: &DatabaseTransaction,
    rows: Vec<coin::ActiveModel>,
) -> Result<usize> {
    let mut inserted = 0;

    for chunk in rows.chunks(CATALOG_CHUNK_SIZE) {
        let result = Coin::insert_many(chunk.to_vec())
            .on_conflict(
                OnConflict::column(coin::Column::CoinGeckoId)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec_without_returning(txn)
            .await?;

        match result {
            TryInsertResult::Inserted(rows_affected) => inserted += rows_affected as usize,
            TryInsertResult::Conflicted | TryInsertResult::Empty => {}
        }
    }

    Ok(inserted)
}

/// The row collided on insert but cannot be found afterwards
fn vanished(kind: &str, key: &str) -> IngestError {
    IngestError::Persistence(DbErr::RecordNotFound(format!(
        "{} {} conflicted on insert but could not be re-read",
        kind, key
    )))
}
