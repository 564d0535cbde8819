//! Sqlite-backed swap persistence: one pool, JSON-blob rows plus a
//! handful of indexed columns for the lookups the nursery actually does
//! (by preimage hash, by lockup address, by lockup txid). Every write
//! replaces the whole row in a single statement, so a status transition
//! and its accompanying field updates (a lockup txid alongside
//! `TransactionMempool`, say) land atomically — there is no
//! read-modify-write gap for two writers to race through.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

use swap_types::reverse_swap::ReverseSwap;
use swap_types::swap::Swap;
use swap_types::{SwapId, SwapStatus};

use crate::error::RepositoryError;

#[derive(Clone)]
pub struct SwapRepository {
    pool: Pool<Sqlite>,
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs() as i64
}

impl SwapRepository {
    pub async fn connect<P: AsRef<Path>>(db_path: P) -> Result<Self, RepositoryError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::new().filename(db_path).create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn connect_in_memory() -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn upsert_swap(&self, swap: &Swap) -> Result<(), RepositoryError> {
        let data = serde_json::to_string(swap)?;
        let ts = now();
        sqlx::query(
            "INSERT INTO swaps (id, status, preimage_hash, lockup_address, lockup_transaction_id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                preimage_hash = excluded.preimage_hash,
                lockup_address = excluded.lockup_address,
                lockup_transaction_id = excluded.lockup_transaction_id,
                data = excluded.data,
                updated_at = excluded.updated_at",
        )
        .bind(swap.id.as_str())
        .bind(swap.status.to_string())
        .bind(swap.preimage_hash.to_hex())
        .bind(&swap.lockup_address)
        .bind(&swap.lockup_transaction_id)
        .bind(data)
        .bind(ts)
        .bind(ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_swap(&self, id: &SwapId) -> Result<Option<Swap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM swaps WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<Swap>(&r)).transpose()
    }

    pub async fn get_swap_by_preimage_hash(&self, preimage_hash_hex: &str) -> Result<Option<Swap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM swaps WHERE preimage_hash = ?")
            .bind(preimage_hash_hex)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<Swap>(&r)).transpose()
    }

    pub async fn get_swap_by_lockup_address(&self, address: &str) -> Result<Option<Swap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM swaps WHERE lockup_address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<Swap>(&r)).transpose()
    }

    pub async fn get_swap_by_lockup_transaction_id(&self, txid: &str) -> Result<Option<Swap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM swaps WHERE lockup_transaction_id = ?")
            .bind(txid)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<Swap>(&r)).transpose()
    }

    /// Every swap not yet in a terminal status. On startup the nursery
    /// re-arms timeouts and re-subscribes chain watches for these.
    pub async fn pending_swaps(&self) -> Result<Vec<Swap>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query("SELECT data FROM swaps ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(deserialize::<Swap>)
            .collect::<Result<Vec<_>, _>>()
            .map(|swaps| {
                swaps
                    .into_iter()
                    .filter(|s| !s.status.is_terminal(swap_types::SwapKind::Submarine))
                    .collect()
            })
    }

    pub async fn upsert_reverse_swap(&self, swap: &ReverseSwap) -> Result<(), RepositoryError> {
        let data = serde_json::to_string(swap)?;
        let ts = now();
        sqlx::query(
            "INSERT INTO reverse_swaps (id, status, preimage_hash, lockup_address, lockup_transaction_id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                preimage_hash = excluded.preimage_hash,
                lockup_address = excluded.lockup_address,
                lockup_transaction_id = excluded.lockup_transaction_id,
                data = excluded.data,
                updated_at = excluded.updated_at",
        )
        .bind(swap.id.as_str())
        .bind(swap.status.to_string())
        .bind(swap.preimage_hash.to_hex())
        .bind(&swap.lockup_address)
        .bind(&swap.transaction_id)
        .bind(data)
        .bind(ts)
        .bind(ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_reverse_swap(&self, id: &SwapId) -> Result<Option<ReverseSwap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM reverse_swaps WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<ReverseSwap>(&r)).transpose()
    }

    pub async fn get_reverse_swap_by_preimage_hash(
        &self,
        preimage_hash_hex: &str,
    ) -> Result<Option<ReverseSwap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM reverse_swaps WHERE preimage_hash = ?")
            .bind(preimage_hash_hex)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<ReverseSwap>(&r)).transpose()
    }

    pub async fn get_reverse_swap_by_lockup_address(&self, address: &str) -> Result<Option<ReverseSwap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM reverse_swaps WHERE lockup_address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<ReverseSwap>(&r)).transpose()
    }

    pub async fn get_reverse_swap_by_lockup_transaction_id(&self, txid: &str) -> Result<Option<ReverseSwap>, RepositoryError> {
        let row: Option<SqliteRow> = sqlx::query("SELECT data FROM reverse_swaps WHERE lockup_transaction_id = ?")
            .bind(txid)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| deserialize::<ReverseSwap>(&r)).transpose()
    }

    pub async fn pending_reverse_swaps(&self) -> Result<Vec<ReverseSwap>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query("SELECT data FROM reverse_swaps ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(deserialize::<ReverseSwap>)
            .collect::<Result<Vec<_>, _>>()
            .map(|swaps| {
                swaps
                    .into_iter()
                    .filter(|s| !s.status.is_terminal(swap_types::SwapKind::Reverse))
                    .collect()
            })
    }

    pub async fn delete_swap(&self, id: &SwapId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM swaps WHERE id = ?").bind(id.as_str()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_reverse_swap(&self, id: &SwapId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reverse_swaps WHERE id = ?").bind(id.as_str()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(row: &SqliteRow) -> Result<T, RepositoryError> {
    let raw: String = row.get("data");
    serde_json::from_str(&raw).map_err(RepositoryError::from)
}
