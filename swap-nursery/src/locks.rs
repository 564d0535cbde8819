//! Per-swap named locks, keyed separately for submarine and reverse
//! swaps. Mutual exclusion is per id, not global: two different swaps
//! proceed fully in parallel, while a transaction event and a block
//! event for the *same* swap can never interleave.
//!
//! The lookup table itself is sharded (spec §5's "swap in-memory map is
//! guarded per-shard"): each shard holds its own small `HashMap` behind
//! its own `Mutex`, so looking up the per-swap lock for one id never
//! contends with a lookup for an id that hashes to a different shard.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use swap_types::SwapId;
use tokio::sync::{Mutex, OwnedMutexGuard};

const SHARD_COUNT: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Keyspace {
    Swap,
    ReverseSwap,
}

type ShardKey = (Keyspace, SwapId);

struct Shard {
    table: Mutex<HashMap<ShardKey, Arc<Mutex<()>>>>,
}

pub struct SwapLocks {
    shards: Vec<Shard>,
}

impl Default for SwapLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapLocks {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Shard { table: Mutex::new(HashMap::new()) }).collect(),
        }
    }

    fn shard_for(&self, key: &ShardKey) -> &Shard {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    async fn lock_for(&self, keyspace: Keyspace, id: &SwapId) -> Arc<Mutex<()>> {
        let key = (keyspace, id.clone());
        let shard = self.shard_for(&key);
        let mut table = shard.table.lock().await;
        table.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn acquire_swap(&self, id: &SwapId) -> OwnedMutexGuard<()> {
        self.lock_for(Keyspace::Swap, id).await.lock_owned().await
    }

    pub async fn acquire_reverse_swap(&self, id: &SwapId) -> OwnedMutexGuard<()> {
        self.lock_for(Keyspace::ReverseSwap, id).await.lock_owned().await
    }
}
