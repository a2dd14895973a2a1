//! Best-effort persistence of the last wallet connection.
//!
//! Storage failures are logged and swallowed: an unavailable store degrades the
//! application to an in-memory session, it never blocks a connection.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::session::WalletKind;
use crate::storage::KeyValueStore;

pub const CONNECTION_STORAGE_KEY: &str = "beeish-wallet-connection";
pub const DEFAULT_RECORD_TTL_HOURS: i64 = 24;

/// Source of the current time, injectable so expiry can be exercised in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What the previous page lifetime left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    wallet_kind: WalletKind,
    on_required_network: bool,
    saved_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(wallet_kind: WalletKind, on_required_network: bool, saved_at: DateTime<Utc>) -> Self {
        Self {
            wallet_kind,
            on_required_network: on_required_network && !wallet_kind.is_none(),
            saved_at,
        }
    }

    pub fn wallet_kind(&self) -> WalletKind {
        self.wallet_kind
    }

    pub fn on_required_network(&self) -> bool {
        self.on_required_network
    }

    pub fn saved_at(&self) -> DateTime<Utc> {
        self.saved_at
    }
}

/// On-disk layout shared with the browser build: `{walletType, isAbstractNetwork, timestamp}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWalletData {
    wallet_type: Option<String>,
    is_abstract_network: bool,
    timestamp: i64,
}

impl StoredWalletData {
    fn from_record(record: &ConnectionRecord) -> Self {
        Self {
            wallet_type: record.wallet_kind.storage_tag().map(str::to_string),
            is_abstract_network: record.on_required_network,
            timestamp: record.saved_at.timestamp_millis(),
        }
    }

    fn into_record(self) -> Option<ConnectionRecord> {
        let kind = WalletKind::from_storage_tag(self.wallet_type.as_deref())?;
        let saved_at = Utc.timestamp_millis_opt(self.timestamp).single()?;
        Some(ConnectionRecord::new(kind, self.is_abstract_network, saved_at))
    }
}

#[derive(Clone)]
pub struct ConnectionStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ConnectionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::hours(DEFAULT_RECORD_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Overwrite the stored record with the current time.
    pub fn save(&self, wallet_kind: WalletKind, on_required_network: bool) {
        let record = ConnectionRecord::new(wallet_kind, on_required_network, self.clock.now());
        let payload = match serde_json::to_string(&StoredWalletData::from_record(&record)) {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("Error encoding wallet connection: {}", err);
                return;
            }
        };

        match self.store.set(CONNECTION_STORAGE_KEY, &payload) {
            Ok(()) => log::debug!(
                "Wallet connection stored: kind={} on_required_network={}",
                record.wallet_kind,
                record.on_required_network
            ),
            Err(err) => log::error!("Error storing wallet connection: {}", err),
        }
    }

    /// The stored record, unless absent, unreadable or older than the TTL.
    /// Expired records are deleted as a side effect.
    pub fn load(&self) -> Option<ConnectionRecord> {
        let raw = match self.store.get(CONNECTION_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                log::error!("Error retrieving wallet connection: {}", err);
                return None;
            }
        };

        let record = match serde_json::from_str::<StoredWalletData>(&raw)
            .ok()
            .and_then(StoredWalletData::into_record)
        {
            Some(record) => record,
            None => {
                log::warn!("Ignoring malformed wallet connection record");
                return None;
            }
        };

        if self.clock.now() - record.saved_at > self.ttl {
            log::info!("Stored wallet connection expired, clearing");
            self.clear();
            return None;
        }

        Some(record)
    }

    /// Delete the record; idempotent.
    pub fn clear(&self) {
        match self.store.remove(CONNECTION_STORAGE_KEY) {
            Ok(()) => log::debug!("Wallet connection cleared from storage"),
            Err(err) => log::error!("Error clearing wallet connection: {}", err),
        }
    }
}

impl std::fmt::Debug for ConnectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{WalletError, WalletResult};
    use crate::storage::MemoryKeyValueStore;
    use parking_lot::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(
                Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            )))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> WalletResult<Option<String>> {
            Err(WalletError::StorageError("storage disabled".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> WalletResult<()> {
            Err(WalletError::StorageError("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> WalletResult<()> {
            Err(WalletError::StorageError("storage disabled".into()))
        }
    }

    fn fixture() -> (Arc<MemoryKeyValueStore>, Arc<ManualClock>, ConnectionStore) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let clock = ManualClock::new();
        let store = ConnectionStore::with_clock(kv.clone(), clock.clone());
        (kv, clock, store)
    }

    #[test]
    fn save_then_load_returns_same_fields() {
        let (_, _, store) = fixture();
        for (kind, on_network) in [
            (WalletKind::InjectedProvider, false),
            (WalletKind::InjectedProvider, true),
            (WalletKind::EmbeddedWalletSdk, true),
        ] {
            store.save(kind, on_network);
            let loaded = store.load().unwrap();
            assert_eq!(loaded.wallet_kind(), kind);
            assert_eq!(loaded.on_required_network(), on_network);
        }
    }

    #[test]
    fn none_kind_is_never_on_network() {
        let (_, _, store) = fixture();
        store.save(WalletKind::None, true);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.wallet_kind(), WalletKind::None);
        assert!(!loaded.on_required_network());
    }

    #[test]
    fn wire_format_matches_browser_layout() {
        let (kv, clock, store) = fixture();
        store.save(WalletKind::EmbeddedWalletSdk, true);
        let raw = kv.get(CONNECTION_STORAGE_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["walletType"], "abstract");
        assert_eq!(json["isAbstractNetwork"], true);
        assert_eq!(json["timestamp"], clock.now().timestamp_millis());
    }

    #[test]
    fn record_within_ttl_survives() {
        let (_, clock, store) = fixture();
        store.save(WalletKind::InjectedProvider, true);
        clock.advance(Duration::hours(23) + Duration::minutes(59));
        assert!(store.load().is_some());
    }

    #[test]
    fn expired_record_is_deleted_permanently() {
        let (kv, clock, store) = fixture();
        store.save(WalletKind::InjectedProvider, true);
        clock.advance(Duration::hours(24) + Duration::milliseconds(1));
        assert!(store.load().is_none());
        assert!(kv.get(CONNECTION_STORAGE_KEY).unwrap().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn malformed_records_load_as_none() {
        let (kv, _, store) = fixture();
        kv.set(CONNECTION_STORAGE_KEY, "{not json").unwrap();
        assert!(store.load().is_none());

        kv.set(
            CONNECTION_STORAGE_KEY,
            r#"{"walletType":"coinbase","isAbstractNetwork":true,"timestamp":1}"#,
        )
        .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn accepts_records_written_by_the_browser_build() {
        let (kv, clock, store) = fixture();
        let ts = clock.now().timestamp_millis() - 3_600_000;
        kv.set(
            CONNECTION_STORAGE_KEY,
            &format!(
                r#"{{"walletType":"MetaMask","isAbstractNetwork":false,"timestamp":{}}}"#,
                ts
            ),
        )
        .unwrap();
        let record = store.load().unwrap();
        assert_eq!(record.wallet_kind(), WalletKind::InjectedProvider);
        assert!(!record.on_required_network());
    }

    #[test]
    fn clear_is_idempotent() {
        let (kv, _, store) = fixture();
        store.save(WalletKind::InjectedProvider, true);
        store.clear();
        store.clear();
        assert!(kv.is_empty());
        assert!(store.load().is_none());
    }

    #[test]
    fn unavailable_storage_never_fails_the_caller() {
        let store = ConnectionStore::new(Arc::new(BrokenStore));
        store.save(WalletKind::InjectedProvider, true);
        assert!(store.load().is_none());
        store.clear();
    }

    #[test]
    fn custom_ttl() {
        let (_, clock, store) = fixture();
        let store = store.with_ttl(Duration::minutes(5));
        store.save(WalletKind::EmbeddedWalletSdk, true);
        clock.advance(Duration::minutes(6));
        assert!(store.load().is_none());
    }
}
