//! End-to-end flows over the in-memory cache and user store.
//!
//! Everything here runs without Redis or PostgreSQL: the services see
//! the same trait objects they see in production, backed by the
//! in-memory fakes.

use std::sync::Arc;

use hamsterbank::cache::{CacheStore, MemoryCache, keys};
use hamsterbank::error::EconomyError;
use hamsterbank::mutes::MuteService;
use hamsterbank::payments::PaymentService;
use hamsterbank::plays::PlayService;
use hamsterbank::users::{MemoryUserStore, UserDirectory, UserRow};

struct Harness {
    cache: Arc<MemoryCache>,
    store: Arc<MemoryUserStore>,
    directory: Arc<UserDirectory>,
}

impl Harness {
    fn new() -> Self {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryUserStore::new());
        let directory = Arc::new(UserDirectory::new(cache.clone(), store.clone()));
        Self {
            cache,
            store,
            directory,
        }
    }

    async fn seed(&self, id: i64, username: &str, balance: i64) {
        self.store
            .seed(UserRow {
                id,
                username: username.to_string(),
                balance,
                level: 1,
                hourly_income: 250,
            })
            .await;
    }

    fn payments(&self) -> PaymentService {
        PaymentService::new(self.directory.clone())
    }

    fn mutes(&self) -> MuteService {
        MuteService::new(self.directory.clone(), self.cache.clone())
    }

    fn plays(&self) -> PlayService {
        PlayService::new(self.directory.clone(), self.cache.clone())
    }
}

#[tokio::test]
async fn registration_hands_out_the_starting_package() {
    let h = Harness::new();
    h.directory.register(42, "newcomer").await.unwrap();

    let user = h.directory.resolve_by_username("newcomer").await.unwrap();
    assert_eq!(user.id, 42);
    assert_eq!(user.balance, 1500);
    assert_eq!(user.level, 1);
    assert_eq!(user.hourly_income, 250);
}

#[tokio::test]
async fn username_resolution_backfills_the_cache() {
    let h = Harness::new();
    h.seed(42, "alice", 1000).await;

    // cold lookup falls back to the durable store and backfills
    let user = h.directory.resolve_by_username("@alice").await.unwrap();
    assert_eq!(user.id, 42);
    assert_eq!(user.balance, 1000);

    // every hot-path field is now cached
    assert_eq!(
        h.cache.get("username:alice").await.unwrap().as_deref(),
        Some("42")
    );
    assert_eq!(
        h.cache.get("user:42:balance").await.unwrap().as_deref(),
        Some("1000")
    );

    // id lookups are served from the cache from here on
    let again = h.directory.resolve_by_id(42).await.unwrap();
    assert_eq!(again.username, "alice");
    assert_eq!(again.balance, 1000);
}

#[tokio::test]
async fn payment_flow_conserves_total_value() {
    let h = Harness::new();
    h.seed(1, "alice", 1000).await;
    h.seed(2, "bob", 500).await;
    let payments = h.payments();

    let balance = payments.pay("bob", "alice", 300).await.unwrap();
    assert_eq!(balance, 700);
    assert_eq!(h.store.balance(1).await, Some(700));
    assert_eq!(h.store.balance(2).await, Some(800));

    // the write-through is visible on the hot path too
    assert_eq!(
        h.cache.get("user:1:balance").await.unwrap().as_deref(),
        Some("700")
    );
}

#[tokio::test]
async fn hourly_income_credits_every_cached_user() {
    let h = Harness::new();
    h.seed(1, "alice", 1000).await;
    h.seed(2, "bob", 500).await;

    // only users present on the hot path earn income
    h.directory.resolve_by_username("alice").await.unwrap();
    h.directory.resolve_by_username("bob").await.unwrap();

    h.directory.apply_hourly_income().await.unwrap();

    assert_eq!(h.store.balance(1).await, Some(1250));
    assert_eq!(h.store.balance(2).await, Some(750));
}

#[tokio::test]
async fn mute_then_unmute_refunds_nothing_but_clears_the_key() {
    let h = Harness::new();
    h.seed(1, "payer", 10_000).await;
    h.seed(2, "target", 1000).await;
    let mutes = h.mutes();

    // 5m at 5 per minute
    let (balance, cost) = mutes.mute("payer", "target", "5m").await.unwrap();
    assert_eq!(cost, 25);
    assert_eq!(balance, 9975);
    assert!(h.cache.exists(&keys::mute(2)).await.unwrap());

    // the remainder no longer aligns to a whole unit, so the buy-out
    // prices at the hour-fallback rate on the seconds left
    let (balance, cost) = mutes.unmute("payer", "target").await.unwrap();
    assert!(cost >= 2 * 295 && cost <= 3 * 300, "unexpected buy-out cost {cost}");
    assert_eq!(balance, 9975 - cost);
    assert!(!h.cache.exists(&keys::mute(2)).await.unwrap());
}

#[tokio::test]
async fn muting_again_extends_the_window() {
    let h = Harness::new();
    h.seed(1, "payer", 10_000).await;
    h.seed(2, "target", 1000).await;
    let mutes = h.mutes();

    mutes.mute("payer", "target", "10m").await.unwrap();
    mutes.mute("payer", "target", "5m").await.unwrap();

    // near-zero elapsed time: the new window is close to 15m
    let ttl = h.cache.ttl(&keys::mute(2)).await.unwrap();
    assert!(ttl.as_secs() > 14 * 60);
    assert!(ttl.as_secs() <= 15 * 60);
}

#[tokio::test]
async fn unmuting_an_unmuted_user_fails_cleanly() {
    let h = Harness::new();
    h.seed(1, "payer", 10_000).await;
    h.seed(2, "target", 1000).await;

    let err = h.mutes().unmute("payer", "target").await.unwrap_err();
    assert!(matches!(err, EconomyError::NotMuted));
    assert_eq!(h.store.balance(1).await, Some(10_000));
}

#[tokio::test]
async fn steal_shields_the_victim_for_the_cooldown() {
    let h = Harness::new();
    h.seed(1, "victim", 1000).await;
    h.seed(2, "attacker", 1000).await;
    h.seed(3, "other", 1000).await;
    let plays = h.plays();

    let (_, balance) = plays.steal("victim", "attacker", 200).await.unwrap();
    // either outcome settles against the attacker only
    assert!(balance == 1200 || balance == 950, "unexpected balance {balance}");
    assert!(h.cache.exists(&keys::steal_cooldown(1)).await.unwrap());

    let err = plays.steal("victim", "other", 100).await.unwrap_err();
    assert!(matches!(err, EconomyError::CooldownActive));
    assert_eq!(h.store.balance(3).await, Some(1000));
}

#[tokio::test]
async fn slots_settle_against_the_house() {
    let h = Harness::new();
    h.seed(1, "house", 10_000).await;
    h.seed(42, "player", 1000).await;
    h.directory.resolve_by_username("house").await.unwrap();
    h.directory.resolve_by_username("player").await.unwrap();
    let plays = h.plays();

    let result = plays.slots(42, 100).await.unwrap();
    let house = h.store.balance(1).await.unwrap();
    let player = h.store.balance(42).await.unwrap();
    assert_eq!(player, result.balance);
    // whatever the outcome, the stake or payout moved between the
    // player and the house and nowhere else
    assert_eq!(house + player, 11_000);
    if result.won {
        assert_eq!(player, 1000 + result.payout);
    } else {
        assert_eq!(player, 900);
    }
}
