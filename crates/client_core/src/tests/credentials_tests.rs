use super::*;
use storage::MemoryStore;

fn rotation(access: Option<&str>, refresh: Option<&str>, expires_in: Option<f64>) -> TokenRotation {
    TokenRotation {
        access_token: access.map(str::to_string),
        refresh_token: refresh.map(str::to_string),
        expires_in,
    }
}

async fn store_with(entries: &[(&str, &str)]) -> (Arc<MemoryStore>, CredentialStore) {
    let memory = Arc::new(MemoryStore::new());
    memory.set_many(entries).await.expect("seed");
    let credentials = CredentialStore::new(memory.clone());
    (memory, credentials)
}

#[tokio::test]
async fn load_returns_full_triple() {
    let (_, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "at"),
        (REFRESH_TOKEN_KEY, "rt"),
        (TOKEN_EXPIRY_KEY, "1700000000000"),
    ])
    .await;

    let tokens = credentials.load().await.expect("load").expect("present");
    assert_eq!(tokens.access_token, "at");
    assert_eq!(tokens.refresh_token, "rt");
    assert_eq!(tokens.expiry_epoch_millis, 1_700_000_000_000);
}

#[tokio::test]
async fn partial_triple_is_absent() {
    let (_, credentials) = store_with(&[(ACCESS_TOKEN_KEY, "at"), (TOKEN_EXPIRY_KEY, "1")]).await;
    assert_eq!(credentials.load().await.expect("load"), None);

    let (_, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "at"),
        (REFRESH_TOKEN_KEY, ""),
        (TOKEN_EXPIRY_KEY, "1"),
    ])
    .await;
    assert_eq!(credentials.load().await.expect("load"), None);
}

#[tokio::test]
async fn unparsable_expiry_is_absent_and_float_expiry_is_accepted() {
    let (_, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "at"),
        (REFRESH_TOKEN_KEY, "rt"),
        (TOKEN_EXPIRY_KEY, "NaN"),
    ])
    .await;
    assert_eq!(credentials.load().await.expect("load"), None);

    let (_, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "at"),
        (REFRESH_TOKEN_KEY, "rt"),
        (TOKEN_EXPIRY_KEY, "1700000000000.4"),
    ])
    .await;
    let tokens = credentials.load().await.expect("load").expect("present");
    assert_eq!(tokens.expiry_epoch_millis, 1_700_000_000_000);
}

#[tokio::test]
async fn rotation_overwrites_all_three_keys_from_receipt_time() {
    let (memory, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "old-at"),
        (REFRESH_TOKEN_KEY, "old-rt"),
        (TOKEN_EXPIRY_KEY, "5"),
    ])
    .await;

    let changed = credentials
        .apply_rotation(
            "get_templates",
            &rotation(Some("new-at"), Some("new-rt"), Some(3600.0)),
            1_000_000,
        )
        .await
        .expect("rotate");

    assert!(changed);
    let stored = memory.snapshot().await;
    assert_eq!(stored[ACCESS_TOKEN_KEY], "new-at");
    assert_eq!(stored[REFRESH_TOKEN_KEY], "new-rt");
    assert_eq!(stored[TOKEN_EXPIRY_KEY], (1_000_000 + 3_600_000).to_string());
}

#[tokio::test]
async fn missing_or_incomplete_rotation_keeps_stored_triple() {
    let (memory, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "old-at"),
        (REFRESH_TOKEN_KEY, "old-rt"),
        (TOKEN_EXPIRY_KEY, "5"),
    ])
    .await;
    let before = memory.snapshot().await;

    assert!(!credentials
        .apply_rotation("analyze_template", &TokenRotation::default(), 10)
        .await
        .expect("no rotation"));
    assert!(!credentials
        .apply_rotation("analyze_template", &rotation(Some("new-at"), None, None), 10)
        .await
        .expect("partial rotation"));

    assert_eq!(memory.snapshot().await, before);
}

#[test]
fn expires_in_goes_negative_after_expiry() {
    let tokens = ProviderTokenSet {
        access_token: "at".into(),
        refresh_token: "rt".into(),
        expiry_epoch_millis: 10_000,
    };
    assert_eq!(tokens.expires_in_secs(4_000), 6.0);
    assert_eq!(tokens.expires_in_secs(12_500), -2.5);
    assert_eq!(tokens.to_payload(12_500).expires_in, -2.5);
}

#[tokio::test]
async fn out_of_range_rotation_keeps_stored_triple() {
    assert_eq!(
        ProviderTokenSet::from_rotation(
            &rotation(Some("a"), Some("r"), Some(1e18)),
            1_700_000_000_000
        ),
        None
    );
    assert_eq!(
        ProviderTokenSet::from_rotation(&rotation(Some("a"), Some("r"), Some(-1e18)), 0),
        None
    );

    let (memory, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "old-at"),
        (REFRESH_TOKEN_KEY, "old-rt"),
        (TOKEN_EXPIRY_KEY, "5"),
    ])
    .await;
    let before = memory.snapshot().await;
    assert!(!credentials
        .apply_rotation(
            "get_templates",
            &rotation(Some("new-at"), Some("new-rt"), Some(1e18)),
            1_700_000_000_000
        )
        .await
        .expect("out-of-range rotation"));
    assert_eq!(memory.snapshot().await, before);
}

#[tokio::test]
async fn extreme_stored_expiry_saturates_instead_of_overflowing() {
    let (_, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "at"),
        (REFRESH_TOKEN_KEY, "rt"),
        (TOKEN_EXPIRY_KEY, "-9223372036854775808"),
    ])
    .await;
    let tokens = credentials.load().await.expect("load").expect("present");

    let expires_in = tokens.expires_in_secs(1_700_000_000_000);
    assert!(expires_in.is_finite());
    assert!(expires_in < 0.0);

    let far_future = ProviderTokenSet {
        expiry_epoch_millis: i64::MAX,
        ..tokens
    };
    assert!(far_future.expires_in_secs(-1_700_000_000_000) > 0.0);
}

#[tokio::test]
async fn clear_removes_triple() {
    let (memory, credentials) = store_with(&[
        (ACCESS_TOKEN_KEY, "at"),
        (REFRESH_TOKEN_KEY, "rt"),
        (TOKEN_EXPIRY_KEY, "5"),
        ("unrelated", "kept"),
    ])
    .await;
    credentials.clear().await.expect("clear");

    let stored = memory.snapshot().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored["unrelated"], "kept");
}
