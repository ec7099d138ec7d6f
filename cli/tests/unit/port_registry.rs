//! Port registry behaviour against the in-memory host.

#![allow(clippy::expect_used)]

use latent_cli::application::services::port_registry::PortRegistry;
use latent_cli::domain::{RegistryError, RetryPolicy};

use crate::helpers::{FakeHost, OTHER_ID, QueueCandidates, TEST_ID};

fn registry(host: &FakeHost) -> PortRegistry<'_, FakeHost> {
    PortRegistry::new(host).with_policy(RetryPolicy::immediate(8))
}

#[tokio::test]
async fn allocate_registers_candidate_for_owner() {
    let host = FakeHost::new();
    let port = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000]))
        .await
        .expect("allocate");

    assert_eq!(port, 40_000);
    assert_eq!(host.registry().get(&40_000).map(String::as_str), Some(TEST_ID));
    assert!(host.has_dir("/opt/latent/reserved/ports"));
}

#[tokio::test]
async fn allocate_creates_registry_before_searching_it() {
    let host = FakeHost::new();
    assert!(!host.has_dir("/opt/latent/reserved/ports"));

    let port = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000]))
        .await
        .expect("allocate on a host that never ran server-setup");

    assert_eq!(port, 40_000);
    let programs: Vec<String> = host
        .commands()
        .iter()
        .map(|c| c.program().to_string())
        .collect();
    let mkdir = programs.iter().position(|p| p == "mkdir").expect("mkdir issued");
    let grep = programs.iter().position(|p| p == "grep").expect("grep issued");
    assert!(mkdir < grep, "registry searched before it was created: {programs:?}");
}

#[tokio::test]
async fn lookup_without_registry_finds_nothing() {
    let host = FakeHost::new();
    assert_eq!(registry(&host).lookup(TEST_ID).await.expect("lookup"), None);
    assert!(!host.has_dir("/opt/latent/reserved/ports"));
}

#[tokio::test]
async fn allocate_is_idempotent_per_id() {
    let host = FakeHost::new();
    let first = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000]))
        .await
        .expect("first");
    let second = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[41_000]))
        .await
        .expect("second");

    assert_eq!(first, second);
    assert_eq!(host.registry().len(), 1);
}

#[tokio::test]
async fn lookup_finds_only_the_owner() {
    let host = FakeHost::new().with_registered(40_000, TEST_ID);
    let reg = registry(&host);
    assert_eq!(reg.lookup(TEST_ID).await.expect("lookup"), Some(40_000));
    assert_eq!(reg.lookup(OTHER_ID).await.expect("lookup"), None);
}

#[tokio::test]
async fn registered_candidate_is_skipped() {
    let host = FakeHost::new().with_registered(40_000, OTHER_ID);
    let port = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000, 40_001]))
        .await
        .expect("allocate");

    assert_eq!(port, 40_001);
    assert_eq!(host.registry().get(&40_000).map(String::as_str), Some(OTHER_ID));
}

#[tokio::test]
async fn listening_candidate_is_skipped_even_if_unregistered() {
    let host = FakeHost::new().with_listener(40_000);
    let port = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000, 40_001]))
        .await
        .expect("allocate");

    assert_eq!(port, 40_001);
    assert!(!host.registry().contains_key(&40_000));
}

#[tokio::test]
async fn out_of_range_candidate_is_never_checked() {
    let host = FakeHost::new();
    let port = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[80, 40_001]))
        .await
        .expect("allocate");

    assert_eq!(port, 40_001);
    assert!(
        host.commands()
            .iter()
            .all(|c| !c.arguments().iter().any(|a| a.ends_with("/80")))
    );
}

#[tokio::test]
async fn exhausted_candidates_fail_with_attempt_count() {
    let host = FakeHost::new().with_listener(40_000);
    let err = PortRegistry::new(&host)
        .with_policy(RetryPolicy::immediate(3))
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000]))
        .await
        .expect_err("every candidate is taken");

    assert!(matches!(
        err.downcast_ref::<RegistryError>(),
        Some(RegistryError::PortAllocationExhausted { attempts: 3 })
    ));
    assert!(host.registry().is_empty());
}

#[tokio::test]
async fn distinct_ids_never_share_a_port() {
    let host = FakeHost::new();
    let candidates = QueueCandidates::new(&[40_000, 40_000, 40_000, 40_002]);
    let a = registry(&host)
        .allocate(TEST_ID, &candidates)
        .await
        .expect("a");
    let b = registry(&host)
        .allocate(OTHER_ID, &candidates)
        .await
        .expect("b");

    assert_ne!(a, b);
    assert_eq!(host.registry().len(), 2);
}

#[tokio::test]
async fn concurrent_allocations_of_same_candidate_produce_one_winner() {
    let host = FakeHost::new();
    let first = QueueCandidates::new(&[40_000, 40_001]);
    let second = QueueCandidates::new(&[40_000, 40_002]);
    let reg_a = registry(&host);
    let reg_b = registry(&host);

    let (a, b) = tokio::join!(
        reg_a.allocate(TEST_ID, &first),
        reg_b.allocate(OTHER_ID, &second),
    );
    let (a, b) = (a.expect("a"), b.expect("b"));

    assert_ne!(a, b);
    assert!(a == 40_000 || b == 40_000, "one allocator keeps the contested port");
    let entries = host.registry();
    assert_eq!(entries.get(&a).map(String::as_str), Some(TEST_ID));
    assert_eq!(entries.get(&b).map(String::as_str), Some(OTHER_ID));
}

#[tokio::test]
async fn claim_failure_without_entry_is_an_error() {
    // `sh` fails for a reason other than a lost race: nothing was created.
    let host = FakeHost::new().failing("sh");
    let err = registry(&host)
        .allocate(TEST_ID, &QueueCandidates::new(&[40_000]))
        .await
        .expect_err("claim cannot succeed");

    assert!(err.to_string().contains("failed with exit code 1"), "got: {err}");
}
