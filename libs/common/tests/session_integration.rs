//! Integration tests for the session store
//!
//! These tests verify that a session persisted through the configured token
//! file survives a restart and that invalidations reach subscribers running
//! on other tasks.

use common::{ClientConfig, InvalidationReason, Session, SessionEvent};
use serial_test::serial;
use std::time::Duration;

/// A token written by one process is picked up by the next one and
/// removed from disk on logout
#[tokio::test]
#[serial]
async fn test_session_persists_through_configured_token_file()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token_path = dir.path().join("aegis/session.json");

    unsafe {
        std::env::set_var("AEGIS_TOKEN_PATH", &token_path);
    }
    let config = ClientConfig::load()?;
    unsafe {
        std::env::remove_var("AEGIS_TOKEN_PATH");
    }
    assert_eq!(config.token_path, token_path);

    let first = Session::from_file(&config.token_path);
    assert!(!first.is_authenticated());
    first.write("persisted-token");
    assert!(token_path.exists());

    // Simulate a restart
    let second = Session::from_file(&config.token_path);
    assert_eq!(second.read().as_deref(), Some("persisted-token"));

    assert!(second.clear(InvalidationReason::Logout));
    let third = Session::from_file(&config.token_path);
    assert!(!third.is_authenticated());

    Ok(())
}

/// A forced logout on one handle wakes a subscriber on another task
#[tokio::test]
async fn test_invalidation_reaches_other_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::in_memory(Some("tok".to_string()));
    let mut events = session.subscribe();

    let watcher = tokio::spawn(async move { events.recv().await.ok() });

    let handle = session.clone();
    tokio::spawn(async move {
        handle.clear(InvalidationReason::Unauthorized);
    });

    let event = tokio::time::timeout(Duration::from_secs(5), watcher).await??;
    assert_eq!(
        event,
        Some(SessionEvent::Invalidated(InvalidationReason::Unauthorized))
    );
    assert!(!session.is_authenticated());

    Ok(())
}
