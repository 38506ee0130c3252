mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use sql_connector::error::ErrorKind;
use sql_connector::pool::ConnectionPool;
use sql_connector::prelude::*;

use common::{MockState, eventually, mock_config, mock_driver};

async fn pool_with(config: BackendConfig) -> (ConnectionPool, Arc<MockState>) {
    let (driver, state) = mock_driver();
    let pool = ConnectionPool::new(Arc::new(config), driver).await.unwrap();
    (pool, state)
}

#[tokio::test]
async fn acquire_times_out_when_every_connection_is_leased() -> Result<(), ConnectorError> {
    let (pool, _state) = pool_with(mock_config(2)).await;
    let first = pool.acquire().await?;
    let _second = pool.acquire().await?;

    let started = Instant::now();
    let err = pool.acquire().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolExhausted);
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(!err.is_retryable());

    pool.release(first);
    let third = pool.acquire().await?;
    assert_eq!(pool.status().leased, 2);
    drop(third);
    Ok(())
}

#[tokio::test]
async fn waiters_are_served_as_connections_return() {
    let config = BackendConfig::sqlite("mock")
        .pool_size(0, 3)
        .acquire_timeout(Duration::from_secs(2))
        .finish()
        .unwrap();
    let (pool, state) = pool_with(config).await;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let lease = pool.acquire().await?;
            let leased = pool.status().leased;
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(lease);
            Ok::<usize, ConnectorError>(leased)
        }));
    }
    for task in tasks {
        let leased = task.await.unwrap().unwrap();
        assert!(leased <= 3);
    }
    assert!(MockState::count(&state.opened) <= 3);
    assert_eq!(pool.status().leased, 0);
}

#[tokio::test]
async fn released_connections_are_reused_most_recent_first() -> Result<(), ConnectorError> {
    let (pool, state) = pool_with(mock_config(2)).await;
    let a = pool.acquire().await?;
    let b = pool.acquire().await?;
    let (a_id, b_id) = (a.id(), b.id());
    drop(a);
    drop(b);
    assert_eq!(pool.status().idle, 2);

    let again = pool.acquire().await?;
    assert_eq!(again.id(), b_id);
    assert_ne!(again.id(), a_id);
    assert_eq!(MockState::count(&state.opened), 2);
    Ok(())
}

#[tokio::test]
async fn broken_connections_are_never_reused() -> Result<(), ConnectorError> {
    let (pool, state) = pool_with(mock_config(1)).await;
    let mut lease = pool.acquire().await?;
    let broken_id = lease.id();
    lease.mark_broken();
    assert!(lease.is_broken());
    drop(lease);

    assert_eq!(pool.status().idle, 0);
    assert!(eventually(|| MockState::count(&state.closed) == 1).await);

    let fresh = pool.acquire().await?;
    assert_ne!(fresh.id(), broken_id);
    assert_eq!(MockState::count(&state.opened), 2);
    Ok(())
}

#[tokio::test]
async fn connectivity_failures_mark_the_connection_broken() -> Result<(), ConnectorError> {
    let (driver, state) = mock_driver();
    let connector = Connector::with_driver(mock_config(1), driver).await?;
    state.fail_statements("DELETE", None, Some("gone"));

    let err = connector
        .execute_dml(&Delete::new("t").into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.is_retryable());
    assert!(eventually(|| MockState::count(&state.closed) == 1).await);

    // Other classified failures keep the connection.
    state.fail_statements("DELETE", Some("dup"), None);
    connector.execute_dml(&Delete::new("t").into()).await.unwrap_err();
    assert_eq!(connector.status().idle, 1);
    assert_eq!(MockState::count(&state.opened), 2);
    Ok(())
}

#[tokio::test]
async fn expired_connections_are_retired() -> Result<(), ConnectorError> {
    let config = BackendConfig::sqlite("mock")
        .pool_size(0, 2)
        .max_lifetime(Duration::from_millis(40))
        .finish()?;
    let (pool, state) = pool_with(config).await;

    let first_id = pool.acquire().await?.id();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let second = pool.acquire().await?;
    assert_ne!(second.id(), first_id);
    assert!(eventually(|| MockState::count(&state.closed) == 1).await);
    drop(second);
    Ok(())
}

#[tokio::test]
async fn idle_timeout_sweeps_unused_connections() -> Result<(), ConnectorError> {
    let config = BackendConfig::sqlite("mock")
        .pool_size(0, 2)
        .idle_timeout(Duration::from_millis(30))
        .finish()?;
    let (pool, state) = pool_with(config).await;
    drop(pool.acquire().await?);
    assert_eq!(pool.status().idle, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(pool.acquire().await?);
    assert_eq!(MockState::count(&state.opened), 2);
    assert!(eventually(|| MockState::count(&state.closed) == 1).await);
    Ok(())
}

#[tokio::test]
async fn min_size_connections_open_up_front() {
    let config = BackendConfig::sqlite("mock").pool_size(2, 4).finish().unwrap();
    let (pool, state) = pool_with(config).await;
    assert_eq!(MockState::count(&state.opened), 2);
    let status = pool.status();
    assert_eq!((status.idle, status.leased, status.max_size), (2, 0, 4));
}

#[tokio::test]
async fn failed_connect_frees_the_slot() {
    let (pool, state) = pool_with(mock_config(1)).await;
    state.fail_connect.store(true, Ordering::SeqCst);

    let err = pool.acquire().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(pool.status().leased, 0);

    state.fail_connect.store(false, Ordering::SeqCst);
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn shutdown_waits_for_leases_then_closes_everything() -> Result<(), ConnectorError> {
    let (pool, state) = pool_with(mock_config(2)).await;
    let idle = pool.acquire().await?;
    let held = pool.acquire().await?;
    drop(idle);

    let closing = tokio::spawn({
        let pool = pool.clone();
        async move { pool.shutdown().await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!closing.is_finished());
    assert!(pool.status().closed);

    let err = pool.acquire().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    drop(held);
    closing.await.unwrap();
    assert!(eventually(|| MockState::count(&state.closed) == 2).await);
    assert_eq!(pool.status().idle, 0);
    Ok(())
}

#[tokio::test]
async fn acquire_timeout_covers_opening_a_connection() {
    let (pool, state) = pool_with(mock_config(2)).await;
    state.set_connect_delay(Some(Duration::from_secs(2)));

    let started = Instant::now();
    let err = pool
        .acquire_with_timeout(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolExhausted);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(pool.status().leased, 0);

    state.set_connect_delay(None);
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn cancelled_acquire_gives_its_slot_back() {
    let (pool, state) = pool_with(mock_config(1)).await;
    state.set_connect_delay(Some(Duration::from_secs(2)));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        pool.acquire_with_timeout(Duration::from_secs(10)),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(pool.status().leased, 0);

    let finished = tokio::time::timeout(Duration::from_secs(1), pool.shutdown()).await;
    assert!(finished.is_ok());
}

#[tokio::test]
async fn idle_connections_are_pinged_before_reuse() -> Result<(), ConnectorError> {
    let config = BackendConfig::sqlite("mock")
        .pool_size(0, 2)
        .acquire_timeout(Duration::from_millis(200))
        .validate_after(Some(Duration::ZERO))
        .finish()?;
    let (pool, state) = pool_with(config).await;

    let first_id = pool.acquire().await?.id();
    let again = pool.acquire().await?;
    assert_eq!(again.id(), first_id);
    assert_eq!(MockState::count(&state.pings), 1);
    drop(again);

    state.fail_ping.store(true, Ordering::SeqCst);
    let replaced = pool.acquire().await?;
    assert_ne!(replaced.id(), first_id);
    assert_eq!(MockState::count(&state.opened), 2);
    assert!(eventually(|| MockState::count(&state.closed) == 1).await);
    Ok(())
}

#[tokio::test]
async fn recently_used_connections_skip_the_ping() -> Result<(), ConnectorError> {
    let (pool, state) = pool_with(mock_config(1)).await;
    drop(pool.acquire().await?);
    drop(pool.acquire().await?);
    assert_eq!(MockState::count(&state.pings), 0);
    assert_eq!(MockState::count(&state.opened), 1);
    Ok(())
}
