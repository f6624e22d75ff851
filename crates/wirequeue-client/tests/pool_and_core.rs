//! Connection-pool and single-connection-discipline scenarios from
//! spec §8, driven against a real `wirequeue_server::Server`.

use std::{sync::Arc, time::Duration};

use wirequeue_client::{Client, ClientConfig, ClientCore, ClientError, Pool};
use wirequeue_proto::Item;
use wirequeue_server::{Server, ServerConfig};

fn start_server(config: ServerConfig) -> Server {
    let server = Server::bind("127.0.0.1", 0, config).unwrap();
    server.run().unwrap();
    server
}

#[test]
fn single_connection_refuses_concurrent_blocking_calls() {
    let server = start_server(ServerConfig::default().with_capacity(1));
    let client = Arc::new(ClientCore::new("127.0.0.1", server.local_addr().port(), ClientConfig::default()).unwrap());

    client.put(Item::Str("1".into()), true, None).unwrap();

    let joiner_client = Arc::clone(&client);
    let handle = std::thread::spawn(move || joiner_client.get(true, None));
    std::thread::sleep(Duration::from_millis(50));

    // `client`'s connection is held by the blocked `get` above; a second
    // concurrent call must be refused rather than queued (spec §4.6).
    assert_eq!(client.full(), Err(ClientError::ConcurrentUseRefused));

    assert_eq!(handle.join().unwrap().unwrap(), Item::Str("1".into()));
    server.close();
}

#[test]
fn pool_caps_concurrent_connections_at_capacity() {
    let server = start_server(ServerConfig::default());
    let pool = Pool::new("127.0.0.1", server.local_addr().port(), 1, ClientConfig::default());

    let first = pool.acquire(None).unwrap();
    assert_eq!(pool.acquire(None).unwrap_err(), ClientError::AtCapacity);

    drop(first);
    assert!(pool.acquire(None).is_ok());

    server.close();
}

#[test]
fn pool_acquire_can_wait_for_a_release_when_given_a_timeout() {
    let server = start_server(ServerConfig::default());
    let pool = Arc::new(Pool::new("127.0.0.1", server.local_addr().port(), 1, ClientConfig::default()));

    let held = pool.acquire(None).unwrap();
    let pool2 = Arc::clone(&pool);
    let handle = std::thread::spawn(move || pool2.acquire(Some(Duration::from_secs(2))).is_ok());

    std::thread::sleep(Duration::from_millis(100));
    drop(held);

    assert!(handle.join().unwrap());
    server.close();
}

#[test]
fn pool_acquire_times_out_when_nothing_is_released() {
    let server = start_server(ServerConfig::default());
    let pool = Pool::new("127.0.0.1", server.local_addr().port(), 1, ClientConfig::default());

    let _held = pool.acquire(None).unwrap();
    let err = pool.acquire(Some(Duration::from_millis(100))).unwrap_err();
    assert_eq!(err, ClientError::Timeout);

    server.close();
}

#[test]
fn closed_pool_refuses_further_acquires_and_releases_idle_connections() {
    let server = start_server(ServerConfig::default());
    let pool = Pool::new("127.0.0.1", server.local_addr().port(), 0, ClientConfig::default());

    let conn = pool.acquire(None).unwrap();
    drop(conn);
    pool.close();

    assert_eq!(pool.acquire(None).unwrap_err(), ClientError::PoolClosed);
    server.close();
}

#[test]
fn client_facade_round_trips_through_a_pool() {
    let server = start_server(ServerConfig::default());
    let pool = Arc::new(Pool::new("127.0.0.1", server.local_addr().port(), 4, ClientConfig::default()));
    let client = Client::with_pool(Arc::clone(&pool));

    client.put_nowait(Item::Int(42)).unwrap();
    assert_eq!(client.get_nowait().unwrap(), Item::Int(42));

    client.close();
    server.close();
}

#[test]
fn silence_err_swallows_disconnected_on_status_queries_only() {
    let server = start_server(ServerConfig::default());
    let addr = server.local_addr();
    let client = ClientCore::new(
        "127.0.0.1",
        addr.port(),
        ClientConfig::default().with_silence_err(true).with_connect_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    server.close();
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(client.full().unwrap(), false);
    assert_eq!(client.empty().unwrap(), false);
    assert_eq!(client.realtime_qsize().unwrap(), 0);

    // put/get/task_done/join/reset must still surface the error.
    assert_eq!(client.put(Item::Int(1), false, None), Err(ClientError::Disconnected));
}
