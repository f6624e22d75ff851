//! End-to-end scenarios driven over real TCP loopback connections
//! (`TcpListener` on `127.0.0.1:0`, real sockets, no mocks).

use std::time::Duration;

use wirequeue_client::{ClientConfig, ClientCore, ClientError};
use wirequeue_proto::Item;
use wirequeue_server::{Server, ServerConfig};

fn start_server(config: ServerConfig) -> Server {
    let server = Server::bind("127.0.0.1", 0, config).unwrap();
    server.run().unwrap();
    server
}

fn connect(server: &Server) -> ClientCore {
    ClientCore::new("127.0.0.1", server.local_addr().port(), ClientConfig::default()).unwrap()
}

#[test]
fn capacity_enforces_full_and_empty_over_the_wire() {
    let server = start_server(ServerConfig::default().with_capacity(2));
    let client = connect(&server);

    client.put(Item::Str("a".into()), true, None).unwrap();
    client.put(Item::Str("b".into()), true, None).unwrap();
    assert_eq!(client.put(Item::Str("c".into()), false, None), Err(ClientError::Full));

    assert_eq!(client.get(true, None).unwrap(), Item::Str("a".into()));
    assert_eq!(client.get(true, None).unwrap(), Item::Str("b".into()));
    assert_eq!(client.get(false, None), Err(ClientError::Empty));

    server.close();
}

#[test]
fn max_clients_admission_and_release() {
    let server = start_server(ServerConfig::default().with_max_clients(1));

    let client_a = connect(&server);
    assert!(client_a.connected().unwrap());

    let client_b_result = ClientCore::new("127.0.0.1", server.local_addr().port(), ClientConfig::default());
    assert_eq!(client_b_result.unwrap_err(), ClientError::ClientsFull);

    client_a.close();
    std::thread::sleep(Duration::from_millis(100));

    let client_c = connect(&server);
    assert!(client_c.connected().unwrap());

    server.close();
}

#[test]
fn auth_key_gate_accepts_matching_secret_and_rejects_others() {
    let server = start_server(ServerConfig::default().with_auth_key("123"));

    let good = ClientCore::new(
        "127.0.0.1",
        server.local_addr().port(),
        ClientConfig::default().with_auth_key("123"),
    )
    .unwrap();
    good.put(Item::Str("x".into()), true, None).unwrap();

    let bad = ClientCore::new(
        "127.0.0.1",
        server.local_addr().port(),
        ClientConfig::default().with_auth_key("1234"),
    );
    assert_eq!(bad.unwrap_err(), ClientError::AuthenticationFail);

    server.close();
}

#[test]
fn heterogeneous_items_round_trip_in_fifo_order() {
    let server = start_server(ServerConfig::default());
    let client = connect(&server);

    let items = vec![
        Item::Bytes(b"123".to_vec()),
        Item::Str("123".into()),
        Item::Int(123),
        Item::Complex(123.0, -1.0),
        Item::Float(123.01),
        Item::Bool(false),
        Item::List(vec![Item::Bool(true), Item::Bool(false), Item::Int(123)]),
        Item::Tuple(vec![Item::Bool(true), Item::Bool(false), Item::Int(123)]),
        Item::Map(vec![
            (Item::Str("1".into()), Item::Int(123)),
            (Item::Str("2".into()), Item::Bool(true)),
            (Item::Str("3".into()), Item::List(vec![Item::Int(1), Item::Int(2), Item::Int(3)])),
        ]),
        Item::Set(vec![Item::Int(1), Item::Int(2), Item::Int(3)]),
        Item::Null,
    ];

    for item in &items {
        client.put_nowait(item.clone()).unwrap();
    }

    let mut received = Vec::new();
    loop {
        match client.get_nowait() {
            Ok(item) => received.push(item),
            Err(ClientError::Empty) => break,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(received, items);
    server.close();
}

#[test]
fn blocked_put_completes_once_peer_drains_a_slot() {
    let server = start_server(ServerConfig::default().with_capacity(1));
    let putter = connect(&server);
    let getter = connect(&server);

    putter.put(Item::Str("1".into()), true, None).unwrap();

    let handle = std::thread::spawn(move || putter.put(Item::Str("2".into()), true, None));
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(getter.get(true, None).unwrap(), Item::Str("1".into()));
    handle.join().unwrap().unwrap();

    assert_eq!(getter.realtime_qsize().unwrap(), 1);
    server.close();
}

#[test]
fn task_done_accounting_and_join() {
    let server = start_server(ServerConfig::default());
    let client = connect(&server);

    client.put(Item::Str("1".into()), true, None).unwrap();
    client.put(Item::Str("2".into()), true, None).unwrap();

    let joiner = connect(&server);
    let handle = std::thread::spawn(move || joiner.join());

    std::thread::sleep(Duration::from_millis(50));
    client.task_done().unwrap();
    client.task_done().unwrap();
    handle.join().unwrap().unwrap();

    assert_eq!(client.task_done(), Err(ClientError::InvalidState));
    server.close();
}

#[test]
fn reset_clears_queue_and_reports_new_capacity() {
    let server = start_server(ServerConfig::default().with_capacity(1));
    let client = connect(&server);

    client.put(Item::Int(1), true, None).unwrap();
    client.reset(Some(5)).unwrap();

    assert_eq!(client.realtime_qsize().unwrap(), 0);
    assert_eq!(client.realtime_maxsize().unwrap(), 5);

    server.close();
}

#[test]
fn scoped_server_closes_on_drop() {
    let server = Server::bind("127.0.0.1", 0, ServerConfig::default()).unwrap();
    server.run().unwrap();
    let addr = server.local_addr();
    {
        let _scoped = server.into_scoped();
        let client = ClientCore::new("127.0.0.1", addr.port(), ClientConfig::default()).unwrap();
        assert!(client.connected().unwrap());
    }
    // Give the accept thread time to unwind after the scope drops.
    std::thread::sleep(Duration::from_millis(100));
    assert!(ClientCore::new("127.0.0.1", addr.port(), ClientConfig::default()).is_err());
}
