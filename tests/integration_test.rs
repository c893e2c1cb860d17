use bytes::BytesMut;
use skipstore::config::Config;
use skipstore::persistence::aof::AofLog;
use skipstore::protocol::{Answer, Reply, ReplyValue};
use skipstore::server;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn start_server(port: u16) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        port,
        dir: dir.path().display().to_string(),
        ..Default::default()
    };
    let (aof, store, _) = AofLog::open(config.aof_path(), config.databases).unwrap();
    tokio::spawn(async move {
        let _ = server::run_server(Arc::new(store), Arc::new(aof), config).await;
    });
    dir
}

async fn connect(port: u16) -> TcpStream {
    for i in 0..50 {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => return stream,
            Err(_) if i < 49 => tokio::time::sleep(Duration::from_millis(100)).await,
            Err(e) => panic!("failed to connect: {e}"),
        }
    }
    unreachable!()
}

async fn send(stream: &mut TcpStream, statement: &str) -> Reply {
    stream
        .write_all(&Answer::new(statement).serialize())
        .await
        .unwrap();

    let mut buf = BytesMut::with_capacity(4096);
    loop {
        let n = stream.read_buf(&mut buf).await.unwrap();
        assert!(n > 0, "server closed the connection");
        if let Ok(reply) = Reply::from_bytes(&buf) {
            return reply;
        }
    }
}

fn status(s: &str) -> ReplyValue {
    ReplyValue::Status(s.to_string())
}

fn string(s: &str) -> ReplyValue {
    ReplyValue::String(s.as_bytes().to_vec())
}

#[tokio::test]
async fn test_string_lifecycle() {
    let _dir = start_server(19401);
    let mut conn = connect(19401).await;

    assert_eq!(send(&mut conn, "SELECT 0").await.value, status("OK"));
    assert_eq!(send(&mut conn, "SET foo bar").await.value, status("OK"));
    assert_eq!(send(&mut conn, "GET foo").await.value, string("bar"));
    assert_eq!(
        send(&mut conn, "STRLEN foo").await.value,
        ReplyValue::Integer(3)
    );
    assert_eq!(
        send(&mut conn, "APPEND foo baz").await.value,
        ReplyValue::Integer(6)
    );
    assert_eq!(send(&mut conn, "GET foo").await.value, string("barbaz"));
    assert_eq!(
        send(&mut conn, "DEL foo").await.value,
        ReplyValue::Integer(1)
    );
    assert_eq!(send(&mut conn, "GET foo").await.value, ReplyValue::Nil);
}

#[tokio::test]
async fn test_integer_errors() {
    let _dir = start_server(19402);
    let mut conn = connect(19402).await;

    assert_eq!(send(&mut conn, "SET n hello").await.value, status("OK"));
    assert_eq!(
        send(&mut conn, "INCR n").await.value,
        ReplyValue::Error("ERR value is not an integer or out of range".to_string())
    );
    assert_eq!(send(&mut conn, "SET n 10").await.value, status("OK"));
    assert_eq!(
        send(&mut conn, "INCRBY n 5").await.value,
        ReplyValue::Integer(15)
    );
    assert_eq!(
        send(&mut conn, "DECR n").await.value,
        ReplyValue::Integer(14)
    );
}

#[tokio::test]
async fn test_wrong_type() {
    let _dir = start_server(19403);
    let mut conn = connect(19403).await;

    assert_eq!(
        send(&mut conn, "HSET h f v").await.value,
        ReplyValue::Integer(1)
    );
    assert_eq!(
        send(&mut conn, "GET h").await.value,
        ReplyValue::Error(
            "WRONGTYPE Operation against a key holding the wrong kind of value".to_string()
        )
    );
    // The failed GET must not have disturbed the hash.
    assert_eq!(send(&mut conn, "HGET h f").await.value, string("v"));
}

#[tokio::test]
async fn test_transaction() {
    let _dir = start_server(19404);
    let mut conn = connect(19404).await;

    let reply = send(&mut conn, "MULTI").await;
    assert_eq!(reply.value, status("OK"));
    assert!(reply.in_transaction);

    assert_eq!(send(&mut conn, "SET a 1").await.value, status("QUEUED"));
    assert_eq!(send(&mut conn, "INCR a").await.value, status("QUEUED"));
    assert_eq!(send(&mut conn, "GET a").await.value, status("QUEUED"));

    let reply = send(&mut conn, "EXEC").await;
    assert!(!reply.in_transaction);
    let ReplyValue::Array(results) = reply.value else {
        panic!("expected array");
    };
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].value, status("OK"));
    assert_eq!(results[1].value, ReplyValue::Integer(2));
    assert_eq!(results[2].value, string("2"));
}

#[tokio::test]
async fn test_transaction_discard() {
    let _dir = start_server(19405);
    let mut conn = connect(19405).await;

    assert_eq!(send(&mut conn, "MULTI").await.value, status("OK"));
    assert_eq!(send(&mut conn, "SET x 9").await.value, status("QUEUED"));
    let reply = send(&mut conn, "DISCARD").await;
    assert_eq!(reply.value, status("OK"));
    assert!(!reply.in_transaction);

    assert_eq!(send(&mut conn, "GET x").await.value, ReplyValue::Nil);
    assert_eq!(
        send(&mut conn, "EXEC").await.value,
        ReplyValue::Array(Vec::new())
    );
}

#[tokio::test]
async fn test_transaction_error_does_not_abort_batch() {
    let _dir = start_server(19406);
    let mut conn = connect(19406).await;

    assert_eq!(send(&mut conn, "SET s text").await.value, status("OK"));
    assert_eq!(send(&mut conn, "MULTI").await.value, status("OK"));
    assert_eq!(send(&mut conn, "INCR s").await.value, status("QUEUED"));
    assert_eq!(send(&mut conn, "SET t 5").await.value, status("QUEUED"));

    let ReplyValue::Array(results) = send(&mut conn, "EXEC").await.value else {
        panic!("expected array");
    };
    assert!(matches!(results[0].value, ReplyValue::Error(_)));
    assert_eq!(results[1].value, status("OK"));
    assert_eq!(send(&mut conn, "GET t").await.value, string("5"));
}

#[tokio::test]
async fn test_move_between_databases() {
    let _dir = start_server(19407);
    let mut conn = connect(19407).await;

    assert_eq!(send(&mut conn, "SELECT 0").await.value, status("OK"));
    assert_eq!(send(&mut conn, "SET k v").await.value, status("OK"));
    assert_eq!(
        send(&mut conn, "MOVE k 1").await.value,
        ReplyValue::Integer(1)
    );

    let reply = send(&mut conn, "SELECT 1").await;
    assert_eq!(reply.value, status("OK"));
    assert_eq!(reply.db_index, 1);
    assert_eq!(send(&mut conn, "GET k").await.value, string("v"));

    assert_eq!(send(&mut conn, "SELECT 0").await.value, status("OK"));
    assert_eq!(send(&mut conn, "GET k").await.value, ReplyValue::Nil);
}

#[tokio::test]
async fn test_move_refused_when_target_holds_key() {
    let _dir = start_server(19408);
    let mut conn = connect(19408).await;

    assert_eq!(send(&mut conn, "SELECT 1").await.value, status("OK"));
    assert_eq!(send(&mut conn, "SET k other").await.value, status("OK"));
    assert_eq!(send(&mut conn, "SELECT 0").await.value, status("OK"));
    assert_eq!(send(&mut conn, "SET k mine").await.value, status("OK"));

    assert_eq!(
        send(&mut conn, "MOVE k 1").await.value,
        ReplyValue::Integer(0)
    );
    // Both copies intact.
    assert_eq!(send(&mut conn, "GET k").await.value, string("mine"));
    assert_eq!(send(&mut conn, "SELECT 1").await.value, status("OK"));
    assert_eq!(send(&mut conn, "GET k").await.value, string("other"));
}

#[tokio::test]
async fn test_unknown_command() {
    let _dir = start_server(19409);
    let mut conn = connect(19409).await;

    assert_eq!(
        send(&mut conn, "NOPE foo").await.value,
        ReplyValue::Error("ERR unknown command 'NOPE'".to_string())
    );
}

#[tokio::test]
async fn test_value_keeps_interior_spaces() {
    let _dir = start_server(19410);
    let mut conn = connect(19410).await;

    assert_eq!(
        send(&mut conn, "SET msg hello world").await.value,
        status("OK")
    );
    assert_eq!(send(&mut conn, "GET msg").await.value, string("hello world"));
}

#[tokio::test]
async fn test_mset_mget() {
    let _dir = start_server(19411);
    let mut conn = connect(19411).await;

    assert_eq!(
        send(&mut conn, "MSET a 1 b 2 c 3").await.value,
        status("OK")
    );
    let ReplyValue::Array(results) = send(&mut conn, "MGET a missing c").await.value else {
        panic!("expected array");
    };
    assert_eq!(results[0].value, string("1"));
    assert_eq!(results[1].value, ReplyValue::Nil);
    assert_eq!(results[2].value, string("3"));
}

#[tokio::test]
async fn test_hash_family() {
    let _dir = start_server(19412);
    let mut conn = connect(19412).await;

    assert_eq!(
        send(&mut conn, "HSET user name ada age 36").await.value,
        ReplyValue::Integer(2)
    );
    assert_eq!(send(&mut conn, "HGET user name").await.value, string("ada"));
    assert_eq!(
        send(&mut conn, "HLEN user").await.value,
        ReplyValue::Integer(2)
    );
    assert_eq!(
        send(&mut conn, "HINCRBY user age 1").await.value,
        ReplyValue::Integer(37)
    );
    assert_eq!(
        send(&mut conn, "HDEL user age").await.value,
        ReplyValue::Integer(1)
    );
    assert_eq!(
        send(&mut conn, "HEXISTS user age").await.value,
        ReplyValue::Integer(0)
    );
}

#[tokio::test]
async fn test_list_family() {
    let _dir = start_server(19413);
    let mut conn = connect(19413).await;

    assert_eq!(
        send(&mut conn, "LPUSHX nosuch x").await.value,
        ReplyValue::Integer(0)
    );
    // Each element pushed to the front in order: final order c b a.
    assert_eq!(
        send(&mut conn, "LPUSH l a b c").await.value,
        ReplyValue::Integer(3)
    );
    assert_eq!(send(&mut conn, "LINDEX l 0").await.value, string("c"));
    assert_eq!(send(&mut conn, "LINDEX l -1").await.value, string("a"));
    assert_eq!(send(&mut conn, "LPOP l").await.value, string("c"));
    assert_eq!(
        send(&mut conn, "LLEN l").await.value,
        ReplyValue::Integer(2)
    );
}

#[tokio::test]
async fn test_sessions_have_independent_state() {
    let _dir = start_server(19414);
    let mut first = connect(19414).await;
    let mut second = connect(19414).await;

    assert_eq!(send(&mut first, "SELECT 2").await.value, status("OK"));
    assert_eq!(send(&mut first, "SET k v").await.value, status("OK"));

    // The second session still points at database 0.
    let reply = send(&mut second, "GET k").await;
    assert_eq!(reply.db_index, 0);
    assert_eq!(reply.value, ReplyValue::Nil);
    assert_eq!(send(&mut second, "SELECT 2").await.value, status("OK"));
    assert_eq!(send(&mut second, "GET k").await.value, string("v"));
}
