//! End-to-end: a chain served over a real socket.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use tether::middleware::{from_fn, RequestId, Trace, REQUEST_ID_HEADER};
use tether::{health, Chain, Method, Request, Response, Router, Server, StatusCode};

fn get_user(req: &mut Request, res: &mut Response) {
    let id = req.param("id").unwrap_or("unknown");
    res.json(format!(r#"{{"id":"{id}"}}"#).into_bytes());
}

fn echo(req: &mut Request, res: &mut Response) {
    res.write(req.body());
}

fn app() -> Chain {
    let mut chain = Chain::new();
    chain.use_middleware(Trace);
    chain.use_middleware(RequestId::new());
    chain.use_middleware(from_fn(|req, res, next| {
        if req.path().starts_with("/admin") {
            res.set_status(StatusCode::FORBIDDEN);
            return;
        }
        next.run(req, res);
    }));
    chain.use_handler(
        Router::new()
            .on(Method::GET, "/users/{id}", get_user)
            .on(Method::POST, "/echo", echo)
            .on(Method::GET, "/healthz", health::liveness),
    );
    chain
}

async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn serves_through_the_chain_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(app(), async {
        let _ = stopped.await;
    }));

    let ok = roundtrip(addr, "GET /users/42 HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");
    assert!(ok.contains(&format!("{REQUEST_ID_HEADER}: ")), "{ok}");
    assert!(ok.contains("content-type: application/json"), "{ok}");
    assert!(ok.ends_with(r#"{"id":"42"}"#), "{ok}");

    let echoed = roundtrip(
        addr,
        "POST /echo HTTP/1.1\r\nhost: test\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello",
    )
    .await;
    assert!(echoed.starts_with("HTTP/1.1 200 OK"), "{echoed}");
    assert!(echoed.ends_with("hello"), "{echoed}");

    let denied = roundtrip(addr, "GET /admin HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(denied.starts_with("HTTP/1.1 403 Forbidden"), "{denied}");
    assert!(denied.contains(REQUEST_ID_HEADER), "{denied}");

    let missing = roundtrip(addr, "GET /nowhere HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "{missing}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn idle_keep_alive_connection_does_not_hold_up_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(app(), async {
        let _ = stopped.await;
    }));

    // No `connection: close`: the socket stays open and idle after the reply.
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"GET /healthz HTTP/1.1\r\nhost: test\r\n\r\n").await.unwrap();

    let mut reply = Vec::new();
    let mut buf = [0u8; 1024];
    while !reply.ends_with(b"ok") {
        let n = client.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before the reply arrived");
        reply.extend_from_slice(&buf[..n]);
    }
    assert!(reply.starts_with(b"HTTP/1.1 200 OK"));

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(3), server)
        .await
        .expect("server kept waiting on an idle connection")
        .unwrap()
        .unwrap();

    let n = client.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "server should have closed the idle connection");
}

#[test]
fn bind_reports_bad_addresses() {
    let err = Server::bind("not-an-address").err().unwrap();
    assert!(err.to_string().contains("not-an-address"));
}
