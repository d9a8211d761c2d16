//! Echo server over a real socket.

use std::sync::Arc;
use std::time::Duration;

use cl_app::echo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;

struct Running {
    base: String,
    sink: Arc<Mutex<Vec<u8>>>,
    shutdown: Arc<Notify>,
    server: tokio::task::JoinHandle<std::io::Result<()>>,
}

async fn start() -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let sink = Arc::new(Mutex::new(Vec::new()));
    let shutdown = Arc::new(Notify::new());
    let server = tokio::spawn(echo::serve(listener, Arc::clone(&sink), Arc::clone(&shutdown)));
    Running { base, sink, shutdown, server }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_post_is_dumped() {
    let running = start().await;

    let response = client().post(format!("{}/submit?x=1", running.base)).header("x-trace", "42").body("hello").send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.bytes().await.unwrap().is_empty());

    let dump = String::from_utf8(running.sink.lock().clone()).unwrap();
    assert!(dump.starts_with("POST /submit?x=1 HTTP/1.1\r\nHost: 127.0.0.1:"), "dump was {dump:?}");
    assert!(dump.contains("\r\nx-trace: 42\r\n"));
    assert!(dump.ends_with("\r\n\r\nhello\n\n"));

    running.shutdown.notify_one();
    tokio::time::timeout(Duration::from_secs(1), running.server).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_requests_are_separated() {
    let running = start().await;
    let client = client();

    for path in ["/one", "/two"] {
        client.get(format!("{}{path}", running.base)).send().await.unwrap();
    }

    let dump = String::from_utf8(running.sink.lock().clone()).unwrap();
    let one = dump.find("GET /one HTTP/1.1\r\n").expect("first request missing");
    let two = dump.find("GET /two HTTP/1.1\r\n").expect("second request missing");
    assert!(one < two);
    assert!(dump[..two].ends_with("\r\n\r\n\n\n"), "dump was {dump:?}");

    running.shutdown.notify_one();
}
