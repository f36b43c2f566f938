//! テスト用のローカルHTTPサーバー

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// 全パスに同じ本文を返すサーバー（`http://127.0.0.1:port` を返す）
pub(crate) async fn spawn_server(body: &'static str) -> String {
    spawn_routes(&[("*", body)]).await
}

/// 受信したリクエストヘッド（リクエスト行とヘッダー）
pub(crate) type RecordedRequests = Arc<Mutex<Vec<String>>>;

/// パス（クエリ込み）ごとに本文を返すサーバー。未登録のパスは404。
pub(crate) async fn spawn_routes(routes: &[(&'static str, &'static str)]) -> String {
    spawn_recording_routes(routes).await.0
}

/// 全パスに同じ本文を返し、受信したリクエストを記録するサーバー
pub(crate) async fn spawn_recording_server(body: &'static str) -> (String, RecordedRequests) {
    spawn_recording_routes(&[("*", body)]).await
}

async fn spawn_recording_routes(
    routes: &[(&'static str, &'static str)],
) -> (String, RecordedRequests) {
    let recorded: RecordedRequests = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);
    let routes: Arc<HashMap<&'static str, &'static str>> =
        Arc::new(routes.iter().copied().collect());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let head = request.split("\r\n\r\n").next().unwrap_or("").to_string();
                sink.lock().unwrap().push(head);
                let path = request.split_whitespace().nth(1).unwrap_or("/");

                let (status, body) = match routes.get(path).or_else(|| routes.get("*")) {
                    Some(body) => ("200 OK", *body),
                    None => ("404 Not Found", "<html><body>Not found</body></html>"),
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), recorded)
}

/// 記録したリクエストヘッドからヘッダー値を取り出す（名前は大文字小文字を区別しない）
pub(crate) fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}
