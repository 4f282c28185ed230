//! Minimal HTTP/1.1 server for exercising the client and collector in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: String::new() }
    }
}

#[derive(Default)]
struct Routes {
    /// Replies per path; the last one repeats once the queue is drained.
    replies: HashMap<String, Vec<Reply>>,
    hits: HashMap<String, usize>,
}

/// Serves canned replies on 127.0.0.1. Unknown paths get 404.
pub struct TestServer {
    base: String,
    routes: Arc<Mutex<Routes>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes = Arc::new(Mutex::new(Routes::default()));

        let shared = routes.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = shared.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf);
                    let path = head
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_string();

                    let reply = {
                        let mut routes = routes.lock().unwrap();
                        *routes.hits.entry(path.clone()).or_default() += 1;
                        match routes.replies.get_mut(&path) {
                            Some(queue) if queue.len() > 1 => queue.remove(0),
                            Some(queue) => queue[0].clone(),
                            None => Reply::status(404),
                        }
                    };

                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        reply.status,
                        reply.body.len(),
                        reply.body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { base, routes }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn route(&self, path: &str, replies: Vec<Reply>) -> &Self {
        assert!(!replies.is_empty());
        self.routes
            .lock()
            .unwrap()
            .replies
            .insert(path.to_string(), replies);
        self
    }

    pub fn hits(&self, path: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}
