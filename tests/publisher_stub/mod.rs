#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    content_type: &'static str,
}

/// Local stand-in for the publisher: fixed routes, 404 for everything else,
/// and a hit counter per request path (query included).
pub struct PublisherStub {
    pub base_url: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PublisherStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start publisher stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn({
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&hits);
            move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }

                    let request = match server.recv_timeout(Duration::from_millis(20)) {
                        Ok(Some(req)) => req,
                        Ok(None) => continue,
                        Err(_) => break,
                    };

                    let path = request.url().to_string();
                    *hits.lock().expect("hits lock").entry(path.clone()).or_default() += 1;

                    let route = routes.lock().expect("routes lock").get(&path).cloned();
                    let Some(route) = route else {
                        let _ = request.respond(
                            tiny_http::Response::from_string("not found").with_status_code(404),
                        );
                        continue;
                    };

                    let header = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        route.content_type.as_bytes(),
                    )
                    .expect("build header");
                    let response = tiny_http::Response::from_data(route.body)
                        .with_status_code(route.status)
                        .with_header(header);
                    let _ = request.respond(response);
                }
            }
        });

        Self {
            base_url,
            routes,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn route(&self, path: &str, status: u16, body: impl Into<Vec<u8>>, content_type: &'static str) {
        self.routes.lock().expect("routes lock").insert(
            path.to_owned(),
            Route {
                status,
                body: body.into(),
                content_type,
            },
        );
    }

    pub fn json(&self, path: &str, body: &str) {
        self.route(path, 200, body.as_bytes().to_vec(), "application/json");
    }

    pub fn image(&self, path: &str) {
        self.route(path, 200, png_bytes(), "image/jpeg");
    }

    pub fn status(&self, path: &str, status: u16) {
        self.route(path, status, b"error".to_vec(), "text/html");
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Requests whose path ends with `.jpg`.
    pub fn image_hits(&self) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter(|(path, _)| path.ends_with(".jpg"))
            .map(|(_, count)| count)
            .sum()
    }
}

impl Drop for PublisherStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// `/Repository/{pub}/{edition}/{date}`
pub fn repository_path(publication: &str, edition: &str, date_str: &str) -> String {
    format!("/Repository/{publication}/{edition}/{date_str}")
}

/// Serves a TOC for `pages` with every page folder named `Page{n}`, a
/// `page.json` per page, and all three images.
pub fn serve_edition(stub: &PublisherStub, repository: &str, pages: &[u32]) {
    let entries = pages
        .iter()
        .map(|n| format!(r#"{{"page": "{n}", "page_title": "Page {n}", "page_folder": "Page{n}"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    stub.json(&format!("{repository}/toc.json"), &format!(r#"{{"toc": [{entries}]}}"#));

    for n in pages {
        let folder = format!("{repository}/Page{n}");
        stub.json(&format!("{folder}/page.json"), &format!(r#"{{"pdf": "Page{n}.pdf"}}"#));
        stub.image(&format!("{folder}/page_thumbnail.jpg"));
        stub.image(&format!("{folder}/big_page.jpg"));
        stub.image(&format!("{folder}/big_page2.jpg"));
    }
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([20, 20, 20]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}
