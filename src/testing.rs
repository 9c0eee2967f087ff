//! Shared test fixtures: in-memory fetchers, PNG bytes and a one-shot HTTP
//! server.

use crate::core::error::FetchError;
use crate::core::types::RawImage;
use crate::source::fetcher::SourceFetcher;
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Encode a solid-colour PNG.
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode test png");
    buffer.into_inner()
}

/// What a [`MemoryFetcher`] does for one URL.
#[derive(Debug, Clone)]
pub struct Canned {
    pub delay: Duration,
    pub result: Result<RawImage, FetchError>,
}

/// Fetcher serving canned answers, tracking concurrency.
#[derive(Default)]
pub struct MemoryFetcher {
    answers: HashMap<String, Canned>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a solid `size` square PNG for `url` after `delay`.
    pub fn image(mut self, url: &str, size: u32, rgba: [u8; 4], delay: Duration) -> Self {
        self.answers.insert(
            url.to_string(),
            Canned {
                delay,
                result: Ok(RawImage::new(
                    png_bytes(size, size, rgba),
                    Some("image/png".to_string()),
                )),
            },
        );
        self
    }

    /// Serve arbitrary bytes for `url`.
    pub fn bytes(mut self, url: &str, bytes: &[u8]) -> Self {
        self.answers.insert(
            url.to_string(),
            Canned {
                delay: Duration::ZERO,
                result: Ok(RawImage::new(bytes.to_vec(), None)),
            },
        );
        self
    }

    /// Fail `url` with `error` after `delay`.
    pub fn failure(mut self, url: &str, error: FetchError, delay: Duration) -> Self {
        self.answers.insert(
            url.to_string(),
            Canned {
                delay,
                result: Err(error),
            },
        );
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<RawImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let canned = self.answers.get(url).cloned().unwrap_or(Canned {
            delay: Duration::ZERO,
            result: Err(FetchError::HttpStatus {
                url: url.to_string(),
                code: 404,
            }),
        });
        thread::sleep(canned.delay);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        canned.result
    }
}

/// Minimal HTTP/1.1 server answering a single request.
pub struct CannedServer {
    addr: SocketAddr,
    handle: Mutex<Option<JoinHandle<String>>>,
}

impl CannedServer {
    /// Answer one request with `status`, `content_type` and `body`.
    pub fn respond(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let content_type = content_type.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let head = read_head(&mut stream);
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                content_type,
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
            head
        });

        Self {
            addr,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Accept one request and never answer it.
    pub fn silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("local addr");

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                read_head(&mut stream);
                thread::sleep(Duration::from_secs(5));
            }
        });

        Self {
            addr,
            handle: Mutex::new(None),
        }
    }

    /// URL of a port nobody listens on.
    pub fn closed_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{}/", addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request line and headers of the answered request.
    pub fn request_head(&self) -> String {
        self.handle
            .lock()
            .take()
            .map(|h| h.join().expect("server thread"))
            .unwrap_or_default()
    }
}

fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(1) => head.push(byte[0]),
            _ => break,
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
