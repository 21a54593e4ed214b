//! One-thread HTTP/1.1 stub server for the retrieval tests.
//!
//! Each request is answered with the body of the first route whose key
//! occurs in the request line, or an empty body. Request lines are recorded
//! so tests can check the query that was sent.

use reqwest::blocking::Client;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub struct StubServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Request lines received so far, e.g. `GET /esearch.fcgi?db=... HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn serve(routes: Vec<(&'static str, String)>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let Ok(read_half) = stream.try_clone() else { continue };
            let mut reader = BufReader::new(read_half);

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                }
            }

            let body = routes
                .iter()
                .find(|(key, _)| request_line.contains(key))
                .map_or("", |(_, body)| body.as_str());
            seen.lock().unwrap().push(request_line.trim_end().to_string());

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    StubServer {
        base: format!("http://{}/", addr),
        requests,
    }
}

/// HTTP client that talks to the stub directly, ignoring proxy settings.
pub fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}
