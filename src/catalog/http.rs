//! Minimal HTTP/1.1 client for the catalog API.
//!
//! One request per connection (`Connection: close`), one attempt per call.
//! TLS is provided by `rustls` with the `webpki-roots` trust store when the
//! `tls` feature is enabled; without it only plain `http://` endpoints work.

use super::CatalogError;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::trace;

/// Fixed timeout for connecting, writing, and reading.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

/// Where the catalog API lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub tls: bool,
    pub host: String,
    pub port: u16,
    /// Path prefix prepended to every request, without a trailing slash
    pub base_path: String,
}

impl Endpoint {
    /// Parse `[http://|https://]host[:port][/base/path]`. HTTPS is assumed
    /// when no scheme is given.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let raw = raw.trim();
        let (tls, rest) = if let Some(rest) = raw.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = raw.strip_prefix("http://") {
            (false, rest)
        } else {
            (true, raw)
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], rest[i..].trim_end_matches('/')),
            None => (rest, ""),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| CatalogError::InvalidEndpoint(raw.to_string()))?;
                (host, port)
            }
            None => (authority, if tls { 443 } else { 80 }),
        };

        if host.is_empty() {
            return Err(CatalogError::InvalidEndpoint(raw.to_string()));
        }

        Ok(Endpoint {
            tls,
            host: host.to_string(),
            port,
            base_path: path.to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}{}{}", scheme, self.host, self.port, self.base_path, path)
    }
}

/// HTTP response from the server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse a complete raw response.
    pub fn parse(raw: &[u8]) -> Result<Self, CatalogError> {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .ok_or_else(|| CatalogError::Protocol("response has no header terminator".to_string()))?;

        let head = String::from_utf8_lossy(&raw[..split]);
        let payload = &raw[split + 4..];

        let mut lines = head.lines();
        let status_line = lines
            .next()
            .ok_or_else(|| CatalogError::Protocol("empty response".to_string()))?;
        let status = parse_status_line(status_line)?;

        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let chunked = headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("transfer-encoding") && v.to_ascii_lowercase().contains("chunked")
        });

        let body = if chunked {
            decode_chunked(payload)?
        } else {
            payload.to_vec()
        };

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

fn parse_status_line(line: &str) -> Result<u16, CatalogError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse()
            .map_err(|_| CatalogError::Protocol(format!("invalid status code: {}", code))),
        _ => Err(CatalogError::Protocol(format!("invalid status line: {}", line))),
    }
}

fn decode_chunked(mut rest: &[u8]) -> Result<Vec<u8>, CatalogError> {
    let mut out = Vec::new();

    loop {
        let line_end = rest
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| CatalogError::Protocol("truncated chunk header".to_string()))?;
        let size_field = String::from_utf8_lossy(&rest[..line_end]);
        // Chunk extensions follow a ';'.
        let size_hex = size_field.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| CatalogError::Protocol(format!("invalid chunk size: {}", size_hex)))?;

        if size == 0 {
            return Ok(out);
        }

        let start = line_end + 2;
        let end = start
            .checked_add(size)
            .filter(|&end| end <= rest.len())
            .ok_or_else(|| CatalogError::Protocol("truncated chunk body".to_string()))?;
        out.extend_from_slice(&rest[start..end]);
        rest = rest.get(end + 2..).unwrap_or(&[]);
    }
}

fn build_request(method: Method, endpoint: &Endpoint, path: &str, headers: &[(&str, &str)], body: Option<&str>) -> Vec<u8> {
    let mut request = format!(
        "{} {}{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nAccept: application/json\r\n",
        method.as_str(),
        endpoint.base_path,
        path,
        endpoint.host,
    );

    for (name, value) in headers {
        request.push_str(name);
        request.push_str(": ");
        request.push_str(value);
        request.push_str("\r\n");
    }

    let body = body.unwrap_or("");
    if !body.is_empty() || method != Method::Get {
        request.push_str("Content-Type: application/json\r\n");
        request.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    request.push_str("\r\n");
    request.push_str(body);
    request.into_bytes()
}

/// Single-attempt HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    endpoint: Endpoint,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(endpoint: Endpoint) -> Self {
        HttpClient {
            endpoint,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send one request and read the whole response. Never retries.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<HttpResponse, CatalogError> {
        trace!(method = method.as_str(), url = %self.endpoint.url(path), "catalog request");
        let request = build_request(method, &self.endpoint, path, headers, body);
        let stream = self.connect()?;

        let raw = if self.endpoint.tls {
            self.exchange_tls(stream, &request)?
        } else {
            exchange(stream, &request)?
        };

        let response = HttpResponse::parse(&raw)?;
        trace!(status = response.status, bytes = response.body.len(), "catalog response");
        Ok(response)
    }

    fn connect(&self) -> Result<TcpStream, CatalogError> {
        let target = format!("{}:{}", self.endpoint.host, self.endpoint.port);
        let addrs = target
            .to_socket_addrs()
            .map_err(|e| CatalogError::Transport(format!("could not resolve {}: {}", target, e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout)).map_err(transport)?;
                    stream.set_write_timeout(Some(self.timeout)).map_err(transport)?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) => io_error(e),
            None => CatalogError::Transport(format!("no addresses found for {}", target)),
        })
    }

    #[cfg(feature = "tls")]
    fn exchange_tls(&self, mut tcp: TcpStream, request: &[u8]) -> Result<Vec<u8>, CatalogError> {
        use std::sync::Arc;

        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let server_name = rustls::pki_types::ServerName::try_from(self.endpoint.host.clone())
            .map_err(|_| CatalogError::InvalidEndpoint(self.endpoint.host.clone()))?;
        let mut conn = rustls::ClientConnection::new(Arc::new(config), server_name)
            .map_err(|e| CatalogError::Transport(format!("TLS setup failed: {}", e)))?;

        let mut stream = rustls::Stream::new(&mut conn, &mut tcp);
        stream.write_all(request).map_err(io_error)?;
        read_to_close(&mut stream)
    }

    #[cfg(not(feature = "tls"))]
    fn exchange_tls(&self, _tcp: TcpStream, _request: &[u8]) -> Result<Vec<u8>, CatalogError> {
        Err(CatalogError::TlsUnavailable)
    }
}

fn exchange(mut stream: TcpStream, request: &[u8]) -> Result<Vec<u8>, CatalogError> {
    stream.write_all(request).map_err(io_error)?;
    read_to_close(&mut stream)
}

fn read_to_close<R: Read>(reader: &mut R) -> Result<Vec<u8>, CatalogError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(buffer),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            // Servers commonly close TLS without close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !buffer.is_empty() => return Ok(buffer),
            Err(e) => return Err(io_error(e)),
        }
    }
}

fn io_error(e: io::Error) -> CatalogError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => CatalogError::Timeout(REQUEST_TIMEOUT),
        _ => CatalogError::Transport(e.to_string()),
    }
}

fn transport(e: io::Error) -> CatalogError {
    CatalogError::Transport(e.to_string())
}
