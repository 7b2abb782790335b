//! WHOIS protocol implementation for domain availability checking.
//!
//! One lookup is a single TCP exchange on port 43: connect to the server
//! registered for the domain's suffix, send `domain\r\n`, read until the
//! server closes the connection, then classify the text. The whole exchange
//! shares one deadline.

use crate::error::ScanError;
use crate::protocols::registry::SuffixRegistry;
use crate::types::{LookupOutcome, DEFAULT_LOOKUP_TIMEOUT, MAX_LOOKUP_TIMEOUT, WHOIS_PORT};
use crate::utils::extract_suffix;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// Markers that mean "this domain is not registered". Matched case-insensitively.
const AVAILABLE_MARKERS: [&str; 3] = ["no match", "not found", "available"];

/// Largest response body accepted from a server.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// Anything that can decide whether a single domain is free.
///
/// The controller only talks to this trait, so workers can be driven by a
/// scripted lookup in tests. Implementations must never panic and must
/// honor `deadline` for all network activity.
pub trait Lookup: Send + Sync {
    fn check<'a>(&'a self, domain: &'a str, deadline: Instant) -> BoxFuture<'a, LookupOutcome>;
}

/// WHOIS client speaking the raw port-43 protocol.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    registry: Arc<SuffixRegistry>,
    port: u16,
    timeout: Duration,
}

impl WhoisClient {
    /// Client over the built-in suffix table with the default timeout.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(SuffixRegistry::new()))
    }

    /// Client over a custom suffix table.
    pub fn with_registry(registry: Arc<SuffixRegistry>) -> Self {
        Self {
            registry,
            port: WHOIS_PORT,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Set the per-lookup timeout used by [`WhoisClient::check_domain`], capped at one hour.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_LOOKUP_TIMEOUT);
        self
    }

    /// Dial servers on a port other than 43.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn registry(&self) -> &SuffixRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check one domain using this client's own timeout.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use domain_scan_lib::WhoisClient;
    ///
    /// # async fn run() {
    /// let client = WhoisClient::new();
    /// let outcome = client.check_domain("example.com").await;
    /// println!("{:?}", outcome);
    /// # }
    /// ```
    pub async fn check_domain(&self, domain: &str) -> LookupOutcome {
        self.check_until(domain, Instant::now() + self.timeout).await
    }

    /// Check one domain, giving up at `deadline`.
    ///
    /// Never returns an error: transport problems become
    /// [`LookupOutcome::Failure`] tagged with the failing step.
    pub async fn check_until(&self, domain: &str, deadline: Instant) -> LookupOutcome {
        match self.query(domain, deadline).await {
            Ok(response) => {
                let outcome = classify_response(&response);
                tracing::debug!(domain, ?outcome, bytes = response.len(), "whois response");
                outcome
            }
            Err(e) => {
                tracing::debug!(domain, error = %e, "whois lookup failed");
                LookupOutcome::Failure(e)
            }
        }
    }

    /// Perform the raw exchange and return the full response text.
    pub async fn query(&self, domain: &str, deadline: Instant) -> Result<String, ScanError> {
        let suffix = extract_suffix(domain);
        let server = self
            .registry
            .server_for(suffix)
            .ok_or_else(|| ScanError::no_server(suffix))?;
        let addr = format!("{}:{}", server, self.port);

        let mut stream = match timeout_at(deadline, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ScanError::dial(server, e.to_string())),
            Err(_) => return Err(ScanError::dial(server, "timed out")),
        };

        let line = format!("{}\r\n", domain);
        match timeout_at(deadline, stream.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ScanError::write(domain, e.to_string())),
            Err(_) => return Err(ScanError::write(domain, "timed out")),
        }

        // one byte past the cap tells an over-size body from one that fits exactly
        let mut buf = Vec::new();
        let mut body = (&mut stream).take(MAX_RESPONSE_BYTES + 1);
        match timeout_at(deadline, body.read_to_end(&mut buf)).await {
            Ok(Ok(_)) if buf.len() as u64 > MAX_RESPONSE_BYTES => Err(ScanError::read(
                domain,
                format!("response exceeds {} bytes", MAX_RESPONSE_BYTES),
            )),
            Ok(Ok(_)) => Ok(String::from_utf8_lossy(&buf).into_owned()),
            Ok(Err(e)) => Err(ScanError::read(domain, e.to_string())),
            Err(_) => Err(ScanError::read(domain, "timed out")),
        }
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Lookup for WhoisClient {
    fn check<'a>(&'a self, domain: &'a str, deadline: Instant) -> BoxFuture<'a, LookupOutcome> {
        Box::pin(self.check_until(domain, deadline))
    }
}

/// Classify a WHOIS response body.
///
/// Any of the availability markers anywhere in the text means available;
/// everything else, including an empty body, means registered.
pub fn classify_response(response: &str) -> LookupOutcome {
    let lower = response.to_lowercase();
    if AVAILABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        LookupOutcome::Available
    } else {
        LookupOutcome::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Serve exactly one connection: read the query line, reply, close.
    async fn serve_once(reply: &'static str) -> (u16, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
            line
        });
        (port, handle)
    }

    fn local_client(port: u16) -> WhoisClient {
        let registry = SuffixRegistry::empty()
            .with_overrides([("com", "127.0.0.1")])
            .unwrap();
        WhoisClient::with_registry(Arc::new(registry))
            .with_port(port)
            .with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_classify_response() {
        assert_eq!(classify_response("No match for \"AB.COM\"."), LookupOutcome::Available);
        assert_eq!(classify_response("Domain NOT FOUND"), LookupOutcome::Available);
        assert_eq!(classify_response("Status: available"), LookupOutcome::Available);
        assert_eq!(
            classify_response("Domain Name: EXAMPLE.COM\nRegistrar: Example"),
            LookupOutcome::Unavailable
        );
        assert_eq!(classify_response(""), LookupOutcome::Unavailable);
    }

    #[test]
    fn test_client_creation() {
        let client = WhoisClient::new();
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.port, WHOIS_PORT);

        let client = client.with_timeout(Duration::from_secs(10)).with_port(4343);
        assert_eq!(client.timeout(), Duration::from_secs(10));
        assert_eq!(client.port, 4343);

        let client = client.with_timeout(Duration::MAX);
        assert_eq!(client.timeout(), MAX_LOOKUP_TIMEOUT);
    }

    #[tokio::test]
    async fn test_sends_query_line_and_classifies() {
        let (port, server) = serve_once("No match for domain \"AB.COM\".\r\n").await;
        let outcome = local_client(port).check_domain("ab.com").await;
        assert_eq!(outcome, LookupOutcome::Available);
        assert_eq!(server.await.unwrap(), "ab.com\r\n");
    }

    #[tokio::test]
    async fn test_registered_domain() {
        let (port, _server) = serve_once("Domain Name: AB.COM\r\nRegistrar: Someone\r\n").await;
        let outcome = local_client(port).check_domain("ab.com").await;
        assert_eq!(outcome, LookupOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_unknown_suffix_is_failure() {
        let outcome = WhoisClient::new().check_domain("ab.zz").await;
        assert_eq!(outcome, LookupOutcome::Failure(ScanError::no_server("zz")));
    }

    #[tokio::test]
    async fn test_refused_connection_is_dial_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        match local_client(port).check_domain("ab.com").await {
            LookupOutcome::Failure(e) => assert_eq!(e.failure_tag(), "dial"),
            other => panic!("expected dial failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_server_hits_read_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = local_client(port).with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        match client.check_domain("ab.com").await {
            LookupOutcome::Failure(e) => assert_eq!(e.failure_tag(), "read"),
            other => panic!("expected read failure, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_oversized_response_is_read_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let chunk = vec![b'x'; 64 * 1024];
            // the client hangs up once it has seen enough
            for _ in 0..64 {
                if socket.write_all(&chunk).await.is_err() {
                    break;
                }
            }
        });

        match local_client(port).check_domain("ab.com").await {
            LookupOutcome::Failure(e) => {
                assert_eq!(e.failure_tag(), "read");
                assert!(e.to_string().contains("exceeds"));
            }
            other => panic!("expected read failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let (port, _server) = serve_once("not found").await;
        let lookup: Arc<dyn Lookup> = Arc::new(local_client(port));
        let deadline = Instant::now() + Duration::from_secs(2);
        assert!(lookup.check("ab.com", deadline).await.is_available());
    }
}
