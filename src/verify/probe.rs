//! HTTP challenge probe.
//!
//! Fetches `http://{host}{path}` with the connection pinned to the addresses
//! of one family, so an IPv4 check never silently succeeds over IPv6 and the
//! other way around. A check passes only on HTTP 200 with a body that equals
//! the expected token after trimming surrounding whitespace.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use log::{info, warn};
use reqwest::StatusCode;

use crate::config::ChallengeConfig;
use crate::domain::{Stack, VerificationResult};
use crate::verify::resolver::AddressResolver;

/// Dual-stack reachability checks for one hostname.
///
/// Both checks are total: every failure degrades to `false`.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn verify_ipv4(&self, host: &str) -> bool;

    async fn verify_ipv6(&self, host: &str) -> bool;

    /// Run both checks concurrently.
    async fn verify(&self, host: &str) -> VerificationResult {
        let (http_ok, ipv6_ok) = futures::join!(self.verify_ipv4(host), self.verify_ipv6(host));
        VerificationResult::new(host, http_ok, ipv6_ok)
    }
}

/// Verifier that resolves through `R` and fetches over HTTP.
#[derive(Debug)]
pub struct ReachabilityVerifier<R> {
    resolver: R,
    config: ChallengeConfig,
}

impl<R: AddressResolver> ReachabilityVerifier<R> {
    pub fn new(resolver: R, config: ChallengeConfig) -> Self {
        Self { resolver, config }
    }

    /// URL of the challenge file for `host`.
    pub fn challenge_url(&self, host: &str) -> String {
        if self.config.port == 80 {
            format!("http://{}{}", host, self.config.path)
        } else {
            format!("http://{}:{}{}", host, self.config.port, self.config.path)
        }
    }

    async fn fetch_token(
        &self,
        host: &str,
        stack: Stack,
        addrs: &[IpAddr],
    ) -> std::result::Result<(), String> {
        let pinned: Vec<SocketAddr> = addrs
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.config.port))
            .collect();

        let client = reqwest::Client::builder()
            .timeout(self.config.timeout())
            .connect_timeout(self.config.timeout())
            .no_proxy()
            .resolve_to_addrs(host, &pinned)
            // Binding to the family's unspecified address keeps redirects
            // on the same stack as the check.
            .local_address(unspecified(stack))
            .build()
            .map_err(|e| format!("client setup: {}", e))?;

        let response = client
            .get(self.challenge_url(host))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(format!("HTTP status {}", status));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        if body.trim() == self.config.expected_token {
            Ok(())
        } else {
            Err("Invalid content".to_string())
        }
    }

    async fn check(&self, host: &str, stack: Stack, addrs: &[IpAddr]) -> bool {
        match self.fetch_token(host, stack, addrs).await {
            Ok(()) => {
                info!("Domain verification successful for {} ({})", host, stack);
                true
            }
            Err(reason) => {
                warn!("Domain verification failed for {} ({}): {}", host, stack, reason);
                false
            }
        }
    }
}

fn unspecified(stack: Stack) -> IpAddr {
    match stack {
        Stack::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Stack::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

#[async_trait]
impl<R: AddressResolver> Reachability for ReachabilityVerifier<R> {
    async fn verify_ipv4(&self, host: &str) -> bool {
        let addrs = match self.resolver.lookup_ipv4(host).await {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => {
                warn!("Domain verification failed for {} (IPv4): No A record found", host);
                return false;
            }
            Err(e) => {
                warn!("Domain verification failed for {} (IPv4): {}", host, e);
                return false;
            }
        };
        let addrs: Vec<IpAddr> = addrs.into_iter().map(IpAddr::V4).collect();
        self.check(host, Stack::V4, &addrs).await
    }

    async fn verify_ipv6(&self, host: &str) -> bool {
        let addrs = match self.resolver.lookup_ipv6(host).await {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => {
                info!("No AAAA record for {}, IPv6 check passes", host);
                return true;
            }
            Err(e) if e.is_absence() => {
                info!("No AAAA record for {} ({}), IPv6 check passes", host, e);
                return true;
            }
            Err(e) => {
                warn!("Domain verification failed for {} (IPv6): {}", host, e);
                return false;
            }
        };
        let addrs: Vec<IpAddr> = addrs.into_iter().map(IpAddr::V6).collect();
        self.check(host, Stack::V6, &addrs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::resolver::{LookupError, StaticResolver};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Serve the same canned response to every connection.
    fn serve(listener: TcpListener, response: String) {
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let response = response.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
    }

    async fn v4_server(status: &str, body: &str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        serve(listener, http_response(status, body));
        port
    }

    fn challenge(port: u16) -> ChallengeConfig {
        ChallengeConfig {
            port,
            timeout_ms: 2000,
            ..Default::default()
        }
    }

    fn loopback_v4() -> StaticResolver {
        StaticResolver::new().with_ipv4("example.com", vec![Ipv4Addr::LOCALHOST])
    }

    #[test]
    fn test_challenge_url_default_port() {
        let verifier = ReachabilityVerifier::new(StaticResolver::new(), ChallengeConfig::default());
        assert_eq!(
            verifier.challenge_url("example.com"),
            "http://example.com/.well-known/acme-challenge/test-file.txt"
        );
    }

    #[test]
    fn test_challenge_url_custom_port() {
        let verifier = ReachabilityVerifier::new(StaticResolver::new(), challenge(8080));
        assert_eq!(
            verifier.challenge_url("example.com"),
            "http://example.com:8080/.well-known/acme-challenge/test-file.txt"
        );
    }

    #[tokio::test]
    async fn test_ipv4_matching_token() {
        let port = v4_server("200 OK", "test\n").await;
        let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
        assert!(verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv4_content_mismatch() {
        for body in ["tes", "Test", "test test", "\u{200b}test"] {
            let port = v4_server("200 OK", body).await;
            let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
            assert!(!verifier.verify_ipv4("example.com").await, "body {body:?} should fail");
        }
    }

    #[tokio::test]
    async fn test_ipv4_non_200_status() {
        let port = v4_server("404 Not Found", "test").await;
        let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
        assert!(!verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv4_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
        assert!(!verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv4_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let config = ChallengeConfig {
            port,
            timeout_ms: 200,
            ..Default::default()
        };
        let verifier = ReachabilityVerifier::new(loopback_v4(), config);
        let started = std::time::Instant::now();
        assert!(!verifier.verify_ipv4("example.com").await);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    fn redirect_to(location: &str) -> String {
        format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            location
        )
    }

    #[tokio::test]
    async fn test_ipv4_redirect_within_ipv4_followed() {
        let target = v4_server("200 OK", "test").await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        serve(
            listener,
            redirect_to(&format!("http://127.0.0.1:{}/.well-known/acme-challenge/test-file.txt", target)),
        );

        let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
        assert!(verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv4_redirect_to_ipv6_fails() {
        // Hosts without IPv6 loopback cannot run this check.
        let Ok(v6) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let v6_port = v6.local_addr().unwrap().port();
        serve(v6, http_response("200 OK", "test"));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        serve(
            listener,
            redirect_to(&format!("http://[::1]:{}/.well-known/acme-challenge/test-file.txt", v6_port)),
        );

        let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
        assert!(!verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv6_redirect_to_ipv4_fails() {
        let Ok(v6) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let v6_port = v6.local_addr().unwrap().port();
        let target = v4_server("200 OK", "test").await;
        serve(
            v6,
            redirect_to(&format!("http://127.0.0.1:{}/.well-known/acme-challenge/test-file.txt", target)),
        );

        let resolver = StaticResolver::new().with_ipv6("example.com", vec![Ipv6Addr::LOCALHOST]);
        let verifier = ReachabilityVerifier::new(resolver, challenge(v6_port));
        assert!(!verifier.verify_ipv6("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv4_without_a_record_fails() {
        let verifier = ReachabilityVerifier::new(StaticResolver::new(), challenge(80));
        assert!(!verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv4_resolver_error_fails() {
        let resolver = StaticResolver::new().with_ipv4_error("example.com", LookupError::Timeout);
        let verifier = ReachabilityVerifier::new(resolver, challenge(80));
        assert!(!verifier.verify_ipv4("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv6_no_aaaa_passes() {
        let verifier = ReachabilityVerifier::new(StaticResolver::new(), challenge(80));
        assert!(verifier.verify_ipv6("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv6_empty_answer_passes() {
        let resolver = StaticResolver::new().with_ipv6("example.com", Vec::new());
        let verifier = ReachabilityVerifier::new(resolver, challenge(80));
        assert!(verifier.verify_ipv6("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv6_absence_errors_pass() {
        for err in [LookupError::NoRecords, LookupError::NotImplemented, LookupError::InvalidName] {
            let resolver = StaticResolver::new().with_ipv6_error("example.com", err);
            let verifier = ReachabilityVerifier::new(resolver, challenge(80));
            assert!(verifier.verify_ipv6("example.com").await);
        }
    }

    #[tokio::test]
    async fn test_ipv6_resolver_failures_fail() {
        for err in [LookupError::Timeout, LookupError::Failed("SERVFAIL".into())] {
            let resolver = StaticResolver::new().with_ipv6_error("example.com", err);
            let verifier = ReachabilityVerifier::new(resolver, challenge(80));
            assert!(!verifier.verify_ipv6("example.com").await);
        }
    }

    #[tokio::test]
    async fn test_ipv6_fetch_over_loopback() {
        // Hosts without IPv6 loopback cannot run this check.
        let Ok(listener) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let port = listener.local_addr().unwrap().port();
        serve(listener, http_response("200 OK", " test "));

        let resolver = StaticResolver::new().with_ipv6("example.com", vec![Ipv6Addr::LOCALHOST]);
        let verifier = ReachabilityVerifier::new(resolver, challenge(port));
        assert!(verifier.verify_ipv6("example.com").await);
    }

    #[tokio::test]
    async fn test_ipv6_present_but_unreachable_fails() {
        // 2001:db8::/32 is documentation space and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        serve(listener, http_response("200 OK", "test"));

        let resolver = StaticResolver::new()
            .with_ipv4("example.com", vec![Ipv4Addr::LOCALHOST])
            .with_ipv6("example.com", vec!["2001:db8::1".parse().unwrap()]);
        let config = ChallengeConfig {
            port,
            timeout_ms: 300,
            ..Default::default()
        };
        let verifier = ReachabilityVerifier::new(resolver, config);
        let result = verifier.verify("example.com").await;
        assert!(result.http_ok);
        assert!(!result.ipv6_ok);
    }

    #[tokio::test]
    async fn test_verify_combines_both_stacks() {
        let port = v4_server("200 OK", "test").await;
        let verifier = ReachabilityVerifier::new(loopback_v4(), challenge(port));
        let result = verifier.verify("example.com").await;
        assert_eq!(result, VerificationResult::new("example.com", true, true));
    }
}
