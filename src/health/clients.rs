// Concrete dependency clients for the health probes.
// Each ping opens its own transient connection and releases it when the scope ends.

use super::checks::{DependencyClient, ProbeError};
use crate::models::{RedisConfig, ScyllaConfig};
use async_trait::async_trait;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use scylla::SessionBuilder;
use std::time::Duration;
use tracing::debug;

const SCYLLA_PING_QUERY: &str = "SELECT now() FROM system.local";
const DEFAULT_REDIS_PORT: u16 = 6379;

/// ScyllaDB client that opens a short-lived session per probe
pub struct ScyllaClient {
    hosts: Vec<String>,
    keyspace: Option<String>,
    credentials: Option<(String, String)>,
    connect_timeout: Duration,
}

impl ScyllaClient {
    pub fn new(config: &ScyllaConfig, connect_timeout: Duration) -> Self {
        let keyspace = Some(config.keyspace.clone()).filter(|k| !k.is_empty());
        let credentials = config
            .username
            .clone()
            .map(|user| (user, config.password.clone().unwrap_or_default()));

        Self {
            hosts: config.hosts.clone(),
            keyspace,
            credentials,
            connect_timeout,
        }
    }
}

#[async_trait]
impl DependencyClient for ScyllaClient {
    async fn ping(&self) -> Result<(), ProbeError> {
        let mut builder = SessionBuilder::new().connection_timeout(self.connect_timeout);
        for host in &self.hosts {
            builder = builder.known_node(host);
        }
        if let Some((user, password)) = &self.credentials {
            builder = builder.user(user.as_str(), password.as_str());
        }
        if let Some(keyspace) = &self.keyspace {
            builder = builder.use_keyspace(keyspace.as_str(), false);
        }

        let session = builder
            .build()
            .await
            .map_err(|e| ProbeError::Connection(e.to_string()))?;

        debug!(hosts = ?self.hosts, "scylla session established");

        session
            .query_unpaged(SCYLLA_PING_QUERY, ())
            .await
            .map_err(|e| ProbeError::Protocol(e.to_string()))?;

        Ok(())
    }
}

/// Redis client issuing PING over a fresh multiplexed connection
#[derive(Debug)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    /// Builds the client without connecting; fails only on a malformed host
    pub fn new(config: &RedisConfig) -> Result<Self, String> {
        let info = redis_connection_info(config)?;
        let client = redis::Client::open(info)
            .map_err(|e| format!("Invalid redis configuration for '{}': {}", config.host, e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DependencyClient for RedisClient {
    async fn ping(&self) -> Result<(), ProbeError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ProbeError::Connection(e.to_string()))?;

        let reply = redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| ProbeError::Protocol(e.to_string()))?;

        if reply != "PONG" {
            return Err(ProbeError::Protocol(format!("PING returned '{}'", reply)));
        }

        Ok(())
    }
}

/// Connection settings for redis, built field by field so the password is never URL-parsed
pub fn redis_connection_info(config: &RedisConfig) -> Result<ConnectionInfo, String> {
    let (host, port) = split_host_port(&config.host)?;
    let password = config.password.clone().filter(|p| !p.is_empty());

    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            db: i64::from(config.database),
            password,
            ..RedisConnectionInfo::default()
        },
    })
}

/// Split `host:port`; the port defaults to 6379 and IPv6 literals use `[addr]:port`
fn split_host_port(address: &str) -> Result<(String, u16), String> {
    let address = address.trim();

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| format!("Invalid redis host '{}': unclosed '['", address))?;
        (host, tail.strip_prefix(':'))
    } else {
        match address.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (address, None),
        }
    };

    if host.is_empty() {
        return Err(format!("Invalid redis host '{}': missing hostname", address));
    }

    let port = match port {
        Some(port) => port
            .parse::<u16>()
            .map_err(|e| format!("Invalid redis port in '{}': {}", address, e))?,
        None => DEFAULT_REDIS_PORT,
    };

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::checks::{DependencyCheck, HealthCheck};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn redis_config(host: &str, password: Option<&str>, database: u8) -> RedisConfig {
        RedisConfig {
            host: host.to_string(),
            password: password.map(str::to_string),
            database,
        }
    }

    /// Local TCP server speaking just enough RESP: every command gets `reply`,
    /// or nothing at all when `reply` is `None`
    async fn spawn_fake_redis(reply: Option<&'static [u8]>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    loop {
                        let n = match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        let Some(reply) = reply else { continue };
                        let commands = buf[..n]
                            .split(|b| *b == b'\n')
                            .filter(|line| line.first() == Some(&b'*'))
                            .count();
                        for _ in 0..commands {
                            if socket.write_all(reply).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        addr.to_string()
    }

    #[test]
    fn test_connection_info_without_password() {
        let info = redis_connection_info(&redis_config("cache.internal:6380", None, 0)).unwrap();

        match info.addr {
            ConnectionAddr::Tcp(ref host, port) => {
                assert_eq!(host, "cache.internal");
                assert_eq!(port, 6380);
            }
            ref other => panic!("unexpected address {:?}", other),
        }
        assert_eq!(info.redis.db, 0);
        assert!(info.redis.password.is_none());
    }

    #[test]
    fn test_connection_info_defaults_port_and_drops_empty_password() {
        let info = redis_connection_info(&redis_config("cache.internal", Some(""), 3)).unwrap();

        assert!(matches!(info.addr, ConnectionAddr::Tcp(_, 6379)));
        assert_eq!(info.redis.db, 3);
        assert!(info.redis.password.is_none());
    }

    #[test]
    fn test_connection_info_ipv6_host() {
        let info = redis_connection_info(&redis_config("[::1]:6379", None, 0)).unwrap();
        match info.addr {
            ConnectionAddr::Tcp(ref host, port) => {
                assert_eq!(host, "::1");
                assert_eq!(port, 6379);
            }
            ref other => panic!("unexpected address {:?}", other),
        }
    }

    #[test]
    fn test_password_with_reserved_characters_is_kept_verbatim() {
        for password in ["p@ss", "a#b", "x/y", "what?now", "100%:secret"] {
            let config = redis_config("cache.internal:6379", Some(password), 0);

            let info = redis_connection_info(&config).unwrap();
            assert_eq!(info.redis.password.as_deref(), Some(password));
            assert!(
                RedisClient::new(&config).is_ok(),
                "password {:?} rejected",
                password
            );
        }
    }

    #[test]
    fn test_invalid_redis_port_is_rejected() {
        let result = RedisClient::new(&redis_config("cache.internal:not-a-port", None, 0));
        assert!(result.unwrap_err().contains("Invalid redis port"));
    }

    #[test]
    fn test_redis_client_construction_does_not_connect() {
        assert!(RedisClient::new(&redis_config("cache.internal:6379", None, 0)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_connection_error() {
        // Port 1 on loopback is never a redis server
        let client = RedisClient::new(&redis_config("127.0.0.1:1", None, 0)).unwrap();

        let result = client.ping().await;
        assert!(matches!(result, Err(ProbeError::Connection(_))));
    }

    #[tokio::test]
    async fn test_unexpected_ping_reply_is_protocol_error() {
        let host = spawn_fake_redis(Some(b"+NOPE\r\n")).await;
        let client = RedisClient::new(&redis_config(&host, None, 0)).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), client.ping())
            .await
            .expect("fake redis answers immediately");
        assert_eq!(
            result,
            Err(ProbeError::Protocol("PING returned 'NOPE'".to_string()))
        );
    }

    #[tokio::test]
    async fn test_error_reply_is_protocol_error() {
        let host = spawn_fake_redis(Some(b"-ERR unknown command\r\n")).await;
        let client = RedisClient::new(&redis_config(&host, None, 0)).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), client.ping())
            .await
            .expect("fake redis answers immediately");
        assert!(matches!(result, Err(ProbeError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_silent_redis_times_out() {
        let host = spawn_fake_redis(None).await;
        let client = RedisClient::new(&redis_config(&host, None, 0)).unwrap();
        let check = DependencyCheck::new("redis", Arc::new(client), Duration::from_millis(200));

        let result = check.check().await;

        assert_eq!(result.state, crate::health::ComponentState::Down);
        assert_eq!(result.detail.as_deref(), Some("timed out after 200ms"));
    }

    #[tokio::test]
    async fn test_unreachable_scylla_is_connection_error() {
        let config = ScyllaConfig {
            hosts: vec!["127.0.0.1:1".to_string()],
            keyspace: String::new(),
            username: None,
            password: None,
        };
        let client = ScyllaClient::new(&config, Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(10), client.ping())
            .await
            .expect("scylla ping should fail fast against a closed port");
        assert!(matches!(result, Err(ProbeError::Connection(_))));
    }
}
