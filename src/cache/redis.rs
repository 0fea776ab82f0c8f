use std::time::Duration;

use async_trait::async_trait;
use redis::{
    ConnectionInfo, IntoConnectionInfo, aio::MultiplexedConnection, cluster::ClusterClient,
    cluster_async::ClusterConnection,
};

use super::{
    error::{CacheError, CacheResult},
    traits::Cache,
};
use crate::config::RedisCacheConfig;

/// A wrapper enum for either a standalone or cluster Redis connection.
enum RedisConn {
    Standalone(MultiplexedConnection),
    Cluster(ClusterConnection),
}

/// Execute a Redis command on either connection type.
macro_rules! redis_cmd {
    ($conn:expr, $cmd:expr) => {
        match $conn {
            RedisConn::Standalone(ref mut c) => $cmd.query_async(c).await,
            RedisConn::Cluster(ref mut c) => $cmd.query_async(c).await,
        }
    };
}

enum RedisConnection {
    Standalone(redis::Client),
    Cluster(ClusterClient),
}

/// Redis-backed cache. Signal queues live under `{key_prefix}{signal key}`.
pub struct RedisCache {
    connection: RedisConnection,
    key_prefix: String,
    connect_timeout: Duration,
}

impl RedisCache {
    pub async fn from_config(config: &RedisCacheConfig) -> CacheResult<Self> {
        let connection = if let Some(cluster_config) = &config.cluster {
            let nodes: Vec<ConnectionInfo> = config
                .url
                .split(',')
                .chain(cluster_config.nodes.iter().map(String::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    let node_url = if s.starts_with("redis://") || s.starts_with("rediss://") {
                        s.to_string()
                    } else {
                        format!("redis://{}", s)
                    };
                    node_url.into_connection_info()
                })
                .collect::<Result<Vec<_>, _>>()?;

            if nodes.is_empty() {
                return Err(CacheError::Redis(redis::RedisError::from((
                    redis::ErrorKind::InvalidClientConfig,
                    "No cluster nodes specified",
                ))));
            }

            let mut builder = redis::cluster::ClusterClientBuilder::new(nodes)
                .retries(cluster_config.retries)
                .connection_timeout(Duration::from_secs(config.connect_timeout_secs));
            if cluster_config.read_from_replicas {
                builder = builder.read_from_replicas();
            }

            RedisConnection::Cluster(builder.build()?)
        } else {
            RedisConnection::Standalone(redis::Client::open(config.url.as_str())?)
        };

        let cache = Self {
            connection,
            key_prefix: config.key_prefix.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        };

        // Fail fast on a bad URL or unreachable server
        cache.get_connection().await?;
        tracing::info!(
            cluster = config.cluster.is_some(),
            key_prefix = %config.key_prefix,
            "Connected to Redis"
        );

        Ok(cache)
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn get_connection(&self) -> CacheResult<RedisConn> {
        let connect = async {
            match &self.connection {
                RedisConnection::Standalone(client) => {
                    let conn = client.get_multiplexed_async_connection().await?;
                    Ok(RedisConn::Standalone(conn))
                }
                RedisConnection::Cluster(client) => {
                    let conn = client.get_async_connection().await?;
                    Ok(RedisConn::Cluster(conn))
                }
            }
        };

        tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| CacheError::Internal("Timed out connecting to Redis".to_string()))?
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        let data: Option<Vec<u8>> = redis_cmd!(conn, redis::cmd("GET").arg(&full_key))?;
        Ok(data)
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        if ttl.as_secs() > 0 {
            let _: () = redis_cmd!(
                conn,
                redis::cmd("SETEX")
                    .arg(&full_key)
                    .arg(ttl.as_secs())
                    .arg(value)
            )?;
        } else {
            let _: () = redis_cmd!(conn, redis::cmd("SET").arg(&full_key).arg(value))?;
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        let count: i64 = redis_cmd!(conn, redis::cmd("EXISTS").arg(&full_key))?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        let _: () = redis_cmd!(conn, redis::cmd("DEL").arg(&full_key))?;
        Ok(())
    }
}
