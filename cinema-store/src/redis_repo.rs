use async_trait::async_trait;
use cinema_core::{CoreError, CoreResult, DocumentStore};
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{info, warn};

/// Redis-backed document store.
///
/// Key layout per collection:
/// - `{collection}:doc:{id}` holds the JSON document as a string
/// - `{collection}:index` is a sorted set of ids scored by insertion order
/// - `{collection}:seq` is the insertion counter feeding those scores
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

// Documents get their own segment so no id can land on a bookkeeping key.
fn document_key(collection: &str, id: &str) -> String {
    format!("{}:doc:{}", collection, id)
}

fn index_key(collection: &str) -> String {
    format!("{}:index", collection)
}

fn seq_key(collection: &str) -> String {
    format!("{}:seq", collection)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> CoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CoreError::backend)
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn decode(collection: &str, id: &str, raw: &str) -> CoreResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| CoreError::Backend(format!("corrupt document {}:{}: {}", collection, id, e)))
}

#[async_trait]
impl DocumentStore for RedisClient {
    async fn list_documents(&self, collection: &str) -> CoreResult<Vec<Value>> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn
            .zrange(index_key(collection), 0, -1)
            .await
            .map_err(CoreError::backend)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| document_key(collection, id)).collect();
        let raw: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(CoreError::backend)?;

        let mut documents = Vec::with_capacity(raw.len());
        for (id, body) in ids.iter().zip(raw) {
            match body {
                Some(body) => documents.push(decode(collection, id, &body)?),
                // Index entry outlived its document; skip it
                None => warn!("Dangling index entry {}:{}", collection, id),
            }
        }
        Ok(documents)
    }

    async fn get_document(&self, collection: &str, id: &str) -> CoreResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(document_key(collection, id))
            .await
            .map_err(CoreError::backend)?;

        raw.map(|body| decode(collection, id, &body)).transpose()
    }

    async fn insert_document(&self, collection: &str, id: &str, document: &Value) -> CoreResult<()> {
        let mut conn = self.connection().await?;
        // Existence check, index insert and write must not interleave with another insert.
        let script = redis::Script::new(
            r#"
            if redis.call("EXISTS", KEYS[1]) == 1 then
                return 0
            end
            local seq = redis.call("INCR", KEYS[3])
            redis.call("SET", KEYS[1], ARGV[2])
            redis.call("ZADD", KEYS[2], seq, ARGV[1])
            return 1
        "#,
        );

        let inserted: i32 = script
            .key(document_key(collection, id))
            .key(index_key(collection))
            .key(seq_key(collection))
            .arg(id)
            .arg(document.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(CoreError::backend)?;

        if inserted == 0 {
            return Err(CoreError::Conflict(format!(
                "A document with id {} already exists in {}",
                id, collection
            )));
        }
        info!("Document stored: {}:{}", collection, id);
        Ok(())
    }

    async fn replace_document(&self, collection: &str, id: &str, document: &Value) -> CoreResult<()> {
        let mut conn = self.connection().await?;
        // SET XX only overwrites an existing key
        let result: Option<String> = redis::cmd("SET")
            .arg(document_key(collection, id))
            .arg(document.to_string())
            .arg("XX")
            .query_async(&mut conn)
            .await
            .map_err(CoreError::backend)?;

        match result {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound(format!("Document {}:{}", collection, id))),
        }
    }

    async fn delete_document(&self, collection: &str, id: &str) -> CoreResult<()> {
        let mut conn = self.connection().await?;
        let (deleted, _unindexed): (i64, i64) = redis::pipe()
            .atomic()
            .del(document_key(collection, id))
            .zrem(index_key(collection), id)
            .query_async(&mut conn)
            .await
            .map_err(CoreError::backend)?;

        if deleted == 0 {
            return Err(CoreError::NotFound(format!("Document {}:{}", collection, id)));
        }
        info!("Document deleted: {}:{}", collection, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_collection() {
        assert_eq!(document_key("movie_catalog", "abc"), "movie_catalog:doc:abc");
        assert_eq!(index_key("reservation_events"), "reservation_events:index");
        assert_eq!(seq_key("reservation_events"), "reservation_events:seq");
    }

    #[test]
    fn reserved_looking_ids_do_not_collide_with_bookkeeping_keys() {
        for collection in ["movie_catalog", "reservation_events"] {
            for id in ["index", "seq", "doc", "doc:index"] {
                let key = document_key(collection, id);
                assert_ne!(key, index_key(collection));
                assert_ne!(key, seq_key(collection));
            }
        }
    }

    #[test]
    fn corrupt_documents_surface_as_backend_errors() {
        let err = decode("movie_catalog", "abc", "{not json").unwrap_err();
        assert!(matches!(err, CoreError::Backend(msg) if msg.contains("movie_catalog:abc")));
    }
}
