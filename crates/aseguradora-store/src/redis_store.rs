//! Redis-backed policy store
//!
//! Each policy is a hash at `{ns}:policy:{id}`. Two index keys sit beside
//! the documents:
//! - `{ns}:policies:numbers` hash mapping policy number to id (uniqueness)
//! - `{ns}:policies:order` sorted set of ids scored by `{ns}:policies:seq`
//!
//! Writes run as Lua scripts so the uniqueness check, the document write and
//! the index maintenance happen atomically per document.

use aseguradora_core::schema::{INSURANCE_TYPE, INSURED_AMOUNT, POLICY_HOLDER, POLICY_NUMBER};
use aseguradora_core::{Error, InsuranceType, NewPolicy, Policy, PolicyPatch, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::{generate_id, now, PolicyStore};

const ID: &str = "id";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

const CREATE_SCRIPT: &str = r"
if redis.call('HSETNX', KEYS[2], ARGV[2], ARGV[1]) == 0 then
  return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV, 3))
redis.call('ZADD', KEYS[3], redis.call('INCR', KEYS[4]), ARGV[1])
return 1
";

const UPDATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return {'missing'}
end
if ARGV[2] ~= '' then
  local current = redis.call('HGET', KEYS[1], 'policyNumber')
  if current ~= ARGV[2] then
    if redis.call('HSETNX', KEYS[2], ARGV[2], ARGV[1]) == 0 then
      return {'duplicate'}
    end
    redis.call('HDEL', KEYS[2], current)
  end
end
redis.call('HSET', KEYS[1], unpack(ARGV, 3))
local fields = redis.call('HGETALL', KEYS[1])
table.insert(fields, 1, 'ok')
return fields
";

const DELETE_SCRIPT: &str = r"
local fields = redis.call('HGETALL', KEYS[1])
if #fields == 0 then
  return fields
end
redis.call('HDEL', KEYS[2], redis.call('HGET', KEYS[1], 'policyNumber'))
redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[3], ARGV[1])
return fields
";

/// Key layout under a namespace
#[derive(Debug, Clone)]
struct KeySpace {
    namespace: String,
}

impl KeySpace {
    fn policy(&self, id: &str) -> String {
        format!("{}:policy:{}", self.namespace, id)
    }

    fn numbers(&self) -> String {
        format!("{}:policies:numbers", self.namespace)
    }

    fn order(&self) -> String {
        format!("{}:policies:order", self.namespace)
    }

    fn seq(&self) -> String {
        format!("{}:policies:seq", self.namespace)
    }
}

/// Policy store backed by a Redis server
pub struct RedisStore {
    conn: ConnectionManager,
    keys: KeySpace,
    create_script: Script,
    update_script: Script,
    delete_script: Script,
}

impl RedisStore {
    /// Connect to Redis at `url`, keeping all keys under `namespace`
    pub async fn connect(url: &str, namespace: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::config(format!("invalid redis url: {}", e)))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(storage_err)?;

        info!(namespace, "Connected to Redis policy store");

        Ok(Self {
            conn,
            keys: KeySpace {
                namespace: namespace.to_string(),
            },
            create_script: Script::new(CREATE_SCRIPT),
            update_script: Script::new(UPDATE_SCRIPT),
            delete_script: Script::new(DELETE_SCRIPT),
        })
    }
}

#[async_trait]
impl PolicyStore for RedisStore {
    async fn create(&self, fields: NewPolicy) -> Result<Policy> {
        let policy = Policy::new(generate_id(), fields, now());
        let mut conn = self.conn.clone();

        let mut invocation = self.create_script.prepare_invoke();
        invocation
            .key(self.keys.policy(&policy.id))
            .key(self.keys.numbers())
            .key(self.keys.order())
            .key(self.keys.seq())
            .arg(&policy.id)
            .arg(&policy.policy_number);
        for (field, value) in encode(&policy) {
            invocation.arg(field).arg(value);
        }

        let inserted: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        if inserted == 0 {
            return Err(Error::duplicate_policy_number(&policy.policy_number));
        }

        debug!(id = %policy.id, "Stored policy");
        Ok(policy)
    }

    async fn list(&self) -> Result<Vec<Policy>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrange(self.keys.order(), 0, -1)
            .await
            .map_err(storage_err)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(self.keys.policy(id));
        }
        let rows: Vec<HashMap<String, String>> =
            pipe.query_async(&mut conn).await.map_err(storage_err)?;

        // Rows deleted between ZRANGE and HGETALL come back empty and are skipped.
        let mut policies = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(policy) = decode(row)? {
                policies.push(policy);
            }
        }
        Ok(policies)
    }

    async fn get(&self, id: &str) -> Result<Option<Policy>> {
        let mut conn = self.conn.clone();
        let row: HashMap<String, String> = conn
            .hgetall(self.keys.policy(id))
            .await
            .map_err(storage_err)?;
        decode(row)
    }

    async fn update(&self, id: &str, patch: PolicyPatch) -> Result<Option<Policy>> {
        let mut conn = self.conn.clone();

        let mut invocation = self.update_script.prepare_invoke();
        invocation
            .key(self.keys.policy(id))
            .key(self.keys.numbers())
            .arg(id)
            .arg(patch.policy_number.as_deref().unwrap_or(""));
        for (field, value) in encode_patch(&patch, now()) {
            invocation.arg(field).arg(value);
        }

        let reply: Vec<String> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;

        match reply.split_first() {
            Some((status, fields)) if status == "ok" => decode(pairs(fields)),
            Some((status, _)) if status == "missing" => Ok(None),
            Some((status, _)) if status == "duplicate" => Err(Error::duplicate_policy_number(
                patch.policy_number.as_deref().unwrap_or_default(),
            )),
            _ => Err(Error::storage(format!(
                "unexpected update reply: {:?}",
                reply
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<Policy>> {
        let mut conn = self.conn.clone();

        let mut invocation = self.delete_script.prepare_invoke();
        invocation
            .key(self.keys.policy(id))
            .key(self.keys.numbers())
            .key(self.keys.order())
            .arg(id);

        let reply: Vec<String> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;
        decode(pairs(&reply))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

fn storage_err(e: redis::RedisError) -> Error {
    Error::storage(e.to_string())
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn encode(policy: &Policy) -> Vec<(&'static str, String)> {
    vec![
        (ID, policy.id.clone()),
        (POLICY_NUMBER, policy.policy_number.clone()),
        (INSURANCE_TYPE, policy.insurance_type.to_string()),
        (POLICY_HOLDER, policy.policy_holder.clone()),
        (INSURED_AMOUNT, policy.insured_amount.to_string()),
        (CREATED_AT, timestamp(&policy.created_at)),
        (UPDATED_AT, timestamp(&policy.updated_at)),
    ]
}

fn encode_patch(patch: &PolicyPatch, at: DateTime<Utc>) -> Vec<(&'static str, String)> {
    let mut fields = Vec::with_capacity(5);
    if let Some(number) = &patch.policy_number {
        fields.push((POLICY_NUMBER, number.clone()));
    }
    if let Some(kind) = patch.insurance_type {
        fields.push((INSURANCE_TYPE, kind.to_string()));
    }
    if let Some(holder) = &patch.policy_holder {
        fields.push((POLICY_HOLDER, holder.clone()));
    }
    if let Some(amount) = patch.insured_amount {
        fields.push((INSURED_AMOUNT, amount.to_string()));
    }
    fields.push((UPDATED_AT, timestamp(&at)));
    fields
}

fn pairs(flat: &[String]) -> HashMap<String, String> {
    flat.chunks_exact(2)
        .map(|kv| (kv[0].clone(), kv[1].clone()))
        .collect()
}

/// Rebuild a policy from its hash fields; an empty hash means no document
fn decode(mut row: HashMap<String, String>) -> Result<Option<Policy>> {
    if row.is_empty() {
        return Ok(None);
    }

    let mut take = |field: &str| {
        row.remove(field)
            .ok_or_else(|| Error::storage(format!("policy document is missing '{}'", field)))
    };

    let id = take(ID)?;
    let policy_number = take(POLICY_NUMBER)?;
    let insurance_type = take(INSURANCE_TYPE)?
        .parse::<InsuranceType>()
        .map_err(Error::storage)?;
    let policy_holder = take(POLICY_HOLDER)?;
    let insured_amount = take(INSURED_AMOUNT)?
        .parse::<f64>()
        .map_err(|e| Error::storage(format!("bad insured amount: {}", e)))?;
    let created_at = parse_timestamp(&take(CREATED_AT)?)?;
    let updated_at = parse_timestamp(&take(UPDATED_AT)?)?;

    Ok(Some(Policy {
        id,
        policy_number,
        insurance_type,
        policy_holder,
        insured_amount,
        created_at,
        updated_at,
    }))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::storage(format!("bad timestamp '{}': {}", raw, e)))
}
