//! In-memory stand-in for the platform's HTTP services.
//!
//! Serves the identity, locks, metadata, restrictions and compute endpoints
//! from one router. Every endpoint except `/token` and `/_admin/*` demands a
//! bearer token previously issued by `/token`. `/_admin/revoke` invalidates
//! all issued tokens so callers can exercise renewal.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{
    alphabet::URL_SAFE,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

const CODEC: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// The only API key `/token` accepts.
    pub api_key: String,
    /// Maximum number of items per list page.
    pub page_size: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api_key: "test_apikey".to_string(),
            page_size: 100,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flight {
    pub oid: String,
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Formation {
    pub oid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(
        rename = "gateway-flight",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gateway_flight: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestrictionDetails {
    #[serde(default)]
    pub regions_allowed: Vec<String>,
    #[serde(default)]
    pub regions_denied: Vec<String>,
    #[serde(default)]
    pub providers_allowed: Vec<String>,
    #[serde(default)]
    pub providers_denied: Vec<String>,
}

#[derive(Clone, Debug)]
struct HeldLock {
    id: String,
    client_id: String,
    ttl: u32,
}

#[derive(Debug, Default)]
pub struct Platform {
    config: MockConfig,
    tokens: HashSet<String>,
    tokens_issued: u64,
    sequencer: u32,
    locks: BTreeMap<String, HeldLock>,
    kvs: BTreeMap<String, String>,
    restrictions: BTreeMap<(String, String), RestrictionDetails>,
    formations: BTreeMap<String, Formation>,
}

pub type Db = Arc<RwLock<Platform>>;

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let db: Db = Arc::new(RwLock::new(Platform {
        config,
        ..Platform::default()
    }));
    Router::new()
        .route("/token", post(issue_token))
        .route("/_admin/revoke", post(revoke_tokens))
        .route("/_admin/stats", get(stats))
        .route("/locks", get(list_locks_root))
        .route(
            "/locks/{key}",
            get(get_lock)
                .post(acquire_lock)
                .patch(renew_lock)
                .delete(release_lock),
        )
        .route("/locks/{key}/", get(list_locks_dir))
        .route("/config", get(list_kvs_root))
        .route("/config/{key}", get(get_kv).put(put_kv).delete(delete_kv))
        .route("/config/{key}/", get(list_kvs_dir))
        .route("/restrict", get(list_restrictions))
        .route(
            "/restrict/{api}/{key}/",
            get(get_restriction)
                .put(put_restriction)
                .delete(delete_restriction),
        )
        .route("/formations", get(list_formations).post(create_formation))
        .route(
            "/formations/{id}",
            get(get_formation).delete(delete_formation),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

// --- encoding ---

pub fn encode_field(value: &str) -> String {
    CODEC.encode(value)
}

fn decode_field(encoded: &str) -> Result<String, StatusCode> {
    let bytes = CODEC.decode(encoded).map_err(|_| StatusCode::BAD_REQUEST)?;
    String::from_utf8(bytes).map_err(|_| StatusCode::BAD_REQUEST)
}

fn decode_segment(segment: &str) -> Result<String, StatusCode> {
    let encoded = segment
        .strip_prefix("base64:")
        .ok_or(StatusCode::BAD_REQUEST)?;
    decode_field(encoded)
}

// --- auth ---

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = bearer(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    if db.read().await.tokens.contains(token) {
        Ok(())
    } else {
        debug!("rejecting unknown bearer token");
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn issue_token(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut platform = db.write().await;
    if bearer(&headers) != Some(platform.config.api_key.as_str()) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let token = format!("tok-{}", Uuid::new_v4().simple());
    platform.tokens.insert(token.clone());
    platform.tokens_issued += 1;
    info!(issued = platform.tokens_issued, "issued access token");
    Ok((
        StatusCode::CREATED,
        Json(json!({"token": token, "tenant": "tnt-mock", "subdomain": "mock"})),
    ))
}

async fn revoke_tokens(State(db): State<Db>) -> StatusCode {
    db.write().await.tokens.clear();
    info!("revoked all access tokens");
    StatusCode::NO_CONTENT
}

async fn stats(State(db): State<Db>) -> Json<Value> {
    let platform = db.read().await;
    Json(json!({
        "tokens_issued": platform.tokens_issued,
        "tokens_valid": platform.tokens.len(),
    }))
}

// --- paging ---

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    from: Option<String>,
    from_api: Option<String>,
}

/// One page of `map`, optionally restricted to keys under `dir` and starting
/// at `from`. The returned cursor is the first key of the following page.
fn page_of<'a, V>(
    map: &'a BTreeMap<String, V>,
    dir: Option<&str>,
    from: Option<&str>,
    size: usize,
) -> (Vec<(&'a String, &'a V)>, Option<String>) {
    let prefix = dir.map(|d| {
        if d.ends_with('/') {
            d.to_string()
        } else {
            format!("{d}/")
        }
    });
    let mut matching = map
        .iter()
        .filter(|(k, _)| prefix.as_deref().map_or(true, |p| k.starts_with(p)))
        .filter(|(k, _)| from.map_or(true, |f| k.as_str() >= f));
    let items: Vec<_> = matching.by_ref().take(size).collect();
    let next = matching.next().map(|(k, _)| k.clone());
    (items, next)
}

fn decode_scope(
    dir: Option<String>,
    params: ListParams,
) -> Result<(Option<String>, Option<String>), StatusCode> {
    let dir = dir.map(|d| decode_segment(&d)).transpose()?;
    let from = params.from.map(|f| decode_segment(&f)).transpose()?;
    Ok((dir, from))
}

// --- locks ---

fn lock_json(name: &str, lock: &HeldLock) -> Value {
    json!({
        "name": encode_field(name),
        "id": lock.id,
        "info": {"ttl": lock.ttl, "client-id": lock.client_id, "ip": "127.0.0.1"},
    })
}

async fn list_locks(
    db: Db,
    headers: HeaderMap,
    dir: Option<String>,
    params: ListParams,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let (dir, from) = decode_scope(dir, params)?;
    let platform = db.read().await;
    let (items, next) = page_of(
        &platform.locks,
        dir.as_deref(),
        from.as_deref(),
        platform.config.page_size,
    );
    let locks: Vec<Value> = items
        .into_iter()
        .map(|(name, lock)| lock_json(name, lock))
        .collect();
    Ok(Json(json!({
        "locks": locks,
        "next": next.map(|k| encode_field(&k)),
    })))
}

async fn list_locks_root(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, StatusCode> {
    list_locks(db, headers, None, params).await
}

async fn list_locks_dir(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(dir): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, StatusCode> {
    list_locks(db, headers, Some(dir), params).await
}

#[derive(Deserialize)]
pub struct AcquireParams {
    #[serde(rename = "client-id")]
    client_id: String,
    ttl: u32,
}

#[derive(Deserialize)]
pub struct RenewParams {
    id: String,
    ttl: u32,
}

#[derive(Deserialize)]
pub struct ReleaseParams {
    id: String,
}

async fn get_lock(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let name = decode_segment(&key)?;
    let platform = db.read().await;
    platform
        .locks
        .get(&name)
        .map(|lock| Json(lock_json(&name, lock)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn acquire_lock(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(params): Query<AcquireParams>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let name = decode_segment(&key)?;
    let mut platform = db.write().await;
    if platform.locks.contains_key(&name) {
        return Err(StatusCode::CONFLICT);
    }
    platform.sequencer += 1;
    let sequencer = platform.sequencer;
    let id = Uuid::new_v4().simple().to_string();
    platform.locks.insert(
        name,
        HeldLock {
            id: id.clone(),
            client_id: params.client_id,
            ttl: params.ttl,
        },
    );
    Ok(Json(json!({"id": id, "sequencer": sequencer})))
}

async fn renew_lock(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(params): Query<RenewParams>,
) -> Result<StatusCode, StatusCode> {
    authorize(&db, &headers).await?;
    let name = decode_segment(&key)?;
    let mut platform = db.write().await;
    match platform.locks.get_mut(&name) {
        Some(lock) if lock.id == params.id => {
            lock.ttl = params.ttl;
            Ok(StatusCode::OK)
        }
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn release_lock(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(params): Query<ReleaseParams>,
) -> Result<StatusCode, StatusCode> {
    authorize(&db, &headers).await?;
    let name = decode_segment(&key)?;
    let mut platform = db.write().await;
    let held = platform
        .locks
        .get(&name)
        .is_some_and(|lock| lock.id == params.id);
    if !held {
        return Err(StatusCode::NOT_FOUND);
    }
    platform.locks.remove(&name);
    Ok(StatusCode::OK)
}

// --- metadata ---

async fn list_kvs(
    db: Db,
    headers: HeaderMap,
    dir: Option<String>,
    params: ListParams,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let (dir, from) = decode_scope(dir, params)?;
    let platform = db.read().await;
    let (items, next) = page_of(
        &platform.kvs,
        dir.as_deref(),
        from.as_deref(),
        platform.config.page_size,
    );
    let kvs: Vec<Value> = items
        .into_iter()
        .map(|(key, value)| json!({"key": encode_field(key), "value": value}))
        .collect();
    Ok(Json(json!({
        "kvs": kvs,
        "next_key": next.map(|k| encode_field(&k)),
    })))
}

async fn list_kvs_root(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, StatusCode> {
    list_kvs(db, headers, None, params).await
}

async fn list_kvs_dir(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(dir): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, StatusCode> {
    list_kvs(db, headers, Some(dir), params).await
}

async fn get_kv(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let key = decode_segment(&key)?;
    let platform = db.read().await;
    platform
        .kvs
        .get(&key)
        .map(|value| Json(json!({"key": encode_field(&key), "value": value})))
        .ok_or(StatusCode::NOT_FOUND)
}

/// The body is the value, already base64 encoded by the client.
async fn put_kv(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let key = decode_segment(&key)?;
    CODEC
        .decode(body.as_bytes())
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    db.write().await.kvs.insert(key, body);
    Ok(Json(json!({"status": 200, "title": "Ok"})))
}

async fn delete_kv(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<StatusCode, StatusCode> {
    authorize(&db, &headers).await?;
    let key = decode_segment(&key)?;
    db.write()
        .await
        .kvs
        .remove(&key)
        .map(|_| StatusCode::OK)
        .ok_or(StatusCode::NOT_FOUND)
}

// --- restrictions ---

fn check_api(api: &str) -> Result<(), StatusCode> {
    match api {
        "locks" | "config" => Ok(()),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

fn restriction_json(api: &str, directory: &str, details: &RestrictionDetails) -> Value {
    json!({
        "api": api,
        "directory": encode_field(directory),
        "details": details,
        "state": "enforced",
    })
}

async fn list_restrictions(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let start = match (params.from_api, params.from) {
        (Some(api), Some(from)) => {
            check_api(&api)?;
            Some((api, decode_segment(&from)?))
        }
        (None, None) => None,
        _ => return Err(StatusCode::BAD_REQUEST),
    };
    let platform = db.read().await;
    let mut matching = platform
        .restrictions
        .iter()
        .filter(|(k, _)| start.as_ref().map_or(true, |s| *k >= s));
    let restrictions: Vec<Value> = matching
        .by_ref()
        .take(platform.config.page_size)
        .map(|((api, dir), details)| restriction_json(api, dir, details))
        .collect();
    let next = matching.next().map(|((api, dir), _)| (api.clone(), dir.clone()));
    Ok(Json(json!({
        "restrictions": restrictions,
        "next_api": next.as_ref().map(|(api, _)| api.clone()),
        "next_key": next.as_ref().map(|(_, dir)| encode_field(dir)),
    })))
}

async fn get_restriction(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((api, key)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    check_api(&api)?;
    let directory = decode_segment(&key)?;
    let platform = db.read().await;
    platform
        .restrictions
        .get(&(api.clone(), directory.clone()))
        .map(|details| Json(restriction_json(&api, &directory, details)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_restriction(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((api, key)): Path<(String, String)>,
    Json(details): Json<RestrictionDetails>,
) -> Result<StatusCode, StatusCode> {
    authorize(&db, &headers).await?;
    check_api(&api)?;
    let directory = decode_segment(&key)?;
    db.write()
        .await
        .restrictions
        .insert((api, directory), details);
    Ok(StatusCode::OK)
}

async fn delete_restriction(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((api, key)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    authorize(&db, &headers).await?;
    check_api(&api)?;
    let directory = decode_segment(&key)?;
    db.write()
        .await
        .restrictions
        .remove(&(api, directory))
        .map(|_| StatusCode::OK)
        .ok_or(StatusCode::NOT_FOUND)
}

// --- compute ---

async fn list_formations(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&db, &headers).await?;
    let platform = db.read().await;
    let formations: Vec<&Formation> = platform.formations.values().collect();
    let total = formations.len();
    Ok(Json(json!({
        "formations": formations,
        "meta": {"total": total, "next": null, "prev": null},
    })))
}

async fn create_formation(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(formation): Json<Formation>,
) -> Result<(StatusCode, Json<Formation>), StatusCode> {
    authorize(&db, &headers).await?;
    let mut platform = db.write().await;
    if platform.formations.contains_key(&formation.oid) {
        return Err(StatusCode::CONFLICT);
    }
    platform
        .formations
        .insert(formation.oid.clone(), formation.clone());
    Ok((StatusCode::CREATED, Json(formation)))
}

async fn get_formation(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Formation>, StatusCode> {
    authorize(&db, &headers).await?;
    let platform = db.read().await;
    platform
        .formations
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_formation(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    authorize(&db, &headers).await?;
    db.write()
        .await
        .formations
        .remove(&id)
        .map(|_| StatusCode::OK)
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(keys: &[&str]) -> BTreeMap<String, u8> {
        keys.iter().map(|k| (k.to_string(), 0)).collect()
    }

    #[test]
    fn formation_uses_kebab_gateway_field() {
        let formation = Formation {
            oid: "frm-1".to_string(),
            name: "web".to_string(),
            url: None,
            flights: Vec::new(),
            gateway_flight: Some("gw".to_string()),
        };
        let json = serde_json::to_value(&formation).unwrap();
        assert_eq!(json["gateway-flight"], "gw");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn segments_require_prefix() {
        assert_eq!(decode_segment("base64:Zm9vL2Jhcg").unwrap(), "foo/bar");
        assert_eq!(decode_segment("Zm9v"), Err(StatusCode::BAD_REQUEST));
        assert_eq!(decode_segment("base64:***"), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn page_of_splits_and_returns_next_key() {
        let m = map(&["a", "b", "c", "d", "e"]);
        let (items, next) = page_of(&m, None, None, 2);
        let keys: Vec<&str> = items.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(next.as_deref(), Some("c"));

        let (items, next) = page_of(&m, None, Some("e"), 2);
        assert_eq!(items.len(), 1);
        assert!(next.is_none());
    }

    #[test]
    fn page_of_scopes_to_directory() {
        let m = map(&["foo", "foo/a", "foo/b", "foobar", "zed"]);
        let (items, next) = page_of(&m, Some("foo"), None, 10);
        let keys: Vec<&str> = items.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["foo/a", "foo/b"]);
        assert!(next.is_none());
    }
}
