//! Distributed locks.
//!
//! Lock names are [`Key`]s. Listing supports the root, a directory, or a
//! forward cursor; acquiring returns the lock id and fencing sequencer the
//! caller needs to renew or release it.

use serde::Deserialize;

use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::key::{self, Key};
use crate::page::{self, Page, PageQuery};
use crate::resource::{check_status, decode_cursor, parse_json, require_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub name: Key,
    pub id: String,
    pub info: LockInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub ttl: u32,
    pub client_id: String,
    pub ip: String,
}

/// Returned verbatim by a successful acquire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeldLock {
    pub id: String,
    pub sequencer: u32,
}

#[derive(Deserialize)]
struct LockDto {
    name: String,
    id: String,
    info: LockInfoDto,
}

#[derive(Deserialize)]
struct LockInfoDto {
    ttl: u32,
    #[serde(rename = "client-id")]
    client_id: String,
    #[serde(default)]
    ip: String,
}

#[derive(Deserialize)]
struct LockPageDto {
    locks: Vec<LockDto>,
    #[serde(default)]
    next: Option<String>,
}

impl LockDto {
    fn into_lock(self) -> Result<Lock> {
        Ok(Lock {
            name: Key::from_wire(&self.name)?,
            id: self.id,
            info: LockInfo {
                ttl: self.info.ttl,
                client_id: self.info.client_id,
                ip: self.info.ip,
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct LocksClient {
    base_url: String,
    executor: RequestExecutor,
}

impl LocksClient {
    /// `metadata_url` is the service base; locks live under `/locks`.
    pub fn new(metadata_url: &str, executor: RequestExecutor) -> Self {
        Self {
            base_url: format!("{}/locks", metadata_url.trim_end_matches('/')),
            executor,
        }
    }

    pub fn build_get_page(&self, query: &PageQuery) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, query.path(&self.base_url))
    }

    pub fn build_get(&self, name: &Key) -> Result<HttpRequest> {
        let name = require_key(name, "lock name")?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            key::leaf_path(&self.base_url, name),
        ))
    }

    pub fn build_acquire(&self, name: &Key, client_id: &str, ttl: u32) -> Result<HttpRequest> {
        let name = require_key(name, "lock name")?;
        Ok(HttpRequest::new(
            HttpMethod::Post,
            format!(
                "{}?client-id={}&ttl={ttl}",
                key::leaf_path(&self.base_url, name),
                urlencoding::encode(client_id)
            ),
        ))
    }

    pub fn build_renew(&self, name: &Key, id: &str, ttl: u32) -> Result<HttpRequest> {
        let name = require_key(name, "lock name")?;
        Ok(HttpRequest::new(
            HttpMethod::Patch,
            format!(
                "{}?id={}&ttl={ttl}",
                key::leaf_path(&self.base_url, name),
                urlencoding::encode(id)
            ),
        ))
    }

    pub fn build_release(&self, name: &Key, id: &str) -> Result<HttpRequest> {
        let name = require_key(name, "lock name")?;
        Ok(HttpRequest::new(
            HttpMethod::Delete,
            format!(
                "{}?id={}",
                key::leaf_path(&self.base_url, name),
                urlencoding::encode(id)
            ),
        ))
    }

    pub fn parse_get_page(&self, response: HttpResponse) -> Result<Page<Lock>> {
        let dto: LockPageDto = parse_json(&response)?;
        let items = dto
            .locks
            .into_iter()
            .map(LockDto::into_lock)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, decode_cursor(dto.next)?))
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Lock> {
        parse_json::<LockDto>(&response)?.into_lock()
    }

    pub fn parse_acquire(&self, response: HttpResponse) -> Result<HeldLock> {
        parse_json(&response)
    }

    pub fn parse_renew(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_release(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn get_page(&self, query: &PageQuery) -> Result<Page<Lock>> {
        let response = self.executor.send(&self.build_get_page(query))?;
        self.parse_get_page(response)
    }

    /// Every held lock, following cursors from the root.
    pub fn get_all_pages(&self) -> Result<Vec<Lock>> {
        page::get_all_pages(|cursor: Option<&Key>| {
            let query = cursor.map_or(PageQuery::Root, |c| PageQuery::From(c.clone()));
            self.get_page(&query)
        })
    }

    pub fn get(&self, name: &Key) -> Result<Lock> {
        let response = self.executor.send(&self.build_get(name)?)?;
        self.parse_get(response)
    }

    pub fn acquire(&self, name: &Key, client_id: &str, ttl: u32) -> Result<HeldLock> {
        let response = self
            .executor
            .send(&self.build_acquire(name, client_id, ttl)?)?;
        self.parse_acquire(response)
    }

    pub fn renew(&self, name: &Key, id: &str, ttl: u32) -> Result<()> {
        let response = self.executor.send(&self.build_renew(name, id, ttl)?)?;
        self.parse_renew(response)
    }

    pub fn release(&self, name: &Key, id: &str) -> Result<()> {
        let response = self.executor.send(&self.build_release(name, id)?)?;
        self.parse_release(response)
    }
}
