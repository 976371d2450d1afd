//! Access restrictions on locks and metadata directories.
//!
//! A restriction scopes a directory of one service to a set of allowed or
//! denied regions and providers. Listings are paged by an (api, key) cursor.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::executor::RequestExecutor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::key::{self, Key};
use crate::page::{self, Page};
use crate::resource::{check_status, decode_cursor, parse_json, require_key, to_json};
use crate::types::{Provider, Region, RestrictedApi, RestrictionState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionDetails {
    #[serde(default)]
    pub regions_allowed: Vec<Region>,
    #[serde(default)]
    pub regions_denied: Vec<Region>,
    #[serde(default)]
    pub providers_allowed: Vec<Provider>,
    #[serde(default)]
    pub providers_denied: Vec<Provider>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub api: RestrictedApi,
    pub directory: Key,
    pub details: RestrictionDetails,
    pub state: RestrictionState,
}

/// Where the next page of restrictions starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionCursor {
    pub api: RestrictedApi,
    pub key: Key,
}

#[derive(Deserialize)]
struct RestrictionDto {
    api: RestrictedApi,
    #[serde(default)]
    directory: Option<String>,
    #[serde(default)]
    details: RestrictionDetails,
    state: RestrictionState,
}

#[derive(Deserialize)]
struct RestrictionPageDto {
    restrictions: Vec<RestrictionDto>,
    #[serde(default)]
    next_api: Option<RestrictedApi>,
    #[serde(default)]
    next_key: Option<String>,
}

impl RestrictionDto {
    fn into_restriction(self) -> Result<Restriction> {
        let directory = match self.directory {
            Some(raw) if !raw.is_empty() => Key::from_wire(&raw)?,
            _ => {
                return Err(ApiError::DeserializationError(
                    "restriction without a directory".to_string(),
                ))
            }
        };
        Ok(Restriction {
            api: self.api,
            directory,
            details: self.details,
            state: self.state,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RestrictionsClient {
    base_url: String,
    executor: RequestExecutor,
}

impl RestrictionsClient {
    /// `metadata_url` is the service base; restrictions live under `/restrict`.
    pub fn new(metadata_url: &str, executor: RequestExecutor) -> Self {
        Self {
            base_url: format!("{}/restrict", metadata_url.trim_end_matches('/')),
            executor,
        }
    }

    fn restriction_path(&self, api: RestrictedApi, directory: &Key) -> Result<String> {
        let directory = require_key(directory, "restriction directory")?;
        Ok(key::directory_path(
            &format!("{}/{api}", self.base_url),
            Some(directory),
        ))
    }

    pub fn build_get_page(&self, cursor: Option<&RestrictionCursor>) -> HttpRequest {
        let path = match cursor {
            Some(c) => format!(
                "{}?from_api={}&{}",
                self.base_url,
                c.api,
                key::from_query(&c.key)
            ),
            None => self.base_url.clone(),
        };
        HttpRequest::new(HttpMethod::Get, path)
    }

    pub fn build_get(&self, api: RestrictedApi, directory: &Key) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            self.restriction_path(api, directory)?,
        ))
    }

    pub fn build_set(
        &self,
        api: RestrictedApi,
        directory: &Key,
        details: &RestrictionDetails,
    ) -> Result<HttpRequest> {
        let path = self.restriction_path(api, directory)?;
        Ok(HttpRequest::new(HttpMethod::Put, path).with_body("application/json", to_json(details)?))
    }

    pub fn build_delete(&self, api: RestrictedApi, directory: &Key) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Delete,
            self.restriction_path(api, directory)?,
        ))
    }

    pub fn parse_get_page(
        &self,
        response: HttpResponse,
    ) -> Result<Page<Restriction, RestrictionCursor>> {
        let dto: RestrictionPageDto = parse_json(&response)?;
        let items = dto
            .restrictions
            .into_iter()
            .map(RestrictionDto::into_restriction)
            .collect::<Result<Vec<_>>>()?;
        let next = match (dto.next_api, decode_cursor(dto.next_key)?) {
            (Some(api), Some(key)) => Some(RestrictionCursor { api, key }),
            (None, None) => None,
            _ => {
                return Err(ApiError::DeserializationError(
                    "next_api and next_key must be given together".to_string(),
                ))
            }
        };
        Ok(Page::new(items, next))
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Restriction> {
        parse_json::<RestrictionDto>(&response)?.into_restriction()
    }

    pub fn parse_set(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn get_page(
        &self,
        cursor: Option<&RestrictionCursor>,
    ) -> Result<Page<Restriction, RestrictionCursor>> {
        let response = self.executor.send(&self.build_get_page(cursor))?;
        self.parse_get_page(response)
    }

    pub fn get_all_pages(&self) -> Result<Vec<Restriction>> {
        page::get_all_pages(|cursor: Option<&RestrictionCursor>| self.get_page(cursor))
    }

    pub fn get(&self, api: RestrictedApi, directory: &Key) -> Result<Restriction> {
        let response = self.executor.send(&self.build_get(api, directory)?)?;
        self.parse_get(response)
    }

    pub fn set(
        &self,
        api: RestrictedApi,
        directory: &Key,
        details: &RestrictionDetails,
    ) -> Result<()> {
        let response = self
            .executor
            .send(&self.build_set(api, directory, details)?)?;
        self.parse_set(response)
    }

    pub fn delete(&self, api: RestrictedApi, directory: &Key) -> Result<()> {
        let response = self.executor.send(&self.build_delete(api, directory)?)?;
        self.parse_delete(response)
    }
}
