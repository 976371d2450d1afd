//! Key-value metadata store.
//!
//! Both keys and values are base64 on the wire and plain strings here.

use serde::Deserialize;

use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::key::{self, Key};
use crate::page::{self, Page, PageQuery};
use crate::resource::{check_status, decode_cursor, parse_json, require_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Key,
    pub value: String,
}

#[derive(Deserialize)]
struct KeyValueDto {
    key: String,
    value: String,
}

#[derive(Deserialize)]
struct KeyValuePageDto {
    kvs: Vec<KeyValueDto>,
    #[serde(default)]
    next_key: Option<String>,
}

impl KeyValueDto {
    fn into_key_value(self) -> Result<KeyValue> {
        Ok(KeyValue {
            key: Key::from_wire(&self.key)?,
            value: key::decode(&self.value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MetadataClient {
    base_url: String,
    executor: RequestExecutor,
}

impl MetadataClient {
    /// `metadata_url` is the service base; entries live under `/config`.
    pub fn new(metadata_url: &str, executor: RequestExecutor) -> Self {
        Self {
            base_url: format!("{}/config", metadata_url.trim_end_matches('/')),
            executor,
        }
    }

    pub fn build_get_page(&self, query: &PageQuery) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, query.path(&self.base_url))
    }

    pub fn build_get(&self, key: &Key) -> Result<HttpRequest> {
        let key = require_key(key, "key")?;
        Ok(HttpRequest::new(
            HttpMethod::Get,
            key::leaf_path(&self.base_url, key),
        ))
    }

    pub fn build_set(&self, entry: &KeyValue) -> Result<HttpRequest> {
        let key = require_key(&entry.key, "key")?;
        Ok(
            HttpRequest::new(HttpMethod::Put, key::leaf_path(&self.base_url, key)).with_body(
                "application/octet-stream",
                key::encode_bytes(entry.value.as_bytes()),
            ),
        )
    }

    pub fn build_delete(&self, key: &Key) -> Result<HttpRequest> {
        let key = require_key(key, "key")?;
        Ok(HttpRequest::new(
            HttpMethod::Delete,
            key::leaf_path(&self.base_url, key),
        ))
    }

    pub fn parse_get_page(&self, response: HttpResponse) -> Result<Page<KeyValue>> {
        let dto: KeyValuePageDto = parse_json(&response)?;
        let items = dto
            .kvs
            .into_iter()
            .map(KeyValueDto::into_key_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, decode_cursor(dto.next_key)?))
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<KeyValue> {
        parse_json::<KeyValueDto>(&response)?.into_key_value()
    }

    pub fn parse_set(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn get_page(&self, query: &PageQuery) -> Result<Page<KeyValue>> {
        let response = self.executor.send(&self.build_get_page(query))?;
        self.parse_get_page(response)
    }

    /// Every entry, following cursors from the root.
    pub fn get_all_pages(&self) -> Result<Vec<KeyValue>> {
        page::get_all_pages(|cursor: Option<&Key>| {
            let query = cursor.map_or(PageQuery::Root, |c| PageQuery::From(c.clone()));
            self.get_page(&query)
        })
    }

    pub fn get(&self, key: &Key) -> Result<KeyValue> {
        let response = self.executor.send(&self.build_get(key)?)?;
        self.parse_get(response)
    }

    pub fn set(&self, entry: &KeyValue) -> Result<()> {
        let response = self.executor.send(&self.build_set(entry)?)?;
        self.parse_set(response)
    }

    pub fn delete(&self, key: &Key) -> Result<()> {
        let response = self.executor.send(&self.build_delete(key)?)?;
        self.parse_delete(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::Configuration;
    use crate::error::ApiError;
    use crate::identity::CredentialManager;
    use crate::testing::ScriptedTransport;

    const META: &str = "https://metadata.example/v1";

    fn client(transport: &Arc<ScriptedTransport>) -> MetadataClient {
        let config = Configuration::new("test_apikey").with_base_url(META);
        let credentials = Arc::new(CredentialManager::new(&config, transport.clone()));
        credentials.set_token("test_token");
        MetadataClient::new(META, RequestExecutor::new(credentials, transport.clone()))
    }

    fn kv(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: Key::from(key),
            value: value.to_string(),
        }
    }

    #[test]
    fn list_response_maps_to_page() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            200,
            json!({"kvs": [{"key": "Zm9v", "value": "YmFy"}], "next_key": null}),
        );

        let page = client(&transport).get_page(&PageQuery::Root).unwrap();

        assert_eq!(transport.requests()[0].path, "https://metadata.example/v1/config");
        assert_eq!(page, Page::new(vec![kv("foo", "bar")], None));
    }

    #[test]
    fn get_single_entry() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, json!({"key": "Zm9vL2Jhcg", "value": "dmFsdWU"}));

        let entry = client(&transport).get(&Key::from("foo/bar")).unwrap();

        assert_eq!(
            transport.requests()[0].path,
            "https://metadata.example/v1/config/base64:Zm9vL2Jhcg"
        );
        assert_eq!(entry, kv("foo/bar", "value"));
    }

    #[test]
    fn set_sends_encoded_value() {
        let transport = ScriptedTransport::new();
        transport.respond(200, "Ok");

        client(&transport).set(&kv("bar/foo", "bar")).unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.path, "https://metadata.example/v1/config/base64:YmFyL2Zvbw");
        assert_eq!(sent.body.as_deref(), Some("YmFy"));
        assert_eq!(sent.header("content-type"), Some("application/octet-stream"));
    }

    #[test]
    fn delete_entry() {
        let transport = ScriptedTransport::new();
        transport.respond(200, "Ok");

        client(&transport).delete(&Key::from("foo/bar")).unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(sent.path, "https://metadata.example/v1/config/base64:Zm9vL2Jhcg");
    }

    #[test]
    fn get_missing_entry() {
        let transport = ScriptedTransport::new();
        transport.respond(404, "");
        let err = client(&transport).get(&Key::from("nope")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn directory_page() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            200,
            json!({"kvs": [{"key": "Zm9v", "value": "YmFy"}], "next_key": null}),
        );

        client(&transport)
            .get_page(&PageQuery::Directory(Key::from("foo")))
            .unwrap();

        assert_eq!(
            transport.requests()[0].path,
            "https://metadata.example/v1/config/base64:Zm9v/"
        );
    }

    #[test]
    fn get_all_pages_concatenates_in_order() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(
                200,
                json!({"kvs": [{"key": "YQ", "value": "MQ"}, {"key": "Yg", "value": "Mg"}], "next_key": "Yw"}),
            )
            .respond_json(
                200,
                json!({"kvs": [{"key": "Yw", "value": "Mw"}], "next_key": "ZA"}),
            )
            .respond_json(200, json!({"kvs": [], "next_key": null}));

        let all = client(&transport).get_all_pages().unwrap();

        assert_eq!(all, vec![kv("a", "1"), kv("b", "2"), kv("c", "3")]);
        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "https://metadata.example/v1/config",
                "https://metadata.example/v1/config?from=base64%3AYw",
                "https://metadata.example/v1/config?from=base64%3AZA",
            ]
        );
    }

    #[test]
    fn failure_mid_traversal_aborts() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, json!({"kvs": [{"key": "YQ", "value": "MQ"}], "next_key": "Yg"}))
            .respond(500, "oops");

        let err = client(&transport).get_all_pages().unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }
}
