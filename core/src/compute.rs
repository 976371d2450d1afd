//! Compute formations.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::executor::RequestExecutor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::resource::{check_status, parse_json, to_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub oid: String,
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A deployable group of flights. On the wire the gateway reference is
/// spelled `gateway-flight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormationPage {
    pub formations: Vec<Formation>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone)]
pub struct ComputeClient {
    base_url: String,
    executor: RequestExecutor,
}

impl ComputeClient {
    pub fn new(compute_url: &str, executor: RequestExecutor) -> Self {
        Self {
            base_url: format!("{}/formations", compute_url.trim_end_matches('/')),
            executor,
        }
    }

    fn formation_path(&self, formation_id: &str) -> Result<String> {
        if formation_id.is_empty() {
            return Err(ApiError::Validation(
                "formation id must not be empty".to_string(),
            ));
        }
        Ok(format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(formation_id)
        ))
    }

    pub fn build_get_page(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.base_url.clone())
    }

    pub fn build_get(&self, formation_id: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Get,
            self.formation_path(formation_id)?,
        ))
    }

    pub fn build_create(&self, formation: &Formation) -> Result<HttpRequest> {
        if formation.name.is_empty() {
            return Err(ApiError::Validation(
                "formation name must not be empty".to_string(),
            ));
        }
        Ok(HttpRequest::new(HttpMethod::Post, self.base_url.clone())
            .with_body("application/json", to_json(formation)?))
    }

    pub fn build_delete(&self, formation_id: &str) -> Result<HttpRequest> {
        Ok(HttpRequest::new(
            HttpMethod::Delete,
            self.formation_path(formation_id)?,
        ))
    }

    pub fn parse_get_page(&self, response: HttpResponse) -> Result<FormationPage> {
        parse_json(&response)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Formation> {
        parse_json(&response)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn get_page(&self) -> Result<FormationPage> {
        let response = self.executor.send(&self.build_get_page())?;
        self.parse_get_page(response)
    }

    pub fn get(&self, formation_id: &str) -> Result<Formation> {
        let response = self.executor.send(&self.build_get(formation_id)?)?;
        self.parse_get(response)
    }

    pub fn create(&self, formation: &Formation) -> Result<()> {
        let response = self.executor.send(&self.build_create(formation)?)?;
        self.parse_create(response)
    }

    pub fn delete(&self, formation_id: &str) -> Result<()> {
        let response = self.executor.send(&self.build_delete(formation_id)?)?;
        self.parse_delete(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::Configuration;
    use crate::identity::CredentialManager;
    use crate::testing::ScriptedTransport;

    const COMPUTE: &str = "https://compute.example/v2beta";
    const OID: &str = "frm-0oug6ng05tvll000e14k2sd3og";

    fn client(transport: &Arc<ScriptedTransport>) -> ComputeClient {
        let config = Configuration::new("test_apikey").with_base_url(COMPUTE);
        let credentials = Arc::new(CredentialManager::new(&config, transport.clone()));
        credentials.set_token("test_token");
        ComputeClient::new(COMPUTE, RequestExecutor::new(credentials, transport.clone()))
    }

    fn formation() -> Formation {
        Formation {
            oid: OID.to_string(),
            name: "name".to_string(),
            url: Some("https://url-example.com".to_string()),
            flights: vec![Flight {
                oid: "frm-0ouz6ng05tvll000e14k2sd3og".to_string(),
                name: "flight-name".to_string(),
                image: "https://image-example.com".to_string(),
                status: None,
            }],
            gateway_flight: Some("gateway".to_string()),
        }
    }

    fn wire_formation() -> serde_json::Value {
        json!({
            "oid": OID,
            "name": "name",
            "url": "https://url-example.com",
            "flights": [{
                "oid": "frm-0ouz6ng05tvll000e14k2sd3og",
                "name": "flight-name",
                "image": "https://image-example.com"
            }],
            "gateway-flight": "gateway"
        })
    }

    #[test]
    fn get_page_maps_formations_and_meta() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            200,
            json!({
                "formations": [wire_formation()],
                "meta": {"total": 1, "prev": "https://prev-example.com", "next": "https://next-example.com"}
            }),
        );

        let page = client(&transport).get_page().unwrap();

        assert_eq!(transport.requests()[0].path, "https://compute.example/v2beta/formations");
        assert_eq!(page.formations, vec![formation()]);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 1,
                next: Some("https://next-example.com".to_string()),
                prev: Some("https://prev-example.com".to_string()),
            }
        );
    }

    #[test]
    fn get_formation() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, wire_formation());

        let got = client(&transport).get(OID).unwrap();

        assert_eq!(
            transport.requests()[0].path,
            format!("https://compute.example/v2beta/formations/{OID}")
        );
        assert_eq!(got, formation());
    }

    #[test]
    fn create_posts_wire_names() {
        let transport = ScriptedTransport::new();
        transport.respond(201, "Ok");

        client(&transport).create(&formation()).unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.path, "https://compute.example/v2beta/formations");
        let body: serde_json::Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, wire_formation());
    }

    #[test]
    fn delete_formation() {
        let transport = ScriptedTransport::new();
        transport.respond(200, "Ok");

        client(&transport).delete(OID).unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(
            sent.path,
            format!("https://compute.example/v2beta/formations/{OID}")
        );
    }

    #[test]
    fn empty_id_is_rejected() {
        let transport = ScriptedTransport::new();
        assert!(matches!(
            client(&transport).get("").unwrap_err(),
            ApiError::Validation(_)
        ));
        assert_eq!(transport.request_count(), 0);
    }
}
