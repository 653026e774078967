//! External connector boundary.
//!
//! Adapters never build HTTP requests themselves; they hand an [`ApiRequest`]
//! (source family + logical endpoint + query parameters) to an
//! [`ApiConnector`]. `HttpConnector` performs the authenticated GET against
//! the catalog-resolved URL; `StubConnector` serves canned payloads so the
//! whole pipeline runs without a service key.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::{AuthLocation, PipelineConfig, SourceCatalog};
use crate::error::{PipelineError, PipelineResult};
use crate::normalize::describe_result_code;
use crate::stub_data;
use crate::types::SourceId;

/// One upstream call. `params` excludes auth and format overrides, which the
/// connector injects; paging defaults are filled in only when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub source: SourceId,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(source: SourceId, endpoint: &str) -> Self {
        Self {
            source,
            endpoint: endpoint.to_string(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetadata {
    pub status_code: u16,
    pub total_count: Option<u64>,
}

/// Raw connector result. `success: false` covers non-2xx statuses and
/// unparseable bodies; transport faults are errors, not responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorResponse {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub metadata: ResponseMetadata,
}

impl ConnectorResponse {
    pub fn ok(data: Value, metadata: ResponseMetadata) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata,
        }
    }
}

#[async_trait]
pub trait ApiConnector: Send + Sync {
    async fn fetch(&self, request: &ApiRequest) -> PipelineResult<ConnectorResponse>;

    /// Whether responses come from canned payloads instead of the live API.
    fn is_stub(&self) -> bool {
        false
    }
}

/// Live connector for the data.go.kr services.
#[derive(Debug)]
pub struct HttpConnector {
    client: reqwest::Client,
    catalog: SourceCatalog,
    service_key: String,
    num_of_rows: u32,
}

impl HttpConnector {
    pub fn new(catalog: SourceCatalog, config: &PipelineConfig) -> PipelineResult<Self> {
        let service_key = config
            .service_key
            .clone()
            .ok_or_else(|| {
                PipelineError::InvalidConfig(
                    "service key required for live upstream calls".to_string(),
                )
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            catalog,
            service_key,
            num_of_rows: config.num_of_rows,
        })
    }

    /// data.go.kr hands out keys already percent-encoded; those must be
    /// spliced into the URL verbatim or the `+`/`=` bytes get encoded twice.
    fn encoded_key(&self) -> String {
        if self.service_key.contains('%') {
            self.service_key.clone()
        } else {
            urlencoding::encode(&self.service_key).into_owned()
        }
    }

    fn build_url(&self, request: &ApiRequest) -> PipelineResult<String> {
        let source_cfg = self.catalog.get(request.source)?;
        let mut url = source_cfg.endpoint_url(&request.endpoint)?;
        let mut sep = '?';
        let mut push = |url: &mut String, key: &str, value: &str| {
            url.push(sep);
            sep = '&';
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        };
        if source_cfg.auth.location == AuthLocation::Query {
            push(&mut url, &source_cfg.auth.param, &self.encoded_key());
        }
        if let Some((key, value)) = &source_cfg.response_format {
            push(&mut url, key, &urlencoding::encode(value));
        }
        if request.get_param("pageNo").is_none() {
            push(&mut url, "pageNo", "1");
        }
        if request.get_param("numOfRows").is_none() {
            push(&mut url, "numOfRows", &self.num_of_rows.to_string());
        }
        for (key, value) in &request.params {
            push(&mut url, key, &urlencoding::encode(value));
        }
        Ok(url)
    }
}

#[async_trait]
impl ApiConnector for HttpConnector {
    async fn fetch(&self, request: &ApiRequest) -> PipelineResult<ConnectorResponse> {
        let source_cfg = self.catalog.get(request.source)?;
        let url = self.build_url(request)?;
        debug!(
            "GET {}/{} ({} params)",
            request.source,
            request.endpoint,
            request.params.len()
        );

        let mut req = self.client.get(&url);
        if source_cfg.auth.location == AuthLocation::Header {
            req = req.header(&source_cfg.auth.param, &self.service_key);
        }
        let response = req.send().await?;
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        let mut metadata = ResponseMetadata {
            status_code,
            total_count: None,
        };

        if !(200..300).contains(&status_code) {
            return Ok(ConnectorResponse {
                success: false,
                data: serde_json::from_str(&body).unwrap_or(Value::Null),
                error: Some(format!("HTTP {status_code} from {}", request.source)),
                metadata,
            });
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(data) => {
                metadata.total_count = data
                    .pointer("/response/body/totalCount")
                    .and_then(Value::as_u64);
                Ok(ConnectorResponse::ok(data, metadata))
            }
            // Auth failures come back as XML even with resultType=json.
            Err(_) => Ok(ConnectorResponse {
                success: false,
                data: Value::String(body.clone()),
                error: Some(xml_fault_message(&body)),
                metadata,
            }),
        }
    }
}

/// Pull `returnReasonCode`/`returnAuthMsg` out of the XML fault wrapper the
/// gateway uses for key errors.
fn xml_fault_message(body: &str) -> String {
    let code = xml_tag(body, "returnReasonCode");
    let msg = xml_tag(body, "returnAuthMsg").or_else(|| xml_tag(body, "errMsg"));
    match code {
        Some(code) => describe_result_code(code, msg),
        None => "upstream returned a non-JSON response".to_string(),
    }
}

fn xml_tag<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find('<')? + start;
    let value = body[start..end].trim();
    (!value.is_empty()).then_some(value)
}

/// Keyless connector serving the built-in demo payloads.
#[derive(Debug, Default)]
pub struct StubConnector;

impl StubConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ApiConnector for StubConnector {
    async fn fetch(&self, request: &ApiRequest) -> PipelineResult<ConnectorResponse> {
        let data = stub_data::payload_for(request);
        let total_count = data
            .pointer("/response/body/totalCount")
            .and_then(Value::as_u64);
        Ok(ConnectorResponse::ok(
            data,
            ResponseMetadata {
                status_code: 200,
                total_count,
            },
        ))
    }

    fn is_stub(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_keeps_param_order() {
        let req = ApiRequest::new(SourceId::Winner, "winners")
            .param("sgId", "20220309")
            .param("sgTypecode", "1");
        assert_eq!(req.params[0].0, "sgId");
        assert_eq!(req.get_param("sgTypecode"), Some("1"));
        assert_eq!(req.get_param("missing"), None);
    }

    #[test]
    fn preencoded_service_key_is_spliced_verbatim() {
        let mut config = PipelineConfig::default();
        config.service_key = Some("abc%2Bdef%3D%3D".to_string());
        let connector = HttpConnector::new(SourceCatalog::with_defaults(), &config).unwrap();
        let url = connector
            .build_url(&ApiRequest::new(SourceId::Winner, "winners").param("sgId", "20220309"))
            .unwrap();
        assert!(url.contains("serviceKey=abc%2Bdef%3D%3D"), "{url}");
        assert!(!url.contains("serviceKey=abc%252B"), "{url}");
        assert!(url.contains("resultType=json"), "{url}");
        assert!(url.contains("numOfRows=100"), "{url}");
        assert!(url.contains("sgId=20220309"), "{url}");
    }

    #[test]
    fn raw_service_key_gets_encoded() {
        let mut config = PipelineConfig::default();
        config.service_key = Some("abc+def==".to_string());
        let connector = HttpConnector::new(SourceCatalog::with_defaults(), &config).unwrap();
        let url = connector
            .build_url(&ApiRequest::new(SourceId::Stats, "turnout"))
            .unwrap();
        assert!(url.contains("serviceKey=abc%2Bdef%3D%3D"), "{url}");
    }

    #[test]
    fn request_paging_overrides_defaults() {
        let mut config = PipelineConfig::default();
        config.service_key = Some("key".to_string());
        let connector = HttpConnector::new(SourceCatalog::with_defaults(), &config).unwrap();
        let url = connector
            .build_url(
                &ApiRequest::new(SourceId::Pledge, "pledges")
                    .param("pageNo", "3")
                    .param("numOfRows", "50"),
            )
            .unwrap();
        assert!(url.contains("pageNo=3"), "{url}");
        assert!(url.contains("numOfRows=50"), "{url}");
        assert!(!url.contains("pageNo=1"), "{url}");
        assert!(!url.contains("numOfRows=100"), "{url}");
    }

    #[test]
    fn xml_fault_is_translated() {
        let body = r#"<OpenAPI_ServiceResponse>
            <cmmMsgHeader>
              <errMsg>SERVICE ERROR</errMsg>
              <returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg>
              <returnReasonCode>30</returnReasonCode>
            </cmmMsgHeader>
          </OpenAPI_ServiceResponse>"#;
        let msg = xml_fault_message(body);
        assert!(msg.contains("등록되지 않은 서비스키"), "{msg}");
        assert!(msg.contains("SERVICE_KEY_IS_NOT_REGISTERED_ERROR"), "{msg}");
    }

    #[test]
    fn missing_key_is_invalid_config() {
        let err =
            HttpConnector::new(SourceCatalog::with_defaults(), &PipelineConfig::default())
                .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }
}
