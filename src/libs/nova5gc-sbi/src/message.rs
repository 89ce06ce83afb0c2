//! SBI message structures and 3GPP model types
//!
//! Request/response containers used by the SBI client and server, plus the
//! OpenAPI model types shared by every network function (PLMN ID, TAI, GUAMI,
//! S-NSSAI, ProblemDetails).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SBI request/response header
#[derive(Debug, Clone, Default)]
pub struct SbiHeader {
    /// HTTP method (GET, POST, PUT, DELETE, PATCH)
    pub method: String,
    /// Request URI (path, or absolute URI for client requests)
    pub uri: String,
}

impl SbiHeader {
    pub fn with_method_uri(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
        }
    }
}

/// HTTP message payload: query parameters, headers and body
#[derive(Debug, Clone, Default)]
pub struct SbiHttpMessage {
    /// Query parameters
    pub params: HashMap<String, String>,
    /// HTTP headers
    pub headers: HashMap<String, String>,
    /// Body content
    pub content: Option<String>,
}

impl SbiHttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get_param(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers.get(key)
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }
}

/// SBI request
#[derive(Debug, Clone, Default)]
pub struct SbiRequest {
    pub header: SbiHeader,
    pub http: SbiHttpMessage,
}

impl SbiRequest {
    fn with_method(method: &str, uri: impl Into<String>) -> Self {
        Self {
            header: SbiHeader::with_method_uri(method, uri),
            http: SbiHttpMessage::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::with_method("GET", uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::with_method("POST", uri)
    }

    pub fn put(uri: impl Into<String>) -> Self {
        Self::with_method("PUT", uri)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::with_method("DELETE", uri)
    }

    pub fn patch(uri: impl Into<String>) -> Self {
        Self::with_method("PATCH", uri)
    }

    /// Set a JSON body and the matching Content-Type header
    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", "application/json");
        Ok(self)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_param(key, value);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// First path segment of the request URI, i.e. the SBI service name.
    pub fn service_name(&self) -> &str {
        let path = self.header.uri.split('?').next().unwrap_or("");
        path.trim_start_matches('/').split('/').next().unwrap_or("")
    }
}

/// SBI response
#[derive(Debug, Clone, Default)]
pub struct SbiResponse {
    pub http: SbiHttpMessage,
    /// HTTP status code
    pub status: u16,
}

impl SbiResponse {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn created() -> Self {
        Self::with_status(201)
    }

    pub fn no_content() -> Self {
        Self::with_status(204)
    }

    pub fn with_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", "application/json");
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Check if the response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the JSON body
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        let content = self.http.content.as_deref().unwrap_or("{}");
        serde_json::from_str(content)
    }
}

// ============================================================================
// 3GPP model types
// ============================================================================

/// PLMN ID (Public Land Mobile Network Identity)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PlmnId {
    /// Mobile Country Code - 3 digits
    pub mcc: String,
    /// Mobile Network Code - 2 or 3 digits
    pub mnc: String,
}

impl PlmnId {
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }
}

/// TAI (Tracking Area Identity)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tai {
    pub plmn_id: PlmnId,
    /// Tracking Area Code - 6 hex digits
    pub tac: String,
}

/// GUAMI (Globally Unique AMF Identifier)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Guami {
    pub plmn_id: PlmnId,
    /// AMF ID - 6 hex digits (region + set + pointer)
    pub amf_id: String,
}

/// S-NSSAI (Single Network Slice Selection Assistance Information)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SNssai {
    /// Slice/Service Type
    pub sst: u8,
    /// Slice Differentiator - 6 hex digits, optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

impl SNssai {
    pub fn new(sst: u8) -> Self {
        Self { sst, sd: None }
    }

    pub fn with_sd(sst: u8, sd: impl Into<String>) -> Self {
        Self {
            sst,
            sd: Some(sd.into()),
        }
    }
}

/// Network name advertised to UEs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkName {
    pub full: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
}

/// Problem Details - RFC 7807 compliant error response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// A short, human-readable summary of the problem type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies the specific occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Application-specific error cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Invalid parameters
    #[serde(rename = "invalidParams", skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<InvalidParam>>,
}

impl ProblemDetails {
    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// Invalid parameter entry for ProblemDetails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvalidParam {
    pub param: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sbi_request_builder() {
        let request = SbiRequest::get("/nnrf-nfm/v1/nf-instances")
            .with_param("nf-type", "AMF")
            .with_header("Accept", "application/json");

        assert_eq!(request.header.method, "GET");
        assert_eq!(request.service_name(), "nnrf-nfm");
        assert_eq!(
            request.http.get_param("nf-type"),
            Some(&"AMF".to_string())
        );
    }

    #[test]
    fn test_sbi_response_builder() {
        let response = SbiResponse::created()
            .with_header("Location", "/nnrf-nfm/v1/nf-instances/abc");

        assert!(response.is_success());
        assert_eq!(response.status, 201);
    }

    #[test]
    fn test_service_name_extraction() {
        let request = SbiRequest::post("/namf-comm/v1/ue-contexts?x=1");
        assert_eq!(request.service_name(), "namf-comm");
        assert_eq!(SbiRequest::get("/").service_name(), "");
    }

    #[test]
    fn test_problem_details_serialization() {
        let problem = ProblemDetails::with_status(404)
            .with_title("Not Found")
            .with_cause("RESOURCE_NOT_FOUND");

        let json = serde_json::to_string(&problem).unwrap();
        assert!(json.contains("404"));
        assert!(json.contains("RESOURCE_NOT_FOUND"));

        let parsed: ProblemDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, Some(404));
    }

    #[test]
    fn test_model_serde_camel_case() {
        let tai = Tai {
            plmn_id: PlmnId::new("208", "93"),
            tac: "000001".to_string(),
        };
        let json = serde_json::to_string(&tai).unwrap();
        assert!(json.contains("plmnId"));
        assert!(json.contains("\"208\""));

        let snssai = SNssai::new(1);
        let json = serde_json::to_string(&snssai).unwrap();
        assert!(!json.contains("sd"));
    }
}
