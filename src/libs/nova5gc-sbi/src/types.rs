//! SBI service types and enumerations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URI scheme for SBI endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriScheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriScheme::Http => write!(f, "http"),
            UriScheme::Https => write!(f, "https"),
        }
    }
}

impl FromStr for UriScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(UriScheme::Http),
            "https" => Ok(UriScheme::Https),
            other => Err(format!("unknown URI scheme: {other}")),
        }
    }
}

/// Network function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NfType {
    Nrf,
    Amf,
    Smf,
    Ausf,
    Udm,
    Udr,
    Pcf,
    Nssf,
    Upf,
}

impl NfType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NfType::Nrf => "NRF",
            NfType::Amf => "AMF",
            NfType::Smf => "SMF",
            NfType::Ausf => "AUSF",
            NfType::Udm => "UDM",
            NfType::Udr => "UDR",
            NfType::Pcf => "PCF",
            NfType::Nssf => "NSSF",
            NfType::Upf => "UPF",
        }
    }
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network function registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfStatus {
    Registered,
    Suspended,
    UndiscoverableFromForeignPlmn,
}

/// SBI service names exposed or consumed by the AMF
pub mod service_name {
    pub const NAMF_COMM: &str = "namf-comm";
    pub const NAMF_EVTS: &str = "namf-evts";
    pub const NAMF_MT: &str = "namf-mt";
    pub const NAMF_LOC: &str = "namf-loc";
    pub const NAMF_CALLBACK: &str = "namf-callback";
    pub const NNRF_NFM: &str = "nnrf-nfm";
}

/// SBI API versions
pub mod api_version {
    pub const V1: &str = "v1";
    pub const V1_0_0: &str = "1.0.0";
}
