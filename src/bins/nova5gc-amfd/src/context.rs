//! AMF context
//!
//! The in-process backing store for the AMF's function profile: everything
//! the instance advertises about itself (served GUAMIs, TAIs, PLMN support,
//! SBI endpoint, enabled services) plus local preferences (security algorithm
//! orders, network name). Built once from configuration at startup and
//! immutable afterwards; `reset` exists so tests can reload a second
//! configuration into the same context.

use serde::Serialize;

use nova5gc_sbi::types::api_version;
use nova5gc_sbi::{Guami, NetworkName, PlmnId, SNssai, Tai, UriScheme};

use crate::config::AmfConfig;

/// Maximum number of served GUAMIs held in the context; overflow entries
/// are dropped with a warning.
pub const MAX_NUM_OF_SERVED_GUAMI: usize = 256;

/// One PLMN support entry
#[derive(Debug, Clone, PartialEq)]
pub struct PlmnSupport {
    pub plmn_id: PlmnId,
    pub s_nssai_list: Vec<SNssai>,
}

/// NF service descriptor, advertised in the registered profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NfService {
    pub service_instance_id: String,
    pub service_name: String,
    pub versions: Vec<NfServiceVersion>,
    pub scheme: UriScheme,
    pub nf_service_status: String,
    pub ip_end_points: Vec<IpEndPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NfServiceVersion {
    pub api_version_in_uri: String,
    pub api_full_version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpEndPoint {
    pub ipv4_address: String,
    pub transport: String,
    pub port: u16,
}

/// AMF context
#[derive(Debug, Clone, Default)]
pub struct AmfContext {
    /// AMF display name
    pub name: String,
    /// NGAP listen addresses
    pub ngap_addrs: Vec<String>,
    /// SBI URI scheme
    pub uri_scheme: UriScheme,
    /// SBI IPv4 address
    pub sbi_ipv4: String,
    /// SBI port
    pub sbi_port: u16,
    /// TLS certificate path, required when the scheme is https
    pub sbi_cert: Option<String>,
    /// TLS private key path, required when the scheme is https
    pub sbi_key: Option<String>,
    /// NRF base URI
    pub nrf_uri: String,
    /// Enabled service names, in configuration order
    pub service_names: Vec<String>,
    /// Per-service descriptors built from the enabled set
    pub nf_services: Vec<NfService>,
    /// Served GUAMI list, bounded by MAX_NUM_OF_SERVED_GUAMI
    pub served_guami_list: Vec<Guami>,
    /// Supported TAI list
    pub support_tai_list: Vec<Tai>,
    /// PLMN support list
    pub plmn_support_list: Vec<PlmnSupport>,
    /// Supported DNN list
    pub support_dnn_list: Vec<String>,
    /// Integrity algorithm preference order, most preferred first
    pub integrity_order: Vec<u8>,
    /// Ciphering algorithm preference order, most preferred first
    pub ciphering_order: Vec<u8>,
    /// Broadcast network name
    pub network_name: NetworkName,
}

impl AmfContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a loaded configuration
    pub fn from_config(config: &AmfConfig) -> Self {
        let mut ctx = Self::new();
        ctx.load(config);
        ctx
    }

    /// Fill the context from a loaded configuration
    pub fn load(&mut self, config: &AmfConfig) {
        let c = &config.configuration;

        self.name = c.amf_name.clone();
        self.ngap_addrs = c.ngap_ip_list.clone();
        self.uri_scheme = c.sbi.scheme;
        self.sbi_ipv4 = c.sbi.ipv4.clone();
        self.sbi_port = c.sbi.port;
        if let Some(tls) = &c.sbi.tls {
            self.sbi_cert = Some(tls.pem.clone());
            self.sbi_key = Some(tls.key.clone());
        }
        self.nrf_uri = c.nrf_uri.clone();
        self.service_names = c.service_name_list.clone();
        self.nf_services = build_nf_services(
            &c.service_name_list,
            c.sbi.scheme,
            &c.sbi.ipv4,
            c.sbi.port,
        );

        for (i, guami) in c.served_guami_list.iter().enumerate() {
            if i >= MAX_NUM_OF_SERVED_GUAMI {
                log::warn!(
                    "Served GUAMI list truncated to {MAX_NUM_OF_SERVED_GUAMI} entries, dropping the rest"
                );
                break;
            }
            self.served_guami_list.push(guami.clone());
        }

        self.support_tai_list = c.support_tai_list.clone();
        self.plmn_support_list = c
            .plmn_support_list
            .iter()
            .map(|item| PlmnSupport {
                plmn_id: item.plmn_id.clone(),
                s_nssai_list: item.snssai_list.clone(),
            })
            .collect();
        self.support_dnn_list = c.support_dnn_list.clone();
        self.integrity_order = c.security.integrity_order.clone();
        self.ciphering_order = c.security.ciphering_order.clone();
        self.network_name = c.network_name.clone();

        log::info!(
            "AMF context loaded: name={}, {} GUAMI, {} TAI, {} PLMN support, {} services",
            self.name,
            self.served_guami_list.len(),
            self.support_tai_list.len(),
            self.plmn_support_list.len(),
            self.service_names.len()
        );
    }

    /// Restore the context to its freshly-constructed state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Build one NF service descriptor per enabled service name
fn build_nf_services(
    service_names: &[String],
    scheme: UriScheme,
    ipv4: &str,
    port: u16,
) -> Vec<NfService> {
    service_names
        .iter()
        .enumerate()
        .map(|(i, name)| NfService {
            service_instance_id: i.to_string(),
            service_name: name.clone(),
            versions: vec![NfServiceVersion {
                api_version_in_uri: api_version::V1.to_string(),
                api_full_version: api_version::V1_0_0.to_string(),
            }],
            scheme,
            nf_service_status: "REGISTERED".to_string(),
            ip_end_points: vec![IpEndPoint {
                ipv4_address: ipv4.to_string(),
                transport: "TCP".to_string(),
                port,
            }],
        })
        .collect()
}
