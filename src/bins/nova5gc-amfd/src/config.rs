//! AMF configuration bootstrap
//!
//! Loads the AMF YAML configuration file into typed structs. The file is
//! read once at startup; a missing or malformed file is a fatal error. After
//! a successful load the configuration is read-only.

use anyhow::{Context, Result};
use serde::Deserialize;

use nova5gc_sbi::{Guami, NetworkName, PlmnId, SNssai, Tai, UriScheme};

/// Default AMF configuration path when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config/amfcfg.yaml";

/// Top-level AMF configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct AmfConfig {
    /// Optional logger section
    #[serde(default)]
    pub logger: Option<LoggerConfig>,
    /// AMF configuration body
    pub configuration: Configuration,
}

/// Logger section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// Log level name (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// AMF configuration body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// AMF display name
    pub amf_name: String,
    /// NGAP listen addresses, one listener per entry
    pub ngap_ip_list: Vec<String>,
    /// SBI server settings
    pub sbi: SbiConfig,
    /// Enabled SBI service names, in mount order
    pub service_name_list: Vec<String>,
    /// Served GUAMI list
    pub served_guami_list: Vec<Guami>,
    /// Supported TAI list
    pub support_tai_list: Vec<Tai>,
    /// PLMN support list
    pub plmn_support_list: Vec<PlmnSupportItem>,
    /// Supported DNN list
    #[serde(default)]
    pub support_dnn_list: Vec<String>,
    /// NRF base URI
    pub nrf_uri: String,
    /// Security algorithm preference orders
    pub security: SecurityConfig,
    /// Broadcast network name
    pub network_name: NetworkName,
}

/// SBI server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SbiConfig {
    /// URI scheme (http or https)
    pub scheme: UriScheme,
    /// Bind/advertise IPv4 address
    pub ipv4: String,
    /// Listen port
    pub port: u16,
    /// TLS certificate/key pair, required when scheme is https
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS certificate/key pair paths
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain path
    pub pem: String,
    /// PEM private key path
    pub key: String,
}

/// One PLMN support entry: a PLMN plus the slices it supports
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlmnSupportItem {
    pub plmn_id: PlmnId,
    pub snssai_list: Vec<SNssai>,
}

/// Security algorithm preference orders, most preferred first.
///
/// Entries are the algorithm capability bit codes (e.g. 0x40 for the
/// first algorithm, 0x20 for the second).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    pub integrity_order: Vec<u8>,
    pub ciphering_order: Vec<u8>,
}

impl AmfConfig {
    /// Load and parse the configuration file. Fatal on a missing or
    /// malformed file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: AmfConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }

    /// Apply the configured logger level when present and parseable.
    /// An unparseable level is logged and otherwise ignored.
    pub fn apply_log_level(&self) {
        let Some(level) = self.logger.as_ref().and_then(|l| l.level.as_deref()) else {
            return;
        };
        match level.parse::<log::LevelFilter>() {
            Ok(filter) => {
                log::set_max_level(filter);
                log::info!("Log level set to {filter} from configuration");
            }
            Err(_) => {
                log::warn!("Ignoring invalid logger level '{level}' in configuration");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const SCENARIO_ONE: &str = r#"
logger:
  level: info
configuration:
  amfName: AMF
  ngapIpList:
    - 127.0.0.1
  sbi:
    scheme: https
    ipv4: 127.0.0.1
    port: 29518
    tls:
      pem: config/TLS/amf.pem
      key: config/TLS/amf.key
  serviceNameList:
    - namf-comm
    - namf-evts
    - namf-mt
    - namf-loc
  servedGuamiList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      amfId: cafe00
  supportTaiList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      tac: "000001"
  plmnSupportList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      snssaiList:
        - sst: 1
          sd: "010203"
  supportDnnList:
    - internet
  nrfUri: https://localhost:29510
  security:
    integrityOrder:
      - 0x40
    cipheringOrder:
      - 0x40
  networkName:
    full: free5GC
    short: free
"#;

    pub(crate) const SCENARIO_TWO: &str = r#"
configuration:
  amfName: Wirelab
  ngapIpList:
    - 172.16.0.1
    - 172.16.0.2
  sbi:
    scheme: http
    ipv4: 192.168.0.1
    port: 8888
  serviceNameList:
    - namf-comm
    - namf-evts
  servedGuamiList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      amfId: cafe00
    - plmnId:
        mcc: "460"
        mnc: "03"
      amfId: cafe01
  supportTaiList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      tac: "000001"
    - plmnId:
        mcc: "460"
        mnc: "03"
      tac: "000002"
    - plmnId:
        mcc: "460"
        mnc: "03"
      tac: "000003"
  plmnSupportList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      snssaiList:
        - sst: 1
          sd: "010203"
        - sst: 2
          sd: "112233"
    - plmnId:
        mcc: "460"
        mnc: "03"
      snssaiList:
        - sst: 1
  supportDnnList:
    - internet
    - ims
  nrfUri: https://192.168.0.2:29510
  security:
    integrityOrder:
      - 0x40
      - 0x80
    cipheringOrder:
      - 0x40
      - 0x20
      - 0x08
  networkName:
    full: HAHAHAHA
"#;

    pub(crate) fn write_temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_scenario_one() {
        let file = write_temp_config(SCENARIO_ONE);
        let config = AmfConfig::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.configuration.amf_name, "AMF");
        assert_eq!(config.configuration.sbi.scheme, UriScheme::Https);
        assert_eq!(config.configuration.sbi.ipv4, "127.0.0.1");
        assert_eq!(config.configuration.sbi.port, 29518);
        assert_eq!(config.configuration.ngap_ip_list, vec!["127.0.0.1"]);
        assert_eq!(config.configuration.nrf_uri, "https://localhost:29510");
        assert_eq!(config.configuration.security.integrity_order, vec![0x40]);
        assert_eq!(config.configuration.network_name.short.as_deref(), Some("free"));
        assert_eq!(
            config.logger.as_ref().unwrap().level.as_deref(),
            Some("info")
        );
    }

    #[test]
    fn test_load_scenario_two() {
        let file = write_temp_config(SCENARIO_TWO);
        let config = AmfConfig::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.configuration.amf_name, "Wirelab");
        assert_eq!(config.configuration.ngap_ip_list.len(), 2);
        assert_eq!(config.configuration.sbi.scheme, UriScheme::Http);
        assert_eq!(config.configuration.support_tai_list.len(), 3);
        assert_eq!(config.configuration.served_guami_list.len(), 2);
        assert_eq!(config.configuration.plmn_support_list.len(), 2);
        assert_eq!(config.configuration.support_dnn_list, vec!["internet", "ims"]);
        assert_eq!(
            config.configuration.security.ciphering_order,
            vec![0x40, 0x20, 0x08]
        );
        assert!(config.configuration.network_name.short.is_none());
        assert!(config.logger.is_none());
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        assert!(AmfConfig::load("/nonexistent/amfcfg.yaml").is_err());
    }

    #[test]
    fn test_load_malformed_file_is_fatal() {
        let file = write_temp_config("configuration: [not, a, mapping");
        assert!(AmfConfig::load(file.path().to_str().unwrap()).is_err());
    }
}
