//! NRF registry client
//!
//! Registers and deregisters this AMF instance with the NRF over the
//! Nnrf_NFManagement service. Registration is best effort: a failure is
//! reported to the caller for logging and the instance keeps serving while
//! unregistered. Deregistration with no stored instance id is an immediate
//! no-op.

use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use uuid::Uuid;

use nova5gc_sbi::types::service_name;
use nova5gc_sbi::{
    Guami, NfStatus, NfType, PlmnId, ProblemDetails, SNssai, SbiClient, SbiClientConfig, SbiError,
    SbiResult, Tai, UriScheme,
};

use crate::context::{AmfContext, NfService};

/// NF profile registered with the NRF
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NfProfile {
    pub nf_instance_id: String,
    pub nf_type: NfType,
    pub nf_status: NfStatus,
    pub ipv4_addresses: Vec<String>,
    pub amf_info: AmfInfo,
    pub s_nssais: Vec<SNssai>,
    pub plmn_list: Vec<PlmnId>,
    pub nf_services: Vec<NfService>,
}

/// AMF-specific profile section
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfInfo {
    pub guami_list: Vec<Guami>,
    pub tai_list: Vec<Tai>,
}

/// NRF registry client
pub struct NrfClient {
    client: SbiClient,
    /// Instance id assigned at registration. Register and deregister are
    /// sequenced by the lifecycle, so a plain mutex suffices.
    nf_instance_id: Mutex<Option<String>>,
}

impl NrfClient {
    /// Build a client for the given NRF base URI
    pub fn new(nrf_uri: &str) -> SbiResult<Self> {
        let mut config = SbiClientConfig::from_uri(nrf_uri)?;
        if config.scheme == UriScheme::Https {
            // NRF deployments commonly run on self-signed certificates
            config = config.with_insecure_skip_verify();
        }
        Ok(Self {
            client: SbiClient::new(config),
            nf_instance_id: Mutex::new(None),
        })
    }

    /// The instance id stored by the last successful registration
    pub fn nf_instance_id(&self) -> Option<String> {
        self.lock_id().clone()
    }

    fn lock_id(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        match self.nf_instance_id.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Build the NF profile advertised to the NRF from the AMF context
    pub fn build_nf_profile(ctx: &AmfContext, nf_instance_id: &str) -> Result<NfProfile> {
        if ctx.sbi_ipv4.is_empty() {
            bail!("Cannot build NF profile: no SBI address configured");
        }
        if ctx.served_guami_list.is_empty() {
            bail!("Cannot build NF profile: no served GUAMI configured");
        }

        let s_nssais: Vec<SNssai> = ctx
            .plmn_support_list
            .iter()
            .flat_map(|p| p.s_nssai_list.iter().cloned())
            .collect();
        let plmn_list: Vec<PlmnId> = ctx
            .plmn_support_list
            .iter()
            .map(|p| p.plmn_id.clone())
            .collect();

        Ok(NfProfile {
            nf_instance_id: nf_instance_id.to_string(),
            nf_type: NfType::Amf,
            nf_status: NfStatus::Registered,
            ipv4_addresses: vec![ctx.sbi_ipv4.clone()],
            amf_info: AmfInfo {
                guami_list: ctx.served_guami_list.clone(),
                tai_list: ctx.support_tai_list.clone(),
            },
            s_nssais,
            plmn_list,
            nf_services: ctx.nf_services.clone(),
        })
    }

    /// Register this instance with the NRF. On success the assigned
    /// instance id is stored for deregistration. A previously stored id is
    /// reused, so a re-register keeps the same identity. Single attempt.
    pub async fn register(&self, ctx: &AmfContext) -> Result<()> {
        let nf_instance_id = self
            .lock_id()
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let profile = Self::build_nf_profile(ctx, &nf_instance_id)?;
        let path = format!(
            "/{}/v1/nf-instances/{nf_instance_id}",
            service_name::NNRF_NFM
        );

        let response = self
            .client
            .put_json(&path, &profile)
            .await
            .context("NRF registration request failed")?;

        match response.status {
            200 | 201 => {
                log::info!("Registered with NRF as {nf_instance_id}");
                *self.lock_id() = Some(nf_instance_id);
                Ok(())
            }
            status => {
                bail!("NRF registration rejected with status {status}");
            }
        }
    }

    /// Deregister this instance from the NRF. With no stored id this is an
    /// immediate success and no request is sent. A registry-reported
    /// ProblemDetails comes back as `Ok(Some(..))` for logging; only
    /// transport failures surface as `Err`, and neither is escalated by
    /// callers.
    pub async fn deregister(&self) -> SbiResult<Option<ProblemDetails>> {
        let Some(nf_instance_id) = self.lock_id().take() else {
            return Ok(None);
        };

        let path = format!(
            "/{}/v1/nf-instances/{nf_instance_id}",
            service_name::NNRF_NFM
        );
        let response = self.client.delete(&path).await?;

        if response.status == 204 {
            log::info!("Deregistered NF instance {nf_instance_id} from NRF");
            return Ok(None);
        }

        match response.json_body::<ProblemDetails>() {
            Ok(problem) => Ok(Some(problem)),
            Err(_) => Err(SbiError::from_status(
                response.status,
                "NRF deregistration failed without problem details",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use nova5gc_sbi::{send_not_found, SbiRequest, SbiResponse, SbiRouter, SbiServer, SbiServerConfig};

    fn test_context() -> AmfContext {
        let mut ctx = AmfContext::new();
        ctx.name = "AMF".to_string();
        ctx.sbi_ipv4 = "127.0.0.1".to_string();
        ctx.sbi_port = 29518;
        ctx.served_guami_list = vec![Guami {
            plmn_id: PlmnId::new("208", "93"),
            amf_id: "cafe00".to_string(),
        }];
        ctx.support_tai_list = vec![Tai {
            plmn_id: PlmnId::new("208", "93"),
            tac: "000001".to_string(),
        }];
        ctx
    }

    /// Spin up a stub NRF recording "METHOD uri" for each request
    async fn stub_nrf(reject_delete: bool) -> (String, Arc<StdMutex<Vec<String>>>) {
        let calls: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let recorded = calls.clone();

        let handler = move |request: SbiRequest| {
            let recorded = recorded.clone();
            async move {
                recorded
                    .lock()
                    .unwrap()
                    .push(format!("{} {}", request.header.method, request.header.uri));
                match request.header.method.as_str() {
                    "PUT" => SbiResponse::created(),
                    "DELETE" if reject_delete => {
                        send_not_found("NF instance not found", Some("NF_INSTANCE_NOT_FOUND"))
                    }
                    "DELETE" => SbiResponse::no_content(),
                    _ => SbiResponse::with_status(405),
                }
            }
        };

        let mut router = SbiRouter::new();
        router.mount(service_name::NNRF_NFM, handler);

        let server = SbiServer::open(SbiServerConfig::new("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();
        let uri = format!("http://{}", server.local_addr());
        tokio::spawn(async move {
            let _ = server.serve(router).await;
        });

        (uri, calls)
    }

    #[test]
    fn test_build_nf_profile() {
        let ctx = test_context();
        let profile = NrfClient::build_nf_profile(&ctx, "id-1").unwrap();

        assert_eq!(profile.nf_instance_id, "id-1");
        assert_eq!(profile.nf_type, NfType::Amf);
        assert_eq!(profile.nf_status, NfStatus::Registered);
        assert_eq!(profile.ipv4_addresses, vec!["127.0.0.1"]);
        assert_eq!(profile.amf_info.guami_list.len(), 1);
        assert_eq!(profile.amf_info.tai_list.len(), 1);
    }

    #[test]
    fn test_build_nf_profile_requires_sbi_address() {
        let mut ctx = test_context();
        ctx.sbi_ipv4.clear();
        assert!(NrfClient::build_nf_profile(&ctx, "id-1").is_err());
    }

    #[test]
    fn test_build_nf_profile_requires_guami() {
        let mut ctx = test_context();
        ctx.served_guami_list.clear();
        assert!(NrfClient::build_nf_profile(&ctx, "id-1").is_err());
    }

    #[tokio::test]
    async fn test_register_stores_and_reuses_instance_id() {
        let (uri, calls) = stub_nrf(false).await;
        let nrf = NrfClient::new(&uri).unwrap();
        let ctx = test_context();

        nrf.register(&ctx).await.unwrap();
        let id = nrf.nf_instance_id().unwrap();
        assert!(!id.is_empty());

        nrf.register(&ctx).await.unwrap();
        assert_eq!(nrf.nf_instance_id().unwrap(), id);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert!(calls[0].starts_with(&format!("PUT /{}/v1/nf-instances/", service_name::NNRF_NFM)));
    }

    #[tokio::test]
    async fn test_deregister_without_registration_is_noop() {
        let (uri, calls) = stub_nrf(false).await;
        let nrf = NrfClient::new(&uri).unwrap();

        let result = nrf.deregister().await.unwrap();
        assert!(result.is_none());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_then_deregister() {
        let (uri, calls) = stub_nrf(false).await;
        let nrf = NrfClient::new(&uri).unwrap();
        let ctx = test_context();

        nrf.register(&ctx).await.unwrap();
        let id = nrf.nf_instance_id().unwrap();

        let result = nrf.deregister().await.unwrap();
        assert!(result.is_none());
        assert!(nrf.nf_instance_id().is_none());

        {
            let calls = calls.lock().unwrap();
            assert_eq!(
                calls[1],
                format!("DELETE /{}/v1/nf-instances/{id}", service_name::NNRF_NFM)
            );
        }

        // Stored id was consumed, a second deregister sends nothing
        let result = nrf.deregister().await.unwrap();
        assert!(result.is_none());
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deregister_returns_problem_details() {
        let (uri, _calls) = stub_nrf(true).await;
        let nrf = NrfClient::new(&uri).unwrap();
        let ctx = test_context();

        nrf.register(&ctx).await.unwrap();
        let problem = nrf.deregister().await.unwrap().unwrap();
        assert_eq!(problem.status, Some(404));
        assert_eq!(problem.cause.as_deref(), Some("NF_INSTANCE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_register_transport_failure_is_err() {
        let nrf = NrfClient::new("http://127.0.0.1:1").unwrap();
        let ctx = test_context();
        assert!(nrf.register(&ctx).await.is_err());
    }
}
