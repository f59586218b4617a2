//! Pure, stateless mapping from Kubernetes typed objects to mesh config
//! entries. Parameterized by [`TranslatorConfig`] and, where a translation
//! needs to know whether a backend or certificate is actually reachable, by
//! caller-supplied lookup closures — the translator itself never touches a
//! [`crate::resource_map::ResourceMap`] or the Kubernetes API directly.

use k8s_openapi::api::core::v1::Secret;
use kcr_gateway_networking_k8s_io::v1::gateways::{Gateway, GatewayListenersTlsMode};
use kcr_gateway_networking_k8s_io::v1::httproutes::{HTTPRoute, HttpRouteRules, HttpRouteRulesFilters, HttpRouteRulesFiltersType};
use kcr_gateway_networking_k8s_io::v1alpha2::referencegrants::{ReferenceGrant, ReferenceGrantFrom, ReferenceGrantTo};
use kcr_gateway_networking_k8s_io::v1alpha2::tcproutes::TCPRoute;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::Error;
use crate::mesh::{
    ApiGatewayEntry, ApiGatewayListener, FileSystemCertificateEntry, HeaderFilter, HttpRouteEntry, RouteRule, TcpRouteEntry,
};
use crate::refs::{ConfigEntryKind, Reference};
use crate::Result;

#[derive(Clone, Debug)]
pub struct TranslatorConfig {
    pub enable_namespaces: bool,
    pub destination_namespace: String,
    pub enable_namespace_mirroring: bool,
    pub namespace_mirroring_prefix: String,
    pub partition: String,
    pub fips_mode: bool,
}

impl From<&crate::config::Config> for TranslatorConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            enable_namespaces: config.enable_namespaces,
            destination_namespace: config.mesh_destination_namespace.clone(),
            enable_namespace_mirroring: config.enable_namespace_mirroring,
            namespace_mirroring_prefix: config.namespace_mirroring_prefix.clone(),
            partition: config.mesh_partition.clone(),
            fips_mode: false,
        }
    }
}

/// A translation that silently dropped part of its input keeps going; the
/// drop is surfaced here so the caller can log it and reflect it on status,
/// per the "never silently discarded" rule.
#[derive(Debug, Default)]
pub struct Drops(pub Vec<String>);

impl Drops {
    fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }
}

/// `namespace(k8sNamespace) -> meshNamespace`.
pub fn namespace(config: &TranslatorConfig, k8s_namespace: &str) -> String {
    if !config.enable_namespaces {
        String::new()
    } else if config.enable_namespace_mirroring {
        format!("{}{}", config.namespace_mirroring_prefix, k8s_namespace)
    } else {
        config.destination_namespace.clone()
    }
}

/// Whether `from` (namespace/kind) may reference `to` (namespace/kind/name),
/// per any grant in `grants` whose `From`/`To` entries admit it. An empty
/// `to.name` in the grant means "any name of this kind".
pub fn reference_grant_admits(
    grants: &[ReferenceGrant],
    from_namespace: &str,
    from_kind: &str,
    to_namespace: &str,
    to_kind: &str,
    to_name: &str,
) -> bool {
    if from_namespace == to_namespace {
        return true;
    }

    grants.iter().any(|grant| {
        grant.metadata.namespace.as_deref() == Some(to_namespace)
            && grant.spec.from.iter().any(|f: &ReferenceGrantFrom| {
                f.namespace == from_namespace && f.kind.eq_ignore_ascii_case(from_kind)
            })
            && grant.spec.to.iter().any(|t: &ReferenceGrantTo| {
                t.kind.eq_ignore_ascii_case(to_kind) && t.name.as_deref().map(|n| n == to_name).unwrap_or(true)
            })
    })
}

fn lowercase_protocol(protocol: &str) -> &'static str {
    match protocol.to_ascii_lowercase().as_str() {
        "https" => "http",
        "http" => "http",
        "tcp" => "tcp",
        _ => "tcp",
    }
}

/// `toAPIGateway(gw, resources) -> APIGatewayEntry`. `resolve_cert` is given
/// the certificate Secret's (namespace, name) and returns whether it both
/// exists and is grant-approved; unresolved certs are dropped, logged via
/// the returned [`Drops`].
pub fn to_api_gateway(
    gw: &Gateway,
    grants: &[ReferenceGrant],
    resolve_cert: impl Fn(&str, &str) -> bool,
) -> (ApiGatewayEntry, Drops) {
    let gw_namespace = gw.metadata.namespace.clone().unwrap_or_default();
    let mut drops = Drops::default();
    let mut listeners = Vec::new();

    for listener in &gw.spec.listeners {
        let mut tls_certs = Vec::new();
        let mut tls_mode = None;

        if let Some(tls) = &listener.tls {
            tls_mode = tls.mode.as_ref().map(|m| match m {
                GatewayListenersTlsMode::Terminate => "terminate".to_string(),
                GatewayListenersTlsMode::Passthrough => "passthrough".to_string(),
            });

            for cert_ref in tls.certificate_refs.iter().flatten() {
                let cert_namespace = cert_ref.namespace.clone().unwrap_or_else(|| gw_namespace.clone());
                let admitted = reference_grant_admits(grants, &gw_namespace, "Gateway", &cert_namespace, "Secret", &cert_ref.name);

                if admitted && resolve_cert(&cert_namespace, &cert_ref.name) {
                    tls_certs.push(
                        Reference::new(ConfigEntryKind::FileSystemCertificate, cert_ref.name.clone())
                            .with_namespace(cert_namespace),
                    );
                } else {
                    drops.push(format!(
                        "listener {} dropped certificate ref {}/{}: unresolved or not grant-approved",
                        listener.name, cert_namespace, cert_ref.name
                    ));
                }
            }
        }

        listeners.push(ApiGatewayListener {
            name: listener.name.clone(),
            port: listener.port as u16,
            protocol: lowercase_protocol(&listener.protocol).to_string(),
            tls_certificates: tls_certs,
            tls_mode,
        });
    }

    (ApiGatewayEntry { listeners }, drops)
}

fn merge_header_filters_http(filters: &[HttpRouteRulesFilters]) -> Option<HeaderFilter> {
    let mut merged = HeaderFilter::default();
    let mut any = false;

    for filter in filters {
        if let Some(modifier) = &filter.request_header_modifier {
            any = true;
            for add in modifier.add.iter().flatten() {
                merged.add.push((add.name.clone(), add.value.clone()));
            }
            for set in modifier.set.iter().flatten() {
                merged.set.push((set.name.clone(), set.value.clone()));
            }
            for remove in modifier.remove.iter().flatten() {
                merged.remove.push(remove.clone());
            }
        }
    }

    any.then_some(merged)
}

fn url_rewrite_prefix_http(filters: &[HttpRouteRulesFilters]) -> Option<String> {
    filters.iter().find_map(|filter| {
        if filter.r#type != HttpRouteRulesFiltersType::UrlRewrite {
            return None;
        }
        let rewrite = filter.url_rewrite.as_ref()?;
        let path = rewrite.path.as_ref()?;
        use kcr_gateway_networking_k8s_io::v1::httproutes::HttpRouteRulesFiltersUrlRewritePathType as PathType;
        match path.r#type {
            PathType::ReplacePrefixMatch => path.replace_prefix_match.clone(),
            // full-path rewrites are intentionally dropped: the rule still
            // matches, it just loses the rewrite.
            PathType::ReplaceFullPath => None,
        }
    })
}

fn describe_matches(rule: &HttpRouteRules) -> Vec<String> {
    rule.matches
        .iter()
        .flatten()
        .map(|m| {
            format!(
                "path={:?} method={:?} headers={}",
                m.path.as_ref().and_then(|p| p.value.clone()),
                m.method,
                m.headers.as_ref().map(|h| h.len()).unwrap_or(0)
            )
        })
        .collect()
}

/// `toHTTPRoute(route, resources) -> HTTPRouteEntry`. Parent refs are left
/// empty — the Binder owns parent assignment via `ResourceMap::mutate*`.
/// `resolve_backend` is given (namespace, group, kind, name) and returns
/// whether the backend is a known Service/MeshService admitted by any
/// reference grant.
pub fn to_http_route(
    route: &HTTPRoute,
    grants: &[ReferenceGrant],
    resolve_backend: impl Fn(&str, &str, &str, &str) -> bool,
) -> (HttpRouteEntry, Drops) {
    let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
    let mut drops = Drops::default();
    let mut rules = Vec::new();

    for rule in route.spec.rules.iter().flatten() {
        let header_filter = rule.filters.as_deref().and_then(merge_header_filters_http);
        let url_rewrite_prefix = rule.filters.as_deref().and_then(url_rewrite_prefix_http);
        let matches = describe_matches(rule);

        let mut backend_refs = Vec::new();
        for backend in rule.backend_refs.iter().flatten() {
            let backend_namespace = backend.namespace.clone().unwrap_or_else(|| route_namespace.clone());
            let group = backend.group.clone().unwrap_or_default();
            let kind = backend.kind.clone().unwrap_or_else(|| "Service".to_string());

            let grant_ok = reference_grant_admits(grants, &route_namespace, "HTTPRoute", &backend_namespace, &kind, &backend.name);
            if grant_ok && resolve_backend(&backend_namespace, &group, &kind, &backend.name) {
                let weight = backend.weight.unwrap_or(1);
                backend_refs.push((
                    Reference::new(ConfigEntryKind::ApiGateway, backend.name.clone()).with_namespace(backend_namespace),
                    weight,
                ));
            } else {
                drops.push(format!(
                    "rule backend {}/{} dropped: unresolved or not grant-approved",
                    backend_namespace, backend.name
                ));
            }
        }

        rules.push(RouteRule {
            matches,
            header_filter,
            url_rewrite_prefix,
            backend_refs,
        });
    }

    (
        HttpRouteEntry {
            parent_refs: vec![],
            hostnames: route.spec.hostnames.clone().unwrap_or_default(),
            rules,
        },
        drops,
    )
}

/// `toTCPRoute`: analogous to `toHTTPRoute`; weights are ignored.
pub fn to_tcp_route(
    route: &TCPRoute,
    grants: &[ReferenceGrant],
    resolve_backend: impl Fn(&str, &str, &str, &str) -> bool,
) -> (TcpRouteEntry, Drops) {
    let route_namespace = route.metadata.namespace.clone().unwrap_or_default();
    let mut drops = Drops::default();
    let mut rules = Vec::new();

    for rule in &route.spec.rules {
        let mut backend_refs = Vec::new();
        for backend in &rule.backend_refs {
            let backend_namespace = backend.namespace.clone().unwrap_or_else(|| route_namespace.clone());
            let group = backend.group.clone().unwrap_or_default();
            let kind = backend.kind.clone().unwrap_or_else(|| "Service".to_string());

            let grant_ok = reference_grant_admits(grants, &route_namespace, "TCPRoute", &backend_namespace, &kind, &backend.name);
            if grant_ok && resolve_backend(&backend_namespace, &group, &kind, &backend.name) {
                backend_refs.push((
                    Reference::new(ConfigEntryKind::ApiGateway, backend.name.clone()).with_namespace(backend_namespace),
                    1,
                ));
            } else {
                drops.push(format!(
                    "rule backend {}/{} dropped: unresolved or not grant-approved",
                    backend_namespace, backend.name
                ));
            }
        }

        rules.push(RouteRule {
            matches: vec![],
            header_filter: None,
            url_rewrite_prefix: None,
            backend_refs,
        });
    }

    (TcpRouteEntry { parent_refs: vec![], rules }, drops)
}

const MIN_RSA_BITS_STANDARD: usize = 2048;
const FIPS_ALLOWED_RSA_BITS: [usize; 3] = [2048, 3072, 4096];

/// `toFileSystemCertificate(secret) -> CertificateEntry`. Parses the
/// Secret's `tls.crt`/`tls.key`, validates RSA key length and that every
/// host in the certificate (CN, DNS SANs, IP SANs) is syntactically valid.
pub fn to_file_system_certificate(secret: &Secret, fips_mode: bool) -> Result<FileSystemCertificateEntry> {
    let data = secret.data.as_ref().ok_or(Error::MissingField)?;
    let cert_bytes = data.get("tls.crt").ok_or(Error::MissingField)?;
    let key_bytes = data.get("tls.key").ok_or(Error::MissingField)?;

    let cert_pem = String::from_utf8(cert_bytes.0.clone()).map_err(|e| Error::CertificateParse(e.to_string()))?;
    let key_pem = String::from_utf8(key_bytes.0.clone()).map_err(|e| Error::CertificateParse(e.to_string()))?;

    let parsed_cert = pem::parse(&cert_pem).map_err(|e| Error::CertificateParse(e.to_string()))?;
    let (_, x509) = X509Certificate::from_der(parsed_cert.contents()).map_err(|e| Error::CertificateParse(e.to_string()))?;

    validate_key_length(&key_pem, fips_mode)?;
    validate_hosts(&x509)?;

    Ok(FileSystemCertificateEntry {
        certificate: cert_pem,
        private_key: key_pem,
    })
}

fn validate_key_length(key_pem: &str, fips_mode: bool) -> Result<()> {
    let parsed = pem::parse(key_pem).map_err(|e| Error::CertificateParse(e.to_string()))?;
    let private_key = RsaPrivateKey::from_pkcs1_der(parsed.contents())
        .or_else(|_| RsaPrivateKey::from_pkcs8_der(parsed.contents()));
    let Ok(private_key) = private_key else {
        // Not an RSA key (e.g. ECDSA) — length requirements are RSA-specific.
        return Ok(());
    };

    let bits = private_key.size() * 8;
    let ok = if fips_mode {
        FIPS_ALLOWED_RSA_BITS.contains(&bits)
    } else {
        bits >= MIN_RSA_BITS_STANDARD
    };

    if ok {
        Ok(())
    } else {
        Err(Error::KeyLengthTooShort {
            bits,
            minimum: MIN_RSA_BITS_STANDARD,
        })
    }
}

fn is_valid_dns_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && name.trim_start_matches("*.").split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn validate_hosts(cert: &X509Certificate) -> Result<()> {
    let mut hosts = Vec::new();

    for rdn in cert.subject().iter_common_name() {
        if let Ok(cn) = rdn.as_str() {
            hosts.push(cn.to_string());
        }
    }

    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for name in &san.value.general_names {
            match name {
                GeneralName::DNSName(dns) => hosts.push(dns.to_string()),
                GeneralName::IPAddress(_) => {}
                _ => {}
            }
        }
    }

    for host in &hosts {
        if !is_valid_dns_name(host) && host.parse::<std::net::IpAddr>().is_err() {
            return Err(Error::InvalidCertificateHost(host.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> TranslatorConfig {
        TranslatorConfig {
            enable_namespaces: false,
            destination_namespace: "default".to_string(),
            enable_namespace_mirroring: false,
            namespace_mirroring_prefix: String::new(),
            partition: String::new(),
            fips_mode: false,
        }
    }

    #[test]
    fn namespace_disabled_yields_empty() {
        assert_eq!(namespace(&base_config(), "n1"), "");
    }

    #[test]
    fn namespace_mirroring_applies_prefix() {
        let mut cfg = base_config();
        cfg.enable_namespaces = true;
        cfg.enable_namespace_mirroring = true;
        cfg.namespace_mirroring_prefix = "k8s-".to_string();
        assert_eq!(namespace(&cfg, "n1"), "k8s-n1");
    }

    #[test]
    fn namespace_destination_used_without_mirroring() {
        let mut cfg = base_config();
        cfg.enable_namespaces = true;
        cfg.destination_namespace = "consul-ns".to_string();
        assert_eq!(namespace(&cfg, "n1"), "consul-ns");
    }

    #[test]
    fn dns_name_validation() {
        assert!(is_valid_dns_name("example.com"));
        assert!(is_valid_dns_name("*.example.com"));
        assert!(!is_valid_dns_name(""));
        assert!(!is_valid_dns_name("-bad.example.com"));
    }

    #[test]
    fn reference_grant_same_namespace_always_admits() {
        assert!(reference_grant_admits(&[], "n1", "Gateway", "n1", "Secret", "cert1"));
    }

    #[test]
    fn reference_grant_cross_namespace_requires_grant() {
        assert!(!reference_grant_admits(&[], "n1", "Gateway", "n2", "Secret", "cert1"));
    }

    fn rsa_key_pem(bits: usize) -> String {
        use rsa::pkcs1::EncodeRsaPrivateKey;
        use rsa::pkcs8::LineEnding;
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), bits).expect("generate test RSA key");
        key.to_pkcs1_pem(LineEnding::LF).expect("encode test RSA key").to_string()
    }

    #[test]
    fn rejects_rsa_key_shorter_than_minimum() {
        let key_pem = rsa_key_pem(1024);
        let err = validate_key_length(&key_pem, false).unwrap_err();
        assert!(matches!(err, Error::KeyLengthTooShort { bits: 1024, minimum: 2048 }));
    }

    #[test]
    fn accepts_rsa_key_at_minimum() {
        let key_pem = rsa_key_pem(2048);
        assert!(validate_key_length(&key_pem, false).is_ok());
    }

    #[test]
    fn fips_mode_rejects_non_allowed_bit_size() {
        let key_pem = rsa_key_pem(1536);
        let err = validate_key_length(&key_pem, true).unwrap_err();
        assert!(matches!(err, Error::KeyLengthTooShort { bits: 1536, .. }));
    }
}
