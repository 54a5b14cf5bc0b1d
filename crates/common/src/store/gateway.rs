use std::fmt;
use std::str::FromStr;

use cid::Cid;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DWEB_LINK: &str = "ipfs.dweb.link";

const SUBDOMAIN_PREFIX: &str = "subdomain:";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid content identifier {0}: {1}")]
    InvalidCid(String, String),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Where content is fetched from.
///
/// Written in config as either a base URL (`https://gateway.pinata.cloud`,
/// path style `<base>/ipfs/<cid>`) or `subdomain:<domain>` for
/// `https://<cid>.<domain>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gateway {
    Path(Url),
    Subdomain(String),
}

impl Default for Gateway {
    fn default() -> Self {
        Gateway::Subdomain(DWEB_LINK.to_string())
    }
}

impl Gateway {
    pub fn url_for(&self, cid: &str) -> Result<Url, GatewayError> {
        let parsed = Cid::try_from(cid)
            .map_err(|e| GatewayError::InvalidCid(cid.to_string(), e.to_string()))?;

        match self {
            Gateway::Path(base) => Ok(base.join(&format!("ipfs/{}", parsed))?),
            Gateway::Subdomain(domain) => {
                // subdomains are case-insensitive, so v0 hashes must go to base32 v1
                let v1 = parsed
                    .into_v1()
                    .map_err(|e| GatewayError::InvalidCid(cid.to_string(), e.to_string()))?;
                Ok(Url::parse(&format!("https://{}.{}/", v1, domain))?)
            }
        }
    }
}

impl FromStr for Gateway {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(domain) = s.strip_prefix(SUBDOMAIN_PREFIX) {
            return Ok(Gateway::Subdomain(domain.trim_matches('.').to_string()));
        }
        let mut url = Url::parse(s)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Gateway::Path(url))
    }
}

impl TryFrom<String> for Gateway {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gateway> for String {
    fn from(value: Gateway) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gateway::Path(url) => write!(f, "{}", url),
            Gateway::Subdomain(domain) => write!(f, "{}{}", SUBDOMAIN_PREFIX, domain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_path_gateway() {
        let gateway: Gateway = "https://gateway.pinata.cloud".parse().unwrap();
        assert_eq!(
            gateway.url_for(V1).unwrap().as_str(),
            format!("https://gateway.pinata.cloud/ipfs/{}", V1)
        );
    }

    #[test]
    fn test_path_gateway_keeps_base_path() {
        let gateway: Gateway = "http://localhost:8080/proxy".parse().unwrap();
        assert_eq!(
            gateway.url_for(V1).unwrap().as_str(),
            format!("http://localhost:8080/proxy/ipfs/{}", V1)
        );
    }

    #[test]
    fn test_subdomain_gateway() {
        let gateway = Gateway::default();
        assert_eq!(
            gateway.url_for(V1).unwrap().as_str(),
            format!("https://{}.ipfs.dweb.link/", V1)
        );
    }

    #[test]
    fn test_subdomain_gateway_upgrades_v0() {
        let url = Gateway::default().url_for(V0).unwrap();
        let host = url.host_str().unwrap();
        assert!(host.starts_with("bafy"));
        assert!(host.ends_with(".ipfs.dweb.link"));
    }

    #[test]
    fn test_rejects_non_cid() {
        let gateway = Gateway::default();
        assert!(matches!(
            gateway.url_for("../../etc/passwd"),
            Err(GatewayError::InvalidCid(..))
        ));
    }

    #[test]
    fn test_config_round_trip() {
        for raw in ["subdomain:ipfs.dweb.link", "https://gateway.pinata.cloud/"] {
            let gateway: Gateway = raw.parse().unwrap();
            assert_eq!(gateway.to_string(), raw);
        }
    }
}
