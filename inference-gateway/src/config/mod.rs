use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_PROJECT_ID: &str = "your-project-id";
const DEFAULT_REGION: &str = "europe-west2";
const DEFAULT_ENDPOINT_ID: &str = "projects/123/locations/europe-west2/endpoints/999";

/// Process-wide gateway configuration. Built once in `main`, never reloaded.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub common: core_config::Config,
    pub vertex: VertexConfig,
}

#[derive(Debug, Clone)]
pub struct VertexConfig {
    /// `GOOGLE_CLOUD_PROJECT`
    pub project_id: String,
    /// `VERTEX_REGION`
    pub region: String,
    /// `VERTEX_ENDPOINT_ID`: a bare endpoint id or a full resource name.
    pub endpoint_id: String,
    /// `VERTEX_API_ENDPOINT`: overrides `https://{location}-aiplatform.googleapis.com`.
    pub api_endpoint: Option<String>,
    /// `VERTEX_ACCESS_TOKEN`: static bearer token. Falls back to the metadata server.
    pub access_token: Option<Secret<String>>,
    /// `VERTEX_TIMEOUT_SECS`: unset means the transport default.
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let vertex = VertexConfig::from_lookup(|key| env::var(key).ok())?;

        Ok(GatewayConfig { common, vertex })
    }
}

impl VertexConfig {
    /// Build from a key lookup. Empty optional values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match optional("VERTEX_TIMEOUT_SECS") {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        let config = VertexConfig {
            project_id: lookup("GOOGLE_CLOUD_PROJECT").unwrap_or_else(|| DEFAULT_PROJECT_ID.into()),
            region: lookup("VERTEX_REGION").unwrap_or_else(|| DEFAULT_REGION.into()),
            endpoint_id: lookup("VERTEX_ENDPOINT_ID").unwrap_or_else(|| DEFAULT_ENDPOINT_ID.into()),
            api_endpoint: optional("VERTEX_API_ENDPOINT")
                .map(|url| url.trim_end_matches('/').to_string()),
            access_token: optional("VERTEX_ACCESS_TOKEN").map(Secret::new),
            timeout,
        };

        // Fail at startup rather than on the first prediction.
        config.endpoint_name()?;

        Ok(config)
    }

    /// Resolve the configured identifier to a full endpoint resource name.
    pub fn endpoint_name(&self) -> Result<EndpointName, AppError> {
        EndpointName::resolve(&self.endpoint_id, &self.project_id, &self.region)
    }

    /// `{base}/v1/{resource}:predict`, using the endpoint's own location for
    /// the regional host.
    pub fn predict_url(&self) -> Result<String, AppError> {
        let name = self.endpoint_name()?;
        let base = match &self.api_endpoint {
            Some(base) => base.clone(),
            None => format!("https://{}-aiplatform.googleapis.com", name.location),
        };

        Ok(format!("{}/v1/{}:predict", base, name))
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "VERTEX_TIMEOUT_SECS must be a positive integer, got '{}'",
            raw
        ))),
    }
}

/// `projects/{project}/locations/{location}/endpoints/{endpoint_id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointName {
    pub project: String,
    pub location: String,
    pub endpoint_id: String,
}

impl EndpointName {
    /// Accept either a fully qualified resource name (used as-is) or a bare
    /// endpoint id (qualified with the configured project and region).
    pub fn resolve(identifier: &str, project: &str, region: &str) -> Result<Self, AppError> {
        let identifier = identifier.trim().trim_matches('/');
        if identifier.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "VERTEX_ENDPOINT_ID must not be empty"
            )));
        }

        if !identifier.contains('/') {
            return Ok(EndpointName {
                project: project.to_string(),
                location: region.to_string(),
                endpoint_id: identifier.to_string(),
            });
        }

        let segments: Vec<&str> = identifier.split('/').collect();
        match segments.as_slice() {
            ["projects", project, "locations", location, "endpoints", endpoint_id]
                if !project.is_empty() && !location.is_empty() && !endpoint_id.is_empty() =>
            {
                Ok(EndpointName {
                    project: project.to_string(),
                    location: location.to_string(),
                    endpoint_id: endpoint_id.to_string(),
                })
            }
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "VERTEX_ENDPOINT_ID '{}' is not of the form \
                 projects/{{project}}/locations/{{location}}/endpoints/{{id}}",
                identifier
            ))),
        }
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/endpoints/{}",
            self.project, self.location, self.endpoint_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<VertexConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VertexConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = from_pairs(&[]).unwrap();

        assert_eq!(config.project_id, "your-project-id");
        assert_eq!(config.region, "europe-west2");
        assert_eq!(
            config.endpoint_id,
            "projects/123/locations/europe-west2/endpoints/999"
        );
        assert!(config.api_endpoint.is_none());
        assert!(config.access_token.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn bare_endpoint_id_is_qualified_with_project_and_region() {
        let config = from_pairs(&[
            ("GOOGLE_CLOUD_PROJECT", "acme-ml"),
            ("VERTEX_REGION", "us-central1"),
            ("VERTEX_ENDPOINT_ID", "4242"),
        ])
        .unwrap();

        assert_eq!(
            config.endpoint_name().unwrap().to_string(),
            "projects/acme-ml/locations/us-central1/endpoints/4242"
        );
        assert_eq!(
            config.predict_url().unwrap(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/acme-ml/locations/us-central1/endpoints/4242:predict"
        );
    }

    #[test]
    fn qualified_name_keeps_its_own_location() {
        let config = from_pairs(&[
            ("VERTEX_REGION", "us-central1"),
            ("VERTEX_ENDPOINT_ID", "projects/9/locations/asia-east1/endpoints/7"),
        ])
        .unwrap();

        let name = config.endpoint_name().unwrap();
        assert_eq!(name.project, "9");
        assert_eq!(name.location, "asia-east1");
        assert!(config
            .predict_url()
            .unwrap()
            .starts_with("https://asia-east1-aiplatform.googleapis.com/v1/"));
    }

    #[test]
    fn api_endpoint_override_replaces_host() {
        let config = from_pairs(&[
            ("VERTEX_ENDPOINT_ID", "projects/p/locations/l/endpoints/e"),
            ("VERTEX_API_ENDPOINT", "http://127.0.0.1:9000/"),
        ])
        .unwrap();

        assert_eq!(
            config.predict_url().unwrap(),
            "http://127.0.0.1:9000/v1/projects/p/locations/l/endpoints/e:predict"
        );
    }

    #[test]
    fn rejects_malformed_resource_names() {
        for bad in [
            "projects/p/endpoints/e",
            "projects/p/locations//endpoints/e",
            "models/p/locations/l/endpoints/e",
            "   ",
        ] {
            assert!(
                from_pairs(&[("VERTEX_ENDPOINT_ID", bad)]).is_err(),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn optional_settings_are_parsed() {
        let config = from_pairs(&[
            ("VERTEX_ACCESS_TOKEN", "ya29.token"),
            ("VERTEX_TIMEOUT_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(
            config.access_token.as_ref().unwrap().expose_secret(),
            "ya29.token"
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn empty_optional_settings_count_as_unset() {
        let config = from_pairs(&[("VERTEX_ACCESS_TOKEN", ""), ("VERTEX_API_ENDPOINT", " ")])
            .unwrap();

        assert!(config.access_token.is_none());
        assert!(config.api_endpoint.is_none());
    }

    #[test]
    fn rejects_invalid_timeout() {
        assert!(from_pairs(&[("VERTEX_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_pairs(&[("VERTEX_TIMEOUT_SECS", "soon")]).is_err());
    }
}
