use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use mm_types::{LoginRequest, LoginResponse};

use crate::error::ClientError;
use crate::http::{client_endpoint, read_json};

/// Parse a homeserver address as given on the command line. A bare host
/// (`matrix.org`) is treated as `https://matrix.org`.
pub fn normalize_homeserver_url(raw: &str) -> Result<Url, ClientError> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    if url.host_str().is_none() {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            source: url::ParseError::EmptyHost,
        });
    }
    Ok(url)
}

/// Password login. There is no retry: the caller treats any error as fatal.
pub async fn login(
    http: &Client,
    homeserver: &Url,
    username: &str,
    password: &str,
) -> Result<LoginResponse, ClientError> {
    let url = client_endpoint(homeserver, &["login"]);
    debug!("POST {}", url);

    let resp = http
        .post(url)
        .json(&LoginRequest::password(username, password))
        .send()
        .await?;

    let creds: LoginResponse = read_json(resp).await?;
    info!(
        "Logged in as {} (device {})",
        creds.user_id,
        creds.device_id.as_deref().unwrap_or("-")
    );
    Ok(creds)
}
