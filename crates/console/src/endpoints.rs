//! Server addresses derived from the page origin

use anyhow::{bail, Result};
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Push channel, `ws://` or `wss://`
    pub channel: String,
    pub run: String,
    pub generate: String,
}

impl Endpoints {
    /// `https` origins get `wss`, everything else plain `ws`. A `ws(s)://`
    /// origin is accepted and mapped back to `http(s)://` for the REST calls.
    pub fn from_origin(origin: &str) -> Result<Self> {
        let origin = origin.trim().trim_end_matches('/');
        let with_scheme = if origin.contains("://") {
            origin.to_string()
        } else {
            format!("http://{}", origin)
        };

        let url = Url::parse(&with_scheme)?;
        let (http_scheme, ws_scheme) = match url.scheme() {
            "http" | "ws" => ("http", "ws"),
            "https" | "wss" => ("https", "wss"),
            other => bail!("Unsupported origin scheme: {}", other),
        };

        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Origin has no host: {}", origin))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            channel: format!("{}://{}/ws", ws_scheme, authority),
            run: format!("{}://{}/api/run", http_scheme, authority),
            generate: format!("{}://{}/api/ai/generate", http_scheme, authority),
        })
    }
}
