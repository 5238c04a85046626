//! Web service configuration

use anyhow::Result;

/// Settings of the front service itself
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Externally visible origin, used to build redirect URIs
    pub public_url: String,
    /// Whether session cookies carry the `Secure` attribute
    pub secure_cookies: bool,
}

impl WebConfig {
    /// Create a new WebConfig from environment variables
    ///
    /// # Environment Variables
    /// - `WEB_BIND_ADDR`: Listener address (default: "0.0.0.0:3000")
    /// - `PUBLIC_URL`: Public origin of the service (default: "http://localhost:3000")
    /// - `APP_ENV`: "production" enables secure cookies (default: "development")
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("WEB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        if !public_url.starts_with("http://") && !public_url.starts_with("https://") {
            anyhow::bail!("PUBLIC_URL must be an http(s) URL, got {}", public_url);
        }

        let secure_cookies = std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(WebConfig {
            bind_addr,
            public_url,
            secure_cookies,
        })
    }

    /// Where the identity provider sends the browser back to
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.public_url)
    }

    /// Where the identity provider sends the browser after logout
    pub fn login_url(&self) -> String {
        format!("{}/login", self.public_url)
    }
}
