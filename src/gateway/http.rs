//! HTTP transport backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;

use super::{Method, Request, Transport};
use crate::error::{Error, Result};

const REST_PREFIX: &str = "REST/1.0";

/// Username and password sent as `user`/`pass` parameters.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    pub fn new(base_url: &str, credentials: Option<Credentials>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidConfig("server.url is not set".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{REST_PREFIX}/{}",
            self.base_url,
            path.trim_start_matches('/')
        )
    }

    fn auth_params(&self) -> Vec<(String, String)> {
        match &self.credentials {
            Some(credentials) => vec![
                ("user".to_string(), credentials.user.clone()),
                ("pass".to_string(), credentials.password.clone()),
            ],
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<String> {
        let url = self.url_for(&request.path);
        let builder = match request.method {
            Method::Get => {
                let mut query = request.query.clone();
                query.extend(self.auth_params());
                self.client.get(&url).query(&query)
            }
            Method::Post => {
                let mut body = request.body.clone();
                body.extend(self.auth_params());
                self.client.post(&url).query(&request.query).form(&body)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|err| Error::Transport(format!("{url}: {err}")))?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_rest_prefix() {
        let transport =
            HttpTransport::new("https://rt.example.com/", None, Duration::from_secs(5))
                .expect("transport");
        assert_eq!(
            transport.url_for("ticket/5/show"),
            "https://rt.example.com/REST/1.0/ticket/5/show"
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = HttpTransport::new("  ", None, Duration::from_secs(5)).expect_err("empty");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials {
            user: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
