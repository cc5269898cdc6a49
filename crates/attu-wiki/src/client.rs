//! `MediaWiki` Action API client.
//!
//! Every call goes to one `api.php` endpoint with `format=json`. Login uses
//! a bot password: fetch a login token, post the credentials with it, then
//! keep the session cookie. Writes (edit, block) fetch a fresh CSRF token
//! first, since the token is tied to the session and may rotate.
//!
//! The API reports most failures with HTTP 200 and an `error` object in the
//! body; those surface as [`WikiError::Api`].

use attu_core::platform::{WikiClient, WikiError};
use serde_json::Value;
use tracing::{debug, info};

/// Endpoint of the Attu Project wiki.
pub const DEFAULT_API_ENDPOINT: &str = "https://wiki.attuproject.org/api.php";

/// Client for one `MediaWiki` installation.
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl MediaWikiClient {
    /// Create a client for the `api.php` at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`WikiError::Request`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, WikiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("attu-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WikiError::Request {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The `api.php` URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<Value, WikiError> {
        let mut fields = form.to_vec();
        fields.push(("format", "json"));
        let response = self
            .client
            .post(&self.endpoint)
            .form(&fields)
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }

    async fn token(&self, kind: &str) -> Result<String, WikiError> {
        let json = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", kind)])
            .await?;
        let field = format!("{kind}token");
        json.get("query")
            .and_then(|q| q.get("tokens"))
            .and_then(|t| t.get(&field))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| WikiError::Decode {
                message: format!("response missing query.tokens.{field}"),
            })
    }
}

impl WikiClient for MediaWikiClient {
    async fn login(&self, user: &str, key: &str) -> Result<String, WikiError> {
        let login_token = self.token("login").await?;
        let json = self
            .post(&[
                ("action", "login"),
                ("lgname", user),
                ("lgpassword", key),
                ("lgtoken", &login_token),
            ])
            .await?;

        let login = json.get("login").ok_or_else(|| WikiError::Decode {
            message: "response missing login".to_owned(),
        })?;
        let result = login.get("result").and_then(Value::as_str).unwrap_or_default();
        if result != "Success" {
            let reason = login
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or(result)
                .to_owned();
            return Err(WikiError::Auth { reason });
        }

        info!(user, "logged in to wiki");
        self.token("csrf").await
    }

    async fn get_page_text(&self, title: &str) -> Result<String, WikiError> {
        let json = self
            .get(&[
                ("action", "parse"),
                ("page", title),
                ("prop", "wikitext"),
                ("formatversion", "2"),
            ])
            .await?;
        json.get("parse")
            .and_then(|p| p.get("wikitext"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| WikiError::Decode {
                message: "response missing parse.wikitext".to_owned(),
            })
    }

    async fn edit_page(&self, title: &str, text: &str, summary: &str) -> Result<(), WikiError> {
        let csrf = self.token("csrf").await?;
        let json = self
            .post(&[
                ("action", "edit"),
                ("title", title),
                ("text", text),
                ("summary", summary),
                ("bot", "1"),
                ("minor", "1"),
                ("token", &csrf),
            ])
            .await?;
        let result = json
            .get("edit")
            .and_then(|e| e.get("result"))
            .and_then(Value::as_str);
        if result != Some("Success") {
            return Err(WikiError::Decode {
                message: format!("edit not applied: {json}"),
            });
        }
        debug!(title, summary, "wiki page edited");
        Ok(())
    }

    async fn block_user(&self, username: &str, reason: &str) -> Result<(), WikiError> {
        let csrf = self.token("csrf").await?;
        let json = self
            .post(&[
                ("action", "block"),
                ("user", username),
                ("expiry", "infinite"),
                ("reason", reason),
                ("token", &csrf),
            ])
            .await?;
        if json.get("block").is_none() {
            return Err(WikiError::Decode {
                message: format!("block not applied: {json}"),
            });
        }
        info!(username, "wiki user blocked");
        Ok(())
    }
}

fn request_failed(e: reqwest::Error) -> WikiError {
    WikiError::Request {
        message: e.to_string(),
    }
}

/// Check the status, parse the body, and surface API-level errors.
async fn decode(response: reqwest::Response) -> Result<Value, WikiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(WikiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let json: Value = response.json().await.map_err(|e| WikiError::Decode {
        message: format!("wiki response parse failed: {e}"),
    })?;

    if let Some(error) = json.get("error") {
        let field = |name: &str| {
            error
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        return Err(WikiError::Api {
            code: field("code"),
            info: field("info"),
        });
    }

    Ok(json)
}
