//! Credential acquisition for the Drive API.
//!
//! Two strategies produce access tokens: a service identity that signs a JWT
//! assertion (optionally delegated to a subject), and an interactive
//! installed-application flow backed by a local token cache file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::{debug, info, warn};
use regex::Regex;
use reqwest::{Client, Url};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::error::{DriveError, Result};
use crate::models::{
    InstalledClientSecret, OAuthClientConfig, ServiceAccountCredentials, StoredToken,
    TokenResponse,
};

/// Google OAuth2 token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth2 authorization endpoint.
const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Drive scope used by every credential this tool produces.
pub const DRIVE_METADATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.metadata.readonly";

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
    /// Subject to impersonate via domain-wide delegation.
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
}

/// Cached access token with expiration.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        // 60 second buffer before expiration
        self.expires_at > SystemTime::now() + Duration::from_secs(60)
    }
}

/// Credential provider polymorphic over the two authentication strategies.
#[derive(Clone)]
pub enum Authenticator {
    ServiceAccount(ServiceAccountAuth),
    Installed(InstalledFlowAuth),
}

impl Authenticator {
    /// Non-interactive service identity from a JSON key file, delegated to
    /// `subject` when given.
    pub fn service_account<P: AsRef<Path>>(path: P, subject: Option<String>) -> Result<Self> {
        Ok(Self::ServiceAccount(ServiceAccountAuth::from_file(
            path, subject,
        )?))
    }

    /// Interactive installed-application flow using the OAuth client secret
    /// at `secret_path`, persisting tokens to `token_cache`.
    pub fn installed(
        secret_path: impl AsRef<Path>,
        token_cache: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self::Installed(InstalledFlowAuth::from_file(
            secret_path,
            token_cache,
        )?))
    }

    /// Get a valid access token, refreshing or logging in as needed.
    pub async fn get_access_token(&self) -> Result<String> {
        match self {
            Self::ServiceAccount(auth) => auth.get_access_token().await,
            Self::Installed(auth) => auth.get_access_token().await,
        }
    }
}

/// Authenticator using service account credentials and a JWT assertion.
#[derive(Clone)]
pub struct ServiceAccountAuth {
    credentials: Arc<ServiceAccountCredentials>,
    subject: Option<String>,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    /// Create a new authenticator from a service account JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P, subject: Option<String>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Ok(Self::new(credentials, subject))
    }

    /// Create a new authenticator from credentials.
    pub fn new(credentials: ServiceAccountCredentials, subject: Option<String>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            subject,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a valid access token, exchanging a fresh assertion if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_valid() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let new_token = self.exchange_assertion().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Sign a JWT assertion and exchange it for an access token.
    async fn exchange_assertion(&self) -> Result<CachedToken> {
        let token_uri = self.credentials.token_uri.as_deref().unwrap_or(TOKEN_URI);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs();

        let claims = Claims {
            iss: self.credentials.client_email.clone(),
            scope: DRIVE_METADATA_SCOPE.to_string(),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + 3600, // 1 hour
            sub: self.subject.clone(),
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())?;
        let jwt = encode(&header, &claims, &key)?;

        debug!("exchanging service account assertion for an access token");

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &jwt),
        ];

        let response = self.client.post(token_uri).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        let expires_at = SystemTime::now() + Duration::from_secs(token_response.expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}

/// Authenticator using the interactive installed-application flow.
///
/// Token material is persisted to a local cache file after every successful
/// login or refresh, so later runs reuse it without user interaction.
#[derive(Clone)]
pub struct InstalledFlowAuth {
    config: Arc<OAuthClientConfig>,
    token_cache: PathBuf,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl InstalledFlowAuth {
    /// Create a new authenticator from an OAuth client secret JSON file.
    pub fn from_file(
        secret_path: impl AsRef<Path>,
        token_cache: impl Into<PathBuf>,
    ) -> Result<Self> {
        let content = fs::read_to_string(secret_path)?;
        let secret: InstalledClientSecret = serde_json::from_str(&content)?;
        Ok(Self::new(secret.installed, token_cache))
    }

    pub fn new(config: OAuthClientConfig, token_cache: impl Into<PathBuf>) -> Self {
        Self {
            config: Arc::new(config),
            token_cache: token_cache.into(),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a valid access token from memory, the cache file, a silent
    /// refresh, or a fresh interactive login, in that order.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_valid() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let stored = self.obtain_stored_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                access_token: stored.access_token.clone(),
                expires_at: stored.expires_at_system_time(),
            });
        }

        Ok(stored.access_token)
    }

    async fn obtain_stored_token(&self) -> Result<StoredToken> {
        if let Some(stored) = self.load_cache_file()? {
            if stored.is_valid() {
                debug!("using cached token from {:?}", self.token_cache);
                return Ok(stored);
            }
            if let Some(refresh_token) = stored.refresh_token.clone() {
                info!("cached token expired, refreshing");
                let response = self.refresh(&refresh_token).await?;
                let stored = StoredToken::from_response(&response, Some(refresh_token));
                self.persist(&stored)?;
                return Ok(stored);
            }
            warn!("cached token expired and has no refresh token");
        }

        let response = self.login().await?;
        let stored = StoredToken::from_response(&response, None);
        self.persist(&stored)?;
        Ok(stored)
    }

    fn load_cache_file(&self) -> Result<Option<StoredToken>> {
        if !self.token_cache.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.token_cache)?;
        match serde_json::from_str(&content) {
            Ok(stored) => Ok(Some(stored)),
            Err(err) => {
                warn!(
                    "ignoring unreadable token cache {:?}: {}",
                    self.token_cache, err
                );
                Ok(None)
            }
        }
    }

    fn persist(&self, token: &StoredToken) -> Result<()> {
        fs::write(&self.token_cache, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }

    fn token_uri(&self) -> &str {
        self.config.token_uri.as_deref().unwrap_or(TOKEN_URI)
    }

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(self.token_uri())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Run the interactive login: print the authorization URL, catch the
    /// redirect on a loopback listener, exchange the code for tokens.
    async fn login(&self) -> Result<TokenResponse> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let url = authorization_url(&self.config, &redirect_uri, DRIVE_METADATA_SCOPE)?;
        println!("Open this URL in your browser to authorize the app:\n\n{}\n", url);
        println!("Waiting for the authorization redirect ...");

        let code = wait_for_auth_code(&listener).await?;
        debug!("received authorization code, exchanging for tokens");
        self.exchange_code(&code, &redirect_uri).await
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .client
            .post(self.token_uri())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthFlowError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

/// Build the user-facing authorization URL for the installed-app flow.
fn authorization_url(
    config: &OAuthClientConfig,
    redirect_uri: &str,
    scope: &str,
) -> Result<String> {
    let auth_uri = config.auth_uri.as_deref().unwrap_or(AUTH_URI);
    let url = Url::parse_with_params(
        auth_uri,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| DriveError::AuthFlowError(format!("Invalid authorization URI: {}", e)))?;
    Ok(url.to_string())
}

/// Accept one connection on the loopback listener and pull the authorization
/// code out of the redirect request.
async fn wait_for_auth_code(listener: &TcpListener) -> Result<String> {
    let (mut stream, _) = listener.accept().await?;

    let mut buf = vec![0u8; 4096];
    let read = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..read]);

    let result = extract_auth_code(request.lines().next().unwrap_or_default());

    let body = match &result {
        Ok(_) => "Authorization received. You can close this window and return to the terminal.",
        Err(_) => "Authorization failed. Check the terminal for details.",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    let _ = stream.shutdown().await;

    result
}

static REQUEST_TARGET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GET (\S+) HTTP/").expect("Invalid request line regex"));

/// Extract the authorization code from the first line of the redirect
/// request, e.g. `GET /?code=4%2Fabc&scope=... HTTP/1.1`.
pub fn extract_auth_code(request_line: &str) -> Result<String> {
    let target = REQUEST_TARGET_REGEX
        .captures(request_line)
        .and_then(|c| c.get(1))
        .ok_or_else(|| {
            DriveError::AuthFlowError(format!("Unexpected redirect request: {}", request_line))
        })?;

    let url = Url::parse(&format!("http://127.0.0.1{}", target.as_str()))
        .map_err(|e| DriveError::AuthFlowError(format!("Unparseable redirect target: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(DriveError::AuthFlowError(format!(
                    "Authorization denied: {}",
                    value
                )))
            }
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| {
        DriveError::AuthFlowError("No authorization code in redirect request".to_string())
    })
}
