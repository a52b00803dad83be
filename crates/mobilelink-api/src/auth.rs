// Authentication modes and per-mode session state.
//
// The MobileLink API accepts three kinds of credentials. Which one a client
// is constructed with decides the preset request headers and whether a login
// round-trip is needed at all; the dispatch itself lives in
// `ApiClient::login`.

use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, AUTHORIZATION, CONNECTION, COOKIE, HOST, HeaderMap,
    HeaderValue, USER_AGENT,
};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Hostname the mobile app pins in its requests (bearer-token mode only).
const API_HOST: &str = "app.mobilelinkgen.com";

/// User agent of the iOS MobileLink app, sent alongside bearer tokens.
const MOBILE_USER_AGENT: &str = "mobilelink/75633 CFNetwork/3826.600.41 Darwin/24.6.0";

/// Desktop browser user agent used for the cookie and account flows -- the
/// hosted sign-in pages are only served to something that looks like a
/// browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// A username/password pair for the hosted sign-in flow.
#[derive(Debug, Clone)]
pub struct Account {
    /// Account email address.
    pub username: String,
    pub password: SecretString,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Credentials for authenticating with the MobileLink cloud.
///
/// Chosen once at construction and immutable for the client's lifetime.
/// Adding a fourth mode means adding a variant here and a match arm in
/// `ApiClient::login` -- the compiler finds every other site.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Username/password; every login runs the full hosted sign-in flow.
    Account(Account),

    /// Raw `Cookie:` header harvested from a browser session. The optional
    /// fallback account is used when the cookies stop being accepted.
    Cookies {
        header: String,
        fallback: Option<Account>,
    },

    /// Pre-authenticated bearer token (JWT from the mobile app). Never
    /// probed; assumed valid until a data endpoint says otherwise.
    Token(SecretString),
}

impl Credentials {
    /// Preset request headers for this mode, attached to every request.
    ///
    /// Bearer tokens get the mobile app's header set; the cookie and
    /// account modes get a browser header set, with the raw cookie header
    /// attached only in cookie mode.
    pub(crate) fn base_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        match self {
            Self::Token(token) => {
                headers.insert(HOST, HeaderValue::from_static(API_HOST));
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
                let bearer = format!("Bearer {}", token.expose_secret());
                let mut value =
                    HeaderValue::from_str(&bearer).map_err(|_| Error::InvalidCredentials {
                        message: "bearer token is not a valid header value".into(),
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
                headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
            }
            Self::Cookies { header, .. } => {
                browser_headers(&mut headers);
                let mut value =
                    HeaderValue::from_str(header).map_err(|_| Error::InvalidCredentials {
                        message: "cookie header contains invalid characters".into(),
                    })?;
                value.set_sensitive(true);
                headers.insert(COOKIE, value);
            }
            Self::Account(_) => browser_headers(&mut headers),
        }
        Ok(headers)
    }
}

fn browser_headers(headers: &mut HeaderMap) {
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
}

/// Mutable session state tracked across requests.
///
/// Mutated only by the login orchestrator (csrf token, `logged_in = true`)
/// and the fetch retry wrapper (`logged_in = false` on expiry).
#[derive(Debug)]
pub(crate) struct Session {
    /// Mode-specific preset headers, cloned into every request.
    pub headers: HeaderMap,
    /// Anti-forgery token scraped during the sign-in flow; attached as a
    /// header to every request once known.
    pub csrf: Option<String>,
    /// Whether the session is believed valid. Bearer tokens start `true`.
    pub logged_in: bool,
}

impl Session {
    pub fn new(credentials: &Credentials) -> Result<Self, Error> {
        Ok(Self {
            headers: credentials.base_headers()?,
            csrf: None,
            logged_in: matches!(credentials, Credentials::Token(_)),
        })
    }
}
