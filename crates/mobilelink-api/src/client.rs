// MobileLink HTTP client
//
// Wraps `reqwest::Client` with session-state tracking, response
// classification, and the versioned newer-then-older endpoint fallback.
// The hosted sign-in flow lives in `signin.rs` as inherent methods to keep
// this module focused on transport mechanics and orchestration.

use std::collections::HashMap;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::{Credentials, Session};
use crate::error::Error;
use crate::models::{Apparatus, ApparatusDetail, GENERATOR_APPARATUS_TYPE, Item};

/// Production API root, including the `/api` prefix.
pub const API_BASE: &str = "https://app.mobilelinkgen.com/api";

/// Hosted identity-provider policy root used by the sign-in flow.
pub const LOGIN_BASE: &str = "https://generacconnectivity.b2clogin.com/generacconnectivity.onmicrosoft.com/B2C_1A_MobileLink_SignIn";

/// Anti-forgery header attached once a token is known.
pub(crate) const CSRF_HEADER: &str = "X-Csrf-Token";

const APPARATUS_LIST_V5: &str = "/v5/Apparatus/list";
const APPARATUS_LIST_V2: &str = "/v2/Apparatus/list";

/// Async client for the MobileLink cloud API.
///
/// Holds the credentials chosen at construction and the mutable session
/// state (preset headers, csrf token, logged-in flag). Both public
/// operations take `&mut self`: the API assumes at most one fetch in
/// flight per client, and exclusive access encodes that.
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) api_base: String,
    pub(crate) login_base: String,
    credentials: Credentials,
    pub(crate) session: Session,
}

impl ApiClient {
    /// Create a client against the production endpoints.
    ///
    /// The underlying HTTP client gets a cookie jar (the sign-in flow
    /// depends on the identity provider's session cookies persisting
    /// between steps) and no request timeout of its own.
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(Error::Transport)?;
        Self::from_reqwest(credentials, http, API_BASE, LOGIN_BASE)
    }

    /// Create a client with a pre-built `reqwest::Client` and explicit
    /// base URLs. This is the constructor tests point at a mock server;
    /// the supplied client's timeout/TLS/cookie policy is used as-is.
    pub fn from_reqwest(
        credentials: Credentials,
        http: reqwest::Client,
        api_base: &str,
        login_base: &str,
    ) -> Result<Self, Error> {
        Url::parse(api_base)?;
        Url::parse(login_base)?;
        let session = Session::new(&credentials)?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            login_base: login_base.trim_end_matches('/').to_owned(),
            credentials,
            session,
        })
    }

    /// Start a request with the session's preset headers, plus the csrf
    /// header once the sign-in flow has produced a token.
    pub(crate) fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .headers(self.session.headers.clone());
        if let Some(csrf) = &self.session.csrf {
            builder = builder.header(CSRF_HEADER, csrf.as_str());
        }
        builder
    }

    // ── Endpoint fetcher ─────────────────────────────────────────────

    /// One authenticated GET against a data endpoint, with strict
    /// response classification:
    ///
    /// - 204 is "no data" (`Ok(None)`) -- not an error, not expiry
    /// - 200 is parsed JSON (`Ok(Some)`); a parse failure is a
    ///   deserialization error, which never triggers the expiry retry
    /// - every other status is the vendor's "no longer authenticated"
    ///   signal and classifies as [`Error::SessionExpired`]
    /// - network failures are [`Error::Transport`], also outside the
    ///   retry path
    pub(crate) async fn get_endpoint(&self, path: &str) -> Result<Option<Value>, Error> {
        let url = format!("{}{}", self.api_base, path);
        debug!("GET {url}");

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(Error::Transport)?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::OK => {
                let body = response.text().await.map_err(Error::Transport)?;
                let value: Value =
                    serde_json::from_str(&body).map_err(|err| Error::Deserialization {
                        message: err.to_string(),
                        body: body.clone(),
                    })?;
                debug!("{path} payload: {body}");
                Ok(Some(value))
            }
            status => Err(Error::SessionExpired {
                status: status.as_u16(),
            }),
        }
    }

    // ── Auth orchestrator ────────────────────────────────────────────

    /// Ensure the session is valid for data fetches.
    ///
    /// Behavior is a closed dispatch over the credential variant:
    ///
    /// - `Token`: nothing to do, bearer tokens are assumed pre-authenticated
    /// - `Cookies`: one device-list probe; if it yields data the cookies
    ///   are accepted, on no-data or expiry the configured fallback
    ///   account (if any) goes through the full sign-in flow
    /// - `Account`: always runs the sign-in flow fresh to re-establish
    ///   csrf and cookies
    pub async fn login(&mut self) -> Result<(), Error> {
        let account = match &self.credentials {
            Credentials::Token(_) => {
                debug!("bearer token auth, session assumed valid");
                self.session.logged_in = true;
                return Ok(());
            }
            Credentials::Account(account) => account.clone(),
            Credentials::Cookies { fallback, .. } => {
                let probe = self.get_endpoint(APPARATUS_LIST_V5).await;
                match probe {
                    Ok(Some(_)) => {
                        debug!("cookie session accepted by probe");
                        self.session.logged_in = true;
                        return Ok(());
                    }
                    Ok(None) => {
                        debug!("cookie probe returned no data, trying account fallback");
                    }
                    Err(err) if err.is_session_expired() => {
                        debug!("cookie session expired, trying account fallback");
                    }
                    Err(err) => return Err(err),
                }
                fallback.clone().ok_or_else(|| Error::InvalidCredentials {
                    message: "cookie session rejected and no username/password fallback configured"
                        .into(),
                })?
            }
        };

        self.sign_in(&account).await?;
        self.session.logged_in = true;
        Ok(())
    }

    // ── Data retriever ───────────────────────────────────────────────

    /// Fetch every generator and its detail record, keyed by apparatus id.
    ///
    /// Returns `Ok(None)` when both device-list generations legitimately
    /// report no data. A session-expiry signal from any inner request
    /// invalidates the session and retries the whole pass (login included)
    /// exactly once; a second expiry is surfaced as a hard failure.
    pub async fn fetch_device_data(&mut self) -> Result<Option<HashMap<String, Item>>, Error> {
        let mut retried = false;
        loop {
            if !self.session.logged_in {
                self.login().await?;
            }
            let attempt = self.generator_data().await;
            match attempt {
                Err(err) if err.is_session_expired() && !retried => {
                    debug!("session expired mid-fetch, retrying once after a fresh login");
                    self.session.logged_in = false;
                    retried = true;
                }
                result => return result,
            }
        }
    }

    /// Walk the device list and collect per-device details, with the
    /// versioned fallback on both levels.
    ///
    /// List: v5, then v2 on no-data; both empty means the whole fetch is
    /// "no data". Detail: v5, then v1 on no-data; a device whose fallback
    /// is exhausted is skipped, not fatal. Fallback is strictly
    /// newer-to-older and fires only on the explicit no-data outcome.
    async fn generator_data(&self) -> Result<Option<HashMap<String, Item>>, Error> {
        let list = match self.get_endpoint(APPARATUS_LIST_V5).await? {
            Some(value) => value,
            None => match self.get_endpoint(APPARATUS_LIST_V2).await? {
                Some(value) => value,
                None => {
                    debug!("both apparatus list generations returned no data");
                    return Ok(None);
                }
            },
        };

        let apparatuses: Vec<Apparatus> =
            serde_json::from_value(list.clone()).map_err(|err| Error::Deserialization {
                message: format!("apparatus list: {err}"),
                body: list.to_string(),
            })?;

        let mut data = HashMap::new();
        for apparatus in apparatuses {
            if apparatus.apparatus_type != GENERATOR_APPARATUS_TYPE {
                debug!(
                    kind = apparatus.apparatus_type,
                    name = apparatus.name.as_deref(),
                    "skipping non-generator apparatus"
                );
                continue;
            }

            let id = apparatus.apparatus_id;
            let Some(detail_value) = self.apparatus_detail(id).await? else {
                debug!(apparatus_id = id, "no detail from either generation, skipping");
                continue;
            };

            let detail: ApparatusDetail = serde_json::from_value(detail_value.clone())
                .map_err(|err| Error::Deserialization {
                    message: format!("apparatus {id} detail: {err}"),
                    body: detail_value.to_string(),
                })?;

            data.insert(
                id.to_string(),
                Item {
                    apparatus,
                    apparatus_detail: detail,
                },
            );
        }
        Ok(Some(data))
    }

    /// Detail record for one apparatus: v5 first, oldest generation on
    /// no-data, `None` when both come back empty.
    async fn apparatus_detail(&self, id: i64) -> Result<Option<Value>, Error> {
        match self.get_endpoint(&format!("/v5/Apparatus/{id}")).await? {
            Some(value) => Ok(Some(value)),
            None => self.get_endpoint(&format!("/v1/Apparatus/details/{id}")).await,
        }
    }

    /// Raw detail JSON for every listed apparatus (any type), keyed by
    /// apparatus id. Protocol-debugging aid behind the CLI `dump`
    /// command; skips devices without a detail record, like the
    /// normal retriever.
    pub async fn dump_properties(&mut self) -> Result<HashMap<String, Value>, Error> {
        if !self.session.logged_in {
            self.login().await?;
        }

        let list = match self.get_endpoint(APPARATUS_LIST_V5).await? {
            Some(value) => value,
            None => match self.get_endpoint(APPARATUS_LIST_V2).await? {
                Some(value) => value,
                None => return Ok(HashMap::new()),
            },
        };

        let apparatuses: Vec<Apparatus> =
            serde_json::from_value(list.clone()).map_err(|err| Error::Deserialization {
                message: format!("apparatus list: {err}"),
                body: list.to_string(),
            })?;

        let mut dump = HashMap::new();
        for apparatus in apparatuses {
            let id = apparatus.apparatus_id;
            if let Some(detail) = self.apparatus_detail(id).await? {
                dump.insert(id.to_string(), detail);
            }
        }
        Ok(dump)
    }
}
