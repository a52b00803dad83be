// Hosted sign-in flow
//
// The credential login is a five-step, forward-only sequence against the
// identity provider: fetch the sign-in page, scrape a settings blob for
// csrf/transaction tokens, post the credentials, fetch a confirmation
// page, and submit the final state/code form. Every step couples one HTTP
// call to one piece of loosely-structured parsing, so the brittle
// extraction lives in two small pure functions that fail closed.

use reqwest::{Method, StatusCode};
use scraper::{Html, Selector};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;

use crate::auth::Account;
use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{SelfAssertedResult, SignInConfig};

/// Assignment the settings blob hides behind in the page's script block.
const SETTINGS_PREFIX: &str = "var SETTINGS = ";

/// Identity-provider policy name bound into every flow request.
const SIGNIN_POLICY: &str = "B2C_1A_SignUpOrSigninOnline";

/// Hidden-field payload of the final confirmation form.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FinalForm {
    pub action: String,
    pub state: String,
    pub code: String,
}

/// Scan the page for the `var SETTINGS = {...};` assignment and parse its
/// JSON payload. Returns `None` when the assignment is absent or its
/// payload is not valid JSON -- callers treat both as a fatal parse error.
pub(crate) fn extract_settings_json(page: &str) -> Option<Value> {
    page.lines().map(str::trim).find_map(|line| {
        let json = line.strip_prefix(SETTINGS_PREFIX)?.strip_suffix(';')?;
        serde_json::from_str(json).ok()
    })
}

/// Pull the final confirmation form out of a page: the form `action` URL
/// plus the `state` and `code` hidden-input values. `None` if any of the
/// three is missing.
pub(crate) fn extract_final_form(page: &str) -> Option<FinalForm> {
    let document = Html::parse_document(page);
    let form_selector = Selector::parse("form").ok()?;
    let state_selector = Selector::parse(r#"input[name="state"]"#).ok()?;
    let code_selector = Selector::parse(r#"input[name="code"]"#).ok()?;

    let form = document.select(&form_selector).next()?;
    let action = form.value().attr("action")?.to_owned();
    let state = document
        .select(&state_selector)
        .next()?
        .value()
        .attr("value")?
        .to_owned();
    let code = document
        .select(&code_selector)
        .next()?
        .value()
        .attr("value")?
        .to_owned();

    Some(FinalForm {
        action,
        state,
        code,
    })
}

impl ApiClient {
    /// Run the full credential sign-in sequence.
    ///
    /// Forward-only: a failure at any step aborts the login. On success
    /// the identity provider's cookies sit in the HTTP client's jar and
    /// the scraped csrf token is in the session for all later requests.
    pub(crate) async fn sign_in(&mut self, account: &Account) -> Result<(), Error> {
        // Step 1: the sign-in page, following the provider redirects.
        let url = format!("{}/Auth/SignIn?email={}", self.api_base, account.username);
        debug!("starting sign-in flow for {}", account.username);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(Error::Transport)?;
        let page = response.text().await.map_err(Error::Transport)?;

        // Step 2: a live server-side session skips straight to the final
        // form on the first page.
        if self.submit_final_form(&page).await? {
            debug!("sign-in page carried the final form, short-circuiting");
            return Ok(());
        }

        // Step 3: scrape the settings blob for csrf/transId.
        let settings = extract_settings_json(&page).ok_or_else(|| {
            debug!("sign-in page without settings blob:\n{page}");
            Error::ConfigParse {
                message: "no SETTINGS assignment found in sign-in page".into(),
            }
        })?;
        let config: SignInConfig =
            serde_json::from_value(settings).map_err(|err| Error::ConfigParse {
                message: format!("malformed SETTINGS blob: {err}"),
            })?;
        let (Some(csrf), Some(trans_id)) = (config.csrf, config.trans_id) else {
            return Err(Error::ConfigParse {
                message: "SETTINGS blob missing csrf and/or transId".into(),
            });
        };
        self.session.csrf = Some(csrf.clone());

        // Step 4: post the credentials to the Self-Asserted endpoint. The
        // csrf token rides as a header (via `request`) and the transaction
        // id binds the call to this flow through the query string.
        let tx = format!("StateProperties={trans_id}");
        let url = format!("{}/SelfAsserted", self.login_base);
        let response = self
            .request(Method::POST, &url)
            .query(&[("tx", tx.as_str()), ("p", SIGNIN_POLICY)])
            .form(&[
                ("request_type", "RESPONSE"),
                ("signInName", account.username.as_str()),
                ("password", account.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus {
                step: "SelfAsserted",
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(Error::Transport)?;
        let verdict: SelfAssertedResult =
            serde_json::from_str(&body).map_err(|err| Error::Deserialization {
                message: format!("SelfAsserted response: {err}"),
                body: body.clone(),
            })?;
        if verdict.status != "200" {
            return Err(Error::InvalidCredentials {
                message: format!("identity provider rejected the account (status {})", verdict.status),
            });
        }

        // Step 5: fetch the confirmation page and submit its final form.
        let url = format!("{}/api/CombinedSigninAndSignup/confirmed", self.login_base);
        let response = self
            .request(Method::GET, &url)
            .query(&[
                ("csrf_token", csrf.as_str()),
                ("tx", tx.as_str()),
                ("p", SIGNIN_POLICY),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus {
                step: "CombinedSigninAndSignup",
                status: status.as_u16(),
            });
        }
        let page = response.text().await.map_err(Error::Transport)?;
        if !self.submit_final_form(&page).await? {
            debug!("confirmation page without final form:\n{page}");
            return Err(Error::ConfigParse {
                message: "confirmation page is missing the final submit form".into(),
            });
        }
        Ok(())
    }

    /// Submit the state/code confirmation form if the page contains one.
    ///
    /// `Ok(false)` means the page had no recognizable form, so the caller
    /// decides whether that is the early-exit probe (fine) or the
    /// confirmation step (fatal).
    async fn submit_final_form(&self, page: &str) -> Result<bool, Error> {
        let Some(form) = extract_final_form(page) else {
            return Ok(false);
        };

        debug!("submitting final sign-in form to {}", form.action);
        let response = self
            .request(Method::POST, &form.action)
            .form(&[
                ("state", form.state.as_str()),
                ("code", form.code.as_str()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus {
                step: "final sign-in form",
                status: status.as_u16(),
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SIGNIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
<div id="api"></div>
<script>
var locale = "en";
var SETTINGS = {"csrf":"csrf-token-1","transId":"tx-9","hosts":{"tenant":"gc"}};
var trailing = true;
</script>
</body>
</html>"#;

    #[test]
    fn settings_blob_is_extracted_from_script_line() {
        let settings = extract_settings_json(SIGNIN_PAGE).unwrap();
        assert_eq!(settings["csrf"], "csrf-token-1");
        assert_eq!(settings["hosts"]["tenant"], "gc");
    }

    #[test]
    fn settings_requires_prefix_and_terminator() {
        assert!(extract_settings_json("var SETTINGS = {\"csrf\":\"x\"}").is_none());
        assert!(extract_settings_json("SETTINGS = {\"csrf\":\"x\"};").is_none());
        assert!(extract_settings_json("<html>no script here</html>").is_none());
    }

    #[test]
    fn settings_with_invalid_json_is_treated_as_absent() {
        assert!(extract_settings_json("var SETTINGS = {not json};").is_none());
    }

    #[test]
    fn final_form_is_extracted_with_action_and_fields() {
        let page = r#"<html><body>
            <form method="post" action="https://app.example.com/signin-oidc">
                <input type="hidden" name="state" value="st-1"/>
                <input type="hidden" name="code" value="co-2"/>
            </form>
        </body></html>"#;

        let form = extract_final_form(page).unwrap();
        assert_eq!(
            form,
            FinalForm {
                action: "https://app.example.com/signin-oidc".into(),
                state: "st-1".into(),
                code: "co-2".into(),
            }
        );
    }

    #[test]
    fn final_form_requires_every_element() {
        let no_code = r#"<form action="/a"><input name="state" value="s"/></form>"#;
        assert!(extract_final_form(no_code).is_none());

        let no_form = r#"<input name="state" value="s"/><input name="code" value="c"/>"#;
        assert!(extract_final_form(no_form).is_none());

        let no_action = r#"<form><input name="state" value="s"/><input name="code" value="c"/></form>"#;
        assert!(extract_final_form(no_action).is_none());
    }
}
