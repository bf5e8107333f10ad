use tracing::debug;

use crate::client::{DecodedResponse, LottoClient};
use crate::config::{URL_LANDING, URL_LOGIN, URL_MAIN, URL_PWD_SKIP};
use crate::crypto;
use crate::error::{LottoError, Result};
use crate::scrape;

/// Marker the post-login redirect carries when the portal accepted the
/// credentials. Any other redirect target is a failure.
const LOGIN_SUCCESS_MARKER: &str = "common.do?method=main";

const MAINTENANCE_MARKER: &str = "index_check";

enum SubmitStep {
    LoggedIn,
    PasswordChange(Vec<(String, String)>),
    Denied(String),
}

/// Drives the whole authentication sequence: cookie warm-up, fresh RSA key
/// fetch, credential submit, and the optional skip of a forced password
/// change. Runs once per purchase cycle.
pub async fn login(client: &LottoClient, user_id: &str, user_pw: &str) -> Result<()> {
    warm_up(client).await?;

    let key = crypto::fetch_key_material(client).await?;
    let enc_user_id = crypto::encrypt(&key, user_id)?;
    let enc_password = crypto::encrypt(&key, user_pw)?;

    // The server still wants the plaintext id next to the encrypted one.
    let form = [
        ("returnUrl", URL_MAIN.to_string()),
        ("userId", user_id.to_string()),
        ("encUserId", enc_user_id),
        ("encPassword", enc_password),
        ("checkSave", "on".to_string()),
        ("newsEventYn", String::new()),
    ];
    let response = client.post_form(URL_LOGIN, &form).await?;

    match evaluate_submit(&response) {
        SubmitStep::LoggedIn => Ok(()),
        SubmitStep::PasswordChange(fields) => {
            debug!("skipping the forced password change ({} fields)", fields.len());
            // The skip endpoint's own reply is not load-bearing.
            if let Err(e) = client.post_form(URL_PWD_SKIP, &fields).await {
                debug!("password change skip request failed: {e}");
            }
            Ok(())
        }
        SubmitStep::Denied(reason) => Err(LottoError::Auth(reason)),
    }
}

/// GET the landing page purely for its session cookies. A redirect to the
/// system-check page means the whole site is down for maintenance.
async fn warm_up(client: &LottoClient) -> Result<()> {
    let response = client.get(URL_LANDING).await?;
    if response.status.is_redirection()
        && response
            .location
            .as_deref()
            .is_some_and(|location| location.contains(MAINTENANCE_MARKER))
    {
        return Err(LottoError::Maintenance);
    }
    Ok(())
}

fn evaluate_submit(response: &DecodedResponse) -> SubmitStep {
    if response.status.is_redirection() {
        return match response.location.as_deref() {
            Some(location) if location.contains(LOGIN_SUCCESS_MARKER) => SubmitStep::LoggedIn,
            _ => SubmitStep::Denied("unexpected redirect".to_string()),
        };
    }

    if response.status.is_success() {
        if let Some(fields) = scrape::password_change_form_fields(&response.text) {
            return SubmitStep::PasswordChange(fields);
        }
        if !scrape::has_login_prompt(&response.text) {
            return SubmitStep::LoggedIn;
        }
        return SubmitStep::Denied("login failed".to_string());
    }

    SubmitStep::Denied(format!("login request failed with status {}", response.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn response(status: StatusCode, location: Option<&str>, text: &str) -> DecodedResponse {
        DecodedResponse {
            status,
            location: location.map(str::to_owned),
            text: text.to_string(),
            json: None,
        }
    }

    #[test]
    fn redirect_to_main_is_success() {
        let step = evaluate_submit(&response(
            StatusCode::FOUND,
            Some("https://dhlottery.co.kr/common.do?method=main"),
            "",
        ));
        assert!(matches!(step, SubmitStep::LoggedIn));
    }

    #[test]
    fn redirect_elsewhere_is_denied() {
        let step = evaluate_submit(&response(
            StatusCode::FOUND,
            Some("https://dhlottery.co.kr/user.do?method=loginFail"),
            "",
        ));
        assert!(matches!(step, SubmitStep::Denied(reason) if reason == "unexpected redirect"));
    }

    #[test]
    fn redirect_without_location_is_denied() {
        let step = evaluate_submit(&response(StatusCode::FOUND, None, ""));
        assert!(matches!(step, SubmitStep::Denied(_)));
    }

    #[test]
    fn password_change_page_yields_the_hidden_fields() {
        let html = r#"<form name="frmPwdChange">
            <input type="hidden" name="token" value="t1">
        </form>"#;
        let step = evaluate_submit(&response(StatusCode::OK, None, html));
        match step {
            SubmitStep::PasswordChange(fields) => {
                assert_eq!(fields, vec![("token".to_string(), "t1".to_string())]);
            }
            _ => panic!("expected the password change branch"),
        }
    }

    #[test]
    fn page_without_login_button_is_success() {
        let step = evaluate_submit(&response(StatusCode::OK, None, "<p>마이페이지</p>"));
        assert!(matches!(step, SubmitStep::LoggedIn));
    }

    #[test]
    fn page_with_login_button_is_denied() {
        let html = r#"<a class="btn_common lrg blu">로그인</a>"#;
        let step = evaluate_submit(&response(StatusCode::OK, None, html));
        assert!(matches!(step, SubmitStep::Denied(reason) if reason == "login failed"));
    }

    #[test]
    fn server_error_status_is_denied() {
        let step = evaluate_submit(&response(StatusCode::INTERNAL_SERVER_ERROR, None, ""));
        assert!(matches!(step, SubmitStep::Denied(_)));
    }
}
