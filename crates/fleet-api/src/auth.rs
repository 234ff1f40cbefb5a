//! Session operations on top of the request pipeline

use fleet_auth::{
    CHANGE_PASSWORD_PATH, ChangePasswordRequest, LOGIN_PATH, LOGOUT_PATH, LoginRequest,
    PROFILE_PATH, TokenPair, VALIDATE_PATH,
};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::client::{ApiClient, RequestOptions};
use crate::envelope::ResponseEnvelope;
use crate::error::ApiError;
use crate::profile::{Acknowledgement, ProfileDto, TokenValidation, UserProfile};

const NO_BODY: Option<&()> = None;

impl ApiClient {
    /// Exchange credentials for a token pair and persist it.
    ///
    /// On failure the stored tokens are left as they were.
    pub async fn login(&self, email: &str, password: &str) -> ResponseEnvelope<TokenPair> {
        let body = LoginRequest { email, password };
        let envelope: ResponseEnvelope<TokenPair> = self
            .request(Method::POST, LOGIN_PATH, Some(&body), RequestOptions::unauthenticated())
            .await;

        let Some(pair) = envelope.data() else {
            warn!(
                status = ?envelope.status(),
                code = envelope.outcome(),
                "login failed"
            );
            return envelope;
        };

        if let Err(e) = self.store().save(pair.clone()).await {
            let mut err = ApiError::unknown(format!("login succeeded but tokens were not saved: {e}"));
            err.status = envelope.status();
            return ResponseEnvelope::failure(err);
        }
        info!(backend = self.store().backend(), "logged in");
        envelope
    }

    /// End the session.
    ///
    /// The logout endpoint is called best-effort; the stored tokens are
    /// cleared whatever it answers. With nothing stored the remote call is
    /// skipped.
    pub async fn logout(&self) -> ResponseEnvelope<Acknowledgement> {
        let remote = match self.store().load().await {
            Ok(Some(_)) => {
                self.request(
                    Method::POST,
                    LOGOUT_PATH,
                    NO_BODY,
                    RequestOptions::default().without_refresh(),
                )
                .await
            }
            Ok(None) => {
                debug!("no stored session, skipping remote logout");
                ResponseEnvelope::local(Acknowledgement::default())
            }
            Err(e) => ResponseEnvelope::failure(ApiError::unknown(format!(
                "reading token store: {e}"
            ))),
        };

        if !remote.is_success() {
            warn!(
                status = ?remote.status(),
                code = remote.outcome(),
                "remote logout failed, clearing local tokens anyway"
            );
        }

        if let Err(e) = self.store().clear().await {
            return ResponseEnvelope::failure(ApiError::unknown(format!(
                "clearing stored tokens: {e}"
            )));
        }
        info!("logged out");
        remote
    }

    pub async fn get_profile(&self) -> ResponseEnvelope<UserProfile> {
        self.request::<ProfileDto, ()>(Method::GET, PROFILE_PATH, None, RequestOptions::default())
            .await
            .map(UserProfile::from)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> ResponseEnvelope<Acknowledgement> {
        let body = ChangePasswordRequest {
            current_password,
            new_password,
        };
        self.request(
            Method::POST,
            CHANGE_PASSWORD_PATH,
            Some(&body),
            RequestOptions::default(),
        )
        .await
    }

    /// Ask the backend whether the stored access token is still accepted.
    pub async fn validate_token(&self) -> ResponseEnvelope<TokenValidation> {
        self.request(Method::POST, VALIDATE_PATH, NO_BODY, RequestOptions::default())
            .await
    }
}
