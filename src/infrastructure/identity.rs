//! Email/password sign-in against an Identity Toolkit compatible REST API.

use crate::error::{AppError, Result};
use crate::infrastructure::settings::IdentitySettings;
use crate::infrastructure::traits::IdentityProvider;
use async_trait::async_trait;
use di::{inject, injectable};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// An identity confirmed by the provider. `email` is the join key to the
/// user profile stored by QuickDesk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: String,
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
}

pub struct RestIdentityProvider {
    client: reqwest::Client,
    settings: IdentitySettings,
}

#[injectable(IdentityProvider)]
impl RestIdentityProvider {
    #[inject]
    pub fn create() -> RestIdentityProvider {
        RestIdentityProvider::new(IdentitySettings::from_env())
    }
}

impl RestIdentityProvider {
    pub fn new(settings: IdentitySettings) -> RestIdentityProvider {
        RestIdentityProvider {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn sign_in_url(&self) -> String {
        let base = self.settings.api_url.trim_end_matches('/');
        match &self.settings.api_key {
            Some(key) => format!("{base}/accounts:signInWithPassword?key={key}"),
            None => format!("{base}/accounts:signInWithPassword"),
        }
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthIdentity> {
        debug!("signing in {email} with the identity provider");

        let response = self
            .client
            .post(self.sign_in_url())
            .header("Accept", "application/json")
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("identity provider rejected sign-in for {email}: {status}");
            return Err(AppError::Identity(format!("sign-in rejected with {status}")));
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        Ok(AuthIdentity {
            uid: body.local_id,
            email: body.email,
        })
    }
}
