//! Authentication endpoints

use common::{
    models::{LoginCredentials, TokenResponse, UserResponse},
    session::InvalidationReason,
};
use tracing::info;

use crate::{
    client::{Access, ApiClient},
    error::{ApiError, ApiResult},
    validation::{validate_email, validate_password},
};

impl ApiClient {
    /// Exchange credentials for a token and store it in the session
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let credentials = LoginCredentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let request = self
            .http()
            .post(self.endpoint(&["auth", "login"]))
            .json(&credentials);
        let response = self
            .execute(request, Access::Anonymous, "Login failed")
            .await?;

        let token: TokenResponse = Self::decode(response).await?;
        if token.access_token.is_empty() {
            return Err(ApiError::Decode(
                "login response carried no access_token".to_string(),
            ));
        }

        self.session().write(token.access_token.clone());
        info!("Signed in as {}", credentials.email);
        Ok(token)
    }

    /// Create an account; does not sign in
    pub async fn register(&self, email: &str, password: &str) -> ApiResult<UserResponse> {
        let email = email.trim();
        validate_email(email).map_err(ApiError::Validation)?;
        validate_password(password).map_err(ApiError::Validation)?;

        let credentials = LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        let request = self
            .http()
            .post(self.endpoint(&["auth", "register"]))
            .json(&credentials);
        let response = self
            .execute(request, Access::Anonymous, "Registration failed")
            .await?;

        let user: UserResponse = Self::decode(response).await?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// The user owning the current token
    pub async fn current_user(&self) -> ApiResult<UserResponse> {
        if !self.session().is_authenticated() {
            return Err(ApiError::Unauthorized);
        }

        let request = self.http().get(self.endpoint(&["auth", "me"]));
        let response = self
            .execute(request, Access::Session, "Failed to fetch user")
            .await?;
        Self::decode(response).await
    }

    /// Forget the current token
    pub fn logout(&self) {
        if self.session().clear(InvalidationReason::Logout) {
            info!("Signed out");
        }
    }
}
