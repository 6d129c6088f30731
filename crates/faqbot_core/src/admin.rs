use crate::config::PipelineConfig;
use crate::error::{FaqbotError, Result};

/// Guards FAQ mutations behind a single shared bearer token.
#[derive(Debug, Clone)]
pub struct AdminGateway {
    username: String,
    password: String,
    token: String,
}

impl AdminGateway {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.admin_username.clone(),
            config.admin_password.clone(),
            config.admin_token.clone(),
        )
    }

    pub fn login(&self, username: &str, password: &str) -> Result<&str> {
        if username == self.username && password == self.password {
            Ok(&self.token)
        } else {
            Err(FaqbotError::Unauthorized)
        }
    }

    /// Accepts the raw token or an `Authorization: Bearer <token>` value.
    pub fn authorize(&self, credential: Option<&str>) -> Result<()> {
        let token = credential
            .map(str::trim)
            .map(|c| c.strip_prefix("Bearer ").unwrap_or(c).trim());
        match token {
            Some(token) if !self.token.is_empty() && token == self.token => Ok(()),
            _ => Err(FaqbotError::Unauthorized),
        }
    }
}
