use async_trait::async_trait;

/// Source of the caller's bearer credential and subscription tier.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;

    async fn is_premium(&self) -> bool;
}

/// Credentials fixed at startup (from configuration).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
    premium: bool,
}

impl StaticCredentials {
    pub fn new(token: Option<String>, premium: bool) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token, premium }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn is_premium(&self) -> bool {
        self.premium
    }
}

/// Anonymous caller: no token, not premium.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn bearer_token(&self) -> Option<String> {
        None
    }

    async fn is_premium(&self) -> bool {
        false
    }
}
