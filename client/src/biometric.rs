use async_trait::async_trait;

pub const UNLOCK_PROMPT: &str = "Authenticate to continue";

#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    async fn has_hardware(&self) -> bool;
    async fn is_enrolled(&self) -> bool;
    async fn authenticate(&self, prompt: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricOutcome {
    /// No sensor, or nothing enrolled.
    Unavailable,
    Failed,
    Authenticated,
}

pub async fn prompt(authenticator: &dyn BiometricAuthenticator) -> BiometricOutcome {
    if !authenticator.has_hardware().await || !authenticator.is_enrolled().await {
        return BiometricOutcome::Unavailable;
    }
    if authenticator.authenticate(UNLOCK_PROMPT).await {
        BiometricOutcome::Authenticated
    } else {
        BiometricOutcome::Failed
    }
}

/// Authenticator for hosts without a biometric sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricAuthenticator for NoBiometrics {
    async fn has_hardware(&self) -> bool {
        false
    }

    async fn is_enrolled(&self) -> bool {
        false
    }

    async fn authenticate(&self, _prompt: &str) -> bool {
        false
    }
}
