use crate::{
    api::{ApiClient, LoginRequest, SignupRequest, UserIdentity},
    biometric::{self, BiometricAuthenticator, BiometricOutcome},
    device::{register_device, DeviceInfoSource},
    error::ClientError,
    router::{resolve_launch, route_for, Destination},
};

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<UserIdentity>,
    pub is_authenticated: bool,
    pub loading: bool,
}

/// Login, signup, biometric unlock, logout and the launch routing decision.
#[derive(Clone)]
pub struct AuthFlow {
    api: ApiClient,
    state: AuthState,
}

impl AuthFlow {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: AuthState::default(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Registers the device (failures are logged only), then routes on the
    /// cached identity.
    pub async fn launch(&mut self, source: &dyn DeviceInfoSource) -> Destination {
        if let Err(err) = register_device(&self.api, source).await {
            tracing::warn!(error = %err, "Device registration failed at launch");
        }
        let destination = resolve_launch(self.api.session()).await;
        let user = self.api.session().cached_user().await.ok().flatten();
        self.set_user(user);
        tracing::info!(path = destination.path(), "Launch routed");
        destination
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Destination, ClientError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.state.loading = true;
        let result = self.api.login(&request).await;
        self.state.loading = false;

        let session = result?;
        self.set_user(Some(session.user));
        Ok(route_for(self.state.user.as_ref()))
    }

    pub async fn signup(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Destination, ClientError> {
        let request = SignupRequest {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.state.loading = true;
        let result = self.api.signup(&request).await;
        self.state.loading = false;

        let session = result?;
        self.set_user(Some(session.user));
        Ok(route_for(self.state.user.as_ref()))
    }

    /// Unlock gate shown on launch when biometrics are on. Without a usable
    /// sensor the gate is skipped and the cached identity decides.
    pub async fn biometric_unlock(
        &mut self,
        authenticator: &dyn BiometricAuthenticator,
    ) -> Result<Destination, ClientError> {
        match biometric::prompt(authenticator).await {
            BiometricOutcome::Unavailable => {
                tracing::info!("Biometric not available");
                Ok(resolve_launch(self.api.session()).await)
            }
            BiometricOutcome::Failed => {
                Err(ClientError::Biometric("Authentication failed".into()))
            }
            BiometricOutcome::Authenticated => {
                let Some(user) = self.api.session().cached_user().await? else {
                    return Ok(Destination::Login);
                };
                let session = self.api.biometric_login(&user.id).await?;
                self.set_user(Some(session.user));
                Ok(route_for(self.state.user.as_ref()))
            }
        }
    }

    pub async fn biometric_enabled(&self) -> Result<bool, ClientError> {
        Ok(self.api.get_biometric_status().await?.enabled)
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> Result<bool, ClientError> {
        let status = self.api.set_biometric_status(enabled).await?;
        tracing::info!(enabled = status.enabled, "Biometric login updated");
        Ok(status.enabled)
    }

    /// Always lands on the login screen, even if clearing storage fails.
    pub async fn logout(&mut self) -> Destination {
        if let Err(err) = self.api.session().invalidate().await {
            tracing::error!(error = %err, "Failed to clear session during logout");
        }
        self.set_user(None);
        Destination::Login
    }

    fn set_user(&mut self, user: Option<UserIdentity>) {
        self.state.is_authenticated = user.is_some();
        self.state.user = user;
        self.state.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{alice_json, client_for, seeded_client};
    use crate::api::Role;
    use crate::biometric::test_support::ScriptedBiometrics;
    use crate::device::HostDevice;
    use crate::session::Session;
    use crate::utils::storage::{keys, KeyValueStore, MemoryStorage, StorageError};
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    /// Reads and writes work; removals always fail.
    #[derive(Default)]
    struct StuckStore(MemoryStorage);

    #[async_trait]
    impl KeyValueStore for StuckStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.set_item(key, value).await
        }

        async fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }

        async fn multi_remove(&self, _keys: &[&str]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }
    }

    #[tokio::test]
    async fn login_persists_session_and_routes_by_role() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .json_body(json!({ "email": "root@example.com", "password": "secret" }));
                then.status(200).json_body(json!({
                    "token": "admin-token",
                    "user": { "_id": "a1", "username": "root", "email": "root@example.com", "role": "admin" }
                }));
            })
            .await;
        let mut flow = AuthFlow::new(client_for(&server));

        let destination = flow.login(" root@example.com ", "secret").await.unwrap();

        assert_eq!(destination, Destination::AdminHome);
        assert!(flow.state().is_authenticated);
        let session = flow.api().session();
        assert_eq!(session.token().await.unwrap().as_deref(), Some("admin-token"));
        assert_eq!(session.cached_user().await.unwrap().unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn login_without_token_leaves_storage_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(200).json_body(json!({ "user": alice_json() }));
            })
            .await;
        let mut flow = AuthFlow::new(client_for(&server));

        let err = flow.login("alice@example.com", "pw").await.unwrap_err();

        assert_eq!(err.to_string(), "Authentication failed");
        assert!(!flow.state().is_authenticated);
        assert!(!flow.state().loading);
        let store = flow.api().session().store();
        assert!(store.get_item(keys::TOKEN).await.unwrap().is_none());
        assert!(store.get_item(keys::USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_signup_surfaces_server_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/signup");
                then.status(400)
                    .json_body(json!({ "message": "User already exists" }));
            })
            .await;
        let mut flow = AuthFlow::new(client_for(&server));

        let err = flow
            .signup("alice", "alice@example.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already exists");
    }

    #[tokio::test]
    async fn launch_routes_even_when_device_upload_fails() {
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/saveDeviceInfo")
                    .header("authorization", "Bearer test-token");
                then.status(500).json_body(json!({ "message": "db down" }));
            })
            .await;
        let mut flow = AuthFlow::new(seeded_client(&server).await);

        let destination = flow.launch(&HostDevice).await;

        upload.assert_async().await;
        assert_eq!(destination, Destination::Home);
        assert!(flow.state().is_authenticated);
        let cached = flow
            .api()
            .session()
            .store()
            .get_item(keys::DEVICE_INFO)
            .await
            .unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn launch_without_session_goes_to_login() {
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/saveDeviceInfo");
                then.status(200).json_body(json!({ "success": true }));
            })
            .await;
        let mut flow = AuthFlow::new(client_for(&server));

        assert_eq!(flow.launch(&HostDevice).await, Destination::Login);
        // No token, so the upload is never attempted.
        upload.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn biometric_unlock_paths() {
        let server = MockServer::start_async().await;
        let relogin = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/biometric-login")
                    .header("authorization", "Bearer test-token")
                    .json_body(json!({ "userId": "u1" }));
                then.status(200)
                    .json_body(json!({ "token": "fresh-token", "user": alice_json() }));
            })
            .await;
        let mut flow = AuthFlow::new(seeded_client(&server).await);

        let unavailable = ScriptedBiometrics {
            hardware: false,
            enrolled: false,
            accept: false,
        };
        assert_eq!(
            flow.biometric_unlock(&unavailable).await.unwrap(),
            Destination::Home
        );

        let rejecting = ScriptedBiometrics {
            hardware: true,
            enrolled: true,
            accept: false,
        };
        let err = flow.biometric_unlock(&rejecting).await.unwrap_err();
        assert_eq!(err.code(), "BIOMETRIC_FAILED");
        relogin.assert_hits_async(0).await;

        let accepting = ScriptedBiometrics {
            hardware: true,
            enrolled: true,
            accept: true,
        };
        assert_eq!(
            flow.biometric_unlock(&accepting).await.unwrap(),
            Destination::Home
        );
        relogin.assert_async().await;
        assert_eq!(
            flow.api().session().token().await.unwrap().as_deref(),
            Some("fresh-token")
        );
    }

    #[tokio::test]
    async fn biometric_toggle_round_trips_server_flag() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/auth/biometric-status");
                then.status(200).json_body(json!({ "enabled": false }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/auth/biometric-status")
                    .json_body(json!({ "enabled": true }));
                then.status(200).json_body(json!({ "enabled": true }));
            })
            .await;
        let flow = AuthFlow::new(seeded_client(&server).await);

        assert!(!flow.biometric_enabled().await.unwrap());
        assert!(flow.set_biometric_enabled(true).await.unwrap());
    }

    #[tokio::test]
    async fn logout_clears_identity_but_keeps_device_info() {
        let server = MockServer::start_async().await;
        let mut flow = AuthFlow::new(seeded_client(&server).await);
        let store = flow.api().session().store().clone();
        store.set_item(keys::PROFILE_IMAGE, "data:image/jpeg;base64,AA==").await.unwrap();
        store.set_item(keys::DEVICE_INFO, "{}").await.unwrap();

        assert_eq!(flow.logout().await, Destination::Login);

        assert!(store.get_item(keys::TOKEN).await.unwrap().is_none());
        assert!(store.get_item(keys::USER).await.unwrap().is_none());
        assert!(store.get_item(keys::PROFILE_IMAGE).await.unwrap().is_none());
        assert!(store.get_item(keys::DEVICE_INFO).await.unwrap().is_some());
        assert!(!flow.state().is_authenticated);
    }

    #[tokio::test]
    async fn logout_routes_to_login_even_when_storage_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(200)
                    .json_body(json!({ "token": "t-1", "user": alice_json() }));
            })
            .await;
        let session = Session::new(Arc::new(StuckStore::default()));
        let api = ApiClient::new_with_base_url(server.url("/api"), session);
        let mut flow = AuthFlow::new(api);
        flow.login("alice@example.com", "pw").await.unwrap();
        assert!(flow.state().is_authenticated);

        assert_eq!(flow.logout().await, Destination::Login);

        assert!(!flow.state().is_authenticated);
        assert!(flow.state().user.is_none());
        // Removal failed, so the token is still on disk; routing ignores it.
        assert!(flow.api().session().token().await.unwrap().is_some());
    }
}
