use crate::{
    api::UserIdentity,
    session::Session,
    utils::storage::StorageError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Login,
    Home,
    AdminHome,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::Login => "/auth",
            Destination::Home => "/(tabs)",
            Destination::AdminHome => "/admin-home",
        }
    }
}

pub const ROUTE_PATHS: &[&str] = &["/auth", "/(tabs)", "/admin-home"];

/// Admin destination iff the identity carries the admin role.
pub fn route_for(user: Option<&UserIdentity>) -> Destination {
    match user {
        Some(user) if user.is_admin() => Destination::AdminHome,
        Some(_) => Destination::Home,
        None => Destination::Login,
    }
}

/// Post-launch destination from whatever the session has cached.
pub async fn resolve_launch(session: &Session) -> Destination {
    match session.cached_user().await {
        Ok(user) => route_for(user.as_ref()),
        Err(StorageError::Corrupt { .. }) => {
            tracing::warn!("Cached user is unreadable; falling back to the standard destination");
            match session.token().await {
                Ok(Some(_)) => Destination::Home,
                _ => Destination::Login,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read cached user");
            Destination::Login
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use crate::utils::storage::keys;

    fn user(role: Role) -> UserIdentity {
        UserIdentity {
            id: "u1".into(),
            username: "alice".into(),
            email: "a@x".into(),
            role,
            profile_image: None,
        }
    }

    #[test]
    fn admin_role_routes_to_admin_home_only() {
        assert_eq!(route_for(Some(&user(Role::Admin))), Destination::AdminHome);
        assert_eq!(route_for(Some(&user(Role::User))), Destination::Home);
        assert_eq!(route_for(None), Destination::Login);
    }

    #[test]
    fn every_destination_has_a_known_path() {
        for destination in [Destination::Login, Destination::Home, Destination::AdminHome] {
            assert!(ROUTE_PATHS.contains(&destination.path()));
        }
    }

    #[tokio::test]
    async fn launch_reads_cached_role() {
        let session = Session::in_memory();
        assert_eq!(resolve_launch(&session).await, Destination::Login);

        session.persist_login("t", &user(Role::Admin)).await.unwrap();
        assert_eq!(resolve_launch(&session).await, Destination::AdminHome);
    }

    #[tokio::test]
    async fn unreadable_user_falls_back_to_standard_destination() {
        let session = Session::in_memory();
        session.store().set_item(keys::USER, "not json").await.unwrap();
        assert_eq!(resolve_launch(&session).await, Destination::Login);

        session.store().set_item(keys::TOKEN, "t").await.unwrap();
        assert_eq!(resolve_launch(&session).await, Destination::Home);
    }
}
