use serde::Deserialize;

use crate::api::KeycloakAdminApi;
use crate::error::ApiError;
use crate::models::{AuthToken, KeycloakUser, Notification, UserPatch};
use crate::utils::{paginate, Page};

/// Filter and paging parameters for the user table.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserQuery {
    pub email: Option<String>,
    pub page: usize,
    pub per_page: usize,
}

#[derive(Clone, Copy)]
enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    fn action(self) -> &'static str {
        match self {
            Mutation::Create => "create",
            Mutation::Update => "update",
            Mutation::Delete => "delete",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Mutation::Create => "User created successfully",
            Mutation::Update => "User updated successfully",
            Mutation::Delete => "User deleted successfully",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Mutation::Create => "Error creating user",
            Mutation::Update => "Error updating user",
            Mutation::Delete => "Error deleting user",
        }
    }
}

/// Display copy of a realm's users.
///
/// Keycloak stays the source of truth: a successful mutation is always
/// followed by a full re-list, and a failed one leaves the copy untouched.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: Vec<KeycloakUser>,
    notifications: Vec<Notification>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[KeycloakUser] {
        &self.users
    }

    pub fn view(&self, query: &UserQuery) -> Page<KeycloakUser> {
        let needle = query.email.as_deref().unwrap_or("");
        let filtered: Vec<KeycloakUser> = self
            .users
            .iter()
            .filter(|u| u.email_matches(needle))
            .cloned()
            .collect();
        paginate(&filtered, query.page, query.per_page)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub async fn refresh(&mut self, api: &dyn KeycloakAdminApi, token: &AuthToken) -> Result<(), ApiError> {
        match api.list_users(token).await {
            Ok(users) => {
                tracing::debug!(count = users.len(), "Refreshed Keycloak users");
                self.users = users;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list Keycloak users");
                self.notifications.push(Notification::error("Error fetching users"));
                Err(e)
            }
        }
    }

    pub async fn create(
        &mut self,
        api: &dyn KeycloakAdminApi,
        token: &AuthToken,
        user: KeycloakUser,
    ) -> Result<(), ApiError> {
        if user.username.trim().is_empty() {
            return Err(ApiError::validation("username", "must not be empty"));
        }
        let result = api.create_user(token, &user).await;
        self.finish(api, token, Mutation::Create, result).await
    }

    pub async fn update(
        &mut self,
        api: &dyn KeycloakAdminApi,
        token: &AuthToken,
        user_id: &str,
        user: KeycloakUser,
    ) -> Result<(), ApiError> {
        let user_id = require_id(user_id)?;
        let result = api.update_user(token, user_id, &user).await;
        self.finish(api, token, Mutation::Update, result).await
    }

    /// Merge `patch` onto the current Keycloak copy of the user and send the
    /// whole representation back, so omitted fields are never reset.
    pub async fn patch(
        &mut self,
        api: &dyn KeycloakAdminApi,
        token: &AuthToken,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<(), ApiError> {
        let user_id = require_id(user_id)?;
        self.refresh(api, token).await?;
        let current = self.users.iter().find(|u| u.id.as_deref() == Some(user_id)).cloned();
        let Some(mut user) = current else {
            let missing = Err(ApiError::NotFound(format!("user {}", user_id)));
            return self.finish(api, token, Mutation::Update, missing).await;
        };
        user.apply(patch);
        self.update(api, token, user_id, user).await
    }

    pub async fn delete(
        &mut self,
        api: &dyn KeycloakAdminApi,
        token: &AuthToken,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let user_id = require_id(user_id)?;
        let result = api.delete_user(token, user_id).await;
        self.finish(api, token, Mutation::Delete, result).await
    }

    async fn finish(
        &mut self,
        api: &dyn KeycloakAdminApi,
        token: &AuthToken,
        mutation: Mutation,
        result: Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        if let Err(e) = result {
            tracing::warn!(action = mutation.action(), error = %e, "Keycloak user mutation failed");
            self.notifications.push(Notification::error(mutation.failure_message()));
            return Err(ApiError::mutation(mutation.action(), e));
        }
        self.notifications.push(Notification::success(mutation.success_message()));
        // The mutation already went through; a failed re-list only leaves the
        // copy stale and is reported on its own.
        let _ = self.refresh(api, token).await;
        Ok(())
    }
}

fn require_id(user_id: &str) -> Result<&str, ApiError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("id", "must not be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockKeycloakAdminApi;
    use crate::models::NotificationLevel;

    fn user(id: &str, email: &str) -> KeycloakUser {
        KeycloakUser {
            id: Some(id.to_string()),
            username: id.to_string(),
            email: Some(email.to_string()),
            enabled: true,
            ..Default::default()
        }
    }

    fn token() -> AuthToken {
        AuthToken::parse("admin-token").unwrap()
    }

    #[tokio::test]
    async fn deleting_missing_user_keeps_list() {
        let mut api = MockKeycloakAdminApi::new();
        api.expect_list_users()
            .times(1)
            .returning(|_| Ok(vec![user("a", "a@example.org"), user("b", "b@example.org")]));
        api.expect_delete_user()
            .times(1)
            .returning(|_, _| Err(ApiError::NotFound("User not found".into())));

        let mut directory = UserDirectory::new();
        directory.refresh(&api, &token()).await.unwrap();
        let before = directory.users().to_vec();

        let err = directory.delete(&api, &token(), "ghost").await.unwrap_err();
        assert!(matches!(err, ApiError::MutationFailed { action: "delete", .. }));
        assert_eq!(directory.users(), before.as_slice());

        let notes = directory.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert_eq!(notes[0].message, "Error deleting user");
    }

    #[tokio::test]
    async fn successful_create_relists() {
        let mut api = MockKeycloakAdminApi::new();
        api.expect_list_users()
            .times(1)
            .returning(|_| Ok(vec![user("new", "new@example.org")]));
        api.expect_create_user().times(1).returning(|_, _| Ok(()));

        let mut directory = UserDirectory::new();
        let mut new_user = user("new", "new@example.org");
        new_user.id = None;
        directory.create(&api, &token(), new_user).await.unwrap();

        assert_eq!(directory.users().len(), 1);
        assert_eq!(directory.take_notifications(), vec![Notification::success("User created successfully")]);
    }

    #[tokio::test]
    async fn update_with_blank_id_never_calls_keycloak() {
        let api = MockKeycloakAdminApi::new();
        let mut directory = UserDirectory::new();
        let err = directory.update(&api, &token(), "  ", user("x", "x@example.org")).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn failed_relist_after_update_still_succeeds() {
        let mut api = MockKeycloakAdminApi::new();
        api.expect_update_user().times(1).returning(|_, _, _| Ok(()));
        api.expect_list_users()
            .times(1)
            .returning(|_| Err(ApiError::UpstreamUnavailable("down".into())));

        let mut directory = UserDirectory::new();
        directory.update(&api, &token(), "a", user("a", "a@example.org")).await.unwrap();
        let messages: Vec<String> = directory.take_notifications().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["User updated successfully", "Error fetching users"]);
    }

    #[tokio::test]
    async fn patch_keeps_fields_it_does_not_name() {
        let mut api = MockKeycloakAdminApi::new();
        api.expect_list_users()
            .times(2)
            .returning(|_| Ok(vec![user("a", "a@example.org")]));
        api.expect_update_user()
            .times(1)
            .withf(|_, id, u| {
                id == "a" && u.enabled && u.username == "a" && u.email.as_deref() == Some("new@example.org")
            })
            .returning(|_, _, _| Ok(()));

        let mut directory = UserDirectory::new();
        let patch = UserPatch {
            email: Some("new@example.org".into()),
            ..Default::default()
        };
        directory.patch(&api, &token(), "a", patch).await.unwrap();
        assert_eq!(directory.take_notifications(), vec![Notification::success("User updated successfully")]);
    }

    #[tokio::test]
    async fn patch_of_unknown_user_is_not_found() {
        let mut api = MockKeycloakAdminApi::new();
        api.expect_list_users()
            .times(1)
            .returning(|_| Ok(vec![user("a", "a@example.org")]));
        api.expect_update_user().never();

        let mut directory = UserDirectory::new();
        let err = directory.patch(&api, &token(), "ghost", UserPatch::default()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
        let messages: Vec<String> = directory.take_notifications().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Error updating user"]);
    }

    #[tokio::test]
    async fn view_filters_by_email_and_pages() {
        let mut api = MockKeycloakAdminApi::new();
        api.expect_list_users().returning(|_| {
            Ok(vec![
                user("a", "alice@corp.dz"),
                user("b", "bob@example.org"),
                user("c", "carol@CORP.dz"),
            ])
        });
        let mut directory = UserDirectory::new();
        directory.refresh(&api, &token()).await.unwrap();

        let page = directory.view(&UserQuery {
            email: Some("corp".into()),
            page: 1,
            per_page: 1,
        });
        assert_eq!(page.total_count, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].username, "a");
    }
}
