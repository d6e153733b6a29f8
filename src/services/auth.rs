// src/services/auth.rs

//! The single signed-in session and the login/logout flow around it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{session::Session, user::LoginRequest},
    services::users::UserDirectory,
    store::{Slot, Storage, keys},
    utils::jwt::sign_jwt,
};

/// Persisted session plus a channel that notifies subscribers of sign-in changes.
#[derive(Clone)]
pub struct AuthState {
    slot: Slot<Session>,
    remembered_email: Slot<String>,
    tx: Arc<watch::Sender<Option<Session>>>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub session: Session,
}

impl AuthState {
    /// Loads whatever session the store still holds.
    pub async fn restore(storage: &Storage) -> Result<Self, AppError> {
        let slot = storage.slot::<Session>(keys::SESSION);
        let current = slot.get().await?;
        if let Some(session) = &current {
            tracing::info!("Restored session for {}", session.email);
        }
        let (tx, _rx) = watch::channel(current);

        Ok(Self {
            slot,
            remembered_email: storage.slot(keys::REMEMBERED_EMAIL),
            tx: Arc::new(tx),
        })
    }

    pub async fn current(&self) -> Result<Option<Session>, AppError> {
        self.slot.get().await
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub async fn remembered_email(&self) -> Result<Option<String>, AppError> {
        self.remembered_email.get().await
    }

    /// Replaces the active session.
    pub async fn sign_in(&self, session: Session) -> Result<(), AppError> {
        self.slot.set(&session).await?;
        self.tx.send_replace(Some(session));
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.slot.clear().await?;
        if let Some(previous) = self.tx.send_replace(None) {
            tracing::info!("Signed out {}", previous.email);
        }
        Ok(())
    }

    /// Checks credentials, writes the session and issues a bearer token.
    pub async fn login(
        &self,
        users: &UserDirectory,
        config: &Config,
        req: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        req.validate()?;

        let user = users.authenticate(&req.email, &req.password).await?;
        let session = Session::from(&user);

        if req.remember {
            self.remembered_email.set(&user.email).await?;
        } else {
            self.remembered_email.clear().await?;
        }

        let token = sign_jwt(&session, &config.jwt_secret, config.jwt_expiration)?;
        self.sign_in(session.clone()).await?;
        tracing::info!("User {} signed in", session.email);

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::{CreateUserRequest, Role},
        utils::{ids::IdGenerator, jwt::verify_jwt},
    };

    fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test-secret".into(),
            jwt_expiration: 3600,
            rust_log: "info".into(),
            public_origin: "http://localhost:4200".into(),
            bind_addr: "127.0.0.1:0".into(),
            cors_origins: Vec::new(),
            admin_email: None,
            admin_password: None,
            reject_duplicate_emails: true,
            remote_api_url: None,
            remote_api_token: None,
        }
    }

    async fn setup() -> (Storage, AuthState, UserDirectory) {
        let storage = Storage::memory();
        let auth = AuthState::restore(&storage).await.unwrap();
        let users = UserDirectory::new(storage.collection(keys::USERS), true);
        users
            .create(
                CreateUserRequest {
                    first_name: "Carla".into(),
                    last_name: "Dias".into(),
                    email: "carla@x.com".into(),
                    password: "segredo1".into(),
                    role: Role::Professor,
                },
                &IdGenerator::new(),
            )
            .await
            .unwrap();
        (storage, auth, users)
    }

    #[tokio::test]
    async fn login_writes_session_and_remembers_email() {
        let (storage, auth, users) = setup().await;
        let mut rx = auth.subscribe();

        let res = auth
            .login(
                &users,
                &config(),
                LoginRequest { email: "carla@x.com".into(), password: "segredo1".into(), remember: true },
            )
            .await
            .unwrap();

        assert_eq!(res.session.name, "Carla Dias");
        assert_eq!(verify_jwt(&res.token, "test-secret").unwrap().sub, res.session.id.to_string());
        assert_eq!(auth.current().await.unwrap(), Some(res.session.clone()));
        assert_eq!(auth.remembered_email().await.unwrap().as_deref(), Some("carla@x.com"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&res.session));

        // A fresh state over the same storage sees the persisted session.
        let restored = AuthState::restore(&storage).await.unwrap();
        assert_eq!(restored.current().await.unwrap(), Some(res.session));

        auth.sign_out().await.unwrap();
        assert_eq!(auth.current().await.unwrap(), None);
        assert!(rx.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn failed_login_leaves_no_session() {
        let (_storage, auth, users) = setup().await;
        let err = auth
            .login(
                &users,
                &config(),
                LoginRequest { email: "carla@x.com".into(), password: "errada".into(), remember: false },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AuthError(_)));
        assert_eq!(auth.current().await.unwrap(), None);
    }
}
