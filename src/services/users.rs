// src/services/users.rs

use std::collections::HashSet;

use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, Role, UserRecord, UserStats},
    store::Collection,
    utils::{hash::{hash_password, password_matches}, ids::IdGenerator},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// The `users` collection plus the rules for adding to it.
#[derive(Clone)]
pub struct UserDirectory {
    users: Collection<UserRecord>,
    reject_duplicate_emails: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserDirectory {
    pub fn new(users: Collection<UserRecord>, reject_duplicate_emails: bool) -> Self {
        Self { users, reject_duplicate_emails }
    }

    /// Newest first, as stored.
    pub async fn list(&self) -> Result<Vec<UserRecord>, AppError> {
        self.users.load().await
    }

    /// Validates, hashes the password and prepends the new user.
    pub async fn create(&self, mut req: CreateUserRequest, ids: &IdGenerator) -> Result<UserRecord, AppError> {
        req.email = normalize_email(&req.email);
        req.validate()?;

        let record = UserRecord {
            id: ids.next(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email,
            password: hash_password(&req.password)?,
            role: req.role,
            created_at: Some(Utc::now()),
        };

        let reject_duplicates = self.reject_duplicate_emails;
        self.users
            .update(|all| {
                if reject_duplicates && all.iter().any(|u| normalize_email(&u.email) == record.email) {
                    return Err(AppError::Conflict(format!(
                        "Email '{}' is already registered",
                        record.email
                    )));
                }
                all.insert(0, record.clone());
                Ok(())
            })
            .await?;

        tracing::info!("User {} created with role {}", record.email, record.role.as_str());
        Ok(record)
    }

    pub async fn remove(&self, id: i64) -> Result<(), AppError> {
        self.users
            .update(|all| {
                let before = all.len();
                all.retain(|u| u.id != id);
                if all.len() == before {
                    return Err(AppError::NotFound(format!("User {} not found", id)));
                }
                Ok(())
            })
            .await
    }

    pub async fn stats(&self) -> Result<UserStats, AppError> {
        let all = self.users.load().await?;
        Ok(compute_stats(&all))
    }

    /// Finds the user matching `email` and `password`.
    /// Unknown email and wrong password fail with the same message.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, AppError> {
        let all = self.users.load().await?;
        if all.is_empty() {
            return Err(AppError::AuthError("No users registered".to_string()));
        }

        let email = normalize_email(email);
        for user in all.into_iter().filter(|u| normalize_email(&u.email) == email) {
            if password_matches(password, &user.password)? {
                return Ok(user);
            }
        }

        tracing::warn!("Failed login attempt for {}", email);
        Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()))
    }

    /// Inserts an admin with the given credentials unless the email is taken.
    pub async fn seed_admin(&self, email: &str, password: &str, ids: &IdGenerator) -> Result<bool, AppError> {
        let email = normalize_email(email);
        if self.users.load().await?.iter().any(|u| normalize_email(&u.email) == email) {
            return Ok(false);
        }

        let record = UserRecord {
            id: ids.next(),
            first_name: "Admin".to_string(),
            last_name: String::new(),
            email,
            password: hash_password(password)?,
            role: Role::Admin,
            created_at: Some(Utc::now()),
        };
        self.users
            .update(|all| {
                all.insert(0, record);
                Ok(())
            })
            .await?;
        Ok(true)
    }
}

pub fn compute_stats(users: &[UserRecord]) -> UserStats {
    let admins = users.iter().filter(|u| u.role == Role::Admin).count();
    let unique_emails = users
        .iter()
        .map(|u| normalize_email(&u.email))
        .collect::<HashSet<_>>()
        .len();

    UserStats {
        total: users.len(),
        professors: users.len() - admins,
        admins,
        unique_emails,
        last_created_at: users.iter().filter_map(|u| u.created_at).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Storage, keys};

    fn request(email: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            first_name: "Maria".into(),
            last_name: "Souza".into(),
            email: email.into(),
            password: "segredo1".into(),
            role,
        }
    }

    fn directory(reject: bool) -> UserDirectory {
        UserDirectory::new(Storage::memory().collection(keys::USERS), reject)
    }

    #[tokio::test]
    async fn create_hashes_and_prepends() {
        let dir = directory(true);
        let ids = IdGenerator::new();

        let first = dir.create(request("a@x.com", Role::Professor), &ids).await.unwrap();
        let second = dir.create(request("  B@X.com ", Role::Admin), &ids).await.unwrap();

        assert!(first.password.starts_with("$argon2"));
        assert_eq!(second.email, "b@x.com");

        let all = dir.list().await.unwrap();
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn duplicate_emails_follow_configuration() {
        let ids = IdGenerator::new();

        let strict = directory(true);
        strict.create(request("a@x.com", Role::Professor), &ids).await.unwrap();
        let err = strict.create(request("A@x.com", Role::Professor), &ids).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let lenient = directory(false);
        lenient.create(request("a@x.com", Role::Professor), &ids).await.unwrap();
        lenient.create(request("a@x.com", Role::Admin), &ids).await.unwrap();
        let stats = lenient.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.unique_emails, 1);
        assert_eq!(stats.admins, 1);
        assert_eq!(stats.professors, 1);
        assert!(stats.last_created_at.is_some());
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let dir = directory(true);
        let mut req = request("not-an-email", Role::Professor);
        req.password = "123".into();
        let err = dir.create(req, &IdGenerator::new()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(dir.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn authenticate_does_not_reveal_which_part_failed() {
        let dir = directory(true);
        let ids = IdGenerator::new();
        dir.create(request("a@x.com", Role::Professor), &ids).await.unwrap();

        let wrong_password = dir.authenticate("a@x.com", "errada").await.unwrap_err();
        let unknown_email = dir.authenticate("b@x.com", "segredo1").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());

        let user = dir.authenticate("A@X.COM", "segredo1").await.unwrap();
        assert_eq!(user.email, "a@x.com");
    }

    #[tokio::test]
    async fn legacy_plaintext_records_still_sign_in() {
        let storage = Storage::memory();
        storage
            .backend()
            .put_raw(
                keys::USERS,
                r#"[{"id":1,"firstName":"Ana","lastName":"Lima","email":"ana@x.com","password":"123456","role":"Admin"}]"#,
            )
            .await
            .unwrap();
        let dir = UserDirectory::new(storage.collection(keys::USERS), true);

        let user = dir.authenticate("ana@x.com", "123456").await.unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn remove_and_seed() {
        let dir = directory(true);
        let ids = IdGenerator::new();
        let err = dir.authenticate("x@x.com", "p").await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(msg) if msg == "No users registered"));

        assert!(dir.seed_admin("root@x.com", "segredo1", &ids).await.unwrap());
        assert!(!dir.seed_admin("ROOT@x.com", "outra", &ids).await.unwrap());

        let admin = dir.authenticate("root@x.com", "segredo1").await.unwrap();
        assert_eq!(admin.role, Role::Admin);

        dir.remove(admin.id).await.unwrap();
        assert!(matches!(dir.remove(admin.id).await, Err(AppError::NotFound(_))));
    }
}
