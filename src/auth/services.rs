use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::JwtPayload,
        dto::{CreateUserRequest, LoginRequest, LoginResponse, RegisterRequest},
        errors::AuthError,
        jwt::JwtKeys,
        password::{hash_password, verify_dummy, verify_password},
    },
    users::{NewUser, PublicUser, UserStore},
};

/// Account creation and authentication on top of a [`UserStore`].
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Hashes the password and stores a new user. Email uniqueness is
    /// decided by the store, so concurrent creates with one email leave
    /// exactly one record and the rest fail with `DuplicateEmail`.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: CreateUserRequest) -> Result<PublicUser, AuthError> {
        input.validate()?;
        let CreateUserRequest {
            email,
            name,
            address,
            password,
        } = input;

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::internal("hash task failed", e))?
            .map_err(|e| AuthError::internal("hash_password failed", e))?;

        let user = self
            .store
            .insert(NewUser::new(email, name, address, password_hash))
            .await
            .map_err(|e| {
                let err = AuthError::from(e);
                if let AuthError::DuplicateEmail(email) = &err {
                    warn!(%email, "email already registered");
                }
                err
            })?;

        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<PublicUser, AuthError> {
        let user = self.store.find_by_id(id).await?.ok_or(AuthError::NotFound)?;
        Ok(user.into())
    }

    /// Every stored user, password hashes stripped like on every other read path.
    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<PublicUser>, AuthError> {
        let users = self.store.list_all().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginRequest) -> Result<LoginResponse, AuthError> {
        input.validate()?;

        let password = input.password;
        let Some(user) = self.store.find_by_email(&input.email).await? else {
            tokio::task::spawn_blocking(move || verify_dummy(&password))
                .await
                .map_err(|e| AuthError::internal("verify task failed", e))?;
            warn!("login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let hash = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal("verify task failed", e))?
            .map_err(|e| AuthError::internal("verify_password failed", e))?;

        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login for inactive user");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.get_jwt_token(&JwtPayload { id: user.id })?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            user: user.into(),
            token,
        })
    }

    /// Creates the user and issues a token keyed on the new id.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterRequest) -> Result<LoginResponse, AuthError> {
        let user = self.create(input).await?;
        let token = self.get_jwt_token(&JwtPayload { id: user.id })?;
        info!(user_id = %user.id, "user registered");
        Ok(LoginResponse { user, token })
    }

    /// Fresh token for a user that already holds a valid one.
    pub fn check_token(&self, user: PublicUser) -> Result<LoginResponse, AuthError> {
        let token = self.get_jwt_token(&JwtPayload { id: user.id })?;
        Ok(LoginResponse { user, token })
    }

    pub fn get_jwt_token(&self, payload: &JwtPayload) -> Result<String, AuthError> {
        self.keys
            .sign(payload)
            .map_err(|e| AuthError::internal("jwt sign failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        users::{InMemoryUserStore, StoreError, User},
    };

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    fn service() -> (AuthService, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        (AuthService::new(store.clone(), keys()), store)
    }

    fn create_req(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.into(),
            name: "A".into(),
            address: "addr".into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_id_matches_input() {
        let (svc, _) = service();
        let created = svc.create(create_req("a@x.com", "secret1")).await.unwrap();
        assert_eq!(created.email, "a@x.com");
        assert_eq!(created.name, "A");
        assert_eq!(created.address, "addr");
        assert!(created.is_active);
        assert_eq!(created.roles, vec!["user".to_string()]);

        let found = svc.find_user_by_id(created.id).await.unwrap();
        assert_eq!(found, created);
        let json = serde_json::to_value(&found).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn create_stores_fields_exactly_as_given() {
        let (svc, _) = service();
        let input = CreateUserRequest {
            email: "Alice@X.com".into(),
            name: " A ".into(),
            address: "addr ".into(),
            password: "secret1".into(),
        };
        let created = svc.create(input).await.unwrap();

        let found = svc.find_user_by_id(created.id).await.unwrap();
        assert_eq!(found.email, "Alice@X.com");
        assert_eq!(found.name, " A ");
        assert_eq!(found.address, "addr ");

        let res = svc.login(login_req("Alice@X.com", "secret1")).await.unwrap();
        assert_eq!(res.user.id, created.id);
    }

    #[tokio::test]
    async fn stored_hash_is_not_plaintext_and_verifies() {
        let (svc, store) = service();
        let created = svc.create(create_req("a@x.com", "secret1")).await.unwrap();
        let record = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_ne!(record.password_hash, "secret1");
        assert!(verify_password("secret1", &record.password_hash).unwrap());
        assert!(!verify_password("secret2", &record.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_fails_and_keeps_existing_record() {
        let (svc, store) = service();
        let first = svc.create(create_req("a@x.com", "secret1")).await.unwrap();

        let mut dup = create_req("a@x.com", "another1");
        dup.name = "B".into();
        let err = svc.create(dup).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail(ref e) if e == "a@x.com"));

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].name, "A");
        assert!(verify_password("secret1", &all[0].password_hash).unwrap());
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_email_leave_one_record() {
        let (svc, store) = service();
        let svc = Arc::new(svc);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.create(create_req("race@x.com", "secret1")).await
            }));
        }
        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AuthError::DuplicateEmail(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_short_password_before_store() {
        let (svc, store) = service();
        let err = svc.create(create_req("a@x.com", "12345")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_user_by_id_unknown_is_not_found() {
        let (svc, _) = service();
        let err = svc.find_user_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }

    #[tokio::test]
    async fn find_all_strips_hashes() {
        let (svc, _) = service();
        svc.create(create_req("a@x.com", "secret1")).await.unwrap();
        svc.create(create_req("b@x.com", "secret2")).await.unwrap();
        let all = svc.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        let json = serde_json::to_string(&all).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[tokio::test]
    async fn login_wrong_password_and_unknown_email_are_indistinguishable() {
        let (svc, _) = service();
        svc.create(create_req("a@x.com", "secret1")).await.unwrap();

        let wrong = svc.login(login_req("a@x.com", "wrong")).await.unwrap_err();
        let unknown = svc.login(login_req("nobody@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.status(), unknown.status());
    }

    #[tokio::test]
    async fn login_success_returns_user_and_token() {
        let (svc, _) = service();
        let created = svc.create(create_req("a@x.com", "secret1")).await.unwrap();
        let res = svc.login(login_req("a@x.com", "secret1")).await.unwrap();
        assert_eq!(res.user, created);
        let claims = svc.keys().verify(&res.token).unwrap();
        assert_eq!(claims.id, created.id);
    }

    #[tokio::test]
    async fn inactive_user_cannot_login() {
        let (svc, store) = service();
        let mut new = NewUser::new(
            "off@x.com".into(),
            "Off".into(),
            "addr".into(),
            hash_password("secret1").unwrap(),
        );
        new.is_active = false;
        store.insert(new).await.unwrap();

        let err = svc.login(login_req("off@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn register_token_decodes_to_created_id() {
        let (svc, _) = service();
        let res = svc.register(create_req("a@x.com", "secret1")).await.unwrap();
        let claims = svc.keys().verify(&res.token).unwrap();
        assert_eq!(claims.id, res.user.id);

        let err = svc.register(create_req("a@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn check_token_issues_token_for_same_user() {
        let (svc, _) = service();
        let user = svc.create(create_req("a@x.com", "secret1")).await.unwrap();
        let res = svc.check_token(user.clone()).unwrap();
        assert_eq!(res.user, user);
        assert_eq!(svc.keys().verify(&res.token).unwrap().id, user.id);
    }

    #[tokio::test]
    async fn scenario_create_duplicate_login() {
        let (svc, _) = service();
        let user = svc.create(create_req("a@x.com", "secret1")).await.unwrap();
        assert!(!serde_json::to_string(&user).unwrap().contains("password"));

        assert!(matches!(
            svc.create(create_req("a@x.com", "secret1")).await,
            Err(AuthError::DuplicateEmail(_))
        ));
        assert!(!svc.login(login_req("a@x.com", "secret1")).await.unwrap().token.is_empty());
        assert!(matches!(
            svc.login(login_req("a@x.com", "wrong")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl UserStore for FailingStore {
        async fn insert(&self, _new: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Backend(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
            Err(StoreError::Backend(sqlx::Error::PoolClosed))
        }
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Backend(sqlx::Error::PoolClosed))
        }
        async fn list_all(&self) -> Result<Vec<User>, StoreError> {
            Err(StoreError::Backend(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn store_failures_are_opaque_internal_errors() {
        let svc = AuthService::new(Arc::new(FailingStore), keys());
        let err = svc.create(create_req("a@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal));
        assert!(!err.to_string().contains("pool"));
        assert!(matches!(
            svc.login(login_req("a@x.com", "secret1")).await,
            Err(AuthError::Internal)
        ));
        assert!(matches!(svc.find_all().await, Err(AuthError::Internal)));
    }
}
