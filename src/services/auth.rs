// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::StaffRepository,
    models::auth::{Claims, StaffMember, StaffRole},
};

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))??;
    Ok(hashed)
}

#[derive(Clone)]
pub struct AuthService {
    staff_repo: StaffRepository,
    jwt_secret: String,
    jwt_ttl_hours: i64,
    pool: PgPool,
}

impl AuthService {
    pub fn new(staff_repo: StaffRepository, jwt_secret: String, jwt_ttl_hours: i64, pool: PgPool) -> Self {
        Self { staff_repo, jwt_secret, jwt_ttl_hours, pool }
    }

    // ---
    // Sessions
    // ---

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let staff = self
            .staff_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = staff.password_hash.clone();

        // bcrypt is CPU bound
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !staff.is_active {
            return Err(AppError::AccountDisabled);
        }

        tracing::info!(staff_id = %staff.id, role = ?staff.role, "staff logged in");
        self.create_token(staff.id, staff.role)
    }

    /// Resolves a bearer token to a live, active staff account.
    pub async fn validate_token(&self, token: &str) -> Result<StaffMember, AppError> {
        let claims = self.decode_token(token)?;

        let staff = self
            .staff_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !staff.is_active {
            return Err(AppError::AccountDisabled);
        }
        Ok(staff)
    }

    pub fn create_token(&self, staff_id: Uuid, role: StaffRole) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.jwt_ttl_hours);

        let claims = Claims {
            sub: staff_id,
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    // ---
    // Staff management
    // ---

    /// Creates the first admin when the staff table is empty.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<StaffMember>, AppError> {
        let mut tx = self.pool.begin().await?;

        if self.staff_repo.count(&mut *tx).await? > 0 {
            return Ok(None);
        }

        let hashed = hash_password(password).await?;
        let admin = self
            .staff_repo
            .create(&mut *tx, "Administrator", &email.trim().to_lowercase(), &hashed, StaffRole::Admin)
            .await?;

        tx.commit().await?;
        tracing::info!(staff_id = %admin.id, "bootstrap admin created");
        Ok(Some(admin))
    }

    pub async fn list_staff(&self) -> Result<Vec<StaffMember>, AppError> {
        self.staff_repo.list().await
    }

    pub async fn create_staff(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: StaffRole,
    ) -> Result<StaffMember, AppError> {
        let hashed = hash_password(password).await?;
        self.staff_repo
            .create(&self.pool, name.trim(), &email.trim().to_lowercase(), &hashed, role)
            .await
    }

    pub async fn update_staff(
        &self,
        actor: &StaffMember,
        id: Uuid,
        name: &str,
        role: StaffRole,
        is_active: bool,
    ) -> Result<StaffMember, AppError> {
        // An admin cannot lock themselves out.
        if actor.id == id && (!is_active || role != actor.role) {
            return Err(AppError::CannotModifySelf);
        }

        self.staff_repo
            .update(&self.pool, id, name.trim(), role, is_active)
            .await?
            .ok_or(AppError::ResourceNotFound("staff"))
    }

    pub async fn reset_password(&self, id: Uuid, new_password: &str) -> Result<(), AppError> {
        let hashed = hash_password(new_password).await?;
        if !self.staff_repo.update_password(&self.pool, id, &hashed).await? {
            return Err(AppError::ResourceNotFound("staff"));
        }
        Ok(())
    }

    pub async fn delete_staff(&self, actor: &StaffMember, id: Uuid) -> Result<(), AppError> {
        if actor.id == id {
            return Err(AppError::CannotModifySelf);
        }
        if !self.staff_repo.delete(&self.pool, id).await? {
            return Err(AppError::ResourceNotFound("staff"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        AuthService::new(StaffRepository::new(pool.clone()), "test-secret".into(), 24, pool)
    }

    #[tokio::test]
    async fn token_round_trip_keeps_subject_and_role() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc.create_token(id, StaffRole::Barista).unwrap();

        let claims = svc.decode_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, StaffRole::Barista);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let svc = service();
        let other = AuthService { jwt_secret: "other".into(), ..svc.clone() };
        let token = other.create_token(Uuid::new_v4(), StaffRole::Admin).unwrap();

        assert!(matches!(svc.decode_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(svc.decode_token("garbage"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let svc = AuthService { jwt_ttl_hours: -2, ..service() };
        let token = svc.create_token(Uuid::new_v4(), StaffRole::Cashier).unwrap();
        assert!(matches!(svc.decode_token(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn admins_cannot_disable_or_delete_themselves() {
        let svc = service();
        let me = StaffMember {
            id: Uuid::new_v4(),
            name: "Admin".into(),
            email: "admin@restaurant.com".into(),
            password_hash: String::new(),
            role: StaffRole::Admin,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let err = svc.update_staff(&me, me.id, "Admin", StaffRole::Admin, false).await;
        assert!(matches!(err, Err(AppError::CannotModifySelf)));

        let err = svc.update_staff(&me, me.id, "Admin", StaffRole::Cashier, true).await;
        assert!(matches!(err, Err(AppError::CannotModifySelf)));

        let err = svc.delete_staff(&me, me.id).await;
        assert!(matches!(err, Err(AppError::CannotModifySelf)));
    }
}
