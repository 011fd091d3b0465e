// src/services/auth.rs

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthResponse, Claims, RefreshResponse, TokenUse, User},
};

// Tempo de vida dos tokens: acesso curto, renovação longa.
const ACCESS_TOKEN_TTL_HOURS: i64 = 1;
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Emite um JWT assinado para o usuário, com o uso (access/refresh) gravado
/// nas claims.
pub fn generate_token(
    user_id: Uuid,
    secret: &str,
    token_use: TokenUse,
    ttl: Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
        token_use,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Decodifica e valida a assinatura/expiração. Qualquer falha vira 401,
/// sem distinguir o motivo para o cliente.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;
    Ok(data.claims)
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(pool: PgPool, user_repo: UserRepository, jwt_secret: String) -> Self {
        Self {
            pool,
            user_repo,
            jwt_secret,
        }
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<(String, String), AppError> {
        let access = generate_token(
            user_id,
            &self.jwt_secret,
            TokenUse::Access,
            Duration::hours(ACCESS_TOKEN_TTL_HOURS),
        )?;
        let refresh = generate_token(
            user_id,
            &self.jwt_secret,
            TokenUse::Refresh,
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
        )?;
        Ok((access, refresh))
    }

    /// Registra um usuário novo (sem filiação). A resposta é só a visão
    /// do usuário; tokens são emitidos no login.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        // bcrypt é CPU-bound: fora do executor async.
        let password = password.to_owned();
        let password_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
                .await
                .map_err(anyhow::Error::new)??;

        let user = self
            .user_repo
            .create_user(&self.pool, username, email, &password_hash)
            .await?;

        tracing::info!(user_id = %user.id, "novo usuário registrado");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
            .await
            .map_err(anyhow::Error::new)??;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let (access_token, refresh_token) = self.issue_pair(user.id)?;
        Ok(AuthResponse {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Troca um refresh token válido por um novo access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AppError> {
        let claims = decode_token(refresh_token, &self.jwt_secret)?;
        if claims.token_use != TokenUse::Refresh {
            return Err(AppError::InvalidToken);
        }
        // Usuário removido depois da emissão não renova sessão.
        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let access_token = generate_token(
            user.id,
            &self.jwt_secret,
            TokenUse::Access,
            Duration::hours(ACCESS_TOKEN_TTL_HOURS),
        )?;
        Ok(RefreshResponse { access_token })
    }

    /// Valida um access token e recarrega o usuário do banco: papel e
    /// filiação sempre refletem o estado atual, nunca o do momento da emissão.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(token, &self.jwt_secret)?;
        if claims.token_use != TokenUse::Access {
            return Err(AppError::InvalidToken);
        }
        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    const SECRET: &str = "segredo-de-teste";

    #[test]
    fn token_de_acesso_faz_a_volta_completa() {
        let user_id = Uuid::new_v4();
        let token =
            generate_token(user_id, SECRET, TokenUse::Access, Duration::hours(1)).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_use, TokenUse::Access);
    }

    #[test]
    fn refresh_token_carrega_o_uso_correto() {
        let token =
            generate_token(Uuid::new_v4(), SECRET, TokenUse::Refresh, Duration::days(7)).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.token_use, TokenUse::Refresh);
    }

    #[test]
    fn segredo_errado_e_rejeitado_com_401() {
        let token =
            generate_token(Uuid::new_v4(), SECRET, TokenUse::Access, Duration::hours(1)).unwrap();
        let err = decode_token(&token, "outro-segredo").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn token_expirado_e_rejeitado() {
        // Além da margem de tolerância padrão do validador.
        let token =
            generate_token(Uuid::new_v4(), SECRET, TokenUse::Access, Duration::hours(-2)).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }

    #[test]
    fn token_adulterado_e_rejeitado() {
        let token =
            generate_token(Uuid::new_v4(), SECRET, TokenUse::Access, Duration::hours(1)).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(decode_token(&tampered, SECRET).is_err());
    }
}
