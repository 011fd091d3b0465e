// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// Representa um usuário vindo do banco de dados.
// A filiação à empresa é o campo `company_id` + a flag `is_company_owner`:
// dono => is_company_owner && company_id preenchido;
// funcionário => company_id preenchido sem a flag;
// sem filiação => company_id nulo.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub is_company_owner: bool,
    pub company_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Dono da empresa indicada? (papel derivado, nunca vindo do cliente)
    pub fn owns_company(&self, company_id: Uuid) -> bool {
        self.is_company_owner && self.company_id == Some(company_id)
    }
}

// Visão resumida de um funcionário (para o dono).
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_company_owner: bool,
}

impl From<User> for EmployeeView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_company_owner: u.is_company_owner,
        }
    }
}

// ---
// Payloads
// ---

fn validate_passwords_match(payload: &RegisterUserPayload) -> Result<(), ValidationError> {
    if payload.password != payload.password_confirm {
        let mut err = ValidationError::new("password_mismatch");
        err.message = Some("As senhas não coincidem.".into());
        return Err(err);
    }
    Ok(())
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_passwords_match"))]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, max = 150, message = "O nome de usuário é obrigatório."))]
    pub username: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: String,

    pub password_confirm: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "O nome de usuário é obrigatório."))]
    pub username: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddEmployeePayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
}

// Resposta de autenticação com os tokens e o usuário
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

// ---
// JWT
// ---

// Discriminador de uso do token: um refresh token nunca autentica
// uma requisição e um access token nunca é renovado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,           // Subject (ID do usuário)
    pub exp: usize,          // Expiration time
    pub iat: usize,          // Issued At
    pub token_use: TokenUse, // access | refresh
}
