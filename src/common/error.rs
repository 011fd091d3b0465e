// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Taxonomia de erros da aplicação, com `thiserror` para melhor ergonomia.
// Todo erro de regra de negócio é traduzido aqui para uma resposta
// estruturada; nenhum detalhe interno de armazenamento vaza para o cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Violação de regra de negócio (400) com mensagem global.
    #[error("{0}")]
    BusinessRule(String),

    #[error("Produtos não encontrados: {0:?}")]
    ProductsNotFound(Vec<Uuid>),

    #[error("Estoque insuficiente. Disponível: {available}")]
    InsufficientStock { available: i64 },

    #[error("Nome de usuário já existe")]
    UsernameAlreadyExists,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("INN já cadastrado")]
    InnAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    // Papel errado (ex.: funcionário tentando ação de dono) -> 403.
    #[error("{0}")]
    Forbidden(String),

    // Recurso ausente ou fora do escopo da empresa do chamador -> 404.
    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    // Violação de transição de estado (dupla posse de empresa,
    // solicitação já resolvida, solicitação pendente duplicada) -> 409.
    #[error("{0}")]
    Conflict(String),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Mapeamento estável erro -> código HTTP (400/401/403/404/409/500).
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BusinessRule(_)
            | AppError::ProductsNotFound(_)
            | AppError::InsufficientStock { .. }
            | AppError::UsernameAlreadyExists
            | AppError::EmailAlreadyExists
            | AppError::InnAlreadyExists => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,

            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Erros de validação carregam os detalhes por campo.
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "details": details,
            }));
            return (status, body).into_response();
        }

        // Erros internos são logados com a mensagem detalhada do thiserror;
        // o cliente recebe apenas uma mensagem genérica.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro interno do servidor: {}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regras_de_negocio_viram_400() {
        assert_eq!(
            AppError::BusinessRule("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientStock { available: 3 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ProductsNotFound(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UsernameAlreadyExists.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn autenticacao_autorizacao_e_escopo() {
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("só o dono".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::NotFound("Armazém").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("já resolvida".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn estoque_insuficiente_expoe_o_saldo_disponivel() {
        let err = AppError::InsufficientStock { available: 15 };
        assert!(err.to_string().contains("15"));
    }
}
