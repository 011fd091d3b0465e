// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{EmployeeView, User},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_company_owner, company_id, created_at, updated_at";

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    /// Carrega um usuário sob trava de linha, para decisões que dependem
    /// da filiação atual (ex.: aprovação de solicitação de vínculo).
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(maybe_user)
    }

    // Cria um novo usuário, com tratamento específico para
    // username/e-mail duplicados.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().unwrap_or_default();
                    if constraint.contains("username") {
                        return AppError::UsernameAlreadyExists;
                    }
                    if constraint.contains("email") {
                        return AppError::EmailAlreadyExists;
                    }
                }
            }
            e.into()
        })
    }

    /// Define (ou limpa) a filiação de um usuário. É o único caminho de
    /// escrita para company_id/is_company_owner.
    pub async fn set_company<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Option<Uuid>,
        is_owner: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE users
            SET company_id = $2, is_company_owner = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(is_owner)
        .execute(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // uniq_company_owner: no máximo um dono por empresa.
                if db_err.is_unique_violation() {
                    return AppError::Conflict("A empresa já possui um dono.".to_string());
                }
            }
            e.into()
        })?;
        Ok(())
    }

    pub async fn list_employees(&self, company_id: Uuid) -> Result<Vec<EmployeeView>, AppError> {
        let employees = sqlx::query_as::<_, EmployeeView>(
            r#"
            SELECT id, username, email, is_company_owner
            FROM users
            WHERE company_id = $1
            ORDER BY username ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    pub async fn find_employee(
        &self,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND company_id = $2"
        ))
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    /// Desvincula todos os funcionários de uma empresa (usado na exclusão
    /// da empresa: eles não são removidos, apenas perdem o vínculo e a flag).
    pub async fn clear_company_members<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET company_id = NULL, is_company_owner = false, updated_at = now()
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
