// src/db/company_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{Company, CompanyOwnerView, CompanyView, JoinRequest, JoinRequestStatus},
};

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

// Linha intermediária da visão de empresa: dono derivado (LEFT JOIN no
// funcionário com a flag) + contagem de funcionários.
#[derive(FromRow)]
struct CompanyViewRow {
    id: Uuid,
    inn: String,
    title: String,
    owner_id: Option<Uuid>,
    owner_username: Option<String>,
    owner_email: Option<String>,
    employees_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyViewRow> for CompanyView {
    fn from(row: CompanyViewRow) -> Self {
        let owner = match (row.owner_id, row.owner_username, row.owner_email) {
            (Some(id), Some(username), Some(email)) => Some(CompanyOwnerView {
                id,
                username,
                email,
            }),
            _ => None,
        };
        CompanyView {
            id: row.id,
            inn: row.inn,
            title: row.title,
            owner,
            employees_count: row.employees_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COMPANY_VIEW_QUERY: &str = r#"
    SELECT c.id, c.inn, c.title,
           o.id AS owner_id, o.username AS owner_username, o.email AS owner_email,
           (SELECT COUNT(*) FROM users e WHERE e.company_id = c.id) AS employees_count,
           c.created_at, c.updated_at
    FROM companies c
    LEFT JOIN users o ON o.company_id = c.id AND o.is_company_owner = true
"#;

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Empresas
    // ---

    pub async fn list_all(&self) -> Result<Vec<CompanyView>, AppError> {
        let rows = sqlx::query_as::<_, CompanyViewRow>(&format!(
            "{COMPANY_VIEW_QUERY} ORDER BY c.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CompanyView::from).collect())
    }

    pub async fn find_view_by_id(&self, id: Uuid) -> Result<Option<CompanyView>, AppError> {
        let row = sqlx::query_as::<_, CompanyViewRow>(&format!(
            "{COMPANY_VIEW_QUERY} WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CompanyView::from))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, inn, title, created_at, updated_at FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    pub async fn create_company<'e, E>(
        &self,
        executor: E,
        inn: &str,
        title: &str,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (inn, title)
            VALUES ($1, $2)
            RETURNING id, inn, title, created_at, updated_at
            "#,
        )
        .bind(inn)
        .bind(title)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::InnAlreadyExists;
                }
            }
            e.into()
        })
    }

    pub async fn update_company(
        &self,
        id: Uuid,
        inn: Option<&str>,
        title: Option<&str>,
    ) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET inn = COALESCE($2, inn),
                title = COALESCE($3, title),
                updated_at = now()
            WHERE id = $1
            RETURNING id, inn, title, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(inn)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::InnAlreadyExists;
                }
            }
            e.into()
        })
    }

    pub async fn delete_company<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // ---
    // Solicitações de vínculo
    // ---

    pub async fn create_join_request(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<JoinRequest, AppError> {
        sqlx::query_as::<_, JoinRequest>(
            r#"
            INSERT INTO join_requests (user_id, company_id)
            VALUES ($1, $2)
            RETURNING id, user_id, company_id, status, created_at, reviewed_at
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // Índice parcial uniq_pending_join_request: corrida entre
                // duas solicitações simultâneas do mesmo par vira 409.
                if db_err.is_unique_violation() {
                    return AppError::Conflict(
                        "Você já enviou uma solicitação para esta empresa. Aguarde a decisão do dono."
                            .to_string(),
                    );
                }
            }
            e.into()
        })
    }

    pub async fn pending_request_exists(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM join_requests
                WHERE user_id = $1 AND company_id = $2 AND status = 'pending'
            )
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn list_join_requests(
        &self,
        company_id: Uuid,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, AppError> {
        let requests = sqlx::query_as::<_, JoinRequest>(
            r#"
            SELECT id, user_id, company_id, status, created_at, reviewed_at
            FROM join_requests
            WHERE company_id = $1 AND ($2::join_request_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Busca a solicitação pelo id DENTRO da empresa do dono, sob trava de
    /// linha. Solicitação de outra empresa é indistinguível de inexistente.
    pub async fn find_join_request_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<JoinRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, JoinRequest>(
            r#"
            SELECT id, user_id, company_id, status, created_at, reviewed_at
            FROM join_requests
            WHERE id = $1 AND company_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(executor)
        .await?;
        Ok(request)
    }

    pub async fn set_join_request_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: JoinRequestStatus,
    ) -> Result<JoinRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, JoinRequest>(
            r#"
            UPDATE join_requests
            SET status = $2, reviewed_at = now()
            WHERE id = $1
            RETURNING id, user_id, company_id, status, created_at, reviewed_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }
}
