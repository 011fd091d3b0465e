// src/services/access.rs

use uuid::Uuid;

use crate::{common::error::AppError, models::auth::User};

// Camada de controle de acesso: os papéis (membro/dono) são derivados
// exclusivamente dos campos de tenancy do usuário autenticado, sempre
// recarregados do banco a cada requisição. Nada vem do cliente.
//
// Papel errado -> 403; recurso fora do escopo -> 404 (tratado nos
// repositórios, que filtram pela empresa); referência cruzada em escrita
// de estoque/catálogo -> 400 (tratado nos serviços).

/// Empresa do chamador, exigindo que ele seja membro (dono ou funcionário).
pub fn member_company(user: &User) -> Result<Uuid, AppError> {
    user.company_id.ok_or_else(|| {
        AppError::Forbidden("Apenas membros de uma empresa podem executar esta ação.".to_string())
    })
}

/// Empresa do chamador, exigindo que ele seja o dono.
pub fn owner_company(user: &User) -> Result<Uuid, AppError> {
    let company_id = member_company(user)?;
    if !user.is_company_owner {
        return Err(AppError::Forbidden(
            "Apenas o dono da empresa pode executar esta ação.".to_string(),
        ));
    }
    Ok(company_id)
}
