// src/services/stock_service.rs
//
// O motor de mutação de estoque. Fornecimentos aumentam o saldo de um ou
// mais produtos; vendas diminuem o saldo de exatamente um produto. Toda
// operação roda em UMA transação, com trava pessimista de linha sobre os
// produtos afetados (adquirida em ordem crescente de id para evitar
// deadlock entre fornecimentos concorrentes com conjuntos sobrepostos).
//
// A persistência fica atrás da porta StockStore/StockTx: a implementação
// Postgres usa transações sqlx com SELECT ... FOR UPDATE; os testes usam
// um armazém em memória que serializa transações com um guard de mutex.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::User,
    models::stock::{LockedProduct, Sale, SaleView, Supply, SupplyLineInput, SupplyView},
    services::access,
};

// ---
// A porta de armazenamento
// ---

/// Transação de estoque em andamento. Largar o valor sem `commit`
/// equivale a rollback: nenhuma escrita parcial sobrevive.
#[async_trait]
pub trait StockTx: Send {
    /// Trava e carrega os produtos indicados. `ids` deve vir em ordem
    /// crescente; produtos inexistentes simplesmente não aparecem no
    /// resultado.
    async fn lock_products(&mut self, ids: &[Uuid]) -> Result<Vec<LockedProduct>, AppError>;

    async fn adjust_quantity(&mut self, product_id: Uuid, delta: i64) -> Result<(), AppError>;

    async fn insert_supply(
        &mut self,
        supplier_id: Uuid,
        created_by: Uuid,
    ) -> Result<Supply, AppError>;

    async fn insert_supply_line(
        &mut self,
        supply_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<(), AppError>;

    async fn insert_sale(
        &mut self,
        product_id: Uuid,
        quantity: i64,
        unit_price: Decimal,
        created_by: Uuid,
    ) -> Result<Sale, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

/// Porta de persistência do módulo de estoque.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StockTx>, AppError>;

    /// Empresa dona de um fornecedor (None se o fornecedor não existe).
    async fn supplier_company(&self, supplier_id: Uuid) -> Result<Option<Uuid>, AppError>;

    async fn list_supplies(&self, company_id: Uuid) -> Result<Vec<SupplyView>, AppError>;
    async fn get_supply(&self, company_id: Uuid, id: Uuid)
        -> Result<Option<SupplyView>, AppError>;
    async fn list_sales(&self, company_id: Uuid) -> Result<Vec<SaleView>, AppError>;
    async fn get_sale(&self, company_id: Uuid, id: Uuid) -> Result<Option<SaleView>, AppError>;
    async fn update_sale_price(
        &self,
        company_id: Uuid,
        id: Uuid,
        unit_price: Decimal,
    ) -> Result<Option<SaleView>, AppError>;
}

// ---
// Mesclagem de linhas
// ---

/// Mescla ids de produto duplicados somando as quantidades. O BTreeMap
/// devolve as chaves em ordem crescente, que é exatamente a ordem de
/// travamento exigida das transações.
pub(crate) fn merge_lines(lines: &[SupplyLineInput]) -> Result<BTreeMap<Uuid, i64>, AppError> {
    if lines.is_empty() {
        return Err(AppError::BusinessRule(
            "A lista de produtos não pode ser vazia.".to_string(),
        ));
    }
    let mut merged: BTreeMap<Uuid, i64> = BTreeMap::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::BusinessRule(
                "A quantidade deve ser positiva.".to_string(),
            ));
        }
        // Duas quantidades válidas podem estourar i64 quando somadas.
        let total = merged.entry(line.id).or_insert(0);
        *total = total.checked_add(line.quantity).ok_or_else(|| {
            AppError::BusinessRule(
                "A quantidade total do produto excede o limite suportado.".to_string(),
            )
        })?;
    }
    Ok(merged)
}

// ---
// O serviço
// ---

#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn StockStore>,
}

impl StockService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    /// Cria um fornecimento: valida o fornecedor e os produtos contra a
    /// empresa do chamador, trava as linhas afetadas e incrementa os
    /// saldos. Tudo ou nada.
    pub async fn create_supply(
        &self,
        actor: &User,
        supplier_id: Uuid,
        lines: &[SupplyLineInput],
    ) -> Result<SupplyView, AppError> {
        let company_id = access::member_company(actor)?;
        let merged = merge_lines(lines)?;

        match self.store.supplier_company(supplier_id).await? {
            Some(c) if c == company_id => {}
            Some(_) => {
                return Err(AppError::BusinessRule(
                    "O fornecedor não pertence à sua empresa.".to_string(),
                ));
            }
            None => {
                return Err(AppError::BusinessRule(
                    "Fornecedor não encontrado.".to_string(),
                ));
            }
        }

        // Chaves do BTreeMap: já em ordem crescente de id.
        let ids: Vec<Uuid> = merged.keys().copied().collect();

        let mut tx = self.store.begin().await?;
        let locked = tx.lock_products(&ids).await?;

        let found: HashSet<Uuid> = locked.iter().map(|p| p.id).collect();
        let missing: Vec<Uuid> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
        if !missing.is_empty() {
            return Err(AppError::ProductsNotFound(missing));
        }
        if let Some(outsider) = locked.iter().find(|p| p.company_id != company_id) {
            return Err(AppError::BusinessRule(format!(
                "O produto «{}» não pertence à sua empresa.",
                outsider.title
            )));
        }

        let supply = tx.insert_supply(supplier_id, actor.id).await?;
        for (&product_id, &quantity) in &merged {
            tx.adjust_quantity(product_id, quantity).await?;
            tx.insert_supply_line(supply.id, product_id, quantity).await?;
        }
        tx.commit().await?;

        self.store
            .get_supply(company_id, supply.id)
            .await?
            .ok_or_else(|| {
                AppError::InternalServerError(anyhow::anyhow!(
                    "fornecimento recém-criado não encontrado"
                ))
            })
    }

    /// Cria uma venda: trava o produto, checa o saldo e decrementa sob a
    /// mesma trava (evita a corrida clássica de lost update entre duas
    /// vendas concorrentes). Nenhuma venda leva o saldo abaixo de zero.
    pub async fn create_sale(
        &self,
        actor: &User,
        product_id: Uuid,
        quantity: i64,
        unit_price: Option<Decimal>,
    ) -> Result<SaleView, AppError> {
        let company_id = access::member_company(actor)?;
        if quantity <= 0 {
            return Err(AppError::BusinessRule(
                "A quantidade deve ser positiva.".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let locked = tx.lock_products(&[product_id]).await?;
        let product = locked
            .into_iter()
            .next()
            .ok_or(AppError::ProductsNotFound(vec![product_id]))?;

        if product.company_id != company_id {
            return Err(AppError::BusinessRule(format!(
                "O produto «{}» não pertence à sua empresa.",
                product.title
            )));
        }
        if quantity > product.quantity {
            return Err(AppError::InsufficientStock {
                available: product.quantity,
            });
        }

        // Sem preço explícito, vende pelo preço de tabela do produto.
        let price = unit_price.unwrap_or(product.sale_price);

        tx.adjust_quantity(product_id, -quantity).await?;
        let sale = tx.insert_sale(product_id, quantity, price, actor.id).await?;
        tx.commit().await?;

        Ok(SaleView {
            id: sale.id,
            product_id: sale.product_id,
            product_title: product.title,
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            created_by: sale.created_by,
            created_at: sale.created_at,
        })
    }

    // ---
    // Leituras (sempre escopadas pela empresa do chamador)
    // ---

    pub async fn list_supplies(&self, actor: &User) -> Result<Vec<SupplyView>, AppError> {
        match actor.company_id {
            Some(company_id) => self.store.list_supplies(company_id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_supply(&self, actor: &User, id: Uuid) -> Result<SupplyView, AppError> {
        let company_id = actor.company_id.ok_or(AppError::NotFound("Fornecimento"))?;
        self.store
            .get_supply(company_id, id)
            .await?
            .ok_or(AppError::NotFound("Fornecimento"))
    }

    pub async fn list_sales(&self, actor: &User) -> Result<Vec<SaleView>, AppError> {
        match actor.company_id {
            Some(company_id) => self.store.list_sales(company_id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_sale(&self, actor: &User, id: Uuid) -> Result<SaleView, AppError> {
        let company_id = actor.company_id.ok_or(AppError::NotFound("Venda"))?;
        self.store
            .get_sale(company_id, id)
            .await?
            .ok_or(AppError::NotFound("Venda"))
    }

    /// Edição de venda: apenas o preço unitário. A quantidade pertence ao
    /// motor de estoque e não é editável depois do fato.
    pub async fn update_sale(
        &self,
        actor: &User,
        id: Uuid,
        unit_price: Decimal,
    ) -> Result<SaleView, AppError> {
        let company_id = access::member_company(actor)?;
        self.store
            .update_sale_price(company_id, id, unit_price)
            .await?
            .ok_or(AppError::NotFound("Venda"))
    }
}

// ---
// Testes: armazém em memória + propriedades de concorrência
// ---

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio::sync::{Mutex, OwnedMutexGuard};
    use tokio::task::JoinSet;

    // Armazém em memória. Um único mutex faz o papel das travas de linha:
    // é mais grosso que o Postgres, porém conservador — toda transação
    // enxerga o estado comprometido pela anterior, que é a propriedade
    // que o motor exige.
    #[derive(Default)]
    struct MemState {
        suppliers: HashMap<Uuid, (Uuid, String)>, // id -> (empresa, título)
        products: HashMap<Uuid, LockedProduct>,
        supplies: Vec<(Supply, Vec<(Uuid, i64)>)>,
        sales: Vec<Sale>,
    }

    #[derive(Clone, Default)]
    struct MemStockStore {
        state: Arc<Mutex<MemState>>,
    }

    enum PendingOp {
        Adjust(Uuid, i64),
        Supply(Supply),
        Line(Uuid, Uuid, i64),
        Sale(Sale),
    }

    struct MemTx {
        guard: OwnedMutexGuard<MemState>,
        ops: Vec<PendingOp>,
    }

    #[async_trait]
    impl StockTx for MemTx {
        async fn lock_products(&mut self, ids: &[Uuid]) -> Result<Vec<LockedProduct>, AppError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.guard.products.get(id).cloned())
                .collect())
        }

        async fn adjust_quantity(&mut self, product_id: Uuid, delta: i64) -> Result<(), AppError> {
            self.ops.push(PendingOp::Adjust(product_id, delta));
            Ok(())
        }

        async fn insert_supply(
            &mut self,
            supplier_id: Uuid,
            created_by: Uuid,
        ) -> Result<Supply, AppError> {
            let supply = Supply {
                id: Uuid::new_v4(),
                supplier_id,
                created_by: Some(created_by),
                created_at: Utc::now(),
            };
            self.ops.push(PendingOp::Supply(supply.clone()));
            Ok(supply)
        }

        async fn insert_supply_line(
            &mut self,
            supply_id: Uuid,
            product_id: Uuid,
            quantity: i64,
        ) -> Result<(), AppError> {
            self.ops.push(PendingOp::Line(supply_id, product_id, quantity));
            Ok(())
        }

        async fn insert_sale(
            &mut self,
            product_id: Uuid,
            quantity: i64,
            unit_price: Decimal,
            created_by: Uuid,
        ) -> Result<Sale, AppError> {
            let sale = Sale {
                id: Uuid::new_v4(),
                product_id,
                quantity,
                unit_price,
                created_by: Some(created_by),
                created_at: Utc::now(),
            };
            self.ops.push(PendingOp::Sale(sale.clone()));
            Ok(sale)
        }

        // As escritas ficam em buffer até aqui; largar a transação sem
        // commitar descarta tudo, como um rollback.
        async fn commit(mut self: Box<Self>) -> Result<(), AppError> {
            let ops = std::mem::take(&mut self.ops);
            for op in ops {
                match op {
                    PendingOp::Adjust(id, delta) => {
                        if let Some(p) = self.guard.products.get_mut(&id) {
                            p.quantity += delta;
                        }
                    }
                    PendingOp::Supply(supply) => {
                        self.guard.supplies.push((supply, Vec::new()));
                    }
                    PendingOp::Line(supply_id, product_id, quantity) => {
                        if let Some((_, lines)) = self
                            .guard
                            .supplies
                            .iter_mut()
                            .find(|(s, _)| s.id == supply_id)
                        {
                            lines.push((product_id, quantity));
                        }
                    }
                    PendingOp::Sale(sale) => self.guard.sales.push(sale),
                }
            }
            Ok(())
        }
    }

    impl MemStockStore {
        fn supply_view(&self, state: &MemState, supply: &Supply, lines: &[(Uuid, i64)]) -> SupplyView {
            let supplier_title = state
                .suppliers
                .get(&supply.supplier_id)
                .map(|(_, t)| t.clone())
                .unwrap_or_default();
            SupplyView {
                id: supply.id,
                supplier_id: supply.supplier_id,
                supplier_title,
                items: lines
                    .iter()
                    .map(|(pid, qty)| crate::models::stock::SupplyItemView {
                        product_id: *pid,
                        product_title: state
                            .products
                            .get(pid)
                            .map(|p| p.title.clone())
                            .unwrap_or_default(),
                        quantity: *qty,
                    })
                    .collect(),
                created_by: supply.created_by,
                created_by_username: None,
                created_at: supply.created_at,
            }
        }

        fn sale_view(&self, state: &MemState, sale: &Sale) -> SaleView {
            SaleView {
                id: sale.id,
                product_id: sale.product_id,
                product_title: state
                    .products
                    .get(&sale.product_id)
                    .map(|p| p.title.clone())
                    .unwrap_or_default(),
                quantity: sale.quantity,
                unit_price: sale.unit_price,
                created_by: sale.created_by,
                created_at: sale.created_at,
            }
        }
    }

    #[async_trait]
    impl StockStore for MemStockStore {
        async fn begin(&self) -> Result<Box<dyn StockTx>, AppError> {
            Ok(Box::new(MemTx {
                guard: self.state.clone().lock_owned().await,
                ops: Vec::new(),
            }))
        }

        async fn supplier_company(&self, supplier_id: Uuid) -> Result<Option<Uuid>, AppError> {
            Ok(self
                .state
                .lock()
                .await
                .suppliers
                .get(&supplier_id)
                .map(|(c, _)| *c))
        }

        async fn list_supplies(&self, company_id: Uuid) -> Result<Vec<SupplyView>, AppError> {
            let state = self.state.lock().await;
            Ok(state
                .supplies
                .iter()
                .filter(|(s, _)| {
                    state
                        .suppliers
                        .get(&s.supplier_id)
                        .is_some_and(|(c, _)| *c == company_id)
                })
                .map(|(s, lines)| self.supply_view(&state, s, lines))
                .collect())
        }

        async fn get_supply(
            &self,
            company_id: Uuid,
            id: Uuid,
        ) -> Result<Option<SupplyView>, AppError> {
            Ok(self
                .list_supplies(company_id)
                .await?
                .into_iter()
                .find(|s| s.id == id))
        }

        async fn list_sales(&self, company_id: Uuid) -> Result<Vec<SaleView>, AppError> {
            let state = self.state.lock().await;
            Ok(state
                .sales
                .iter()
                .filter(|s| {
                    state
                        .products
                        .get(&s.product_id)
                        .is_some_and(|p| p.company_id == company_id)
                })
                .map(|s| self.sale_view(&state, s))
                .collect())
        }

        async fn get_sale(&self, company_id: Uuid, id: Uuid) -> Result<Option<SaleView>, AppError> {
            Ok(self
                .list_sales(company_id)
                .await?
                .into_iter()
                .find(|s| s.id == id))
        }

        async fn update_sale_price(
            &self,
            company_id: Uuid,
            id: Uuid,
            unit_price: Decimal,
        ) -> Result<Option<SaleView>, AppError> {
            let mut state = self.state.lock().await;
            let scoped: Vec<Uuid> = state
                .products
                .iter()
                .filter(|(_, p)| p.company_id == company_id)
                .map(|(id, _)| *id)
                .collect();
            let view = {
                let sale = state
                    .sales
                    .iter_mut()
                    .find(|s| s.id == id && scoped.contains(&s.product_id));
                match sale {
                    Some(s) => {
                        s.unit_price = unit_price;
                        Some(s.clone())
                    }
                    None => None,
                }
            };
            Ok(view.map(|s| self.sale_view(&state, &s)))
        }
    }

    // ---
    // Montagem de cenário
    // ---

    fn member(company_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            username: "funcionario".into(),
            email: "func@example.com".into(),
            password_hash: "x".into(),
            is_company_owner: false,
            company_id: Some(company_id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn add_supplier(store: &MemStockStore, company_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        store
            .state
            .lock()
            .await
            .suppliers
            .insert(id, (company_id, title.to_string()));
        id
    }

    async fn add_product(store: &MemStockStore, company_id: Uuid, title: &str, qty: i64) -> Uuid {
        let id = Uuid::new_v4();
        store.state.lock().await.products.insert(
            id,
            LockedProduct {
                id,
                title: title.to_string(),
                quantity: qty,
                sale_price: Decimal::new(9990, 2), // 99.90
                storage_id: Uuid::new_v4(),
                company_id,
            },
        );
        id
    }

    async fn quantity_of(store: &MemStockStore, product_id: Uuid) -> i64 {
        store.state.lock().await.products[&product_id].quantity
    }

    fn line(id: Uuid, quantity: i64) -> SupplyLineInput {
        SupplyLineInput { id, quantity }
    }

    // ---
    // merge_lines
    // ---

    #[test]
    fn mesclagem_soma_duplicatas_e_ordena_por_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged =
            merge_lines(&[line(a, 3), line(b, 1), line(a, 2)]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&a], 5);
        assert_eq!(merged[&b], 1);
        let keys: Vec<Uuid> = merged.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn mesclagem_rejeita_lista_vazia_e_quantidade_nao_positiva() {
        assert!(merge_lines(&[]).is_err());
        assert!(merge_lines(&[line(Uuid::new_v4(), 0)]).is_err());
        assert!(merge_lines(&[line(Uuid::new_v4(), -3)]).is_err());
    }

    #[test]
    fn mesclagem_rejeita_soma_que_estoura_o_limite() {
        // Linhas individualmente válidas cuja soma não cabe em i64.
        let a = Uuid::new_v4();
        let err = merge_lines(&[line(a, i64::MAX), line(a, 1)]).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    // ---
    // Fornecimentos
    // ---

    #[tokio::test]
    async fn fornecimento_mescla_linhas_e_incrementa_o_saldo() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let supplier = add_supplier(&store, company, "Fornecedor A").await;
        let p1 = add_product(&store, company, "Parafuso", 0).await;
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let view = service
            .create_supply(&actor, supplier, &[line(p1, 10), line(p1, 5)])
            .await
            .unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, p1);
        assert_eq!(view.items[0].quantity, 15);
        assert_eq!(quantity_of(&store, p1).await, 15);
    }

    #[tokio::test]
    async fn fornecimento_lista_todos_os_ids_ausentes_sem_mudar_estado() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let supplier = add_supplier(&store, company, "Fornecedor A").await;
        let p1 = add_product(&store, company, "Parafuso", 0).await;
        let ghost_a = Uuid::new_v4();
        let ghost_b = Uuid::new_v4();
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let err = service
            .create_supply(&actor, supplier, &[line(p1, 4), line(ghost_a, 1), line(ghost_b, 2)])
            .await
            .unwrap_err();

        match err {
            AppError::ProductsNotFound(missing) => {
                assert_eq!(missing.len(), 2);
                assert!(missing.contains(&ghost_a));
                assert!(missing.contains(&ghost_b));
            }
            other => panic!("erro inesperado: {other:?}"),
        }
        assert_eq!(quantity_of(&store, p1).await, 0);
        assert!(store.state.lock().await.supplies.is_empty());
    }

    #[tokio::test]
    async fn fornecimento_rejeita_fornecedor_de_outra_empresa() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let other = Uuid::new_v4();
        let foreign_supplier = add_supplier(&store, other, "Alheio").await;
        let p1 = add_product(&store, company, "Parafuso", 0).await;
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let err = service
            .create_supply(&actor, foreign_supplier, &[line(p1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(quantity_of(&store, p1).await, 0);
    }

    #[tokio::test]
    async fn fornecimento_rejeita_produto_de_outra_empresa() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let other = Uuid::new_v4();
        let supplier = add_supplier(&store, company, "Fornecedor A").await;
        let mine = add_product(&store, company, "Meu", 0).await;
        let foreign = add_product(&store, other, "Alheio", 0).await;
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let err = service
            .create_supply(&actor, supplier, &[line(mine, 3), line(foreign, 3)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(quantity_of(&store, mine).await, 0);
        assert_eq!(quantity_of(&store, foreign).await, 0);
    }

    #[tokio::test]
    async fn fornecimentos_concorrentes_somam_sem_perder_atualizacao() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let supplier = add_supplier(&store, company, "Fornecedor A").await;
        let p1 = add_product(&store, company, "Parafuso", 0).await;
        let service = StockService::new(Arc::new(store.clone()));

        let mut set = JoinSet::new();
        for qty in [10i64, 7, 3] {
            let service = service.clone();
            let actor = member(company);
            set.spawn(async move {
                service.create_supply(&actor, supplier, &[line(p1, qty)]).await
            });
        }
        while let Some(res) = set.join_next().await {
            res.unwrap().unwrap();
        }
        assert_eq!(quantity_of(&store, p1).await, 20);
    }

    // ---
    // Vendas
    // ---

    #[tokio::test]
    async fn venda_insuficiente_falha_sem_mudar_estado() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let p1 = add_product(&store, company, "Parafuso", 15).await;
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let err = service.create_sale(&actor, p1, 20, None).await.unwrap_err();
        match &err {
            AppError::InsufficientStock { available } => assert_eq!(*available, 15),
            other => panic!("erro inesperado: {other:?}"),
        }
        assert!(err.to_string().contains("15"));
        assert_eq!(quantity_of(&store, p1).await, 15);
        assert!(store.state.lock().await.sales.is_empty());
    }

    #[tokio::test]
    async fn venda_decrementa_e_usa_preco_de_tabela_por_padrao() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let p1 = add_product(&store, company, "Parafuso", 15).await;
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let sale = service.create_sale(&actor, p1, 5, None).await.unwrap();
        assert_eq!(sale.quantity, 5);
        assert_eq!(sale.unit_price, Decimal::new(9990, 2));
        assert_eq!(quantity_of(&store, p1).await, 10);

        let explicit = service
            .create_sale(&actor, p1, 1, Some(Decimal::new(12345, 2)))
            .await
            .unwrap();
        assert_eq!(explicit.unit_price, Decimal::new(12345, 2));
    }

    #[tokio::test]
    async fn venda_rejeita_produto_de_outra_empresa() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let other = Uuid::new_v4();
        let foreign = add_product(&store, other, "Alheio", 10).await;
        let service = StockService::new(Arc::new(store.clone()));
        let actor = member(company);

        let err = service.create_sale(&actor, foreign, 1, None).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(quantity_of(&store, foreign).await, 10);
    }

    #[tokio::test]
    async fn vendas_concorrentes_nunca_negativam_o_saldo() {
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let p1 = add_product(&store, company, "Parafuso", 5).await;
        let service = StockService::new(Arc::new(store.clone()));

        let mut set = JoinSet::new();
        for _ in 0..10 {
            let service = service.clone();
            let actor = member(company);
            set.spawn(async move { service.create_sale(&actor, p1, 1, None).await });
        }
        let mut ok = 0;
        let mut insufficient = 0;
        while let Some(res) = set.join_next().await {
            match res.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::InsufficientStock { .. }) => insufficient += 1,
                Err(other) => panic!("erro inesperado: {other:?}"),
            }
        }
        assert_eq!(ok, 5);
        assert_eq!(insufficient, 5);
        assert_eq!(quantity_of(&store, p1).await, 0);
    }

    #[tokio::test]
    async fn vendas_concorrentes_de_lote_respeitam_o_teto() {
        // Q=5, cada venda pede 2: no máximo floor(5/2)=2 sucessos.
        let store = MemStockStore::default();
        let company = Uuid::new_v4();
        let p1 = add_product(&store, company, "Parafuso", 5).await;
        let service = StockService::new(Arc::new(store.clone()));

        let mut set = JoinSet::new();
        for _ in 0..5 {
            let service = service.clone();
            let actor = member(company);
            set.spawn(async move { service.create_sale(&actor, p1, 2, None).await });
        }
        let mut ok = 0;
        while let Some(res) = set.join_next().await {
            if res.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 2);
        assert_eq!(quantity_of(&store, p1).await, 1);
    }

    // ---
    // Leituras escopadas
    // ---

    #[tokio::test]
    async fn leituras_sao_escopadas_pela_empresa() {
        let store = MemStockStore::default();
        let company_a = Uuid::new_v4();
        let company_b = Uuid::new_v4();
        let supplier_a = add_supplier(&store, company_a, "Fornecedor A").await;
        let p_a = add_product(&store, company_a, "Parafuso", 0).await;
        let service = StockService::new(Arc::new(store.clone()));

        let actor_a = member(company_a);
        let actor_b = member(company_b);
        let supply = service
            .create_supply(&actor_a, supplier_a, &[line(p_a, 10)])
            .await
            .unwrap();

        assert_eq!(service.list_supplies(&actor_a).await.unwrap().len(), 1);
        assert!(service.list_supplies(&actor_b).await.unwrap().is_empty());

        // Fora do escopo: indistinguível de inexistente (404).
        let err = service.get_supply(&actor_b, supply.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Sem empresa: lista vazia, não erro.
        let outsider = User {
            company_id: None,
            ..member(company_a)
        };
        assert!(service.list_supplies(&outsider).await.unwrap().is_empty());
        assert!(service.list_sales(&outsider).await.unwrap().is_empty());
    }
}
