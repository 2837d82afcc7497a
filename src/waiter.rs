//! Tenant registry
//!
//! A [`Waiter`] owns one logical table definition and hands out a [`Tenant`]
//! per tenant id, creating the tenant's physical table on first request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{Result, WaiterError};
use crate::executor::{SqlExecutor, Statement};
use crate::sql::ddl::SchemaCompiler;
use crate::tenant::Tenant;
use crate::types::TableSchema;

type TenantSlot = Arc<OnceCell<Arc<Tenant>>>;

/// Provisions and caches tenants of one logical table
///
/// Concurrent first requests for the same tenant id share a single
/// provisioning run. A failed run leaves nothing cached, so the next request
/// tries again.
pub struct Waiter {
    base_table: String,
    schema: Arc<TableSchema>,
    executor: Arc<dyn SqlExecutor>,
    tenants: Mutex<HashMap<String, TenantSlot>>,
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("base_table", &self.base_table)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Waiter {
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        base_table: impl Into<String>,
        schema: TableSchema,
    ) -> Self {
        Self {
            base_table: base_table.into(),
            schema: Arc::new(schema),
            executor,
            tenants: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Get the tenant for `tenant_id`, provisioning its table if needed
    ///
    /// Every successful call for the same id returns the same instance.
    pub async fn get_tenant(&self, tenant_id: &str) -> Result<Arc<Tenant>> {
        let slot = self.slot(tenant_id);

        let result = slot
            .get_or_try_init(|| self.provision(tenant_id))
            .await
            .cloned();

        if result.is_err() {
            self.release_slot(tenant_id, &slot);
        }

        result
    }

    /// Tenants whose tables have been provisioned, keyed by tenant id
    pub fn ready_tenants(&self) -> HashMap<String, Arc<Tenant>> {
        self.lock_tenants()
            .iter()
            .filter_map(|(id, slot)| slot.get().map(|t| (id.clone(), t.clone())))
            .collect()
    }

    fn slot(&self, tenant_id: &str) -> TenantSlot {
        self.lock_tenants()
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Drop an empty slot once no other request is waiting on it
    ///
    /// Slots are only cloned under the lock, so a strong count of two (the
    /// map and `slot`) means nobody else can still initialize it.
    fn release_slot(&self, tenant_id: &str, slot: &TenantSlot) {
        let mut tenants = self.lock_tenants();
        let unused = tenants.get(tenant_id).is_some_and(|existing| {
            Arc::ptr_eq(existing, slot) && !existing.initialized() && Arc::strong_count(slot) == 2
        });
        if unused {
            tenants.remove(tenant_id);
        }
    }

    // Never held across an await
    fn lock_tenants(&self) -> MutexGuard<'_, HashMap<String, TenantSlot>> {
        self.tenants.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn provision(&self, tenant_id: &str) -> Result<Arc<Tenant>> {
        let table = SchemaCompiler::physical_table_name(&self.base_table, tenant_id);

        let mut statements = vec![SchemaCompiler::compile_table(&table, &self.schema)?];
        statements.extend(SchemaCompiler::compile_indexes(&table, &self.schema)?);

        for sql in statements {
            debug!(table = %table, sql = %sql, "Provisioning tenant table");
            if let Err(e) = self.executor.execute(&Statement::new(sql)).await {
                warn!(table = %table, tenant_id, error = %e, "Tenant provisioning failed");
                return Err(WaiterError::provision(&table, e.to_string()));
            }
        }

        info!(table = %table, tenant_id, "Tenant table ready");

        Ok(Arc::new(Tenant::new(
            self.executor.clone(),
            self.schema.clone(),
            &self.base_table,
            tenant_id,
        )))
    }
}
