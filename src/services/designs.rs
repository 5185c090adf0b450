// src/services/designs.rs

//! Read-only view of the design registry, plus the sales-count bump. Designs
//! are owned by the CRUD side of the application; fulfillment only needs the
//! catalog product id and a title for confirmation emails.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::PgPool;

use crate::errors::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DesignSummary {
  pub id: String,
  pub title: String,
  /// Set once the design has been published as a sellable catalog product.
  /// `None` is a hard fulfillment precondition failure.
  pub printify_product_id: Option<String>,
}

#[async_trait]
pub trait DesignRegistry: Send + Sync {
  async fn get_design(&self, design_id: &str) -> Result<Option<DesignSummary>>;

  /// Best-effort bookkeeping; callers log and continue on failure.
  async fn increment_sales(&self, design_id: &str, quantity: i64) -> Result<()>;
}

pub struct PgDesignRegistry {
  pool: PgPool,
}

impl PgDesignRegistry {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl DesignRegistry for PgDesignRegistry {
  async fn get_design(&self, design_id: &str) -> Result<Option<DesignSummary>> {
    let design = sqlx::query_as::<_, DesignSummary>(
      "SELECT id, title, printify_product_id FROM designs WHERE id = $1",
    )
    .bind(design_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(design)
  }

  async fn increment_sales(&self, design_id: &str, quantity: i64) -> Result<()> {
    sqlx::query("UPDATE designs SET sales_count = sales_count + $2 WHERE id = $1")
      .bind(design_id)
      .bind(quantity)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

/// In-memory registry for tests and local development without a database.
#[derive(Default)]
pub struct MemoryDesignRegistry {
  designs: RwLock<HashMap<String, DesignSummary>>,
  sales: RwLock<HashMap<String, i64>>,
}

impl MemoryDesignRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, design: DesignSummary) {
    self.designs.write().insert(design.id.clone(), design);
  }

  pub fn sales_count(&self, design_id: &str) -> i64 {
    self.sales.read().get(design_id).copied().unwrap_or(0)
  }
}

#[async_trait]
impl DesignRegistry for MemoryDesignRegistry {
  async fn get_design(&self, design_id: &str) -> Result<Option<DesignSummary>> {
    Ok(self.designs.read().get(design_id).cloned())
  }

  async fn increment_sales(&self, design_id: &str, quantity: i64) -> Result<()> {
    *self.sales.write().entry(design_id.to_string()).or_insert(0) += quantity;
    Ok(())
  }
}
