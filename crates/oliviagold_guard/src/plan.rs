//! Ordered deletion plans.
//!
//! Each step names the parent tables its rows reference. Steps are grouped
//! into waves so a table is only emptied after every table referencing it
//! has been emptied (children before parents).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::client::is_valid_identifier;

/// Errors raised while building a deletion plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("deletion plan is empty")]
    Empty,

    #[error("invalid table name '{0}'")]
    InvalidTable(String),

    #[error("table '{0}' appears more than once")]
    DuplicateTable(String),

    #[error("table '{table}' depends on unknown table '{parent}'")]
    UnknownDependency { table: String, parent: String },

    #[error("dependency cycle among tables: {0}")]
    Cycle(String),
}

/// One table to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletionStep {
    /// Human-readable name used in status lines.
    pub entity: String,
    pub table: String,
    /// Parent tables this table's rows reference.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl DeletionStep {
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, parents: &[&str]) -> Self {
        self.depends_on
            .extend(parents.iter().map(|p| p.to_string()));
        self
    }
}

/// A validated, dependency-ordered set of deletion steps.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    steps: Vec<DeletionStep>,
    /// Indices into `steps`, one inner vec per wave.
    waves: Vec<Vec<usize>>,
}

impl DeletionPlan {
    pub fn new(steps: Vec<DeletionStep>) -> Result<Self, PlanError> {
        if steps.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, step) in steps.iter().enumerate() {
            if !is_valid_identifier(&step.table) {
                return Err(PlanError::InvalidTable(step.table.clone()));
            }
            if index.insert(step.table.as_str(), i).is_some() {
                return Err(PlanError::DuplicateTable(step.table.clone()));
            }
        }

        // parents[i]: distinct parent indices of step i, self references dropped
        let mut parents: Vec<Vec<usize>> = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let mut seen = HashSet::new();
            let mut list = Vec::new();
            for parent in &step.depends_on {
                let &p = index.get(parent.as_str()).ok_or_else(|| PlanError::UnknownDependency {
                    table: step.table.clone(),
                    parent: parent.clone(),
                })?;
                if p != i && seen.insert(p) {
                    list.push(p);
                }
            }
            parents.push(list);
        }

        let mut pending_children = vec![0usize; steps.len()];
        for list in &parents {
            for &p in list {
                pending_children[p] += 1;
            }
        }

        let mut done = vec![false; steps.len()];
        let mut remaining = steps.len();
        let mut waves = Vec::new();
        while remaining > 0 {
            let wave: Vec<usize> = (0..steps.len())
                .filter(|&i| !done[i] && pending_children[i] == 0)
                .collect();
            if wave.is_empty() {
                let stuck: Vec<&str> = (0..steps.len())
                    .filter(|&i| !done[i])
                    .map(|i| steps[i].table.as_str())
                    .collect();
                return Err(PlanError::Cycle(stuck.join(", ")));
            }
            for &i in &wave {
                done[i] = true;
                for &p in &parents[i] {
                    pending_children[p] -= 1;
                }
            }
            remaining -= wave.len();
            waves.push(wave);
        }

        Ok(Self { steps, waves })
    }

    /// The storefront's tables, children declared before their parents.
    pub fn shop_default() -> Self {
        let steps = vec![
            DeletionStep::new("order items", "order_items")
                .depends_on(&["orders", "product_variants"]),
            DeletionStep::new("payments", "payments").depends_on(&["orders"]),
            DeletionStep::new("cart items", "cart_items")
                .depends_on(&["carts", "product_variants"]),
            DeletionStep::new("wishlist items", "wishlist_items")
                .depends_on(&["customers", "products"]),
            DeletionStep::new("reviews", "reviews").depends_on(&["customers", "products"]),
            DeletionStep::new("product images", "product_images").depends_on(&["products"]),
            DeletionStep::new("orders", "orders").depends_on(&["customers", "addresses"]),
            DeletionStep::new("carts", "carts").depends_on(&["customers"]),
            DeletionStep::new("product variants", "product_variants").depends_on(&["products"]),
            DeletionStep::new("addresses", "addresses").depends_on(&["customers"]),
            DeletionStep::new("products", "products").depends_on(&["categories"]),
            DeletionStep::new("customers", "customers"),
            DeletionStep::new("categories", "categories").depends_on(&["categories"]),
        ];
        match Self::new(steps) {
            Ok(plan) => plan,
            Err(err) => unreachable!("built-in deletion plan is invalid: {}", err),
        }
    }

    /// Steps as declared.
    pub fn steps(&self) -> &[DeletionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps grouped by dependency wave, declaration order within a wave.
    pub fn waves(&self) -> Vec<Vec<&DeletionStep>> {
        self.waves
            .iter()
            .map(|wave| wave.iter().map(|&i| &self.steps[i]).collect())
            .collect()
    }

    /// Steps in execution order.
    pub fn ordered(&self) -> impl Iterator<Item = &DeletionStep> + '_ {
        self.waves.iter().flatten().map(move |&i| &self.steps[i])
    }
}
