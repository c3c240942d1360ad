//! FK-aware topological ordering of entities
//!
//! Referenced tables must be created before the tables pointing at them and
//! dropped after them. Uses a depth-first search with in-progress/done marks;
//! reaching an in-progress table again means a cycle and the whole resolution fails.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{DdlError, Result};
use crate::schema::TableContext;
use crate::types::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Orders entities for safe CREATE / DROP sequencing
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Entities ordered so every referenced table precedes its dependents
    ///
    /// Entities are visited in context order, so unrelated tables keep their
    /// relative input order. Dependencies on tables outside the context are ignored.
    pub fn resolve_creation_order<'a>(&self, context: &'a TableContext) -> Result<Vec<&'a Entity>> {
        let mut by_table: HashMap<String, &'a Entity> = HashMap::new();
        let mut tables: Vec<String> = Vec::with_capacity(context.entities().len());
        for entity in context.entities() {
            let table = entity.table_name();
            if !by_table.contains_key(&table) {
                by_table.insert(table.clone(), entity);
                tables.push(table);
            }
        }

        let mut marks: HashMap<String, Mark> = HashMap::new();
        let mut order: Vec<&'a Entity> = Vec::with_capacity(tables.len());

        for table in &tables {
            visit(table, context, &by_table, &mut marks, &mut order)?;
        }

        debug!(
            order = ?order.iter().map(|e| e.table_name()).collect::<Vec<_>>(),
            "Resolved table creation order"
        );
        Ok(order)
    }

    /// Exact reverse of [`resolve_creation_order`](Self::resolve_creation_order)
    pub fn resolve_deletion_order<'a>(&self, context: &'a TableContext) -> Result<Vec<&'a Entity>> {
        let mut order = self.resolve_creation_order(context)?;
        order.reverse();
        Ok(order)
    }
}

fn visit<'a>(
    table: &str,
    context: &TableContext,
    by_table: &HashMap<String, &'a Entity>,
    marks: &mut HashMap<String, Mark>,
    order: &mut Vec<&'a Entity>,
) -> Result<()> {
    match marks.get(table) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => return Err(DdlError::circular_dependency(table)),
        None => {}
    }

    let Some(&entity) = by_table.get(table) else {
        return Ok(());
    };

    marks.insert(table.to_string(), Mark::InProgress);
    for dependency in context.dependencies_of(table) {
        if by_table.contains_key(dependency) {
            visit(dependency, context, by_table, marks, order)?;
        }
    }
    marks.insert(table.to_string(), Mark::Done);

    order.push(entity);
    Ok(())
}
