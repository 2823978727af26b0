//! Query builder over a memory table

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::model::{
    EagerLoads, Model, ModelDescriptor, Page, QueryBuilder, RelationConstraint, SimplePage,
};
use crate::domain::DomainError;

use super::table::MemoryTable;

/// Comparison applied by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
struct Filter {
    column: String,
    operator: Operator,
    value: Value,
}

impl Filter {
    fn matches(&self, row: &Value) -> bool {
        let field = row.get(&self.column).unwrap_or(&Value::Null);

        match self.operator {
            Operator::Eq => field == &self.value,
            Operator::Ne => field != &self.value,
            Operator::Gt => compare(field, &self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare(field, &self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Orders two JSON scalars of the same kind
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Query against a [`MemoryTable`].
///
/// Supports filters, ordering, limit and offset. Eager loads are carried for
/// fingerprinting and tagging only; related rows are not attached.
#[derive(Debug)]
pub struct MemoryQuery<M: Model> {
    table: Arc<MemoryTable<M>>,
    filters: Vec<Filter>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
    offset: Option<usize>,
    eager: EagerLoads,
    with_trashed: bool,
}

impl<M: Model> Clone for MemoryQuery<M> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            filters: self.filters.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
            eager: self.eager.clone(),
            with_trashed: self.with_trashed,
        }
    }
}

impl<M: Model> MemoryQuery<M> {
    pub fn new(table: Arc<MemoryTable<M>>) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            eager: EagerLoads::new(),
            with_trashed: false,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Eager-loads a relation path
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.eager.insert(path.into(), None);
        self
    }

    pub fn with_constraint(mut self, path: impl Into<String>, constraint: RelationConstraint) -> Self {
        self.eager.insert(path.into(), Some(constraint));
        self
    }

    /// Includes soft-deleted rows
    pub fn with_trashed(mut self) -> Self {
        self.with_trashed = true;
        self
    }

    /// Rows matching every filter, ordered, before limit and offset
    fn matching(&self) -> Result<Vec<M>, DomainError> {
        let rows = self.table.read_rows();
        let mut matched = Vec::new();

        for row in rows.iter() {
            if row.deleted && !self.with_trashed {
                continue;
            }

            let json = serde_json::to_value(&row.record)?;
            if self.filters.iter().all(|f| f.matches(&json)) {
                matched.push((json, row.record.clone()));
            }
        }

        if !self.order.is_empty() {
            matched.sort_by(|(a, _), (b, _)| {
                for (column, direction) in &self.order {
                    let left = a.get(column).unwrap_or(&Value::Null);
                    let right = b.get(column).unwrap_or(&Value::Null);
                    let ordering = compare(left, right).unwrap_or(Ordering::Equal);
                    let ordering = match direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        Ok(matched.into_iter().map(|(_, record)| record).collect())
    }

    /// Applies this query's own offset and limit
    fn windowed(&self) -> Result<Vec<M>, DomainError> {
        let rows = self.matching()?;
        let skip = self.offset.unwrap_or(0);
        let take = self.limit.unwrap_or(usize::MAX);

        Ok(rows.into_iter().skip(skip).take(take).collect())
    }

    fn record(&self, statement: String) {
        self.table.log().record(statement);
    }

    fn select(&self, columns: &[String]) -> String {
        self.to_sql().replacen("select *", &format!("select {}", columns.join(", ")), 1)
    }
}

#[async_trait]
impl<M: Model> QueryBuilder<M> for MemoryQuery<M> {
    fn model(&self) -> &ModelDescriptor {
        self.table.model()
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("select * from {}", self.table.model().table);

        let mut conditions: Vec<String> = self
            .filters
            .iter()
            .map(|f| format!("{} {} ?", f.column, f.operator))
            .collect();

        if self.table.soft_deletes() && !self.with_trashed {
            conditions.push("deleted_at is null".to_string());
        }

        if !conditions.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&conditions.join(" and "));
        }

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| match direction {
                    Direction::Asc => format!("{} asc", column),
                    Direction::Desc => format!("{} desc", column),
                })
                .collect();
            sql.push_str(" order by ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" limit {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" offset {}", offset));
        }

        sql
    }

    fn bindings(&self) -> Vec<Value> {
        self.filters.iter().map(|f| f.value.clone()).collect()
    }

    fn eager_loads(&self) -> &EagerLoads {
        &self.eager
    }

    async fn get(&self, columns: &[String]) -> Result<Vec<M>, DomainError> {
        self.record(self.select(columns));
        self.windowed()
    }

    async fn first(&self, columns: &[String]) -> Result<Option<M>, DomainError> {
        self.record(format!("{} limit 1", self.select(columns)));
        Ok(self.windowed()?.into_iter().next())
    }

    async fn find(&self, id: &Value, columns: &[String]) -> Result<Option<M>, DomainError> {
        self.record(format!("{} [key = {}]", self.select(columns), id));
        Ok(self
            .matching()?
            .into_iter()
            .find(|record| &record.key() == id))
    }

    async fn find_many(&self, ids: &[Value], columns: &[String]) -> Result<Vec<M>, DomainError> {
        self.record(format!("{} [key in {}]", self.select(columns), ids.len()));
        Ok(self
            .matching()?
            .into_iter()
            .filter(|record| ids.contains(&record.key()))
            .collect())
    }

    async fn paginate(
        &self,
        per_page: u32,
        page: u32,
        columns: &[String],
    ) -> Result<Page<M>, DomainError> {
        self.record(format!("{} [page {} of {}]", self.select(columns), page, per_page));

        let rows = self.matching()?;
        let total = rows.len() as u64;
        let skip = page.saturating_sub(1) as usize * per_page as usize;
        let items = rows.into_iter().skip(skip).take(per_page as usize).collect();

        Ok(Page::new(items, total, per_page, page))
    }

    async fn simple_paginate(
        &self,
        per_page: u32,
        page: u32,
        columns: &[String],
    ) -> Result<SimplePage<M>, DomainError> {
        self.record(format!("{} [simple page {} of {}]", self.select(columns), page, per_page));

        let skip = page.saturating_sub(1) as usize * per_page as usize;
        let mut items: Vec<M> = self
            .matching()?
            .into_iter()
            .skip(skip)
            .take(per_page as usize + 1)
            .collect();

        let has_more = items.len() > per_page as usize;
        items.truncate(per_page as usize);

        Ok(SimplePage {
            items,
            per_page,
            current_page: page,
            has_more,
        })
    }

    async fn count(&self) -> Result<u64, DomainError> {
        self.record(self.to_sql().replacen("select *", "select count(*)", 1));
        Ok(self.windowed()?.len() as u64)
    }

    async fn exists(&self) -> Result<bool, DomainError> {
        self.record(self.to_sql().replacen("select *", "select exists(*)", 1));
        Ok(!self.windowed()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ModelEvents;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Product {
        id: u64,
        name: String,
        price: u32,
    }

    impl Model for Product {
        fn key(&self) -> Value {
            Value::from(self.id)
        }
    }

    async fn seeded() -> Arc<MemoryTable<Product>> {
        let table = Arc::new(
            MemoryTable::new(
                ModelDescriptor::new("Product", "products"),
                Arc::new(ModelEvents::new()),
            )
            .with_soft_deletes(),
        );

        for (id, name, price) in [(1, "Laptop", 900), (2, "Mouse", 20), (3, "Monitor", 250)] {
            table
                .insert(Product {
                    id,
                    name: name.to_string(),
                    price,
                })
                .await
                .unwrap();
        }

        table
    }

    fn all() -> Vec<String> {
        vec!["*".to_string()]
    }

    fn ids(products: &[Product]) -> Vec<u64> {
        products.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        let table = seeded().await;

        let cheap = table
            .query()
            .filter("price", Operator::Lt, 500)
            .order_by("price", Direction::Desc)
            .get(&all())
            .await
            .unwrap();
        assert_eq!(ids(&cheap), vec![3, 2]);

        let named = table.query().where_eq("name", "Mouse").first(&all()).await.unwrap();
        assert_eq!(named.map(|p| p.id), Some(2));
    }

    #[tokio::test]
    async fn test_sql_and_bindings() {
        let table = seeded().await;
        let query = table
            .query()
            .where_eq("name", "Mouse")
            .filter("price", Operator::Gte, 10)
            .order_by("id", Direction::Asc)
            .limit(5);

        assert_eq!(
            query.to_sql(),
            "select * from products where name = ? and price >= ? and deleted_at is null order by id asc limit 5"
        );
        assert_eq!(query.bindings(), vec![Value::from("Mouse"), Value::from(10)]);
    }

    #[tokio::test]
    async fn test_find_and_find_many() {
        let table = seeded().await;

        let found = table.query().find(&Value::from(3), &all()).await.unwrap();
        assert_eq!(found.map(|p| p.name), Some("Monitor".to_string()));

        let many = table
            .query()
            .find_many(&[Value::from(1), Value::from(3), Value::from(9)], &all())
            .await
            .unwrap();
        assert_eq!(ids(&many), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let table = seeded().await;

        let page = table.query().paginate(2, 2, &all()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(ids(&page.items), vec![3]);
        assert_eq!(page.last_page(), 2);

        let simple = table.query().simple_paginate(2, 1, &all()).await.unwrap();
        assert!(simple.has_more);
        assert_eq!(simple.items.len(), 2);
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_are_hidden() {
        let table = seeded().await;
        table.delete(&Value::from(2)).await.unwrap();

        assert_eq!(table.query().count().await.unwrap(), 2);
        assert_eq!(table.query().with_trashed().count().await.unwrap(), 3);

        table.restore(&Value::from(2)).await.unwrap();
        assert!(table.query().where_eq("id", 2).exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_every_read_is_logged() {
        let table = seeded().await;

        table.query().get(&all()).await.unwrap();
        table.query().count().await.unwrap();

        let statements = table.log().statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with("select count(*) from products"));
    }

    #[test]
    fn test_compare_mixed_kinds() {
        assert_eq!(compare(&Value::from(1), &Value::from(2.5)), Some(Ordering::Less));
        assert_eq!(compare(&Value::from("a"), &Value::from(1)), None);
    }
}
