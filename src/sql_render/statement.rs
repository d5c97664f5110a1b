use serde::{Deserialize, Serialize};

use super::ToSql;
use crate::join_walker::JoinType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expression: String,
    pub col_alias: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectItems(pub Vec<SelectItem>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromTable {
    pub table_name: String,
    pub alias: String,
}

/// `lhs_alias.lhs_column = rhs_alias.rhs_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinCondition {
    pub lhs_alias: String,
    pub lhs_column: String,
    pub rhs_alias: String,
    pub rhs_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub table_name: String,
    pub table_alias: String,
    pub join_type: JoinType,
    pub joining_on: Vec<JoinCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinItems(pub Vec<Join>);

/// Conjunction of WHERE predicates, rendered in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItems(pub Vec<String>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByItems(pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub select: SelectItems,
    pub from: FromTable,
    pub joins: JoinItems,
    pub filters: FilterItems,
    pub order_by: OrderByItems,
}

impl ToSql for SelectItem {
    fn to_sql(&self) -> String {
        format!("{} AS {}", self.expression, self.col_alias)
    }
}

impl ToSql for SelectItems {
    fn to_sql(&self) -> String {
        let items: Vec<String> = self.0.iter().map(|item| item.to_sql()).collect();
        format!("SELECT {}\n", items.join(", "))
    }
}

impl ToSql for FromTable {
    fn to_sql(&self) -> String {
        format!("FROM {} AS {}\n", self.table_name, self.alias)
    }
}

impl ToSql for JoinCondition {
    fn to_sql(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.lhs_alias, self.lhs_column, self.rhs_alias, self.rhs_column
        )
    }
}

impl ToSql for Join {
    fn to_sql(&self) -> String {
        let conditions: Vec<String> = self.joining_on.iter().map(|c| c.to_sql()).collect();
        format!(
            "{} {} AS {} ON {}\n",
            self.join_type.to_sql(),
            self.table_name,
            self.table_alias,
            conditions.join(" AND ")
        )
    }
}

impl ToSql for JoinItems {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        for join in &self.0 {
            sql.push_str(&join.to_sql());
        }
        sql
    }
}

impl ToSql for FilterItems {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return "".into();
        }
        format!("WHERE {}\n", self.0.join(" AND "))
    }
}

impl ToSql for OrderByItems {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return "".into();
        }
        format!("ORDER BY {}\n", self.0.join(", "))
    }
}

impl ToSql for SelectStatement {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        sql.push_str(&self.select.to_sql());
        sql.push_str(&self.from.to_sql());
        sql.push_str(&self.joins.to_sql());
        sql.push_str(&self.filters.to_sql());
        sql.push_str(&self.order_by.to_sql());
        // No trailing newline so statements compare and log cleanly
        sql.truncate(sql.trim_end().len());
        sql
    }
}
