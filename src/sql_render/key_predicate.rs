//! Key restriction of a loader statement.
//!
//! - single column, one key: `order0_.id = ?`
//! - single column, n keys: `order0_.id in (?, ?, ?)`
//! - composite key, one key: `order0_.a = ? and order0_.b = ?`
//! - composite key, n keys: `((order0_.a = ? and order0_.b = ?) or (...))`
//! - sub-select: `order0_.id in (select ...)`

use serde::{Deserialize, Serialize};

use super::ToSql;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPredicate {
    /// Positional parameters for `batch_size` keys
    Keys {
        alias: String,
        columns: Vec<String>,
        batch_size: usize,
    },
    /// Keys produced by a previously executed query
    Subselect {
        alias: String,
        columns: Vec<String>,
        subselect: String,
    },
}

impl KeyPredicate {
    pub fn keys(alias: impl Into<String>, columns: &[String], batch_size: usize) -> Self {
        KeyPredicate::Keys {
            alias: alias.into(),
            columns: columns.to_vec(),
            batch_size,
        }
    }

    pub fn subselect(alias: impl Into<String>, columns: &[String], subselect: impl Into<String>) -> Self {
        KeyPredicate::Subselect {
            alias: alias.into(),
            columns: columns.to_vec(),
            subselect: subselect.into(),
        }
    }

    /// Number of `?` placeholders in the rendered predicate.
    pub fn parameter_count(&self) -> usize {
        match self {
            KeyPredicate::Keys {
                columns,
                batch_size,
                ..
            } => columns.len() * batch_size,
            KeyPredicate::Subselect { .. } => 0,
        }
    }
}

fn qualified(alias: &str, columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| format!("{}.{}", alias, c)).collect()
}

impl ToSql for KeyPredicate {
    fn to_sql(&self) -> String {
        match self {
            KeyPredicate::Keys {
                alias,
                columns,
                batch_size,
            } => {
                let columns = qualified(alias, columns);
                if columns.len() == 1 {
                    if *batch_size == 1 {
                        format!("{} = ?", columns[0])
                    } else {
                        format!("{} in ({})", columns[0], vec!["?"; *batch_size].join(", "))
                    }
                } else {
                    let single = columns
                        .iter()
                        .map(|c| format!("{} = ?", c))
                        .collect::<Vec<_>>()
                        .join(" and ");
                    if *batch_size == 1 {
                        single
                    } else {
                        let disjuncts = vec![format!("({})", single); *batch_size];
                        format!("({})", disjuncts.join(" or "))
                    }
                }
            }
            KeyPredicate::Subselect {
                alias,
                columns,
                subselect,
            } => {
                let columns = qualified(alias, columns);
                if columns.len() == 1 {
                    format!("{} in ({})", columns[0], subselect)
                } else {
                    format!("({}) in ({})", columns.join(", "), subselect)
                }
            }
        }
    }
}
