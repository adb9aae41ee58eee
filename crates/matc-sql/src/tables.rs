//! Table reference discovery and renaming
//!
//! Both helpers walk relations with sqlparser's visitor. Only references
//! written as exactly `schema.table` take part; bare names (including CTE
//! references) and three-part names are ignored.

use crate::dialect::parse_sql;
use crate::error::SqlResult;
use sqlparser::ast::{visit_relations, visit_relations_mut, Ident, ObjectName, ObjectNamePart};
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

fn name_parts(name: &ObjectName) -> Option<Vec<&str>> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident.value.as_str()),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .collect()
}

/// `schema.table` references used by the SQL, lower-cased, in first-seen order
pub fn used_tables(sql: &str, dialect: &str) -> SqlResult<Vec<String>> {
    let statements = parse_sql(sql, dialect)?;
    let mut seen = HashSet::new();
    let mut tables = Vec::new();

    for stmt in &statements {
        let _ = visit_relations(stmt, |relation| {
            if let Some(parts) = name_parts(relation) {
                if parts.len() == 2 {
                    let reference = parts.join(".").to_lowercase();
                    if seen.insert(reference.clone()) {
                        tables.push(reference);
                    }
                }
            }
            ControlFlow::<()>::Continue(())
        });
    }

    Ok(tables)
}

/// Rewrite `schema.table` references found in `mapping`.
///
/// Keys are matched case-insensitively; values must be `schema.table` too.
/// Statements are re-serialized and joined with `;\n`. An empty mapping
/// returns the input untouched.
pub fn rename_tables(
    sql: &str,
    dialect: &str,
    mapping: &HashMap<String, String>,
) -> SqlResult<String> {
    if mapping.is_empty() {
        return Ok(sql.to_string());
    }

    let lookup: HashMap<String, &str> = mapping
        .iter()
        .map(|(from, to)| (from.to_lowercase(), to.as_str()))
        .collect();

    let mut statements = parse_sql(sql, dialect)?;
    for stmt in &mut statements {
        let _ = visit_relations_mut(stmt, |name: &mut ObjectName| {
            let replacement = name_parts(name)
                .filter(|parts| parts.len() == 2)
                .and_then(|parts| lookup.get(&parts.join(".").to_lowercase()).copied());

            if let Some(target) = replacement {
                name.0 = target
                    .split('.')
                    .map(|part| ObjectNamePart::Identifier(Ident::new(part)))
                    .collect();
            }
            ControlFlow::<()>::Continue(())
        });
    }

    Ok(statements
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(";\n"))
}

#[cfg(test)]
#[path = "tables_test.rs"]
mod tests;
