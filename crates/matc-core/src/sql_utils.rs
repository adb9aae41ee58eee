//! SQL identifier and literal quoting utilities shared by the dialect builders.

/// Quote a SQL identifier with double quotes, doubling embedded quotes.
///
/// # Examples
/// ```
/// use matc_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each dot-separated component of a name with double quotes.
///
/// # Examples
/// ```
/// use matc_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("staging.orders"), r#""staging"."orders""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Wrap a whole, possibly dotted, name in backticks.
///
/// # Examples
/// ```
/// use matc_core::sql_utils::backtick;
/// assert_eq!(backtick("project.dataset.table"), "`project.dataset.table`");
/// ```
pub fn backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "\\`"))
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a value as a double-quoted string literal with backslash escapes,
/// the form BigQuery accepts in `OPTIONS(description=...)`.
pub fn double_quoted_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
