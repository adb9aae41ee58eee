use super::*;

#[test]
fn test_quote_ident_doubles_quotes() {
    assert_eq!(quote_ident(r#"order"s"#), r#""order""s""#);
    assert_eq!(quote_ident("analytics.orders"), r#""analytics.orders""#);
}

#[test]
fn test_quote_qualified_quotes_each_part() {
    assert_eq!(
        quote_qualified("warehouse.analytics.orders"),
        r#""warehouse"."analytics"."orders""#
    );
    assert_eq!(quote_qualified("orders"), r#""orders""#);
}

#[test]
fn test_backtick_wraps_whole_name() {
    assert_eq!(backtick("proj.analytics.orders"), "`proj.analytics.orders`");
    assert_eq!(backtick("a`b"), "`a\\`b`");
}

#[test]
fn test_escape_sql_string_doubles_single_quotes() {
    assert_eq!(escape_sql_string("customer's orders"), "customer''s orders");
    assert_eq!(escape_sql_string("''"), "''''");
}

#[test]
fn test_double_quoted_literal_escapes() {
    assert_eq!(double_quoted_literal("Order total"), r#""Order total""#);
    assert_eq!(
        double_quoted_literal(r#"the "net" amount"#),
        r#""the \"net\" amount""#
    );
    assert_eq!(double_quoted_literal("line\tone\nline two"), r#""line\tone\nline two""#);
    assert_eq!(double_quoted_literal(r"C:\tmp"), r#""C:\\tmp""#);
}
