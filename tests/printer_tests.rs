// tests/printer_tests.rs

use dotquery::parse;

fn canonical(query: &str) -> String {
    parse(query).unwrap().to_string()
}

#[test]
fn test_precedence_is_made_explicit() {
    insta::assert_snapshot!(canonical("1 + 2 * 3 - 4"), @"((1 + (2 * 3)) - 4)");
    insta::assert_snapshot!(canonical("true || false && false"), @"(true || (false && false))");
    insta::assert_snapshot!(canonical("a OR b AND c"), @"(a || (b && c))");
    insta::assert_snapshot!(canonical("a ?? b ?? c"), @"((a ?? b) ?? c)");
}

#[test]
fn test_member_chains() {
    insta::assert_snapshot!(
        canonical("site.children.filter('listed').first.title"),
        @"site.children.filter('listed').first.title"
    );
    insta::assert_snapshot!(canonical("page?.parent.title"), @"page?.parent?.title");
    insta::assert_snapshot!(canonical("items.0.1"), @"items.0.1");
}

#[test]
fn test_ternaries() {
    insta::assert_snapshot!(canonical("x > 5 ? 'big' : 'small'"), @"((x > 5) ? 'big' : 'small')");
    insta::assert_snapshot!(canonical("title ?: 'untitled'"), @"(title ?: 'untitled')");
}

#[test]
fn test_closures() {
    insta::assert_snapshot!(
        canonical("items.map((item) => item.price * 2)"),
        @"items.map(fn(item) => (item.price * 2))"
    );
}

#[test]
fn test_literals() {
    insta::assert_snapshot!(canonical("[1, 2.5, 'it\\'s', NULL, TRUE]"), @r"[1, 2.5, 'it\'s', null, true]");
    insta::assert_snapshot!(canonical("-x"), @"(0 - x)");
}

#[test]
fn test_reparses_to_same_tree() {
    for query in [
        "a.b?.c(1, 'x').d",
        "x ?: y ? 1 : 2",
        "fn(a, b) => a + b",
        "(fn(x) => x).call",
        "(fn(a) => a) + 1",
        "-1.5 - -2",
        "items.0.1",
        "'it\\'s' == \"it's\"",
    ] {
        let printed = canonical(query);
        assert_eq!(parse(&printed).unwrap(), parse(query).unwrap(), "{}", printed);
    }
}

#[test]
fn test_float_keeps_decimal_point() {
    assert_eq!(canonical("2.0"), "2.0");
    assert_eq!(canonical("(1).0"), "(1).0");
}
