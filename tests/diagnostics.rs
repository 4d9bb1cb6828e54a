use extparse::{CompiledGrammar, Grammar, ParseResult, Parser, Rule, SyntaxError, Terminal};

fn calc() -> CompiledGrammar {
    Grammar::new(Terminal::regex("Trivia", r"\s*").unwrap())
        .rule(
            "Expr",
            [
                Terminal::regex("Number", r"\d+").unwrap().into(),
                Rule::seq(
                    "Parens",
                    [Rule::literal("("), Rule::reference("Expr"), Rule::literal(")")],
                ),
                Rule::seq(
                    "Add",
                    [Rule::reference("Expr"), Rule::literal("+"), Rule::req("Expr", 10)],
                ),
                Rule::seq(
                    "Mul",
                    [Rule::reference("Expr"), Rule::literal("*"), Rule::req("Expr", 20)],
                ),
            ],
        )
        .build("Expr")
        .unwrap()
}

fn first_error(input: &str) -> SyntaxError {
    let grammar = calc();
    let (result, _) = Parser::new(&grammar).parse(input, "Expr");
    result.errors().first().cloned().unwrap()
}

#[test]
fn error_on_second_line() {
    let error = first_error("1 +\n2 * * 3");
    assert_eq!(error.offset, 8);
    insta::assert_snapshot!(error.to_string(), @r"
    (2,5): Expected: Number, (
    ...1 +\n2 * * 3...
                ^
    ");
}

#[test]
fn short_success_reports_the_rest() {
    let input = "1 +\n2 * * 3";
    let grammar = calc();
    let (result, consumed) = Parser::new(&grammar).parse(input, "Expr");
    let ParseResult::Success { node, end_pos, errors } = result else {
        panic!("expected a short success");
    };
    assert_eq!(node.text(input), "1 +\n2");
    assert_eq!((end_pos, consumed), (6, 6));
    assert_eq!(errors.len(), 1);
}

#[test]
fn crlf_and_multibyte_chars() {
    let input = "(1 +\r\n λ)";
    let grammar = calc();
    let (result, consumed) = Parser::new(&grammar).parse(input, "Expr");
    let ParseResult::Failure { error } = result else {
        panic!("expected failure");
    };
    assert_eq!(consumed, 7);
    assert_eq!((error.line, error.col), (2, 2));
    insta::assert_snapshot!(error.to_string(), @r"
    (2,2): Expected: Number, (
    ...(1 +\r\n λ)...
                ^
    ");
}

#[test]
fn long_line_is_cut_around_the_error() {
    let input = "1+".repeat(40) + "+";
    let error = first_error(&input);
    assert_eq!((error.offset, error.col), (80, 81));
    assert_eq!(
        error.to_string(),
        format!(
            "(1,81): Expected: Number, (\n...{}+...\n{}^",
            "1+".repeat(15),
            " ".repeat(33)
        )
    );
}

#[test]
fn expected_names_are_merged_ignoring_case() {
    let grammar = Grammar::new(Terminal::regex("Trivia", r"\s*").unwrap())
        .rule(
            "Stmt",
            [
                Rule::seq(
                    "If",
                    [Terminal::literal_with_kind("if", "Keyword").into(), Rule::literal("x")],
                ),
                Rule::seq(
                    "Loop",
                    [Terminal::regex("keyword", "while|for").unwrap().into(), Rule::literal("x")],
                ),
                Terminal::regex("Number", r"\d+").unwrap().into(),
            ],
        )
        .build("Stmt")
        .unwrap();

    let (result, _) = Parser::new(&grammar).parse("  ?", "Stmt");
    let error = &result.errors()[0];
    assert_eq!(error.offset, 2);
    assert_eq!(error.expected, ["Keyword", "Number"]);
}
