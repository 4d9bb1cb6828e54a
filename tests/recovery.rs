use extparse::{CompiledGrammar, Grammar, ParseResult, Parser, ParserOptions, Rule, Terminal};
use indoc::indoc;

fn grammar() -> CompiledGrammar {
    let ident: Rule = Terminal::regex("Ident", r"[\l_]\w*").unwrap().into();
    let number: Rule = Terminal::regex("Number", r"\d+").unwrap().into();
    let semicolon = || Rule::often_missed("Missing", Rule::literal(";"));

    Grammar::new(Terminal::regex("Trivia", r"\s*").unwrap())
        .rule("Program", [Rule::zero_or_many("Program", Rule::reference("Stmt"))])
        .rule(
            "Stmt",
            [
                Rule::seq(
                    "Let",
                    [
                        Rule::literal("let"),
                        ident.clone(),
                        Rule::literal("="),
                        Rule::reference("Expr"),
                        semicolon(),
                    ],
                ),
                Rule::seq("Print", [Rule::literal("print"), Rule::reference("Expr"), semicolon()]),
            ],
        )
        .rule(
            "Expr",
            [
                number,
                ident,
                Rule::seq(
                    "Parens",
                    [
                        Rule::literal("("),
                        Rule::reference("Expr"),
                        Rule::often_missed("Missing", Rule::literal(")")),
                    ],
                ),
                Rule::seq(
                    "Add",
                    [Rule::reference("Expr"), Rule::literal("+"), Rule::req("Expr", 10)],
                ),
                Rule::recovery("Error"),
            ],
        )
        .build("Program")
        .unwrap()
}

#[test]
fn independent_errors_are_all_recovered() {
    let input = indoc! {"
        let a = 1
        let b = (2 + a;
        let c = b
    "};
    let grammar = grammar();
    let (result, consumed) = Parser::new(&grammar).parse(input, "Program");
    assert_eq!(consumed, input.len());

    let positions: Vec<_> = result.errors().iter().map(|e| (e.offset, e.line, e.col)).collect();
    assert_eq!(positions, [(10, 2, 1), (24, 2, 15), (36, 4, 1)]);
    assert_eq!(result.errors()[1].expected, ["+", ")"]);

    insta::assert_snapshot!(result.node().unwrap().dump(input), @r#"
    Program
      Let
        let "let"
        Ident "a"
        = "="
        Number "1"
        Missing (missing)
      Let
        let "let"
        Ident "b"
        = "="
        Parens
          ( "("
          Add
            Number "2"
            + "+"
            Ident "a"
          Missing (missing)
        ; ";"
      Let
        let "let"
        Ident "c"
        = "="
        Ident "b"
        Missing (missing)
    "#);
}

#[test]
fn recovery_alternative_fills_missing_operand() {
    let input = "let a = 1 +;\nprint a;";
    let grammar = grammar();
    let (result, _) = Parser::new(&grammar).parse(input, "Program");

    let ParseResult::Success { node, errors, .. } = &result else {
        panic!("expected success");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].offset, 11);
    assert_eq!(errors[0].expected, ["Number", "Ident", "("]);

    insta::assert_snapshot!(node.dump(input), @r#"
    Program
      Let
        let "let"
        Ident "a"
        = "="
        Add
          Number "1"
          + "+"
          Error (missing)
        ; ";"
      Print
        print "print"
        Ident "a"
        ; ";"
    "#);
}

#[test]
fn passes_are_limited() {
    let input = "let a = 1\nlet b = (2 + a;\nlet c = b\n";
    let grammar = grammar();
    let options = ParserOptions::default().with_max_recovery_passes(1);
    let (result, consumed) = Parser::with_options(&grammar, options).parse(input, "Program");

    assert_eq!(consumed, 10);
    let ParseResult::Success { node, end_pos, errors } = result else {
        panic!("expected a short success");
    };
    assert_eq!(end_pos, 10);
    assert_eq!(node.children().len(), 1);
    let offsets: Vec<_> = errors.iter().map(|e| e.offset).collect();
    assert_eq!(offsets, [10, 24]);
}

#[test]
fn unrecoverable_error_fails() {
    let input = "let = 1;";
    let grammar = grammar();
    let (result, consumed) = Parser::new(&grammar).parse(input, "Stmt");

    assert_eq!(consumed, 4);
    let ParseResult::Failure { error } = result else {
        panic!("expected failure");
    };
    assert_eq!(error.expected, ["Ident"]);
}

#[test]
fn clean_input_needs_no_recovery() {
    let input = "let a = (1 + 2);\nprint a + 3;\n";
    let grammar = grammar();
    let (result, consumed) = Parser::new(&grammar).parse(input, "Program");

    assert_eq!(consumed, input.len());
    assert!(result.errors().is_empty());
    assert!(result.node().unwrap().tokens().iter().all(|t| !t.is_recovery));
}
