use extparse::{
    CompiledGrammar, EndBehavior, Grammar, ParseResult, Parser, ParserOptions, Rule, Terminal,
};

/// `Call = Ident "(" (Expr; ",")* ")"`, with a recovery-only `Error` alternative for `Expr`.
fn grammar(end: EndBehavior, can_be_empty: bool) -> CompiledGrammar {
    call_grammar(end, can_be_empty, true)
}

fn call_grammar(end: EndBehavior, can_be_empty: bool, error_alternative: bool) -> CompiledGrammar {
    let ident: Rule = Terminal::regex("Ident", r"[\l_]\w*").unwrap().into();
    let number: Rule = Terminal::regex("Number", r"\d+").unwrap().into();
    let args = Rule::separated_list(
        "Args",
        Rule::reference("Expr"),
        Rule::literal(","),
        end,
        can_be_empty,
    );

    let mut alternatives = vec![
        Rule::seq(
            "Call",
            [
                ident.clone(),
                Rule::literal("("),
                args,
                Rule::often_missed("Missing", Rule::literal(")")),
            ],
        ),
        ident,
        number,
    ];
    if error_alternative {
        alternatives.push(Rule::recovery("Error"));
    }

    Grammar::new(Terminal::regex("Trivia", r"\s*").unwrap())
        .rule("Expr", alternatives)
        .build("Expr")
        .unwrap()
}

fn parse(end: EndBehavior, input: &str) -> ParseResult {
    Parser::new(&grammar(end, true)).parse(input, "Expr").0
}

fn outcome(result: &ParseResult, input: &str) -> String {
    let mut out = match result {
        ParseResult::Success { node, end_pos, .. } => {
            format!("end {end_pos}\n{}", node.dump(input))
        }
        ParseResult::Failure { .. } => "failed\n".to_string(),
    };
    for error in result.errors() {
        out.push_str(&format!("{error}\n"));
    }
    out
}

#[test]
fn forbidden_trailing_separator_is_recovered() {
    let input = "func(1, )";
    let result = parse(EndBehavior::Forbidden, input);
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 9
    Call
      Ident "func"
      ( "("
      Args
        Number "1"
        , ","
        Error (missing)
      ) ")"
    (1,9): Expected: Ident, Number
    ...func(1, )...
               ^
    "#);
}

#[test]
fn forbidden_without_recovery_stops_early() {
    let input = "func(1,)";
    let grammar = grammar(EndBehavior::Forbidden, true);
    let options = ParserOptions::default().with_recovery(false);
    let (result, consumed) = Parser::with_options(&grammar, options).parse(input, "Expr");

    assert_eq!(consumed, 4);
    let ParseResult::Success { node, end_pos, errors } = result else {
        panic!("expected a short success");
    };
    assert_eq!((node.kind(), end_pos), ("Ident", 4));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].offset, 7);
    assert_eq!(errors[0].expected, ["Ident", "Number"]);
}

#[test]
fn forbidden_accepts_proper_lists() {
    let input = "f(a, g(1, 2), 3)";
    let result = parse(EndBehavior::Forbidden, input);
    assert!(result.errors().is_empty());
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 16
    Call
      Ident "f"
      ( "("
      Args
        Ident "a"
        , ","
        Call
          Ident "g"
          ( "("
          Args
            Number "1"
            , ","
            Number "2"
          ) ")"
        , ","
        Number "3"
      ) ")"
    "#);
}

#[test]
fn required_single_element() {
    let input = "func(1)";
    let result = parse(EndBehavior::Required, input);
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 4
    Ident "func"
    (1,7): Expected: ,
    ...func(1)...
             ^
    "#);
}

#[test]
fn required_trailing_separator() {
    let input = "func(1, 2,)";
    let result = parse(EndBehavior::Required, input);
    assert!(result.errors().is_empty());
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 11
    Call
      Ident "func"
      ( "("
      Args
        Number "1"
        , ","
        Number "2"
        , ","
      ) ")"
    "#);
}

#[test]
fn optional_end() {
    for input in ["func(1)", "func(1,)", "func( 1 , )"] {
        let result = parse(EndBehavior::Optional, input);
        let ParseResult::Success { node, end_pos, errors } = &result else {
            panic!("{input:?} failed");
        };
        assert!(errors.is_empty(), "{input:?}: {errors:?}");
        assert_eq!(*end_pos, input.len());
        assert_eq!(node.kind(), "Call");
        assert!(node.tokens().iter().all(|t| !t.is_recovery));
    }
}

#[test]
fn empty_list() {
    let input = "func()";
    let result = parse(EndBehavior::Optional, input);
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 6
    Call
      Ident "func"
      ( "("
      Args
      ) ")"
    "#);
}

#[test]
fn empty_list_not_allowed() {
    let input = "func()";
    let grammar = grammar(EndBehavior::Optional, false);
    let (result, _) = Parser::new(&grammar).parse(input, "Expr");
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 6
    Call
      Ident "func"
      ( "("
      Args
        Error (missing)
      ) ")"
    (1,6): Expected: Ident, Number
    ...func()...
            ^
    "#);
}

#[test]
fn forbidden_list_appends_error_element() {
    let grammar = call_grammar(EndBehavior::Forbidden, true, false);

    let input = "func(1, )";
    let (result, consumed) = Parser::new(&grammar).parse(input, "Expr");
    assert_eq!(consumed, 9);
    insta::assert_snapshot!(outcome(&result, input), @r#"
    end 9
    Call
      Ident "func"
      ( "("
      Args
        Number "1"
        , ","
        Error (missing)
      ) ")"
    (1,9): Expected: Ident, Number
    ...func(1, )...
               ^
    "#);

    let input = "f(g(1,), 2)";
    let (result, _) = Parser::new(&grammar).parse(input, "Expr");
    let offsets: Vec<_> = result.errors().iter().map(|e| e.offset).collect();
    assert_eq!(offsets, [6]);
    insta::assert_snapshot!(result.node().unwrap().dump(input), @r#"
    Call
      Ident "f"
      ( "("
      Args
        Call
          Ident "g"
          ( "("
          Args
            Number "1"
            , ","
            Error (missing)
          ) ")"
        , ","
        Number "2"
      ) ")"
    "#);
}
