use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use extparse::{CompiledGrammar, Grammar, Parser, Regex, Rule, Terminal};

pub fn regex(c: &mut Criterion) {
    let mut group = c.benchmark_group("a?^na^n benchmark");
    group.measurement_time(Duration::from_secs(1));

    let inputs = (1..=8).map(|n| (n, ("a?".repeat(n) + &"a".repeat(n), "a".repeat(n))));

    for (n, input) in inputs {
        group.bench_with_input(
            BenchmarkId::new(format!("n={n}"), 0),
            &input,
            |b, (pattern, text)| {
                b.iter(|| {
                    let re = Regex::new(pattern).unwrap();
                    assert!(re.is_match(text));
                })
            },
        );
    }
}

fn calc() -> CompiledGrammar {
    let number = Terminal::regex("Number", r"\d+").unwrap();
    Grammar::new(Terminal::regex("Trivia", r"\s*").unwrap())
        .rule(
            "Expr",
            [
                number.into(),
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
                Rule::seq("Neg", [Rule::literal("-"), Rule::req("Expr", 100)]),
            ],
        )
        .build("Expr")
        .unwrap()
}

pub fn grammar(c: &mut Criterion) {
    let mut group = c.benchmark_group("calc");
    group.measurement_time(Duration::from_secs(1));

    let grammar = calc();
    for n in [10, 100, 1000] {
        let input = vec!["(1 + 2) * -3"; n].join(" + ");
        group.bench_with_input(BenchmarkId::new(format!("terms={n}"), 0), &input, |b, input| {
            b.iter(|| {
                let (result, _) = Parser::new(&grammar).parse(input, "Expr");
                assert!(result.is_success());
            })
        });
    }
}

criterion_group!(benches, regex, grammar);
criterion_main!(benches);
