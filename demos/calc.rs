//! Integer calculator on top of the generic tree.
//!
//! ```sh
//! cargo run --example calc -- "2 ^ 3 ^ 2 - (4 + 1) * 3"
//! ```

use anyhow::{anyhow, bail, Result};
use clap::Parser as _;
use extparse::{
    CompiledGrammar, Grammar, ListNode, NoneNode, ParseResult, Parser, Rule, SeqNode, SomeNode,
    Terminal, TerminalNode, Visitor,
};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

#[derive(clap::Parser)]
struct Cli {
    expression: String,
    /// Print the syntax tree before the value.
    #[arg(long)]
    tree: bool,
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

fn grammar() -> Result<CompiledGrammar> {
    let number = Terminal::regex("Number", r"\d+")?;
    let trivia = Terminal::regex("Trivia", r"\s*")?;

    let binary = |kind, op, precedence| {
        Rule::seq(kind, [Rule::reference("Expr"), Rule::literal(op), Rule::req("Expr", precedence)])
    };

    Ok(Grammar::new(trivia)
        .rule(
            "Expr",
            [
                number.into(),
                Rule::seq(
                    "Parens",
                    [
                        Rule::literal("("),
                        Rule::reference("Expr"),
                        Rule::often_missed("Missing", Rule::literal(")")),
                    ],
                ),
                Rule::seq("Neg", [Rule::literal("-"), Rule::req("Expr", 100)]),
                binary("Add", "+", 10),
                binary("Sub", "-", 10),
                binary("Mul", "*", 20),
                binary("Div", "/", 20),
                Rule::seq(
                    "Pow",
                    [Rule::reference("Expr"), Rule::literal("^"), Rule::req_right("Expr", 30)],
                ),
            ],
        )
        .build("Expr")?)
}

struct Eval<'a> {
    input: &'a str,
}

impl Visitor for Eval<'_> {
    type Output = Result<i64>;

    fn visit_terminal(&mut self, node: &TerminalNode) -> Result<i64> {
        let text = &self.input[node.start..node.end];
        Ok(text.parse()?)
    }

    fn visit_seq(&mut self, node: &SeqNode) -> Result<i64> {
        let operand = |this: &mut Self, i: usize| -> Result<i64> {
            node.elements
                .get(i)
                .ok_or_else(|| anyhow!("{} without operand", node.kind))?
                .accept(this)
        };

        match &*node.kind {
            "Parens" => operand(self, 1),
            "Neg" => Ok(-operand(self, 1)?),
            kind => {
                let (l, r) = (operand(self, 0)?, operand(self, 2)?);
                let value = match kind {
                    "Add" => l.checked_add(r),
                    "Sub" => l.checked_sub(r),
                    "Mul" => l.checked_mul(r),
                    "Div" => l.checked_div(r),
                    "Pow" => u32::try_from(r).ok().and_then(|r| l.checked_pow(r)),
                    _ => bail!("unexpected node {kind}"),
                };
                let text = &self.input[node.start..node.end];
                value.ok_or_else(|| anyhow!("arithmetic error in {text}"))
            }
        }
    }

    fn visit_list(&mut self, node: &ListNode) -> Result<i64> {
        bail!("unexpected list {}", node.kind)
    }

    fn visit_some(&mut self, node: &SomeNode) -> Result<i64> {
        node.value.accept(self)
    }

    fn visit_none(&mut self, node: &NoneNode) -> Result<i64> {
        bail!("missing {}", node.kind)
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    TermLogger::init(
        args.log_level,
        ConfigBuilder::new().set_time_format_custom(&[]).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let grammar = grammar()?;
    let input = args.expression.as_str();

    let (result, consumed) = Parser::new(&grammar).parse(input, "Expr");
    info!("consumed {consumed} of {} bytes", input.len());

    match result {
        ParseResult::Success { node, errors, .. } => {
            for error in &errors {
                eprintln!("{error}");
            }
            if args.tree {
                print!("{}", node.dump(input));
            }
            if !errors.is_empty() {
                bail!("{} syntax errors", errors.len());
            }
            println!("{}", node.accept(&mut Eval { input })?);
        }
        ParseResult::Failure { error } => bail!("{error}"),
    }

    Ok(())
}
