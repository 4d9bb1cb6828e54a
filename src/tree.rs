//! Generic syntax tree produced by the engine.
//!
//! The engine knows nothing about the grammar it runs, so every node is one of
//! five shapes tagged with the `kind` of the rule that built it. Grammar code
//! turns the tree into its own AST with a [`Visitor`], switching on `kind`.

use std::{fmt::Write, ops::Range, sync::Arc};

/// Name of a rule or terminal, shared between the grammar and every node it produces.
pub type Kind = Arc<str>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalNode {
    pub kind: Kind,
    pub start: usize,
    pub end: usize,
    /// Synthesized by error recovery; always empty.
    pub is_recovery: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqNode {
    pub kind: Kind,
    pub start: usize,
    pub end: usize,
    pub elements: Vec<SyntaxNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNode {
    pub kind: Kind,
    pub start: usize,
    pub end: usize,
    pub elements: Vec<SyntaxNode>,
    /// `delimiters[i]` follows `elements[i]`.
    pub delimiters: Vec<SyntaxNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SomeNode {
    pub kind: Kind,
    pub start: usize,
    pub end: usize,
    pub value: Box<SyntaxNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoneNode {
    pub kind: Kind,
    /// Where the element was looked for.
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    Terminal(TerminalNode),
    Seq(SeqNode),
    List(ListNode),
    Some(SomeNode),
    None(NoneNode),
}

/// One method per node shape. Implementors usually recurse by calling
/// [`SyntaxNode::accept`] on the children they care about.
pub trait Visitor {
    type Output;

    fn visit_terminal(&mut self, node: &TerminalNode) -> Self::Output;
    fn visit_seq(&mut self, node: &SeqNode) -> Self::Output;
    fn visit_list(&mut self, node: &ListNode) -> Self::Output;
    fn visit_some(&mut self, node: &SomeNode) -> Self::Output;
    fn visit_none(&mut self, node: &NoneNode) -> Self::Output;
}

impl ListNode {
    /// Elements and delimiters in source order.
    pub fn children(&self) -> impl Iterator<Item = &SyntaxNode> {
        let len = self.elements.len().max(self.delimiters.len());
        (0..len).flat_map(move |i| self.elements.get(i).into_iter().chain(self.delimiters.get(i)))
    }
}

impl SyntaxNode {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            SyntaxNode::Terminal(node) => visitor.visit_terminal(node),
            SyntaxNode::Seq(node) => visitor.visit_seq(node),
            SyntaxNode::List(node) => visitor.visit_list(node),
            SyntaxNode::Some(node) => visitor.visit_some(node),
            SyntaxNode::None(node) => visitor.visit_none(node),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            SyntaxNode::Terminal(node) => &node.kind,
            SyntaxNode::Seq(node) => &node.kind,
            SyntaxNode::List(node) => &node.kind,
            SyntaxNode::Some(node) => &node.kind,
            SyntaxNode::None(node) => &node.kind,
        }
    }

    pub fn start(&self) -> usize {
        self.span().start
    }

    pub fn end(&self) -> usize {
        self.span().end
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            SyntaxNode::Terminal(node) => node.start..node.end,
            SyntaxNode::Seq(node) => node.start..node.end,
            SyntaxNode::List(node) => node.start..node.end,
            SyntaxNode::Some(node) => node.start..node.end,
            SyntaxNode::None(node) => node.pos..node.pos,
        }
    }

    /// Source text under the node, trivia between its tokens included.
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.span()).unwrap_or_default()
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&SyntaxNode> {
        match self {
            SyntaxNode::Terminal(_) | SyntaxNode::None(_) => Vec::new(),
            SyntaxNode::Seq(node) => node.elements.iter().collect(),
            SyntaxNode::List(node) => node.children().collect(),
            SyntaxNode::Some(node) => vec![&*node.value],
        }
    }

    /// All terminals under the node, left to right.
    pub fn tokens(&self) -> Vec<&TerminalNode> {
        let mut tokens = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                SyntaxNode::Terminal(t) => tokens.push(t),
                _ => stack.extend(node.children().into_iter().rev()),
            }
        }
        tokens
    }

    /// Indented outline, one node per line:
    ///
    /// ```txt
    /// Add
    ///   Number "3"
    ///   + "+"
    ///   Number "4"
    /// ```
    pub fn dump(&self, input: &str) -> String {
        let mut out = String::new();
        self.dump_into(input, 0, &mut out);
        out
    }

    fn dump_into(&self, input: &str, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        // Writing to a String cannot fail.
        let _ = match self {
            SyntaxNode::Terminal(t) if t.is_recovery => {
                writeln!(out, "{indent}{} (missing)", t.kind)
            }
            SyntaxNode::Terminal(t) => writeln!(out, "{indent}{} {:?}", t.kind, self.text(input)),
            SyntaxNode::None(n) => writeln!(out, "{indent}{} (none)", n.kind),
            _ => writeln!(out, "{indent}{}", self.kind()),
        };
        for child in self.children() {
            child.dump_into(input, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn terminal(kind: &str, start: usize, end: usize) -> SyntaxNode {
        SyntaxNode::Terminal(TerminalNode {
            kind: kind.into(),
            start,
            end,
            is_recovery: false,
        })
    }

    // a, b,
    fn list() -> SyntaxNode {
        SyntaxNode::List(ListNode {
            kind: "Args".into(),
            start: 0,
            end: 5,
            elements: vec![terminal("Ident", 0, 1), terminal("Ident", 3, 4)],
            delimiters: vec![terminal(",", 1, 2), terminal(",", 4, 5)],
        })
    }

    struct Count;

    impl Visitor for Count {
        type Output = usize;

        fn visit_terminal(&mut self, _: &TerminalNode) -> usize {
            1
        }

        fn visit_seq(&mut self, node: &SeqNode) -> usize {
            node.elements.iter().map(|e| e.accept(self)).sum()
        }

        fn visit_list(&mut self, node: &ListNode) -> usize {
            node.children().map(|e| e.accept(self)).sum()
        }

        fn visit_some(&mut self, node: &SomeNode) -> usize {
            node.value.accept(self)
        }

        fn visit_none(&mut self, _: &NoneNode) -> usize {
            0
        }
    }

    #[test]
    fn list_children_interleave() {
        let list = list();
        let kinds: Vec<_> = list.tokens().iter().map(|t| (t.start, &*t.kind)).collect();
        assert_eq!(kinds, [(0, "Ident"), (1, ","), (3, "Ident"), (4, ",")]);
        assert_eq!(list.accept(&mut Count), 4);
    }

    #[test]
    fn text_and_dump() {
        let input = "a, b,";
        let node = SyntaxNode::Seq(SeqNode {
            kind: "Call".into(),
            start: 0,
            end: 5,
            elements: vec![
                list(),
                SyntaxNode::None(NoneNode {
                    kind: "Tail".into(),
                    pos: 5,
                }),
            ],
        });

        assert_eq!(node.text(input), "a, b,");
        assert_eq!(node.children()[1].span(), 5..5);
        assert_eq!(
            node.dump(input),
            concat!(
                "Call\n  Args\n    Ident \"a\"\n    , \",\"\n",
                "    Ident \"b\"\n    , \",\"\n  Tail (none)\n",
            )
        );
    }
}
