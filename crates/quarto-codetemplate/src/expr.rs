/*
 * expr.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Bundled reference backend: a minimal expression language.
//!
//! The language covers what code-generation templates actually splice:
//! identifiers, integer/float/string/boolean/null literals, call
//! expressions, member access, list literals, and `;`-separated statement
//! sequences. `%%name%%` is the syntactic placeholder form; ordinary
//! identifiers become placeholders when whitelisted or when they match the
//! recognition pattern (by default `^[_$A-Z0-9]+$`).
//!
//! Recognition modes follow [`ParseOptions::syntactic_placeholders`]:
//! `Some(true)` accepts only `%%name%%` (and rejects a non-empty whitelist
//! or custom pattern), `Some(false)` rejects `%%name%%` outright, and
//! `None` auto-detects but refuses to mix both forms in one template.
//!
//! Line comments (`// ...`) are kept as statement-level nodes when comment
//! preservation is on; comments inside expressions are always dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;

use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::backend::{Formatter, ParseOptions, Placeholder, TemplateBackend};
use crate::error::{TemplateError, TemplateResult};
use crate::options::PlaceholderPattern;
use crate::replacements::ReplacementMap;

/// Default recognition pattern for ad-hoc placeholder identifiers.
static DEFAULT_PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_$A-Z0-9]+$").expect("default placeholder pattern is valid"));

/// A node in the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// A sequence of statements; the root of every parsed source.
    Program(Vec<Node>),
    /// An ordinary identifier.
    Ident(String),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal.
    Str(String),
    /// A boolean literal.
    Bool(bool),
    /// The null literal.
    Null,
    /// A line comment (statement position only).
    Comment(String),
    /// A recognized placeholder position.
    Placeholder(String),
    /// A call expression: `callee(args...)`.
    Call { callee: Box<Node>, args: Vec<Node> },
    /// Member access: `object.property`.
    Member { object: Box<Node>, property: String },
    /// A list literal: `[items...]`.
    List(Vec<Node>),
}

impl Node {
    /// An identifier node.
    pub fn ident(name: impl Into<String>) -> Self {
        Node::Ident(name.into())
    }

    /// An integer literal node.
    pub fn int(value: i64) -> Self {
        Node::Int(value)
    }

    /// A float literal node.
    pub fn float(value: f64) -> Self {
        Node::Float(value)
    }

    /// A string literal node.
    pub fn string(value: impl Into<String>) -> Self {
        Node::Str(value.into())
    }

    /// A call expression node.
    pub fn call(callee: Node, args: Vec<Node>) -> Self {
        Node::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// A member access node.
    pub fn member(object: Node, property: impl Into<String>) -> Self {
        Node::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    /// A list literal node.
    pub fn list(items: Vec<Node>) -> Self {
        Node::List(items)
    }

    /// A program node holding a statement sequence.
    pub fn program(statements: Vec<Node>) -> Self {
        Node::Program(statements)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl TryFrom<&serde_json::Value> for Node {
    type Error = TemplateError;

    /// Convert a JSON value into the literal node spelling it in source.
    /// Objects have no source representation in this language.
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(Node::Null),
            Value::Bool(b) => Ok(Node::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Node::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Node::Float(f))
                } else {
                    Err(TemplateError::UnsupportedValue {
                        message: format!("number {n} has no source representation"),
                    })
                }
            }
            Value::String(s) => Ok(Node::Str(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Node::try_from)
                .collect::<TemplateResult<Vec<_>>>()
                .map(Node::List),
            Value::Object(_) => Err(TemplateError::UnsupportedValue {
                message: "JSON objects have no source representation".to_string(),
            }),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Program(statements) => {
                let mut first = true;
                for statement in statements {
                    if !first {
                        writeln!(f)?;
                    }
                    first = false;
                    match statement {
                        Node::Comment(text) => write!(f, "//{text}")?,
                        other => write!(f, "{other};")?,
                    }
                }
                Ok(())
            }
            Node::Ident(name) | Node::Placeholder(name) => write!(f, "{name}"),
            Node::Int(value) => write!(f, "{value}"),
            Node::Float(value) => write!(f, "{value:?}"),
            Node::Str(value) => write!(f, "\"{}\"", escape_str(value)),
            Node::Bool(value) => write!(f, "{value}"),
            Node::Null => write!(f, "null"),
            Node::Comment(text) => write!(f, "//{text}"),
            Node::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Node::Member { object, property } => write!(f, "{object}.{property}"),
            Node::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

fn escape_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semi,
    #[token("%%")]
    PlaceholderDelim,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[regex(r"//[^\n]*", |lex| lex.slice()[2..].to_owned())]
    Comment(String),
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape_str(lex.slice()))]
    Str(String),
}

fn unescape_str(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    out
}

struct Parser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    preserve_comments: bool,
}

impl Parser {
    fn new(source: &str, preserve_comments: bool) -> TemplateResult<Self> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(result) = lexer.next() {
            match result {
                Ok(token) => tokens.push((token, lexer.span())),
                Err(()) => {
                    return Err(TemplateError::Parse {
                        message: format!("unexpected character at byte {}", lexer.span().start),
                    });
                }
            }
        }
        Ok(Parser {
            tokens,
            pos: 0,
            preserve_comments,
        })
    }

    fn parse_program(mut self) -> TemplateResult<Node> {
        let mut statements = Vec::new();
        while let Some((token, _)) = self.tokens.get(self.pos) {
            match token {
                Token::Comment(text) => {
                    if self.preserve_comments {
                        statements.push(Node::Comment(text.clone()));
                    }
                    self.pos += 1;
                }
                Token::Semi => {
                    self.pos += 1;
                }
                _ => statements.push(self.parse_expr()?),
            }
        }
        Ok(Node::Program(statements))
    }

    // Comments inside expressions carry no position in the tree; skip them.
    fn skip_expr_comments(&mut self) {
        while matches!(self.tokens.get(self.pos), Some((Token::Comment(_), _))) {
            self.pos += 1;
        }
    }

    fn peek_token(&mut self) -> Option<&Token> {
        self.skip_expr_comments();
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next_token(&mut self) -> Option<(Token, Range<usize>)> {
        self.skip_expr_comments();
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, expected: Token) -> TemplateResult<()> {
        match self.next_token() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, span)) => Err(TemplateError::Parse {
                message: format!(
                    "expected {expected:?}, found {token:?} at byte {}",
                    span.start
                ),
            }),
            None => Err(TemplateError::Parse {
                message: format!("expected {expected:?}, found end of input"),
            }),
        }
    }

    fn parse_expr(&mut self) -> TemplateResult<Node> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek_token() {
                Some(Token::LParen) => {
                    self.pos += 1;
                    let args = self.parse_list(Token::RParen)?;
                    node = Node::Call {
                        callee: Box::new(node),
                        args,
                    };
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    let property = match self.next_token() {
                        Some((Token::Ident(name), _)) => name,
                        Some((token, span)) => {
                            return Err(TemplateError::Parse {
                                message: format!(
                                    "expected a property name after '.', found {token:?} at byte {}",
                                    span.start
                                ),
                            });
                        }
                        None => {
                            return Err(TemplateError::Parse {
                                message: "expected a property name after '.', found end of input"
                                    .to_string(),
                            });
                        }
                    };
                    node = Node::Member {
                        object: Box::new(node),
                        property,
                    };
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> TemplateResult<Node> {
        match self.next_token() {
            Some((Token::Ident(name), _)) => Ok(Node::Ident(name)),
            Some((Token::Int(value), _)) => Ok(Node::Int(value)),
            Some((Token::Float(value), _)) => Ok(Node::Float(value)),
            Some((Token::Str(value), _)) => Ok(Node::Str(value)),
            Some((Token::True, _)) => Ok(Node::Bool(true)),
            Some((Token::False, _)) => Ok(Node::Bool(false)),
            Some((Token::Null, _)) => Ok(Node::Null),
            Some((Token::PlaceholderDelim, span)) => {
                let name = match self.next_token() {
                    Some((Token::Ident(name), _)) => name,
                    _ => {
                        return Err(TemplateError::Parse {
                            message: format!(
                                "expected a placeholder name after '%%' at byte {}",
                                span.start
                            ),
                        });
                    }
                };
                match self.next_token() {
                    Some((Token::PlaceholderDelim, _)) => Ok(Node::Placeholder(name)),
                    _ => Err(TemplateError::Parse {
                        message: format!("unterminated '%%' placeholder at byte {}", span.start),
                    }),
                }
            }
            Some((Token::LParen, _)) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some((Token::LBracket, _)) => {
                let items = self.parse_list(Token::RBracket)?;
                Ok(Node::List(items))
            }
            Some((token, span)) => Err(TemplateError::Parse {
                message: format!("unexpected {token:?} at byte {}", span.start),
            }),
            None => Err(TemplateError::Parse {
                message: "unexpected end of input".to_string(),
            }),
        }
    }

    /// Comma-separated expressions up to `close`; the opener is already
    /// consumed. Tolerates a trailing comma.
    fn parse_list(&mut self, close: Token) -> TemplateResult<Vec<Node>> {
        let mut items = Vec::new();
        if self.peek_token() == Some(&close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            match self.next_token() {
                Some((token, _)) if token == close => break,
                Some((Token::Comma, _)) => {
                    if self.peek_token() == Some(&close) {
                        self.pos += 1;
                        break;
                    }
                }
                Some((token, span)) => {
                    return Err(TemplateError::Parse {
                        message: format!(
                            "expected ',' or {close:?}, found {token:?} at byte {}",
                            span.start
                        ),
                    });
                }
                None => {
                    return Err(TemplateError::Parse {
                        message: format!("expected {close:?}, found end of input"),
                    });
                }
            }
        }
        Ok(items)
    }
}

struct MarkState<'a> {
    whitelist: &'a HashSet<String>,
    pattern: Option<&'a Regex>,
    mode: Option<bool>,
    occurrences: Vec<String>,
    ident_seen: bool,
    syntactic_seen: bool,
}

/// Rewrite recognized identifiers into placeholder nodes and collect all
/// placeholder occurrences in source order.
fn mark_placeholders(root: &mut Node, options: &ParseOptions<'_>) -> TemplateResult<Vec<String>> {
    let pattern = match options.placeholder_pattern {
        PlaceholderPattern::Default => Some(&*DEFAULT_PLACEHOLDER_PATTERN),
        PlaceholderPattern::Disabled => None,
        PlaceholderPattern::Custom(re) => Some(re),
    };
    let mut state = MarkState {
        whitelist: options.placeholder_whitelist,
        pattern,
        mode: options.syntactic_placeholders,
        occurrences: Vec::new(),
        ident_seen: false,
        syntactic_seen: false,
    };
    mark_node(root, &mut state)?;
    if state.mode.is_none() && state.ident_seen && state.syntactic_seen {
        return Err(TemplateError::Parse {
            message: "cannot mix '%%'-style placeholders with placeholder identifiers in one template"
                .to_string(),
        });
    }
    Ok(state.occurrences)
}

fn mark_node(node: &mut Node, state: &mut MarkState<'_>) -> TemplateResult<()> {
    match node {
        Node::Ident(name) => {
            if state.mode == Some(true) {
                return Ok(());
            }
            let recognized = state.whitelist.contains(name.as_str())
                || state.pattern.is_some_and(|re| re.is_match(name));
            if recognized {
                let name = std::mem::take(name);
                state.ident_seen = true;
                state.occurrences.push(name.clone());
                *node = Node::Placeholder(name);
            }
            Ok(())
        }
        Node::Placeholder(name) => {
            if state.mode == Some(false) {
                return Err(TemplateError::Parse {
                    message: "'%%'-style placeholders are not enabled".to_string(),
                });
            }
            state.syntactic_seen = true;
            state.occurrences.push(name.clone());
            Ok(())
        }
        Node::Program(children) | Node::List(children) => {
            for child in children {
                mark_node(child, state)?;
            }
            Ok(())
        }
        Node::Call { callee, args } => {
            mark_node(callee, state)?;
            for arg in args {
                mark_node(arg, state)?;
            }
            Ok(())
        }
        Node::Member { object, .. } => mark_node(object, state),
        _ => Ok(()),
    }
}

/// Cached result of parsing a candidate source.
#[derive(Debug, Clone)]
pub struct ExprMetadata {
    root: Node,
    placeholders: Vec<Placeholder>,
    placeholder_names: HashSet<String>,
}

impl ExprMetadata {
    /// The parsed tree, with recognized placeholders marked.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Placeholder occurrences in source order.
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }
}

/// The bundled parser/instantiator collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprParser;

impl ExprParser {
    /// Create a parser value.
    pub fn new() -> Self {
        Self
    }
}

impl TemplateBackend for ExprParser {
    type Metadata = ExprMetadata;
    type Tree = Node;

    fn parse(&self, source: &str, options: &ParseOptions<'_>) -> TemplateResult<ExprMetadata> {
        if options.syntactic_placeholders == Some(true)
            && (!options.placeholder_whitelist.is_empty()
                || matches!(options.placeholder_pattern, PlaceholderPattern::Custom(_)))
        {
            return Err(TemplateError::Parse {
                message:
                    "placeholder_whitelist and placeholder_pattern cannot be combined with syntactic placeholders"
                        .to_string(),
            });
        }

        let mut root = Parser::new(source, options.preserve_comments)?.parse_program()?;
        let occurrences = mark_placeholders(&mut root, options)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for name in &occurrences {
            *counts.entry(name.as_str()).or_default() += 1;
        }
        let placeholders = occurrences
            .iter()
            .map(|name| Placeholder {
                name: name.clone(),
                is_duplicate: counts[name.as_str()] > 1,
            })
            .collect();
        let placeholder_names = occurrences.into_iter().collect();

        Ok(ExprMetadata {
            root,
            placeholders,
            placeholder_names,
        })
    }

    fn placeholders<'m>(&self, metadata: &'m ExprMetadata) -> &'m [Placeholder] {
        &metadata.placeholders
    }

    fn populate(
        &self,
        metadata: &ExprMetadata,
        replacements: &ReplacementMap<Node>,
    ) -> TemplateResult<Node> {
        if let Some(name) = replacements
            .keys()
            .filter(|name| !metadata.placeholder_names.contains(*name))
            .min()
        {
            return Err(TemplateError::UnknownSubstitution {
                name: name.to_string(),
            });
        }

        let Node::Program(statements) = &metadata.root else {
            return substitute(&metadata.root, replacements);
        };
        let mut body = Vec::with_capacity(statements.len());
        for statement in statements {
            match statement {
                Node::Placeholder(name) => match replacements.get(name) {
                    // A program value splices its statements flat.
                    Some(Node::Program(inner)) => body.extend(inner.iter().cloned()),
                    Some(value) => body.push(value.clone()),
                    // Unbound statement-position placeholders are dropped.
                    None => {}
                },
                other => body.push(substitute(other, replacements)?),
            }
        }
        Ok(Node::Program(body))
    }
}

fn substitute(node: &Node, replacements: &ReplacementMap<Node>) -> TemplateResult<Node> {
    match node {
        Node::Placeholder(name) => {
            replacements
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::MissingSubstitution { name: name.clone() })
        }
        Node::Program(statements) => statements
            .iter()
            .map(|statement| substitute(statement, replacements))
            .collect::<TemplateResult<Vec<_>>>()
            .map(Node::Program),
        Node::List(items) => items
            .iter()
            .map(|item| substitute(item, replacements))
            .collect::<TemplateResult<Vec<_>>>()
            .map(Node::List),
        Node::Call { callee, args } => Ok(Node::Call {
            callee: Box::new(substitute(callee, replacements)?),
            args: args
                .iter()
                .map(|arg| substitute(arg, replacements))
                .collect::<TemplateResult<Vec<_>>>()?,
        }),
        Node::Member { object, property } => Ok(Node::Member {
            object: Box::new(substitute(object, replacements)?),
            property: property.clone(),
        }),
        other => Ok(other.clone()),
    }
}

/// Formats a template as a full program; the output keeps the program
/// root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramFormatter;

impl Formatter<Node> for ProgramFormatter {
    type Output = Node;

    fn wrap(&self, source: &str) -> String {
        source.to_string()
    }

    fn unwrap(&self, tree: Node) -> TemplateResult<Node> {
        Ok(tree)
    }
}

/// Formats a template as a statement sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementsFormatter;

impl Formatter<Node> for StatementsFormatter {
    type Output = Vec<Node>;

    fn wrap(&self, source: &str) -> String {
        source.to_string()
    }

    fn unwrap(&self, tree: Node) -> TemplateResult<Vec<Node>> {
        match tree {
            Node::Program(statements) => Ok(statements),
            other => Err(TemplateError::Output {
                message: format!("expected a program root, found {other}"),
            }),
        }
    }
}

/// Formats a template as a single expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionFormatter;

impl Formatter<Node> for ExpressionFormatter {
    type Output = Node;

    fn wrap(&self, source: &str) -> String {
        format!("({source})")
    }

    fn unwrap(&self, tree: Node) -> TemplateResult<Node> {
        let Node::Program(statements) = tree else {
            return Err(TemplateError::Output {
                message: "expected a program root".to_string(),
            });
        };
        let mut expressions = statements
            .into_iter()
            .filter(|statement| !matches!(statement, Node::Comment(_)));
        match (expressions.next(), expressions.next()) {
            (Some(expression), None) => Ok(expression),
            (None, _) => Err(TemplateError::Output {
                message: "expected a single expression, found none".to_string(),
            }),
            (Some(_), Some(_)) => Err(TemplateError::Output {
                message: "expected a single expression, found multiple statements".to_string(),
            }),
        }
    }
}
