//! Minimal SQL template engine.
//!
//! Text passes through unchanged; `{{ ... }}` actions are evaluated against a
//! [`Helpers`] implementation. Supported actions:
//!
//! - helper calls: `{{ Param "id" }}`, `{{ Quote (Param "name") }}`
//! - pipelines: `{{ Param "name" | OrElse "anon" | Quote }}`
//! - conditionals: `{{ if Bool "active" }} ... {{ else }} ... {{ end }}`
//! - comments: `{{/* ... */}}`
//!
//! `{{-` trims whitespace before the action and `-}}` after it. Helper names may
//! be written with a leading dot (`.Param`). The helper set is closed: `Param`,
//! `Bool`, `Header`, `OrElse`, `Quote`.

use crate::error::{AppError, ConfigError};
use std::fmt;

/// Request-side lookups exposed to templates.
pub trait Helpers {
    fn param(&self, name: &str) -> String;
    fn flag(&self, name: &str) -> bool;
    fn header(&self, name: &str) -> String;
}

/// `default` if `value` is empty, else `value`.
pub fn or_else(default: &str, value: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// `null` for empty input, else the text in single quotes. Does not escape.
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        "null".to_string()
    } else {
        format!("'{}'", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Helper {
    Param,
    Bool,
    Header,
    OrElse,
    Quote,
}

impl Helper {
    fn lookup(ident: &str) -> Result<Self, String> {
        Ok(match ident.strip_prefix('.').unwrap_or(ident) {
            "Param" => Helper::Param,
            "Bool" => Helper::Bool,
            "Header" => Helper::Header,
            "OrElse" => Helper::OrElse,
            "Quote" => Helper::Quote,
            _ => return Err(format!("function {} not defined", ident)),
        })
    }

    fn name(self) -> &'static str {
        match self {
            Helper::Param => "Param",
            Helper::Bool => "Bool",
            Helper::Header => "Header",
            Helper::OrElse => "OrElse",
            Helper::Quote => "Quote",
        }
    }

    fn arity(self) -> usize {
        match self {
            Helper::OrElse => 2,
            _ => 1,
        }
    }

    fn call(self, args: Vec<Expr>) -> Result<Expr, String> {
        if args.len() != self.arity() {
            return Err(format!(
                "wrong number of args for {}: want {} got {}",
                self.name(),
                self.arity(),
                args.len()
            ));
        }
        Ok(Expr::Call(self, args))
    }

    fn apply(self, args: &[Val], helpers: &dyn Helpers) -> Result<Val, String> {
        Ok(match self {
            Helper::Param => Val::Str(helpers.param(self.text(args, 0)?)),
            Helper::Bool => Val::Bool(helpers.flag(self.text(args, 0)?)),
            Helper::Header => Val::Str(helpers.header(self.text(args, 0)?)),
            Helper::OrElse => Val::Str(or_else(self.text(args, 0)?, self.text(args, 1)?)),
            Helper::Quote => Val::Str(quote(self.text(args, 0)?)),
        })
    }

    fn text<'v>(self, args: &'v [Val], i: usize) -> Result<&'v str, String> {
        match &args[i] {
            Val::Str(s) => Ok(s.as_str()),
            Val::Bool(_) => Err(format!("{} expects a string argument, got bool", self.name())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Lit(String),
    Call(Helper, Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Text(String),
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

enum Val {
    Str(String),
    Bool(bool),
}

impl Val {
    fn truthy(&self) -> bool {
        match self {
            Val::Str(s) => !s.is_empty(),
            Val::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Str(s) => f.write_str(s),
            Val::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A compiled template. Immutable and shareable across requests.
#[derive(Clone, Debug)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn compile(name: &str, source: &str) -> Result<Self, ConfigError> {
        let err = |message: String| ConfigError::Template {
            name: name.to_string(),
            message,
        };
        let items = scan(source).map_err(err)?;
        let mut items = items.into_iter();
        let (nodes, stray) = block(&mut items).map_err(err)?;
        if let Some(item) = stray {
            return Err(err(format!("unexpected {{{{{}}}}}", item.keyword())));
        }
        Ok(Template {
            name: name.to_string(),
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, helpers: &dyn Helpers) -> Result<String, AppError> {
        let mut out = String::new();
        render_nodes(&self.nodes, helpers, &mut out)
            .map_err(|e| AppError::Render(format!("{}: {}", self.name, e)))?;
        Ok(out)
    }
}

fn render_nodes(nodes: &[Node], helpers: &dyn Helpers, out: &mut String) -> Result<(), String> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Expr(e) => out.push_str(&eval(e, helpers)?.to_string()),
            Node::If { cond, then, otherwise } => {
                let branch = if eval(cond, helpers)?.truthy() { then } else { otherwise };
                render_nodes(branch, helpers, out)?;
            }
        }
    }
    Ok(())
}

fn eval(expr: &Expr, helpers: &dyn Helpers) -> Result<Val, String> {
    match expr {
        Expr::Lit(s) => Ok(Val::Str(s.clone())),
        Expr::Call(helper, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, helpers))
                .collect::<Result<Vec<_>, _>>()?;
            helper.apply(&args, helpers)
        }
    }
}

enum Item {
    Text(String),
    Expr(Expr),
    If(Expr),
    Else,
    End,
}

impl Item {
    fn keyword(&self) -> &'static str {
        match self {
            Item::Else => "else",
            Item::End => "end",
            _ => "action",
        }
    }
}

/// Split source into text and parsed actions, applying trim markers.
fn scan(source: &str) -> Result<Vec<Item>, String> {
    let mut items = Vec::new();
    let mut rest = source;
    let mut trim_next = false;
    while let Some(open) = rest.find("{{") {
        let mut text = &rest[..open];
        if trim_next {
            text = text.trim_start();
        }
        let after = &rest[open + 2..];
        let body_start = match after.strip_prefix('-') {
            Some(r) if r.starts_with(char::is_whitespace) => {
                text = text.trim_end();
                r
            }
            _ => after,
        };
        push_text(&mut items, text);

        let close = find_close(body_start).ok_or_else(|| "unclosed action".to_string())?;
        let mut body = &body_start[..close];
        trim_next = false;
        if let Some(b) = body.strip_suffix('-') {
            if b.ends_with(char::is_whitespace) {
                body = b;
                trim_next = true;
            }
        }
        rest = &body_start[close + 2..];
        if let Some(item) = parse_action(body.trim())? {
            items.push(item);
        }
    }
    push_text(&mut items, if trim_next { rest.trim_start() } else { rest });
    Ok(items)
}

fn push_text(items: &mut Vec<Item>, text: &str) {
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

/// Byte offset of the closing `}}`, skipping over quoted strings.
fn find_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == b'\\' && q == b'"' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'`' => quote = Some(b),
            None if b == b'}' && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn parse_action(body: &str) -> Result<Option<Item>, String> {
    if let Some(comment) = body.strip_prefix("/*") {
        return if comment.ends_with("*/") {
            Ok(None)
        } else {
            Err("unclosed comment".into())
        };
    }
    let tokens = tokenize(body)?;
    let keyword = match tokens.first() {
        Some(Token::Ident(k)) => k.as_str(),
        Some(_) => "",
        None => return Err("missing value for command".into()),
    };
    match keyword {
        "if" => Parser::new(&tokens[1..]).parse().map(|e| Some(Item::If(e))),
        "else" | "end" if tokens.len() > 1 => Err(format!("unexpected tokens after {}", keyword)),
        "else" => Ok(Some(Item::Else)),
        "end" => Ok(Some(Item::End)),
        _ => Parser::new(&tokens).parse().map(|e| Some(Item::Expr(e))),
    }
}

/// Assemble items into a node tree; returns the `else`/`end` that closed the block.
fn block(items: &mut impl Iterator<Item = Item>) -> Result<(Vec<Node>, Option<Item>), String> {
    let mut nodes = Vec::new();
    while let Some(item) = items.next() {
        match item {
            Item::Text(t) => nodes.push(Node::Text(t)),
            Item::Expr(e) => nodes.push(Node::Expr(e)),
            Item::If(cond) => {
                let (then, closer) = block(items)?;
                let otherwise = match closer {
                    Some(Item::End) => Vec::new(),
                    Some(Item::Else) => match block(items)? {
                        (otherwise, Some(Item::End)) => otherwise,
                        (_, Some(Item::Else)) => return Err("multiple {{else}} in one {{if}}".into()),
                        _ => return Err("missing {{end}}".into()),
                    },
                    _ => return Err("missing {{end}}".into()),
                };
                nodes.push(Node::If { cond, then, otherwise });
            }
            Item::Else | Item::End => return Ok((nodes, Some(item))),
        }
    }
    Ok((nodes, None))
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Pipe,
}

fn tokenize(body: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '|' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Pipe,
                });
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(e @ ('"' | '\\')) => s.push(e),
                            Some(e) => return Err(format!("unknown escape sequence \\{}", e)),
                            None => return Err("unterminated quoted string".into()),
                        },
                        Some(ch) => s.push(ch),
                        None => return Err("unterminated quoted string".into()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '`' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('`') => break,
                        Some(ch) => s.push(ch),
                        None => return Err("unterminated raw string".into()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_alphanumeric() || c == '.' || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '.' || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected {:?} in action", other)),
        }
    }
    Ok(tokens)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("missing value for command".into());
        }
        let expr = self.pipeline()?;
        match self.peek() {
            None => Ok(expr),
            Some(t) => Err(format!("unexpected {:?}", t)),
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn pipeline(&mut self) -> Result<Expr, String> {
        let mut expr = self.command()?;
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            let helper = match self.next() {
                Some(Token::Ident(name)) => Helper::lookup(name)?,
                other => return Err(format!("expected function after '|', found {:?}", other)),
            };
            let mut args = self.args()?;
            args.push(expr);
            expr = helper.call(args)?;
        }
        Ok(expr)
    }

    fn command(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Lit(s.clone())),
            Some(Token::LParen) => self.group(),
            Some(Token::Ident(name)) => {
                let helper = Helper::lookup(name)?;
                let args = self.args()?;
                helper.call(args)
            }
            other => Err(format!("unexpected {:?}", other)),
        }
    }

    fn group(&mut self) -> Result<Expr, String> {
        let expr = self.pipeline()?;
        match self.next() {
            Some(Token::RParen) => Ok(expr),
            other => Err(format!("expected ')', found {:?}", other)),
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Str(s)) => {
                    self.pos += 1;
                    args.push(Expr::Lit(s.clone()));
                }
                Some(Token::LParen) => {
                    self.pos += 1;
                    args.push(self.group()?);
                }
                Some(Token::Ident(name)) => {
                    return Err(format!("{} used as an argument must be parenthesized", name))
                }
                _ => return Ok(args),
            }
        }
    }
}
