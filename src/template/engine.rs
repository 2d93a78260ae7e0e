//! Template Engine
//!
//! 前処理済みのXMLを解析し、コンテキストの値で展開する。
//!
//! # 対応する構文
//!
//! - `{{ name }}` / `{{ row.列名 }}` / `{{ row["列名"] }}` / `{{ 表[0].列名 }}`
//! - `{{r name }}`（装飾付きのランとして展開）
//! - `{% for row in 表 %}` ... `{% endfor %}`
//! - `{% if name %}` / `{% if not name %}` ... `{% else %}` ... `{% endif %}`
//! - `{# コメント #}`
//!
//! 未定義の名前は空文字列として展開され、条件では偽として扱われる。

use log::debug;
use quick_xml::escape::escape;

use crate::context::Context;
use crate::template::preprocess::find_tag_open;
use crate::types::{ContextValue, FormattedValue, TableRow};

/// 字句
#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    /// そのまま出力するXML
    Text(&'a str),
    /// `{{ ... }}`
    Var { rich: bool, expr: &'a str },
    /// `{% ... %}`
    Block(&'a str),
}

/// 構文木のノード
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var {
        rich: bool,
        expr: Expr,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    If {
        negated: bool,
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// 変数参照の式
#[derive(Debug, Clone, PartialEq)]
struct Expr {
    root: String,
    path: Vec<Segment>,
}

/// 変数参照の要素
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// `.列名` / `["列名"]`
    Key(String),
    /// `[0]`
    Index(usize),
}

/// 解析済みのテンプレート
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// 前処理済みのXMLを解析する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Template)` - 解析に成功した場合
    /// * `Err(String)` - 閉じられていないタグ、未対応のタグ、不正な式がある場合
    pub(crate) fn parse(source: &str) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: tokens.into_iter(),
        };
        let (nodes, _) = parser.parse_block(&[])?;
        Ok(Self { nodes })
    }

    /// コンテキストで展開する
    pub(crate) fn render(&self, context: &Context) -> String {
        let mut out = String::new();
        let mut locals = Vec::new();
        render_nodes(&self.nodes, context, &mut locals, &mut out);
        out
    }
}

/// 字句解析
fn tokenize(source: &str) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(start) = find_tag_open(rest) {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }

        let kind = rest.as_bytes()[start + 1];
        let closer = match kind {
            b'{' => "}}",
            b'%' => "%}",
            _ => "#}",
        };
        let body_start = start + 2;
        let body_len = rest[body_start..].find(closer).ok_or_else(|| {
            let opener = &rest[start..body_start];
            format!("Unclosed '{}' near '{}'", opener, preview(&rest[start..]))
        })?;
        let body = &rest[body_start..body_start + body_len];

        match kind {
            b'{' => {
                let (rich, expr) = match body.strip_prefix("r ") {
                    Some(expr) => (true, expr),
                    None => (false, body),
                };
                tokens.push(Token::Var {
                    rich,
                    expr: expr.trim(),
                });
            }
            b'%' => tokens.push(Token::Block(trim_whitespace_control(body))),
            _ => {}
        }

        rest = &rest[body_start + body_len + closer.len()..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

/// `{%- ... -%}` の空白制御記号を取り除く
fn trim_whitespace_control(body: &str) -> &str {
    let body = body.trim();
    let body = body.strip_prefix('-').unwrap_or(body);
    let body = body.strip_suffix('-').unwrap_or(body);
    body.trim()
}

/// エラーメッセージ用に先頭の数文字を取り出す
fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}

struct Parser<'a> {
    tokens: std::vec::IntoIter<Token<'a>>,
}

impl<'a> Parser<'a> {
    /// 終端タグのいずれかが現れるまでノードを読み進める
    ///
    /// # 戻り値
    ///
    /// 読み取ったノードと、出現した終端タグ（`end_tags` が空の場合は `None`）
    fn parse_block(&mut self, end_tags: &[&str]) -> Result<(Vec<Node>, Option<String>), String> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text.to_string())),
                Token::Var { rich, expr } => nodes.push(Node::Var {
                    rich,
                    expr: Expr::parse(expr)?,
                }),
                Token::Block(statement) => {
                    let keyword = statement.split_whitespace().next().unwrap_or("");
                    if end_tags.contains(&keyword) {
                        return Ok((nodes, Some(keyword.to_string())));
                    }
                    match keyword {
                        "for" => nodes.push(self.parse_for(statement)?),
                        "if" => nodes.push(self.parse_if(statement)?),
                        _ => return Err(format!("Unexpected tag '{{% {} %}}'", statement)),
                    }
                }
            }
        }

        match end_tags.last() {
            Some(expected) => Err(format!("Missing '{{% {} %}}'", expected)),
            None => Ok((nodes, None)),
        }
    }

    /// `for VAR in EXPR`
    fn parse_for(&mut self, statement: &str) -> Result<Node, String> {
        let clause = statement["for".len()..].trim();
        let (var, iterable) = clause
            .split_once(" in ")
            .ok_or_else(|| format!("Invalid for tag '{{% {} %}}'", statement))?;

        let var = var.trim();
        if var.is_empty() || !var.chars().all(is_identifier_char) {
            return Err(format!("Invalid loop variable '{}'", var));
        }

        let iterable = Expr::parse(iterable.trim())?;
        let (body, _) = self.parse_block(&["endfor"])?;
        Ok(Node::For {
            var: var.to_string(),
            iterable,
            body,
        })
    }

    /// `if EXPR` / `if not EXPR`
    fn parse_if(&mut self, statement: &str) -> Result<Node, String> {
        let clause = statement["if".len()..].trim();
        let (negated, cond) = match clause.strip_prefix("not ") {
            Some(cond) => (true, cond.trim()),
            None => (false, clause),
        };
        let cond = Expr::parse(cond)?;

        let (then, end) = self.parse_block(&["else", "endif"])?;
        let otherwise = if end.as_deref() == Some("else") {
            self.parse_block(&["endif"])?.0
        } else {
            Vec::new()
        };

        Ok(Node::If {
            negated,
            cond,
            then,
            otherwise,
        })
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Expr {
    /// `name`、`name.key`、`name["key"]`、`name[0]` の組み合わせを解析する
    fn parse(source: &str) -> Result<Self, String> {
        let invalid = || format!("Unsupported expression '{}'", source);
        let mut chars = source.trim().chars().peekable();

        let root = take_identifier(&mut chars);
        if root.is_empty() {
            return Err(invalid());
        }

        let mut path = Vec::new();
        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    let key = take_identifier(&mut chars);
                    if key.is_empty() {
                        return Err(invalid());
                    }
                    path.push(Segment::Key(key));
                }
                '[' => {
                    skip_spaces(&mut chars);
                    let segment = match chars.peek() {
                        Some(&quote) if quote == '"' || quote == '\'' => {
                            chars.next();
                            let mut key = String::new();
                            loop {
                                match chars.next() {
                                    Some(c) if c == quote => break,
                                    Some(c) => key.push(c),
                                    None => return Err(invalid()),
                                }
                            }
                            Segment::Key(key)
                        }
                        _ => {
                            let mut digits = String::new();
                            while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                                digits.push(c);
                                chars.next();
                            }
                            Segment::Index(digits.parse().map_err(|_| invalid())?)
                        }
                    };
                    skip_spaces(&mut chars);
                    if chars.next() != Some(']') {
                        return Err(invalid());
                    }
                    path.push(segment);
                }
                _ => return Err(invalid()),
            }
        }

        Ok(Self { root, path })
    }
}

fn take_identifier(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(c) = chars.peek().copied().filter(|&c| is_identifier_char(c)) {
        ident.push(c);
        chars.next();
    }
    ident
}

fn skip_spaces(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

/// 式の評価結果
#[derive(Debug, Clone, Copy)]
enum Resolved<'c> {
    Scalar(&'c FormattedValue),
    Table(&'c [TableRow]),
    Row(&'c TableRow),
    Missing,
}

impl Resolved<'_> {
    fn is_truthy(&self) -> bool {
        match self {
            Resolved::Scalar(value) => !value.text().is_empty(),
            Resolved::Table(rows) => !rows.is_empty(),
            Resolved::Row(row) => !row.is_empty(),
            Resolved::Missing => false,
        }
    }
}

/// 式を評価する（ループ変数を優先し、なければコンテキストを参照）
fn resolve<'c>(expr: &Expr, context: &'c Context, locals: &[(&str, &'c TableRow)]) -> Resolved<'c> {
    let mut current = match locals.iter().rev().find(|(name, _)| *name == expr.root) {
        Some((_, row)) => Resolved::Row(row),
        None => match context.get(&expr.root) {
            Some(ContextValue::Scalar(value)) => Resolved::Scalar(value),
            Some(ContextValue::Table(rows)) => Resolved::Table(rows),
            None => Resolved::Missing,
        },
    };

    for segment in &expr.path {
        current = match (current, segment) {
            (Resolved::Row(row), Segment::Key(key)) => {
                row.get(key).map_or(Resolved::Missing, Resolved::Scalar)
            }
            (Resolved::Table(rows), Segment::Index(index)) => {
                rows.get(*index).map_or(Resolved::Missing, Resolved::Row)
            }
            _ => Resolved::Missing,
        };
    }

    current
}

fn render_nodes<'t, 'c>(
    nodes: &'t [Node],
    context: &'c Context,
    locals: &mut Vec<(&'t str, &'c TableRow)>,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { rich, expr } => match resolve(expr, context, locals) {
                Resolved::Scalar(value) if *rich => write_rich_run(out, value),
                Resolved::Scalar(value) => out.push_str(&escape(value.text())),
                Resolved::Missing => {}
                Resolved::Table(_) | Resolved::Row(_) => {
                    debug!("'{}' is not a scalar value and renders as empty", expr.root);
                }
            },
            Node::For {
                var,
                iterable,
                body,
            } => {
                if let Resolved::Table(rows) = resolve(iterable, context, locals) {
                    for row in rows {
                        locals.push((var.as_str(), row));
                        render_nodes(body, context, locals, out);
                        locals.pop();
                    }
                }
            }
            Node::If {
                negated,
                cond,
                then,
                otherwise,
            } => {
                let truthy = resolve(cond, context, locals).is_truthy() != *negated;
                let branch = if truthy { then } else { otherwise };
                render_nodes(branch, context, locals, out);
            }
        }
    }
}

/// 値を1つのランとして出力する
///
/// 装飾付きの値は太字と文字色を `<w:rPr>` に設定する。改行は `<w:br/>` になる。
fn write_rich_run(out: &mut String, value: &FormattedValue) {
    out.push_str("<w:r>");
    if let Some(style) = value.style() {
        out.push_str("<w:rPr><w:b w:val=\"");
        out.push_str(if style.bold { "1" } else { "0" });
        out.push_str("\"/><w:color w:val=\"");
        out.push_str(&style.color);
        out.push_str("\"/></w:rPr>");
    }
    out.push_str("<w:t xml:space=\"preserve\">");
    for (index, line) in value.text().split('\n').enumerate() {
        if index > 0 {
            out.push_str("</w:t><w:br/><w:t xml:space=\"preserve\">");
        }
        out.push_str(&escape(line.trim_end_matches('\r')));
    }
    out.push_str("</w:t></w:r>");
}
