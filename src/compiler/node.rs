use std::fmt;

use serde_json::Value as JsonValue;

use crate::conditions::Ops;
use crate::scalar;

/// comparison operators a compare item lowers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl BinaryOp {
    pub fn as_code(&self) -> &'static str {
        match self {
            BinaryOp::LooseEq => "==",
            BinaryOp::LooseNe => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
        }
    }
}

/// lowered program tree
///
/// `Display` renders the generated source; the sandbox interpreter walks
/// the same tree, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// quoted or bare literal
    Literal(JsonValue),
    /// code emitted verbatim, with the value it stands for
    Raw { code: String, value: JsonValue },
    /// `data['a']['b']`
    Lookup(Vec<String>),
    /// `name((a1), (a2))`
    Call { name: String, args: Vec<Node> },
    /// string append
    Concat(Vec<Node>),
    Not(Box<Node>),
    /// `isset(x)`: set and not an empty array
    IsSet(Box<Node>),
    /// `x ?? ''`
    Coalesce(Box<Node>),
    /// `contains((haystack), (needle))`
    Contains(Box<Node>, Box<Node>),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// flat `&&`/`||` chain over every child
    Logical { op: Ops, children: Vec<Node> },
    Paren(Box<Node>),
}

impl Node {
    pub fn not(node: Node) -> Self {
        Node::Not(Box::new(node))
    }

    pub fn paren(node: Node) -> Self {
        Node::Paren(Box::new(node))
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// every function name called anywhere in the tree
    pub fn calls(&self) -> Vec<(&str, usize)> {
        let mut out = Vec::new();
        self.collect_calls(&mut out);
        out
    }

    fn collect_calls<'a>(&'a self, out: &mut Vec<(&'a str, usize)>) {
        match self {
            Node::Call { name, args } => {
                out.push((name.as_str(), args.len()));
                args.iter().for_each(|a| a.collect_calls(out));
            }
            Node::Concat(children) | Node::Logical { children, .. } => {
                children.iter().for_each(|c| c.collect_calls(out));
            }
            Node::Not(inner) | Node::IsSet(inner) | Node::Coalesce(inner) | Node::Paren(inner) => {
                inner.collect_calls(out)
            }
            Node::Contains(left, right) | Node::Binary { left, right, .. } => {
                left.collect_calls(out);
                right.collect_calls(out);
            }
            Node::Literal(_) | Node::Raw { .. } | Node::Lookup(_) => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(value) => f.write_str(&render_literal(value)),
            Node::Raw { code, .. } => f.write_str(code),
            Node::Lookup(path) => {
                f.write_str("data")?;
                for segment in path {
                    write!(f, "[{}]", quote(segment))?;
                }
                Ok(())
            }
            Node::Call { name, args } => {
                let args: Vec<String> = args.iter().map(|a| format!("({})", a)).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
            Node::Concat(children) => {
                let parts: Vec<String> = children.iter().map(Node::to_string).collect();
                f.write_str(&parts.join(" . "))
            }
            Node::Not(inner) => write!(f, "!{}", inner),
            Node::IsSet(inner) => write!(f, "isset({})", inner),
            Node::Coalesce(inner) => write!(f, "{} ?? ''", inner),
            Node::Contains(haystack, needle) => write!(f, "contains(({}), ({}))", haystack, needle),
            Node::Binary { op, left, right } => {
                write!(f, "({}) {} ({})", left, op.as_code(), right)
            }
            Node::Logical { op, children } if children.is_empty() => {
                // identity element of the operator
                f.write_str(if *op == Ops::And { "true" } else { "false" })
            }
            Node::Logical { op, children } => {
                let parts: Vec<String> = children.iter().map(Node::to_string).collect();
                let sep = format!(" {} ", op.as_code());
                write!(f, "({})", parts.join(sep.as_str()))
            }
            Node::Paren(inner) => write!(f, "({})", inner),
        }
    }
}

/// single-quote a string, escaping backslashes and quotes
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn render_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(_) => scalar::stringify(value),
        JsonValue::String(s) => quote(s),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

/// lower a verbatim code fragment
///
/// fragments are literals (numbers, `true`/`false`/`null`, quoted strings)
/// and `data[...]` lookups joined by ` . `. a lone literal keeps its source
/// text. anything else is `None`.
pub fn parse_fragment(raw: &str) -> Option<Node> {
    let mut cursor = Cursor {
        src: raw.trim(),
        pos: 0,
    };

    let mut terms = vec![cursor.term()?];
    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }
        if !cursor.eat('.') {
            return None;
        }
        terms.push(cursor.term()?);
    }

    if terms.len() > 1 {
        return Some(Node::Concat(terms));
    }
    Some(match terms.remove(0) {
        Node::Literal(value) => Node::Raw {
            code: raw.to_string(),
            value,
        },
        other => other,
    })
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            return true;
        }
        false
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn term(&mut self) -> Option<Node> {
        self.skip_ws();
        match self.peek()? {
            '\'' | '"' => self.string().map(|s| Node::Literal(JsonValue::String(s))),
            _ if self.rest().starts_with("data[") => self.lookup(),
            _ => match self.word() {
                "true" => Some(Node::Literal(JsonValue::Bool(true))),
                "false" => Some(Node::Literal(JsonValue::Bool(false))),
                "null" => Some(Node::Literal(JsonValue::Null)),
                word => scalar::parse_number(word).map(Node::Literal),
            },
        }
    }

    /// bare token up to whitespace or a quote; numbers keep their dot
    fn word(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || c == '\'' || c == '"')
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn string(&mut self) -> Option<String> {
        let q = self.bump().filter(|c| *c == '\'' || *c == '"')?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                '\\' => out.push(self.bump()?),
                c if c == q => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn lookup(&mut self) -> Option<Node> {
        self.pos += "data".len();
        let mut path = Vec::new();
        while self.eat('[') {
            self.skip_ws();
            path.push(self.string()?);
            self.skip_ws();
            if !self.eat(']') {
                return None;
            }
        }
        Some(Node::Lookup(path))
    }
}
