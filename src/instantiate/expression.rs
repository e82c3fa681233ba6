//! Infix expressions over features, e.g. `0.5*(feature_a + feature_b*2)` or
//! `(price, quantity).sum(expects_data=True)`.
//!
//! Parsing runs in three passes: a scanner produces [`Token`]s, the
//! shunting-yard algorithm reorders them to postfix, and a stack machine
//! builds a [`Node`] tree. The tree is then lowered to a [`Chain`] of
//! registered transformations.

use anyhow::{Context, Result};

use super::Param;
use crate::array::{Array, BinaryOp};
use crate::errors::ExpressionError;
use crate::transform::importer::FeatureImporter;
use crate::transform::math::Reduce;
use crate::transform::{Chain, Operand, Transformation, TransformationRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// A feature name or `feature:stage`.
    Reference(String),
    /// `.name(args)`; `args` is the raw text between the parentheses.
    Call { name: String, args: String },
    Operator(Operator),
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    /// `,` stacks operands.
    Stack,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            ',' => Some(Operator::Stack),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Sub | Operator::Stack => 1,
            Operator::Mul | Operator::Div => 2,
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            Operator::Add => Some(BinaryOp::Add),
            Operator::Sub => Some(BinaryOp::Sub),
            Operator::Mul => Some(BinaryOp::Mul),
            Operator::Div => Some(BinaryOp::Div),
            Operator::Stack => None,
        }
    }
}

/// A function call with keyword arguments already read.
#[derive(Debug)]
pub struct Call {
    pub name: String,
    pub kwargs: Vec<(String, Param)>,
}

/// Parsed expression tree.
#[derive(Debug)]
pub enum Node {
    Number(f64),
    Reference(String),
    /// One operator folded over two or more operands.
    Apply { op: Operator, operands: Vec<Node> },
    /// Calls applied in order to `source`, or to incoming data when there is
    /// no source.
    Pipeline { source: Option<Box<Node>>, calls: Vec<Call> },
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split an expression into tokens.
pub fn tokenize(expression: &str) -> std::result::Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = expression.chars().collect();
    let error = |position: usize| ExpressionError::Tokenize {
        expression: expression.to_string(),
        position,
    };
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| error(start))?;
            tokens.push(Token::Number(value));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == ':' && is_word_char(chars[i + 1]) {
                i += 1;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
            }
            tokens.push(Token::Reference(chars[start..i].iter().collect()));
        } else if c == '.' {
            let start = i;
            i += 1;
            let name_start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            if i == name_start || i >= chars.len() || chars[i] != '(' {
                return Err(error(start));
            }
            let name: String = chars[name_start..i].iter().collect();
            i += 1;
            let args_start = i;
            let mut quote: Option<char> = None;
            while i < chars.len() {
                match (quote, chars[i]) {
                    (Some(q), ch) if ch == q => quote = None,
                    (Some(_), '\\') => i += 1,
                    (Some(_), _) => {}
                    (None, '\'' | '"') => quote = Some(chars[i]),
                    (None, ')') => break,
                    (None, _) => {}
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(error(start));
            }
            let args: String = chars[args_start..i].iter().collect();
            i += 1;
            tokens.push(Token::Call { name, args });
        } else if let Some(op) = Operator::from_char(c) {
            tokens.push(Token::Operator(op));
            i += 1;
        } else if c == '(' {
            tokens.push(Token::Open);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::Close);
            i += 1;
        } else {
            return Err(error(i));
        }
    }
    Ok(tokens)
}

/// Whether `expression` is a well-formed expression.
///
/// Operands and binary operators must alternate, parentheses must balance,
/// and the expression must not end on an operator. A call may follow any
/// operand; a call opening the expression applies to incoming data and may
/// only be followed by more calls. A lone feature name is not an expression.
pub fn is_valid_expression(expression: &str) -> bool {
    match tokenize(expression) {
        Ok(tokens) => tokens_are_valid(&tokens),
        Err(_) => false,
    }
}

fn tokens_are_valid(tokens: &[Token]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    if matches!(tokens, [Token::Reference(_)] | [Token::Number(_)]) {
        return false;
    }
    let mut depth: i32 = 0;
    let mut needs_operand = true;
    let mut needs_operator = false;
    let mut leading_call = false;

    for (position, token) in tokens.iter().enumerate() {
        match token {
            Token::Open if !needs_operator && !leading_call => {
                depth += 1;
                needs_operand = true;
            }
            Token::Close if !needs_operand => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
                needs_operator = true;
            }
            Token::Number(_) | Token::Reference(_) if needs_operand => {
                needs_operand = false;
                needs_operator = true;
            }
            Token::Operator(_) if needs_operator && !leading_call => {
                needs_operator = false;
                needs_operand = true;
            }
            Token::Call { .. } if needs_operator => {}
            Token::Call { .. } if position == 0 => {
                leading_call = true;
                needs_operand = false;
                needs_operator = true;
            }
            _ => return false,
        }
    }
    depth == 0 && !needs_operand
}

/// Reorder infix tokens to postfix. Calls go straight to the output so they
/// bind to the operand just before them.
pub fn to_postfix(tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) | Token::Reference(_) | Token::Call { .. } => output.push(token),
            Token::Open => stack.push(token),
            Token::Close => {
                while let Some(top) = stack.pop() {
                    if top == Token::Open {
                        break;
                    }
                    output.push(top);
                }
            }
            Token::Operator(op) => {
                while let Some(Token::Operator(top)) = stack.last() {
                    if op.precedence() > top.precedence() {
                        break;
                    }
                    if let Some(popped) = stack.pop() {
                        output.push(popped);
                    }
                }
                stack.push(Token::Operator(op));
            }
        }
    }
    while let Some(top) = stack.pop() {
        output.push(top);
    }
    output
}

/// Parse an expression into a tree.
pub fn parse_expression(expression: &str) -> std::result::Result<Node, ExpressionError> {
    let tokens = tokenize(expression)?;
    if !tokens_are_valid(&tokens) {
        return Err(ExpressionError::Invalid(expression.to_string()));
    }

    let mut stack: Vec<Node> = Vec::new();
    for token in to_postfix(tokens) {
        match token {
            Token::Number(value) => stack.push(Node::Number(value)),
            Token::Reference(name) => stack.push(Node::Reference(name)),
            Token::Call { name, args } => {
                let call = Call {
                    kwargs: parse_arguments(&name, &args)?,
                    name,
                };
                let node = match stack.pop() {
                    None => Node::Pipeline {
                        source: None,
                        calls: vec![call],
                    },
                    Some(Node::Pipeline { source, mut calls }) => {
                        calls.push(call);
                        Node::Pipeline { source, calls }
                    }
                    Some(Node::Number(value)) => {
                        return Err(ExpressionError::InvalidOperand(format!(
                            "cannot apply '{}' to the number {}",
                            call.name, value
                        )))
                    }
                    Some(source) => Node::Pipeline {
                        source: Some(Box::new(source)),
                        calls: vec![call],
                    },
                };
                stack.push(node);
            }
            Token::Operator(op) => {
                let (Some(rhs), Some(lhs)) = (stack.pop(), stack.pop()) else {
                    return Err(ExpressionError::Invalid(expression.to_string()));
                };
                let node = match lhs {
                    Node::Apply { op: lhs_op, mut operands } if lhs_op == op => {
                        operands.push(rhs);
                        Node::Apply { op, operands }
                    }
                    lhs => Node::Apply {
                        op,
                        operands: vec![lhs, rhs],
                    },
                };
                stack.push(node);
            }
            Token::Open | Token::Close => {
                return Err(ExpressionError::Invalid(expression.to_string()));
            }
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(node), true) => Ok(node),
        _ => Err(ExpressionError::Invalid(expression.to_string())),
    }
}

/// Build the chain an expression describes. Steps are named `fn_0`, `fn_1`, ...
pub fn hydrate_expression(expression: &str, registry: &TransformationRegistry) -> Result<Chain> {
    let node = parse_expression(expression)?;
    log::debug!("Hydrating expression '{}' as {:?}", expression, node);
    let mut chain = Chain::new();
    lower_into(node, registry, &mut chain)
        .with_context(|| format!("Failed to build expression '{}'", expression))?;
    Ok(chain)
}

fn next_step_name(chain: &Chain) -> String {
    format!("fn_{}", chain.len())
}

fn lower_into(node: Node, registry: &TransformationRegistry, chain: &mut Chain) -> Result<()> {
    match node {
        Node::Number(value) => Err(ExpressionError::InvalidOperand(format!(
            "the constant {} has nothing to compute",
            value
        ))
        .into()),
        Node::Reference(name) => {
            let step = FeatureImporter::from_names(&[name])?;
            chain.push(next_step_name(chain), Box::new(step));
            Ok(())
        }
        Node::Apply { op, operands } => {
            let step = lower_apply(op, operands, registry)?;
            chain.push(next_step_name(chain), step);
            Ok(())
        }
        Node::Pipeline { source, calls } => {
            if let Some(source) = source {
                lower_into(*source, registry, chain)?;
            }
            for call in calls {
                let step = lower_call(call, registry)?;
                chain.push(next_step_name(chain), step);
            }
            Ok(())
        }
    }
}

fn lower_apply(op: Operator, operands: Vec<Node>, registry: &TransformationRegistry) -> Result<Box<dyn Transformation>> {
    let operands = operands
        .into_iter()
        .map(|node| lower_operand(node, registry))
        .collect::<Result<Vec<_>>>()?;
    Ok(match op.binary_op() {
        Some(binary) => Box::new(Reduce::over(binary, operands)?),
        None => Box::new(FeatureImporter::new(operands)?),
    })
}

fn lower_operand(node: Node, registry: &TransformationRegistry) -> Result<Operand> {
    match node {
        Node::Number(value) => Ok(Operand::literal(Array::scalar_f64(value))),
        Node::Reference(name) => Ok(Operand::reference(&name)),
        Node::Pipeline { source: None, .. } => Err(ExpressionError::InvalidOperand(
            "a call on incoming data cannot be combined with other operands".to_string(),
        )
        .into()),
        node => {
            let mut chain = Chain::new();
            lower_into(node, registry, &mut chain)?;
            Ok(Operand::Chain(chain))
        }
    }
}

fn lower_call(call: Call, registry: &TransformationRegistry) -> Result<Box<dyn Transformation>> {
    if !registry.contains(&call.name) {
        return Err(ExpressionError::UnknownFunction(call.name).into());
    }
    registry
        .create(&call.name, call.kwargs)
        .with_context(|| format!("Failed to create '{}' from expression", call.name))
}

/// Read `key=literal, ...`. Positional arguments are rejected.
fn parse_arguments(function: &str, source: &str) -> std::result::Result<Vec<(String, Param)>, ExpressionError> {
    let mut kwargs = Vec::new();
    for part in split_top_level(source) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = split_keyword(part) else {
            return Err(ExpressionError::PositionalArguments(function.to_string()));
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(is_word_char) {
            return Err(ExpressionError::PositionalArguments(function.to_string()));
        }
        let bad = |detail: String| ExpressionError::BadArgument {
            function: function.to_string(),
            detail,
        };
        let mut reader = LiteralReader::new(value);
        let param = reader.literal().map_err(&bad)?;
        if !reader.at_end() {
            return Err(bad(format!("unexpected text after value of '{}'", key)));
        }
        kwargs.push((key.to_string(), param));
    }
    Ok(kwargs)
}

/// Split on commas outside quotes and brackets.
fn split_top_level(source: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in source.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// `key=value` split at the first `=` outside quotes.
fn split_keyword(part: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    for (i, c) in part.char_indices() {
        match (quote, c) {
            (Some(q), ch) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '=') => return Some((&part[..i], &part[i + 1..])),
            (None, _) => {}
        }
    }
    None
}

/// Recursive-descent reader for argument literals.
struct LiteralReader<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> LiteralReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.chars.len()
    }

    fn literal(&mut self) -> std::result::Result<Param, String> {
        self.skip_whitespace();
        let Some(&c) = self.chars.get(self.pos) else {
            return Err(format!("missing value in '{}'", self.source));
        };
        match c {
            '\'' | '"' => self.string(c),
            '[' => self.list(),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            _ => self.word(),
        }
    }

    fn string(&mut self, quote: char) -> std::result::Result<Param, String> {
        self.pos += 1;
        let mut out = String::new();
        while let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            match c {
                '\\' => {
                    let Some(&next) = self.chars.get(self.pos) else {
                        break;
                    };
                    self.pos += 1;
                    out.push(match next {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Ok(Param::Str(out)),
                c => out.push(c),
            }
        }
        Err(format!("unterminated string in '{}'", self.source))
    }

    fn list(&mut self) -> std::result::Result<Param, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.get(self.pos) {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Param::List(items));
                }
                None => return Err(format!("unterminated list in '{}'", self.source)),
                _ => {}
            }
            items.push(self.literal()?);
            self.skip_whitespace();
            match self.chars.get(self.pos) {
                Some(',') => self.pos += 1,
                Some(']') => {}
                _ => return Err(format!("expected ',' or ']' in '{}'", self.source)),
            }
        }
    }

    fn number(&mut self) -> std::result::Result<Param, String> {
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Param::Int(i));
        }
        text.parse::<f64>()
            .map(Param::Float)
            .map_err(|_| format!("'{}' is not a number", text))
    }

    fn word(&mut self) -> std::result::Result<Param, String> {
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if is_word_char(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "True" | "true" => Ok(Param::Bool(true)),
            "False" | "false" => Ok(Param::Bool(false)),
            "None" | "null" => Ok(Param::Null),
            "" => Err(format!("unexpected character in '{}'", self.source)),
            other => Err(format!("'{}' is not a literal; quote strings", other)),
        }
    }
}
