//! Flat representation of an expression used for evaluation.
//!
//! Nodes are stored in post-order, so every node refers only to nodes with smaller indices
//! and the root is the last one.

use std::cmp::Ordering;

use regex::Regex;

use super::ast::{BinaryOp, Expr, Function, UnaryOp};
use super::functions;
use super::value::Number;
use super::{EvalContext, ExpressionError, NullSemantics, Value};

type NodeId = u32;

#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Attribute(String),
    Variable(String),
    FeatureId,
    GeometryType,
    Binary(BinaryOp, NodeId, NodeId),
    Unary(UnaryOp, NodeId),
    /// Arguments are `args[start..start + len]`.
    Call(Function, u32, u32),
    RegexMatch(NodeId, Regex),
    RegexReplace(NodeId, Regex, String),
}

#[derive(Debug, Clone)]
pub(crate) struct Program {
    nodes: Vec<Node>,
    args: Vec<NodeId>,
}

impl Program {
    pub(crate) fn compile(expr: &Expr) -> Result<Self, ExpressionError> {
        let mut program = Self {
            nodes: vec![],
            args: vec![],
        };
        program.add(expr)?;
        Ok(program)
    }

    pub(crate) fn constant(value: Value) -> Self {
        Self {
            nodes: vec![Node::Literal(value)],
            args: vec![],
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        (self.nodes.len() - 1) as NodeId
    }

    fn add(&mut self, expr: &Expr) -> Result<NodeId, ExpressionError> {
        let node = match expr {
            Expr::Literal(value) => Node::Literal(value.clone()),
            Expr::Attribute(name) => Node::Attribute(name.clone()),
            Expr::Variable(name) => Node::Variable(name.clone()),
            Expr::FeatureId => Node::FeatureId,
            Expr::GeometryType => Node::GeometryType,
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.add(lhs)?;
                let rhs = self.add(rhs)?;
                Node::Binary(*op, lhs, rhs)
            }
            Expr::Unary(op, operand) => Node::Unary(*op, self.add(operand)?),
            Expr::Call(function, args) => {
                let ids = args
                    .iter()
                    .map(|arg| self.add(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let start = self.args.len() as u32;
                self.args.extend(ids);
                Node::Call(*function, start, args.len() as u32)
            }
            Expr::RegexMatch { subject, pattern } => {
                let subject = self.add(subject)?;
                Node::RegexMatch(subject, compile_regex(pattern)?)
            }
            Expr::RegexReplace {
                subject,
                pattern,
                replacement,
            } => {
                let subject = self.add(subject)?;
                Node::RegexReplace(subject, compile_regex(pattern)?, replacement.clone())
            }
        };

        Ok(self.push(node))
    }

    pub(crate) fn evaluate(&self, context: &EvalContext) -> Value {
        match self.nodes.len() {
            0 => Value::Null,
            len => self.eval(len as NodeId - 1, context),
        }
    }

    fn eval(&self, id: NodeId, context: &EvalContext) -> Value {
        let Some(node) = self.nodes.get(id as usize) else {
            return Value::Null;
        };

        match node {
            Node::Literal(value) => value.clone(),
            Node::Attribute(name) => context.feature.get(name).cloned().unwrap_or_default(),
            Node::Variable(name) => context.variables.get(name).cloned().unwrap_or_default(),
            Node::FeatureId => Value::Int(context.feature.id()),
            Node::GeometryType => context
                .feature
                .geometry_type()
                .map(|t| Value::from(t.name()))
                .unwrap_or_default(),
            Node::Binary(BinaryOp::And, lhs, rhs) => {
                let lhs = truth(&self.eval(*lhs, context));
                if lhs == Some(false) {
                    return Value::Bool(false);
                }
                match (lhs, truth(&self.eval(*rhs, context))) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                }
            }
            Node::Binary(BinaryOp::Or, lhs, rhs) => {
                let lhs = truth(&self.eval(*lhs, context));
                if lhs == Some(true) {
                    return Value::Bool(true);
                }
                match (lhs, truth(&self.eval(*rhs, context))) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                }
            }
            Node::Binary(op, lhs, rhs) => {
                let lhs = self.eval(*lhs, context);
                let rhs = self.eval(*rhs, context);
                match op {
                    BinaryOp::Eq
                    | BinaryOp::Neq
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge => compare(*op, &lhs, &rhs, context.null_semantics),
                    _ => arithmetic(*op, &lhs, &rhs),
                }
            }
            Node::Unary(UnaryOp::Not, operand) => match truth(&self.eval(*operand, context)) {
                Some(v) => Value::Bool(!v),
                None => Value::Null,
            },
            Node::Unary(UnaryOp::Neg, operand) => match self.eval(*operand, context).to_number() {
                Some(Number::Int(v)) => v
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or(Value::Double(-(v as f64))),
                Some(Number::Double(v)) => Value::Double(-v),
                None => Value::Null,
            },
            Node::Call(function, start, len) => {
                let start = *start as usize;
                let values: Vec<Value> = self.args[start..start + *len as usize]
                    .iter()
                    .map(|arg| self.eval(*arg, context))
                    .collect();
                functions::call(*function, &values)
            }
            Node::RegexMatch(subject, regex) => match self.eval(*subject, context) {
                Value::Null => Value::Bool(false),
                value => Value::Bool(regex.is_match(&value.to_text())),
            },
            Node::RegexReplace(subject, regex, replacement) => {
                match self.eval(*subject, context) {
                    Value::Null => Value::Null,
                    value => Value::String(
                        regex
                            .replace_all(&value.to_text(), replacement.as_str())
                            .into_owned(),
                    ),
                }
            }
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, ExpressionError> {
    Regex::new(pattern).map_err(|err| ExpressionError::Regex {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        other => Some(other.to_bool()),
    }
}

fn loosely_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value, semantics: NullSemantics) -> Value {
    if semantics == NullSemantics::Loose && (lhs.is_null() || rhs.is_null()) {
        let equal = loosely_null(lhs) && loosely_null(rhs);
        return Value::Bool(match op {
            BinaryOp::Eq => equal,
            BinaryOp::Neq => !equal,
            _ => false,
        });
    }

    let Some(ordering) = lhs.compare(rhs) else {
        return Value::Null;
    };

    Value::Bool(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Neq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => return Value::Null,
    })
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_null() || rhs.is_null() {
        return Value::Null;
    }

    if op == BinaryOp::Add && (matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)))
    {
        return Value::String(lhs.to_text() + &rhs.to_text());
    }

    let (Some(a), Some(b)) = (lhs.to_number(), rhs.to_number()) else {
        return Value::Null;
    };

    match (a, b) {
        (Number::Int(a), Number::Int(b)) => integer_op(op, a, b),
        (a, b) => float_op(op, a.as_f64(), b.as_f64()),
    }
}

/// Integer arithmetic. Results that don't fit into `i64` are computed in floating point.
fn integer_op(op: BinaryOp, a: i64, b: i64) -> Value {
    if b == 0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
        return Value::Null;
    }

    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod => Some(a.checked_rem(b).unwrap_or(0)),
        _ => return Value::Null,
    };

    match result {
        Some(v) => Value::Int(v),
        None => float_op(op, a as f64, b as f64),
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Value {
    if b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
        return Value::Null;
    }

    Value::Double(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => return Value::Null,
    })
}
