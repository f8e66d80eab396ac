//! Attribute expressions and filters.
//!
//! Expressions are written in a small text language (`[population] > 1000 and [name] != ''`),
//! parsed into an [`Expr`] tree and compiled into an [`Expression`]: a flat, index-addressed
//! program with pre-compiled regular expressions. Evaluation never fails: operations that make
//! no sense for their operands (division by zero, comparing a word with a number) produce
//! [`Value::Null`], and a filter that yields `null` is false.

use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use ahash::AHashMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feature::Feature;

mod ast;
mod compiled;
mod functions;
mod parser;
mod value;

pub use ast::{BinaryOp, Expr, Function, UnaryOp};
use compiled::Program;
pub use value::Value;

/// Values of map variables, referenced in expressions as `@name`.
pub type Variables = AHashMap<String, Value>;

/// Error in expression text or in a regular expression it contains.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    /// The text is not a valid expression.
    #[error("failed to parse expression at byte {offset}: {message}")]
    Parse {
        /// Byte offset of the offending token.
        offset: usize,
        /// What went wrong.
        message: String,
    },
    /// Invalid regular expression in `.match()`, `.replace()` or `=~`.
    #[error("invalid regular expression '{pattern}': {message}")]
    Regex {
        /// The pattern as written.
        pattern: String,
        /// Error reported by the regex engine.
        message: String,
    },
}

/// How comparisons treat `null`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NullSemantics {
    /// Three-valued logic: any comparison involving `null` is `null`, so both `[a] = x` and
    /// `[a] != x` are false in a filter when `[a]` is missing.
    #[default]
    Strict,
    /// Compatibility mode: `null` equals `null` and the empty string, and is unequal to
    /// anything else. Ordering comparisons with `null` are false.
    Loose,
}

/// Everything an expression can read during evaluation.
#[derive(Debug, Copy, Clone)]
pub struct EvalContext<'a> {
    /// Evaluated feature.
    pub feature: &'a Feature,
    /// Map variables.
    pub variables: &'a Variables,
    /// Null comparison mode.
    pub null_semantics: NullSemantics,
}

impl<'a> EvalContext<'a> {
    /// Creates a context with strict null semantics.
    pub fn new(feature: &'a Feature, variables: &'a Variables) -> Self {
        Self {
            feature,
            variables,
            null_semantics: NullSemantics::Strict,
        }
    }

    /// Returns a copy of the context with the given null semantics.
    pub fn with_null_semantics(self, null_semantics: NullSemantics) -> Self {
        Self {
            null_semantics,
            ..self
        }
    }
}

/// Compiled expression.
///
/// Cloning is cheap: the compiled program is shared.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Expression {
    ast: Expr,
    program: Arc<Program>,
}

impl Expression {
    /// Parses and compiles expression text.
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        Self::compile(parser::parse(text)?)
    }

    /// Compiles a syntax tree.
    pub fn compile(ast: Expr) -> Result<Self, ExpressionError> {
        let program = Program::compile(&ast)?;
        Ok(Self {
            ast,
            program: Arc::new(program),
        })
    }

    /// Expression that always evaluates to the given value.
    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            program: Arc::new(Program::constant(value.clone())),
            ast: Expr::Literal(value),
        }
    }

    /// Syntax tree of the expression.
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluates the expression.
    pub fn evaluate(&self, context: &EvalContext) -> Value {
        self.program.evaluate(context)
    }

    /// Evaluates the expression as a filter: `null` is false, other values are converted with
    /// [`Value::to_bool`].
    pub fn evaluate_filter(&self, context: &EvalContext) -> bool {
        self.evaluate(context).to_bool()
    }

    /// Names of all attributes the expression reads.
    pub fn referenced_attributes(&self) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.collect_attributes(&mut result);
        result
    }

    /// Adds names of attributes the expression reads to `out`.
    pub fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        self.ast.collect_attributes(out);
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.ast == other.ast
    }
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expression({})", self.ast)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ast)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Expression {
    type Error = ExpressionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Expression> for String {
    fn from(value: Expression) -> Self {
        value.to_string()
    }
}
