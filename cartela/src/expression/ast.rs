use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use super::Value;

/// Expression syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value.
    Literal(Value),
    /// Feature attribute: `[name]`.
    Attribute(String),
    /// Map variable: `@name`.
    Variable(String),
    /// Id of the feature: `$id`.
    FeatureId,
    /// Type of the first geometry of the feature: `$geometry_type`.
    GeometryType,
    /// Operation with two operands.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Operation with one operand.
    Unary(UnaryOp, Box<Expr>),
    /// Built-in function call.
    Call(Function, Vec<Expr>),
    /// Regular expression test: `subject.match('pattern')` or `subject =~ 'pattern'`.
    RegexMatch {
        /// Tested value.
        subject: Box<Expr>,
        /// Regular expression.
        pattern: String,
    },
    /// Regular expression substitution: `subject.replace('pattern', 'replacement')`.
    RegexReplace {
        /// Value to modify.
        subject: Box<Expr>,
        /// Regular expression.
        pattern: String,
        /// Replacement, may reference capture groups as `$1`.
        replacement: String,
    },
}

/// Binary operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `and`
    And,
    /// `or`
    Or,
}

impl BinaryOp {
    /// Canonical textual form of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Unary operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Built-in functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Function {
    /// Smallest of the arguments.
    Min,
    /// Largest of the arguments.
    Max,
    /// `pow(base, exponent)`.
    Pow,
    /// Absolute value.
    Abs,
    /// Square root.
    Sqrt,
    /// Sine of an angle in radians.
    Sin,
    /// Cosine of an angle in radians.
    Cos,
    /// Tangent of an angle in radians.
    Tan,
    /// Arc tangent.
    Atan,
    /// Natural exponent.
    Exp,
    /// Natural logarithm.
    Log,
    /// Number of characters in a string.
    Length,
    /// Uppercase string.
    Upper,
    /// Lowercase string.
    Lower,
    /// Concatenation of all arguments as strings.
    Concat,
}

const FUNCTIONS: &[(&str, Function)] = &[
    ("min", Function::Min),
    ("max", Function::Max),
    ("pow", Function::Pow),
    ("abs", Function::Abs),
    ("sqrt", Function::Sqrt),
    ("sin", Function::Sin),
    ("cos", Function::Cos),
    ("tan", Function::Tan),
    ("atan", Function::Atan),
    ("exp", Function::Exp),
    ("log", Function::Log),
    ("length", Function::Length),
    ("upper", Function::Upper),
    ("lower", Function::Lower),
    ("concat", Function::Concat),
];

impl Function {
    /// Looks up a function by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, function)| *function)
    }

    /// Name of the function.
    pub fn name(&self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    /// Allowed number of arguments: `(min, max)`.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Function::Min | Function::Max => (1, usize::MAX),
            Function::Concat => (0, usize::MAX),
            Function::Pow => (2, 2),
            _ => (1, 1),
        }
    }
}

impl Expr {
    /// Shortcut for an attribute reference.
    pub fn attr(name: impl Into<String>) -> Self {
        Expr::Attribute(name.into())
    }

    /// Shortcut for a literal.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Shortcut for a binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Collects names of all attributes the expression reads.
    pub fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Attribute(name) => {
                out.insert(name.clone());
            }
            Expr::Literal(_) | Expr::Variable(_) | Expr::FeatureId | Expr::GeometryType => {}
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_attributes(out);
                rhs.collect_attributes(out);
            }
            Expr::Unary(_, operand) => operand.collect_attributes(out),
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.collect_attributes(out)),
            Expr::RegexMatch { subject, .. } | Expr::RegexReplace { subject, .. } => {
                subject.collect_attributes(out)
            }
        }
    }
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> std::fmt::Result {
    write!(f, "'")?;
    for c in s.chars() {
        match c {
            '\\' => write!(f, "\\\\")?,
            '\'' => write!(f, "\\'")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "'")
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write_quoted(f, s),
            Expr::Literal(Value::Double(v)) => write!(f, "{v:?}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Attribute(name) => write!(f, "[{name}]"),
            Expr::Variable(name) => write!(f, "@{name}"),
            Expr::FeatureId => write!(f, "$id"),
            Expr::GeometryType => write!(f, "$geometry_type"),
            Expr::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Unary(UnaryOp::Not, operand) => write!(f, "not ({operand})"),
            Expr::Unary(UnaryOp::Neg, operand) => write!(f, "-({operand})"),
            Expr::Call(function, args) => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::RegexMatch { subject, pattern } => {
                write!(f, "{}.match(", Postfix(subject))?;
                write_quoted(f, pattern)?;
                write!(f, ")")
            }
            Expr::RegexReplace {
                subject,
                pattern,
                replacement,
            } => {
                write!(f, "{}.replace(", Postfix(subject))?;
                write_quoted(f, pattern)?;
                write!(f, ", ")?;
                write_quoted(f, replacement)?;
                write!(f, ")")
            }
        }
    }
}

/// Subject of a method call. Negative numbers and negations need parentheses to bind to the
/// method.
struct Postfix<'a>(&'a Expr);

impl Display for Postfix<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Expr::Unary(..) => write!(f, "({})", self.0),
            Expr::Literal(Value::Int(v)) if *v < 0 => write!(f, "({})", self.0),
            Expr::Literal(Value::Double(v)) if v.is_sign_negative() => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}
