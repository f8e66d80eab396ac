//! Recursive descent parser of the expression text form.

use super::ast::{BinaryOp, Expr, Function, UnaryOp};
use super::{ExpressionError, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Str(String),
    Attribute(String),
    Variable(String),
    Dollar(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Match,
    LParen,
    RParen,
    Comma,
    Dot,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {v}"),
            Token::Str(_) => "string".to_string(),
            Token::Attribute(name) => format!("attribute [{name}]"),
            Token::Variable(name) => format!("variable @{name}"),
            Token::Dollar(name) => format!("${name}"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ExpressionError> {
    let mut tokens = vec![];
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '[' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, ']')) => break,
                        Some((_, c)) => name.push(c),
                        None => return Err(parse_error(offset, "unterminated attribute name")),
                    }
                }
                Token::Attribute(name)
            }
            '\'' | '"' => {
                chars.next();
                let quote = c;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, c)) if c == '\\' || c == '\'' || c == '"' => value.push(c),
                            Some((_, c)) => {
                                value.push('\\');
                                value.push(c);
                            }
                            None => return Err(parse_error(offset, "unterminated string")),
                        },
                        Some((_, c)) => value.push(c),
                        None => return Err(parse_error(offset, "unterminated string")),
                    }
                }
                Token::Str(value)
            }
            '@' | '$' => {
                chars.next();
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(parse_error(offset, "expected a name"));
                }
                if c == '@' {
                    Token::Variable(name)
                } else {
                    Token::Dollar(name)
                }
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                let mut prev = ' ';
                while let Some(&(_, c)) = chars.peek() {
                    let exponent_sign = (c == '-' || c == '+') && (prev == 'e' || prev == 'E');
                    if !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign)
                    {
                        break;
                    }
                    text.push(c);
                    prev = c;
                    chars.next();
                }
                Token::Number(text)
            }
            c if is_ident_char(c) => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                Token::Ident(name)
            }
            _ => {
                chars.next();
                let next = chars.peek().map(|(_, c)| *c);
                let mut double = |token: Token| {
                    chars.next();
                    token
                };
                match (c, next) {
                    ('=', Some('~')) => double(Token::Match),
                    ('=', Some('=')) => double(Token::Eq),
                    ('!', Some('=')) => double(Token::Neq),
                    ('<', Some('>')) => double(Token::Neq),
                    ('<', Some('=')) => double(Token::Le),
                    ('>', Some('=')) => double(Token::Ge),
                    ('&', Some('&')) => double(Token::AndAnd),
                    ('|', Some('|')) => double(Token::OrOr),
                    ('=', _) => Token::Eq,
                    ('<', _) => Token::Lt,
                    ('>', _) => Token::Gt,
                    ('!', _) => Token::Bang,
                    ('+', _) => Token::Plus,
                    ('-', _) => Token::Minus,
                    ('*', _) => Token::Star,
                    ('/', _) => Token::Slash,
                    ('%', _) => Token::Percent,
                    ('(', _) => Token::LParen,
                    (')', _) => Token::RParen,
                    (',', _) => Token::Comma,
                    ('.', _) => Token::Dot,
                    (c, _) => return Err(parse_error(offset, &format!("unexpected character '{c}'"))),
                }
            }
        };

        tokens.push((offset, token));
    }

    tokens.push((input.len(), Token::Eof));
    Ok(tokens)
}

fn parse_error(offset: usize, message: &str) -> ExpressionError {
    ExpressionError::Parse {
        offset,
        message: message.to_string(),
    }
}

/// Parses the expression text into a syntax tree.
pub(crate) fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        position: 0,
    };

    let expr = parser.or()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(&format!("unexpected {}", other.describe()))),
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|(_, token)| token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|(offset, _)| *offset)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn error(&self, message: &str) -> ExpressionError {
        parse_error(self.offset(), message)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.and()?;
        while self.is_keyword("or") || *self.peek() == Token::OrOr {
            self.advance();
            let rhs = self.and()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.not()?;
        while self.is_keyword("and") || *self.peek() == Token::AndAnd {
            self.advance();
            let rhs = self.not()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, ExpressionError> {
        if self.is_keyword("not") || *self.peek() == Token::Bang {
            self.advance();
            let operand = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }

        self.comparison()
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        Some(match self.peek() {
            Token::Eq => BinaryOp::Eq,
            Token::Neq => BinaryOp::Neq,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
                "eq" => BinaryOp::Eq,
                "neq" => BinaryOp::Neq,
                "lt" => BinaryOp::Lt,
                "le" => BinaryOp::Le,
                "gt" => BinaryOp::Gt,
                "ge" => BinaryOp::Ge,
                _ => return None,
            },
            _ => return None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.additive()?;
        loop {
            if *self.peek() == Token::Match {
                self.advance();
                let pattern = self.string_literal()?;
                lhs = Expr::RegexMatch {
                    subject: Box::new(lhs),
                    pattern,
                };
                continue;
            }

            let Some(op) = self.comparison_op() else {
                return Ok(lhs);
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if *self.peek() != Token::Minus {
            return self.postfix();
        }

        let offset = self.offset();
        self.advance();
        if let Token::Number(text) = self.peek().clone() {
            self.advance();
            let literal = parse_number(&format!("-{text}"), offset)?;
            return self.methods(literal);
        }

        let operand = self.unary()?;
        Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionError> {
        let primary = self.primary()?;
        self.methods(primary)
    }

    fn methods(&mut self, mut subject: Expr) -> Result<Expr, ExpressionError> {
        while *self.peek() == Token::Dot {
            self.advance();
            let offset = self.offset();
            let Token::Ident(method) = self.advance() else {
                return Err(parse_error(offset, "expected a method name"));
            };

            self.expect(Token::LParen)?;
            subject = match method.as_str() {
                "match" => {
                    let pattern = self.string_literal()?;
                    Expr::RegexMatch {
                        subject: Box::new(subject),
                        pattern,
                    }
                }
                "replace" => {
                    let pattern = self.string_literal()?;
                    self.expect(Token::Comma)?;
                    let replacement = self.string_literal()?;
                    Expr::RegexReplace {
                        subject: Box::new(subject),
                        pattern,
                        replacement,
                    }
                }
                other => return Err(parse_error(offset, &format!("unknown method '{other}'"))),
            };
            self.expect(Token::RParen)?;
        }

        Ok(subject)
    }

    fn string_literal(&mut self) -> Result<String, ExpressionError> {
        if let Token::Str(value) = self.peek() {
            let value = value.clone();
            self.advance();
            return Ok(value);
        }

        Err(self.error(&format!(
            "expected string, found {}",
            self.peek().describe()
        )))
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let offset = self.offset();
        match self.advance() {
            Token::Number(text) => parse_number(&text, offset),
            Token::Str(value) => Ok(Expr::Literal(Value::String(value))),
            Token::Attribute(name) => Ok(Expr::Attribute(name)),
            Token::Variable(name) => Ok(Expr::Variable(name)),
            Token::Dollar(name) => match name.as_str() {
                "id" => Ok(Expr::FeatureId),
                "geometry_type" => Ok(Expr::GeometryType),
                other => Err(parse_error(offset, &format!("unknown property ${other}"))),
            },
            Token::LParen => {
                let expr = self.or()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                lower => {
                    let Some(function) = Function::from_name(lower) else {
                        return Err(parse_error(offset, &format!("unknown identifier '{name}'")));
                    };
                    self.call(function, offset)
                }
            },
            other => Err(parse_error(
                offset,
                &format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn call(&mut self, function: Function, offset: usize) -> Result<Expr, ExpressionError> {
        self.expect(Token::LParen)?;
        let mut args = vec![];
        if *self.peek() != Token::RParen {
            loop {
                args.push(self.or()?);
                if *self.peek() != Token::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(Token::RParen)?;

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(parse_error(
                offset,
                &format!(
                    "function {} doesn't accept {} arguments",
                    function.name(),
                    args.len()
                ),
            ));
        }

        Ok(Expr::Call(function, args))
    }
}

fn parse_number(text: &str, offset: usize) -> Result<Expr, ExpressionError> {
    let is_float = text.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(v) = text.parse::<i64>() {
            return Ok(Expr::Literal(Value::Int(v)));
        }
    }

    text.parse::<f64>()
        .map(|v| Expr::Literal(Value::Double(v)))
        .map_err(|_| parse_error(offset, &format!("invalid number '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn attr(name: &str) -> Box<Expr> {
        Box::new(Expr::attr(name))
    }

    #[test]
    fn precedence() {
        let expr = parse("[a] + 2 * 3 = 7 and not [b]").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::And,
                Expr::binary(
                    BinaryOp::Eq,
                    Expr::binary(
                        BinaryOp::Add,
                        Expr::attr("a"),
                        Expr::binary(BinaryOp::Mul, Expr::lit(2), Expr::lit(3)),
                    ),
                    Expr::lit(7),
                ),
                Expr::Unary(UnaryOp::Not, attr("b")),
            )
        );
    }

    #[test]
    fn operator_spellings() {
        assert_eq!(parse("[a] <> 1").unwrap(), parse("[a] != 1").unwrap());
        assert_eq!(parse("[a] neq 1").unwrap(), parse("[a] != 1").unwrap());
        assert_eq!(parse("[a] == 1").unwrap(), parse("[a] eq 1").unwrap());
        assert_eq!(parse("[a] && [b]").unwrap(), parse("[a] and [b]").unwrap());
        assert_eq!(parse("[a] || ![b]").unwrap(), parse("[a] or not [b]").unwrap());
        assert_eq!(
            parse("[name] =~ '^A.*'").unwrap(),
            parse("[name].match('^A.*')").unwrap()
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse("-5").unwrap(), Expr::lit(-5));
        assert_eq!(parse("1.5e3").unwrap(), Expr::lit(1500.0));
        assert_eq!(parse("'it\\'s'").unwrap(), Expr::lit("it's"));
        assert_eq!(parse("\"a\"").unwrap(), Expr::lit("a"));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(parse("@zoom").unwrap(), Expr::Variable("zoom".into()));
        assert_eq!(parse("$id").unwrap(), Expr::FeatureId);
        assert_eq!(parse("[name with space]").unwrap(), Expr::attr("name with space"));
    }

    #[test]
    fn calls_and_methods() {
        assert_eq!(
            parse("max([a], 2)").unwrap(),
            Expr::Call(Function::Max, vec![Expr::attr("a"), Expr::lit(2)])
        );
        assert_eq!(
            parse("[a].replace('(\\d+)', 'n$1')").unwrap(),
            Expr::RegexReplace {
                subject: attr("a"),
                pattern: "(\\d+)".into(),
                replacement: "n$1".into(),
            }
        );
    }

    #[test]
    fn errors_have_offsets() {
        assert_matches!(parse("[a] = "), Err(ExpressionError::Parse { offset: 6, .. }));
        assert_matches!(parse("[a"), Err(ExpressionError::Parse { offset: 0, .. }));
        assert_matches!(parse("foo(1)"), Err(ExpressionError::Parse { offset: 0, .. }));
        assert_matches!(parse("pow(1)"), Err(ExpressionError::Parse { .. }));
        assert_matches!(parse("1 2"), Err(ExpressionError::Parse { offset: 2, .. }));
        assert_matches!(parse("[a] # 1"), Err(ExpressionError::Parse { offset: 4, .. }));
    }

    #[test]
    fn display_reparses_to_same_tree() {
        let sources = [
            "[a] + 2 * 3 = 7 and not [b]",
            "-[x] - -2.5 >= 1e300 or [s] = 'q\\'uote\\\\'",
            "upper(concat([a], ' ', @suffix)).match('^A(?i)b')",
            "(-3).replace('3', '4') % 2 != $id",
            "$geometry_type = 'polygon' && ![flag]",
            "min(1, 2.0, [c]) / 0 < null",
        ];

        for source in sources {
            let expr = parse(source).unwrap();
            let printed = expr.to_string();
            assert_eq!(parse(&printed).unwrap(), expr, "{source} -> {printed}");
        }
    }
}
