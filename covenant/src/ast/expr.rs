//! Expression AST nodes
//!
//! The grammar the constraint compiler understands is closed: constants,
//! binary/unary/boolean operators, comparisons, names, conditionals and
//! calls. `Attribute`, `Lambda` and `Unsupported` are carried so that the
//! parser can hand over any expression; the compiler abstains on them.

use serde::{Deserialize, Deserializer, Serialize};

/// Literal value of a constant node
///
/// Integers arrive as JSON numbers or as decimal strings. Values outside
/// the `i64` range are kept as text in [`Literal::BigInt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "RawLiteral")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    /// Integer outside the `i64` range. Exact decimal text, except for
    /// JSON numbers too wide to survive parsing, which keep their float
    /// rendering (`1e20`) and are not exact.
    BigInt(String),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    None,
}

impl Literal {
    /// Name of the runtime type, as the source language spells it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "bool",
            Literal::Int(_) | Literal::BigInt(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::Bytes(_) => "bytes",
            Literal::None => "NoneType",
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::BigInt(text) => f.write_str(text),
            Literal::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Literal::None => write!(f, "None"),
        }
    }
}

/// Wire form of [`Literal`]
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawLiteral {
    Bool(bool),
    Int(IntText),
    BigInt(IntText),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    None,
}

impl From<RawLiteral> for Literal {
    fn from(raw: RawLiteral) -> Self {
        match raw {
            RawLiteral::Bool(b) => Literal::Bool(b),
            RawLiteral::Int(IntText(text)) | RawLiteral::BigInt(IntText(text)) => match text.parse() {
                Ok(n) => Literal::Int(n),
                Err(_) => Literal::BigInt(text),
            },
            RawLiteral::Float(x) => Literal::Float(x),
            RawLiteral::Str(s) => Literal::Str(s),
            RawLiteral::Bytes(b) => Literal::Bytes(b),
            RawLiteral::None => Literal::None,
        }
    }
}

/// Integer in any JSON shape: number, decimal string, or a whole float
/// that overflowed the JSON number parser.
struct IntText(String);

impl<'de> Deserialize<'de> for IntText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = IntText;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an integer or a decimal string")
            }

            fn visit_i64<E: serde::de::Error>(self, n: i64) -> Result<IntText, E> {
                Ok(IntText(n.to_string()))
            }

            fn visit_u64<E: serde::de::Error>(self, n: u64) -> Result<IntText, E> {
                Ok(IntText(n.to_string()))
            }

            fn visit_f64<E: serde::de::Error>(self, x: f64) -> Result<IntText, E> {
                if x.is_finite() && x.fract() == 0.0 {
                    Ok(IntText(format!("{:e}", x)))
                } else {
                    Err(E::invalid_value(serde::de::Unexpected::Float(x), &self))
                }
            }

            fn visit_str<E: serde::de::Error>(self, text: &str) -> Result<IntText, E> {
                let digits = text.strip_prefix('-').unwrap_or(text);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(E::invalid_value(serde::de::Unexpected::Str(text), &self));
                }
                Ok(IntText(text.to_string()))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Literal constant
    Constant(Literal),

    /// Binary operation, `op` is the source operator tag (`+`, `//`, ...)
    BinaryOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Possibly chained comparison: `left op0 r0 op1 r1 ...`
    Comparison {
        left: Box<Expr>,
        ops: Vec<(String, Expr)>,
    },

    /// `and` / `or` over one or more operands
    BooleanOp { op: String, values: Vec<Expr> },

    /// Variable reference
    Name(String),

    /// Unary operation (`-`, `+`, `~`)
    UnaryOp { op: String, operand: Box<Expr> },

    /// `body if test else orelse`
    Conditional {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },

    /// Function call. `func` is the dotted callee path; a bare identifier
    /// has exactly one segment.
    Call {
        func: Vec<String>,
        args: Vec<Expr>,
        #[serde(default)]
        keywords: Vec<(String, Expr)>,
    },

    /// Attribute access: `value.attr`
    Attribute { value: Box<Expr>, attr: String },

    /// `lambda params: body`, the validator of a contract
    Lambda { params: Vec<String>, body: Box<Expr> },

    /// Any other expression shape, identified by its parser node kind
    Unsupported(String),
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Constant(Literal::Int(n))
    }

    pub fn float(x: f64) -> Self {
        Expr::Constant(Literal::Float(x))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Constant(Literal::Bool(b))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Constant(Literal::Str(s.into()))
    }

    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name(id.into())
    }

    pub fn binary(op: &str, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: &str, operand: Expr) -> Self {
        Expr::UnaryOp {
            op: op.to_string(),
            operand: Box::new(operand),
        }
    }

    pub fn compare(left: Expr, ops: Vec<(&str, Expr)>) -> Self {
        Expr::Comparison {
            left: Box::new(left),
            ops: ops.into_iter().map(|(op, e)| (op.to_string(), e)).collect(),
        }
    }

    pub fn boolean(op: &str, values: Vec<Expr>) -> Self {
        Expr::BooleanOp {
            op: op.to_string(),
            values,
        }
    }

    pub fn conditional(test: Expr, body: Expr, orelse: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        }
    }

    /// Call with a dotted callee, e.g. `Expr::call("sys.exit", vec![])`.
    pub fn call(func: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: func.split('.').map(str::to_string).collect(),
            args,
            keywords: Vec::new(),
        }
    }

    pub fn lambda(params: &[&str], body: Expr) -> Self {
        Expr::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Box::new(body),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }

    /// True when the expression can be evaluated without any binding:
    /// literals and grammar operators over literals.
    pub fn is_static(&self) -> bool {
        match self {
            Expr::Constant(_) => true,
            Expr::BinaryOp { left, right, .. } => left.is_static() && right.is_static(),
            Expr::Comparison { left, ops } => {
                left.is_static() && ops.iter().all(|(_, e)| e.is_static())
            }
            Expr::BooleanOp { values, .. } => values.iter().all(Expr::is_static),
            Expr::UnaryOp { operand, .. } => operand.is_static(),
            Expr::Conditional { test, body, orelse } => {
                test.is_static() && body.is_static() && orelse.is_static()
            }
            Expr::Call { func, args, keywords } => {
                func.len() == 1
                    && matches!(func[0].as_str(), "abs" | "min" | "max")
                    && keywords.is_empty()
                    && args.iter().all(Expr::is_static)
            }
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Lambda { .. } | Expr::Unsupported(_) => {
                false
            }
        }
    }

    /// Dotted path of a name or attribute chain (`sys.stdout` → `["sys", "stdout"]`).
    pub fn dotted_path(&self) -> Option<Vec<String>> {
        match self {
            Expr::Name(id) => Some(vec![id.clone()]),
            Expr::Attribute { value, attr } => {
                let mut path = value.dotted_path()?;
                path.push(attr.clone());
                Some(path)
            }
            _ => None,
        }
    }

    fn is_atom(&self) -> bool {
        matches!(
            self,
            Expr::Constant(_) | Expr::Name(_) | Expr::Call { .. } | Expr::Attribute { .. } | Expr::Unsupported(_)
        )
    }
}

/// Writes `e`, parenthesized unless it is atomic.
fn write_operand(f: &mut std::fmt::Formatter<'_>, e: &Expr) -> std::fmt::Result {
    if e.is_atom() {
        write!(f, "{}", e)
    } else {
        write!(f, "({})", e)
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant(lit) => write!(f, "{}", lit),
            Expr::BinaryOp { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op)?;
                write_operand(f, right)
            }
            Expr::Comparison { left, ops } => {
                write_operand(f, left)?;
                for (op, right) in ops {
                    write!(f, " {} ", op)?;
                    write_operand(f, right)?;
                }
                Ok(())
            }
            Expr::BooleanOp { op, values } => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write_operand(f, v)?;
                }
                Ok(())
            }
            Expr::Name(id) => write!(f, "{}", id),
            Expr::UnaryOp { op, operand } => {
                write!(f, "{}", op)?;
                write_operand(f, operand)
            }
            Expr::Conditional { test, body, orelse } => {
                write_operand(f, body)?;
                write!(f, " if ")?;
                write_operand(f, test)?;
                write!(f, " else ")?;
                write_operand(f, orelse)
            }
            Expr::Call { func, args, keywords } => {
                write!(f, "{}(", func.join("."))?;
                let mut first = true;
                for arg in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg)?;
                }
                for (name, value) in keywords {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, ")")
            }
            Expr::Attribute { value, attr } => {
                write_operand(f, value)?;
                write!(f, ".{}", attr)
            }
            Expr::Lambda { params, body } => write!(f, "lambda {}: {}", params.join(", "), body),
            Expr::Unsupported(kind) => write!(f, "<{}>", kind),
        }
    }
}
