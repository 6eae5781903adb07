//! Expression-to-constraint compiler
//!
//! Translates the supported expression grammar into SMT terms. Every call
//! returns a non-empty vector: the last term is the value of the expression,
//! the preceding ones are side terms produced by sub-expressions that the
//! caller must keep (a chained comparison yields one boolean per link).
//!
//! Anything the compiler cannot represent is an [`Abstain`], never a panic.

mod context;
pub mod ops;

pub use context::Context;

use crate::ast::{Expr, Literal};
use crate::error::Abstain;
use crate::smt::{Sort, Term};

use ops::{BinOp, BoolOp, CompareOp, UnaryOp};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Compile `expr` against `ctx`.
pub fn compile(expr: &Expr, ctx: &Context) -> Result<Vec<Term>, Abstain> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || compile_inner(expr, ctx))
}

/// Compile and split into `(side terms, value)`.
fn compile_split(expr: &Expr, ctx: &Context) -> Result<(Vec<Term>, Term), Abstain> {
    let mut terms = compile(expr, ctx)?;
    match terms.pop() {
        Some(value) => Ok((terms, value)),
        None => Err(Abstain::UnsupportedExpression(expr.to_string())),
    }
}

fn compile_inner(expr: &Expr, ctx: &Context) -> Result<Vec<Term>, Abstain> {
    match expr {
        Expr::Constant(lit) => Ok(vec![literal(lit)?]),

        Expr::BinaryOp { op, left, right } => {
            let operation = BinOp::from_tag(op).ok_or_else(|| Abstain::UnsupportedOperator(op.clone()))?;
            let (mut out, l) = compile_split(left, ctx)?;
            let (side, r) = compile_split(right, ctx)?;
            out.extend(side);
            out.push(operation.apply(&l, &r)?);
            Ok(out)
        }

        // Every link compares against the original left operand:
        // `a < b < c` yields `a < b` and `a < c`.
        Expr::Comparison { left, ops } => {
            if ops.is_empty() {
                return Err(Abstain::UnsupportedExpression(expr.to_string()));
            }
            let (mut out, l) = compile_split(left, ctx)?;
            for (op, right) in ops {
                let operation =
                    CompareOp::from_tag(op).ok_or_else(|| Abstain::UnsupportedOperator(op.clone()))?;
                let (side, r) = compile_split(right, ctx)?;
                out.extend(side);
                out.push(operation.apply(&l, &r)?);
            }
            Ok(out)
        }

        Expr::BooleanOp { op, values } => {
            let operation = BoolOp::from_tag(op).ok_or_else(|| Abstain::UnsupportedOperator(op.clone()))?;
            if values.is_empty() {
                return Err(Abstain::EmptyBoolOp);
            }
            let mut out = Vec::new();
            let mut operands = Vec::with_capacity(values.len());
            for value in values {
                let (side, v) = compile_split(value, ctx)?;
                out.extend(side);
                operands.push(v);
            }
            out.push(operation.apply(&operands)?);
            Ok(out)
        }

        Expr::Name(id) => match ctx.get(id) {
            Some(term) => Ok(vec![term.clone()]),
            None => Err(Abstain::UnresolvedName(id.clone())),
        },

        Expr::UnaryOp { op, operand } => {
            let operation = UnaryOp::from_tag(op).ok_or_else(|| Abstain::UnsupportedOperator(op.clone()))?;
            let (mut out, v) = compile_split(operand, ctx)?;
            out.push(operation.apply(&v)?);
            Ok(out)
        }

        // Only the final term of each branch feeds the conditional.
        Expr::Conditional { test, body, orelse } => {
            let (_, t) = compile_split(test, ctx)?;
            let (_, b) = compile_split(body, ctx)?;
            let (_, e) = compile_split(orelse, ctx)?;
            Ok(vec![ops::ite(&t, &b, &e)?])
        }

        Expr::Call { func, args, keywords } => {
            let target = match func.as_slice() {
                [name] => name.as_str(),
                _ => return Err(Abstain::UnsupportedCall(func.join("."))),
            };
            if !keywords.is_empty() {
                return Err(Abstain::UnsupportedCall(expr.to_string()));
            }
            let mut out = Vec::new();
            let mut call_args = Vec::with_capacity(args.len());
            for arg in args {
                let (side, v) = compile_split(arg, ctx)?;
                out.extend(side);
                call_args.push(v);
            }
            out.push(builtin(target, &call_args)?);
            Ok(out)
        }

        Expr::Attribute { .. } | Expr::Lambda { .. } | Expr::Unsupported(_) => {
            Err(Abstain::UnsupportedExpression(expr.to_string()))
        }
    }
}

fn literal(lit: &Literal) -> Result<Term, Abstain> {
    match lit {
        Literal::Bool(b) => Ok(Term::bool(*b)),
        Literal::Int(n) => Ok(Term::int(*n)),
        Literal::BigInt(text) => big_int(text),
        Literal::Float(x) => Term::real(*x),
        Literal::Str(s) => Ok(Term::string(s)),
        Literal::Bytes(_) | Literal::None => Err(Abstain::UnsupportedLiteral(lit.type_name().to_string())),
    }
}

/// Numeral for an integer wider than `i64`; inexact text abstains.
fn big_int(text: &str) -> Result<Term, Abstain> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Abstain::UnsupportedLiteral(format!("int {}", text)));
    }
    let digits = match digits.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let smt = if negative {
        format!("(- {})", digits)
    } else {
        digits.to_string()
    };
    Ok(Term::new(Sort::Int, smt))
}

fn expect_arity(func: &str, args: &[Term], expected: usize) -> Result<(), Abstain> {
    if args.len() != expected {
        return Err(Abstain::Arity {
            func: func.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

/// `abs/1`, `min/2`, `max/2`
fn builtin(func: &str, args: &[Term]) -> Result<Term, Abstain> {
    match func {
        "abs" => {
            expect_arity(func, args, 1)?;
            let a = &args[0];
            let zero = Term::int(0);
            let test = CompareOp::Ge.apply(a, &zero)?;
            let neg = UnaryOp::Neg.apply(a)?;
            ops::ite(&test, a, &neg)
        }
        "min" | "max" => {
            expect_arity(func, args, 2)?;
            let (a, b) = (&args[0], &args[1]);
            let op = if func == "min" { CompareOp::Lt } else { CompareOp::Gt };
            let test = op.apply(a, b)?;
            ops::ite(&test, a, b)
        }
        other => Err(Abstain::UnsupportedCall(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::Sort;

    fn symbols(names: &[&str]) -> Context {
        let mut ctx = Context::new();
        for name in names {
            ctx.declare(name, Sort::Int);
        }
        ctx
    }

    fn smt(expr: &Expr, ctx: &Context) -> Vec<String> {
        compile(expr, ctx).unwrap().into_iter().map(|t| t.smt).collect()
    }

    #[test]
    fn test_constants() {
        let ctx = Context::new();
        assert_eq!(smt(&Expr::int(3), &ctx), ["3"]);
        assert_eq!(smt(&Expr::bool(false), &ctx), ["false"]);
        assert_eq!(smt(&Expr::float(0.5), &ctx), ["0.5"]);
        assert_eq!(smt(&Expr::str("s"), &ctx), ["\"s\""]);
    }

    #[test]
    fn test_unsupported_literals_abstain() {
        let ctx = Context::new();
        assert_eq!(
            compile(&Expr::Constant(Literal::None), &ctx),
            Err(Abstain::UnsupportedLiteral("NoneType".to_string()))
        );
        assert!(compile(&Expr::Constant(Literal::Bytes(vec![1])), &ctx).is_err());
        assert!(compile(&Expr::float(f64::NAN), &ctx).is_err());
    }

    #[test]
    fn test_big_int_literals() {
        let ctx = Context::new();
        let big = |text: &str| Expr::Constant(Literal::BigInt(text.to_string()));
        assert_eq!(smt(&big("100000000000000000000"), &ctx), ["100000000000000000000"]);
        assert_eq!(smt(&big("-0100000000000000000000"), &ctx), ["(- 100000000000000000000)"]);
        assert_eq!(
            compile(&big("1e20"), &ctx),
            Err(Abstain::UnsupportedLiteral("int 1e20".to_string()))
        );
        // too wide for an exact bitwise fold
        let or = Expr::binary("|", big("100000000000000000000"), Expr::int(0));
        assert!(matches!(compile(&or, &ctx), Err(Abstain::UnsupportedExpression(_))));
    }

    #[test]
    fn test_chained_comparison_uses_original_left() {
        // `a < b < c` compares both links against `a`; this differs from the
        // usual transitive reading (`b < c`) and is kept deliberately.
        let ctx = symbols(&["a", "b", "c"]);
        let expr = Expr::compare(Expr::name("a"), vec![("<", Expr::name("b")), ("<", Expr::name("c"))]);
        let terms = compile(&expr, &ctx).unwrap();
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(|t| t.sort == Sort::Bool));
        assert_eq!(terms[0].smt, "(< a b)");
        assert_eq!(terms[1].smt, "(< a c)");
    }

    #[test]
    fn test_side_terms_propagate_through_binary() {
        let ctx = symbols(&["a", "b", "c"]);
        let chain = Expr::compare(Expr::name("a"), vec![("<", Expr::name("b")), ("<", Expr::name("c"))]);
        let expr = Expr::boolean("and", vec![chain, Expr::bool(true)]);
        assert_eq!(smt(&expr, &ctx), ["(< a b)", "(and (< a c) true)"]);
    }

    #[test]
    fn test_every_binary_operator_compiles_on_ints() {
        let ctx = Context::new();
        for op in BinOp::ALL {
            let expr = Expr::binary(op.tag(), Expr::int(1), Expr::int(2));
            let terms = compile(&expr, &ctx).unwrap_or_else(|e| panic!("{}: {}", op.tag(), e));
            assert_eq!(terms.len(), 1, "{}", op.tag());
        }
    }

    #[test]
    fn test_every_unary_operator_compiles_on_ints() {
        let ctx = Context::new();
        for op in UnaryOp::ALL {
            let terms = compile(&Expr::unary(op.tag(), Expr::int(1)), &ctx).unwrap();
            assert_eq!(terms.len(), 1);
            assert_eq!(terms[0].sort, Sort::Int);
        }
    }

    #[test]
    fn test_every_comparison_compiles_on_ints() {
        let ctx = Context::new();
        for op in CompareOp::ALL {
            let expr = Expr::compare(Expr::int(1), vec![(op.tag(), Expr::int(2))]);
            assert_eq!(compile(&expr, &ctx).unwrap()[0].sort, Sort::Bool);
        }
    }

    #[test]
    fn test_unknown_operators_abstain() {
        let ctx = Context::new();
        let bin = Expr::binary("<=>", Expr::int(1), Expr::int(2));
        assert_eq!(compile(&bin, &ctx), Err(Abstain::UnsupportedOperator("<=>".to_string())));
        let un = Expr::unary("not", Expr::bool(true));
        assert!(compile(&un, &ctx).is_err());
        let cmp = Expr::compare(Expr::int(1), vec![("in", Expr::int(2))]);
        assert!(compile(&cmp, &ctx).is_err());
        let bo = Expr::boolean("xor", vec![Expr::bool(true)]);
        assert!(compile(&bo, &ctx).is_err());
    }

    #[test]
    fn test_empty_bool_op_abstains() {
        let expr = Expr::boolean("and", vec![]);
        assert_eq!(compile(&expr, &Context::new()), Err(Abstain::EmptyBoolOp));
    }

    #[test]
    fn test_unbound_name_abstains() {
        assert_eq!(
            compile(&Expr::name("ghost"), &Context::new()),
            Err(Abstain::UnresolvedName("ghost".to_string()))
        );
    }

    #[test]
    fn test_conditional() {
        let ctx = symbols(&["x"]);
        let expr = Expr::conditional(
            Expr::compare(Expr::name("x"), vec![(">", Expr::int(0))]),
            Expr::name("x"),
            Expr::int(0),
        );
        assert_eq!(smt(&expr, &ctx), ["(ite (> x 0) x 0)"]);
    }

    #[test]
    fn test_conditional_drops_branch_side_terms() {
        let ctx = symbols(&["a", "b", "c"]);
        let chain = Expr::compare(Expr::name("a"), vec![("<", Expr::name("b")), ("<", Expr::name("c"))]);
        let expr = Expr::conditional(chain, Expr::int(1), Expr::int(2));
        assert_eq!(smt(&expr, &ctx), ["(ite (< a c) 1 2)"]);
    }

    #[test]
    fn test_builtins() {
        let ctx = symbols(&["x", "y"]);
        assert_eq!(
            smt(&Expr::call("abs", vec![Expr::name("x")]), &ctx),
            ["(ite (>= x 0) x (- x))"]
        );
        assert_eq!(
            smt(&Expr::call("min", vec![Expr::name("x"), Expr::name("y")]), &ctx),
            ["(ite (< x y) x y)"]
        );
        assert_eq!(
            smt(&Expr::call("max", vec![Expr::name("x"), Expr::name("y")]), &ctx),
            ["(ite (> x y) x y)"]
        );
    }

    #[test]
    fn test_builtin_arity_abstains() {
        let ctx = Context::new();
        assert!(matches!(
            compile(&Expr::call("abs", vec![Expr::int(1), Expr::int(2)]), &ctx),
            Err(Abstain::Arity { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            compile(&Expr::call("min", vec![Expr::int(1), Expr::int(2), Expr::int(3)]), &ctx),
            Err(Abstain::Arity { expected: 2, found: 3, .. })
        ));
        assert!(matches!(
            compile(&Expr::call("abs", vec![]), &ctx),
            Err(Abstain::Arity { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_or_dotted_callee_abstains() {
        let ctx = Context::new();
        assert_eq!(
            compile(&Expr::call("len", vec![Expr::str("ab")]), &ctx),
            Err(Abstain::UnsupportedCall("len".to_string()))
        );
        assert_eq!(
            compile(&Expr::call("math.fabs", vec![Expr::int(1)]), &ctx),
            Err(Abstain::UnsupportedCall("math.fabs".to_string()))
        );
    }

    #[test]
    fn test_outside_grammar_abstains() {
        let ctx = Context::new();
        assert!(compile(&Expr::Unsupported("list".to_string()), &ctx).is_err());
        assert!(compile(&Expr::lambda(&["x"], Expr::name("x")), &ctx).is_err());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let ctx = symbols(&["x"]);
        let expr = Expr::binary("+", Expr::name("x"), Expr::call("abs", vec![Expr::int(-2)]));
        assert_eq!(compile(&expr, &ctx), compile(&expr, &ctx));
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let ctx = Context::new();
        let mut expr = Expr::int(0);
        for _ in 0..5_000 {
            expr = Expr::unary("-", expr);
        }
        assert!(compile(&expr, &ctx).is_ok());
    }
}
