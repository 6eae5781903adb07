//! Operator tables and their SMT semantics
//!
//! Int and Real operands mix by lifting the Int side to Real; any other
//! sort combination an operator does not accept is a sort mismatch.

use crate::error::Abstain;
use crate::smt::{Sort, Term};

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    FloorDiv,
    Mod,
    MatMul,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub const ALL: [BinOp; 13] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::Pow,
        BinOp::FloorDiv,
        BinOp::Mod,
        BinOp::MatMul,
        BinOp::BitAnd,
        BinOp::BitOr,
        BinOp::BitXor,
        BinOp::Shl,
        BinOp::Shr,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "**",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::MatMul => "@",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn apply(self, left: &Term, right: &Term) -> Result<Term, Abstain> {
        match self {
            BinOp::Add if left.sort == Sort::String && right.sort == Sort::String => Ok(Term::new(
                Sort::String,
                format!("(str.++ {} {})", left.smt, right.smt),
            )),
            BinOp::Add => arith(self, "+", left, right),
            BinOp::Sub => arith(self, "-", left, right),
            BinOp::Mul | BinOp::MatMul => arith(self, "*", left, right),
            BinOp::Pow => arith(self, "^", left, right),
            BinOp::Div => {
                let (l, r) = numeric_pair(self, left, right)?;
                let (l, r) = (l.to_real(), r.to_real());
                Ok(Term::new(Sort::Real, format!("(/ {} {})", l.smt, r.smt)))
            }
            BinOp::FloorDiv => floor_div(self, left, right),
            BinOp::Mod => {
                let quotient = floor_div(self, left, right)?;
                let (l, r) = numeric_pair(self, left, right)?;
                Ok(Term::new(
                    quotient.sort,
                    format!("(- {} (* {} {}))", l.smt, r.smt, quotient.smt),
                ))
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => bitwise(self, left, right),
            BinOp::Shl | BinOp::Shr => shift(self, left, right),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Neg, UnaryOp::Pos, UnaryOp::Invert];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
        }
    }

    pub fn apply(self, operand: &Term) -> Result<Term, Abstain> {
        match (self, operand.sort) {
            (UnaryOp::Neg, sort) if sort.is_numeric() => {
                Ok(Term::new(sort, format!("(- {})", operand.smt)))
            }
            (UnaryOp::Pos, sort) if sort.is_numeric() => Ok(operand.clone()),
            (UnaryOp::Invert, Sort::Int) => {
                Ok(Term::new(Sort::Int, format!("(- (- {}) 1)", operand.smt)))
            }
            // `~True` is -2: bools invert as the ints 1 and 0
            (UnaryOp::Invert, Sort::Bool) => Ok(Term::new(
                Sort::Int,
                format!("(- (- (ite {} 1 0)) 1)", operand.smt),
            )),
            (op, sort) => Err(Abstain::sort_mismatch(op.tag(), sort, sort)),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Eq,
        CompareOp::Ne,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    pub fn apply(self, left: &Term, right: &Term) -> Result<Term, Abstain> {
        let (l, r) = unify(self.tag(), left, right)?;
        let smt = match (self, l.sort) {
            (CompareOp::Eq, _) => format!("(= {} {})", l.smt, r.smt),
            (CompareOp::Ne, _) => format!("(not (= {} {}))", l.smt, r.smt),
            (CompareOp::Lt, Sort::String) => format!("(str.< {} {})", l.smt, r.smt),
            (CompareOp::Le, Sort::String) => format!("(str.<= {} {})", l.smt, r.smt),
            (CompareOp::Gt, Sort::String) => format!("(str.< {} {})", r.smt, l.smt),
            (CompareOp::Ge, Sort::String) => format!("(str.<= {} {})", r.smt, l.smt),
            (_, Sort::Bool) => return Err(Abstain::sort_mismatch(self.tag(), l.sort, r.sort)),
            (CompareOp::Lt, _) => format!("(< {} {})", l.smt, r.smt),
            (CompareOp::Le, _) => format!("(<= {} {})", l.smt, r.smt),
            (CompareOp::Gt, _) => format!("(> {} {})", l.smt, r.smt),
            (CompareOp::Ge, _) => format!("(>= {} {})", l.smt, r.smt),
        };
        Ok(Term::new(Sort::Bool, smt))
    }
}

/// `and` / `or`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "and" => Some(BoolOp::And),
            "or" => Some(BoolOp::Or),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }

    pub fn apply(self, operands: &[Term]) -> Result<Term, Abstain> {
        if operands.is_empty() {
            return Err(Abstain::EmptyBoolOp);
        }
        if let Some(bad) = operands.iter().find(|t| t.sort != Sort::Bool) {
            return Err(Abstain::sort_mismatch(self.tag(), bad.sort, Sort::Bool));
        }
        if let [single] = operands {
            return Ok(single.clone());
        }
        let parts: Vec<&str> = operands.iter().map(|t| t.smt.as_str()).collect();
        Ok(Term::new(Sort::Bool, format!("({} {})", self.tag(), parts.join(" "))))
    }
}

/// Bring two operands to a common sort: equal sorts pass, Int/Real meet at Real.
pub fn unify(op: &str, left: &Term, right: &Term) -> Result<(Term, Term), Abstain> {
    match (left.sort, right.sort) {
        (a, b) if a == b => Ok((left.clone(), right.clone())),
        (a, b) if a.is_numeric() && b.is_numeric() => Ok((left.to_real(), right.to_real())),
        (a, b) => Err(Abstain::sort_mismatch(op, a, b)),
    }
}

/// `if test then body else orelse` over unified branch sorts
pub fn ite(test: &Term, body: &Term, orelse: &Term) -> Result<Term, Abstain> {
    if test.sort != Sort::Bool {
        return Err(Abstain::sort_mismatch("if", test.sort, Sort::Bool));
    }
    let (b, e) = unify("if", body, orelse)?;
    Ok(Term::new(b.sort, format!("(ite {} {} {})", test.smt, b.smt, e.smt)))
}

fn numeric_pair(op: BinOp, left: &Term, right: &Term) -> Result<(Term, Term), Abstain> {
    if !left.sort.is_numeric() || !right.sort.is_numeric() {
        return Err(Abstain::sort_mismatch(op.tag(), left.sort, right.sort));
    }
    unify(op.tag(), left, right)
}

fn arith(op: BinOp, smt_op: &str, left: &Term, right: &Term) -> Result<Term, Abstain> {
    let (l, r) = numeric_pair(op, left, right)?;
    Ok(Term::new(l.sort, format!("({} {} {})", smt_op, l.smt, r.smt)))
}

/// Floor division: Euclidean `div` equals floor for a positive divisor.
fn floor_div(op: BinOp, left: &Term, right: &Term) -> Result<Term, Abstain> {
    let (l, r) = numeric_pair(op, left, right)?;
    match l.sort {
        Sort::Int => Ok(Term::new(
            Sort::Int,
            format!(
                "(ite (< {r} 0) (div (- {l}) (- {r})) (div {l} {r}))",
                l = l.smt,
                r = r.smt
            ),
        )),
        _ => Ok(Term::new(
            Sort::Real,
            format!("(to_real (to_int (/ {} {})))", l.smt, r.smt),
        )),
    }
}

fn bitwise(op: BinOp, left: &Term, right: &Term) -> Result<Term, Abstain> {
    match (left.sort, right.sort) {
        (Sort::Bool, Sort::Bool) => {
            let smt = match op {
                BinOp::BitAnd => format!("(and {} {})", left.smt, right.smt),
                BinOp::BitOr => format!("(or {} {})", left.smt, right.smt),
                _ => format!("(xor {} {})", left.smt, right.smt),
            };
            Ok(Term::new(Sort::Bool, smt))
        }
        // integers are unbounded, so only numerals that fit a machine word
        // are folded; anything symbolic has no exact bit-vector encoding
        (Sort::Int, Sort::Int) => match (numeral(left), numeral(right)) {
            (Some(l), Some(r)) => Ok(Term::int(match op {
                BinOp::BitAnd => l & r,
                BinOp::BitOr => l | r,
                _ => l ^ r,
            })),
            _ => Err(Abstain::UnsupportedExpression(format!(
                "{} {} {}",
                left.smt,
                op.tag(),
                right.smt
            ))),
        },
        (a, b) => Err(Abstain::sort_mismatch(op.tag(), a, b)),
    }
}

/// Value of an Int numeral term (`7` or `(- 7)`) that fits in an `i64`
fn numeral(term: &Term) -> Option<i64> {
    if term.sort != Sort::Int {
        return None;
    }
    match term.smt.strip_prefix("(- ").and_then(|s| s.strip_suffix(')')) {
        Some(digits) => {
            let magnitude: u64 = digits.parse().ok()?;
            i64::try_from(-i128::from(magnitude)).ok()
        }
        None => term.smt.parse().ok(),
    }
}

/// `a << b` is `a * 2**b`, `a >> b` is `floor(a / 2**b)`
fn shift(op: BinOp, left: &Term, right: &Term) -> Result<Term, Abstain> {
    if left.sort != Sort::Int || right.sort != Sort::Int {
        return Err(Abstain::sort_mismatch(op.tag(), left.sort, right.sort));
    }
    let power = format!("(^ 2 {})", right.smt);
    let smt = match op {
        BinOp::Shl => format!("(* {} {})", left.smt, power),
        _ => format!("(div {} {})", left.smt, power),
    };
    Ok(Term::new(Sort::Int, smt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Term {
        Term::int(n)
    }

    #[test]
    fn test_tags_round_trip() {
        for op in BinOp::ALL {
            assert_eq!(BinOp::from_tag(op.tag()), Some(op));
        }
        for op in CompareOp::ALL {
            assert_eq!(CompareOp::from_tag(op.tag()), Some(op));
        }
        assert_eq!(BinOp::from_tag("<=>"), None);
        assert_eq!(UnaryOp::from_tag("not"), None);
        assert_eq!(BoolOp::from_tag("xor"), None);
    }

    #[test]
    fn test_add_mixes_int_and_real() {
        let t = BinOp::Add.apply(&int(1), &Term::real(2.5).unwrap()).unwrap();
        assert_eq!(t.sort, Sort::Real);
        assert_eq!(t.smt, "(+ (to_real 1) 2.5)");
    }

    #[test]
    fn test_add_concatenates_strings() {
        let t = BinOp::Add.apply(&Term::string("a"), &Term::string("b")).unwrap();
        assert_eq!(t, Term::new(Sort::String, "(str.++ \"a\" \"b\")"));
    }

    #[test]
    fn test_add_string_and_int_mismatch() {
        let err = BinOp::Add.apply(&Term::string("a"), &int(1)).unwrap_err();
        assert!(matches!(err, Abstain::SortMismatch { .. }));
    }

    #[test]
    fn test_true_division_is_real() {
        let t = BinOp::Div.apply(&int(1), &int(2)).unwrap();
        assert_eq!(t.sort, Sort::Real);
        assert_eq!(t.smt, "(/ (to_real 1) (to_real 2))");
    }

    #[test]
    fn test_floor_division_int() {
        let t = BinOp::FloorDiv.apply(&int(7), &int(2)).unwrap();
        assert_eq!(t.smt, "(ite (< 2 0) (div (- 7) (- 2)) (div 7 2))");
    }

    #[test]
    fn test_bitwise_bools_are_logical() {
        let t = BinOp::BitXor.apply(&Term::bool(true), &Term::bool(false)).unwrap();
        assert_eq!(t.smt, "(xor true false)");
    }

    #[test]
    fn test_bitwise_ints_fold_numerals() {
        assert_eq!(BinOp::BitAnd.apply(&int(6), &int(3)).unwrap(), int(2));
        assert_eq!(BinOp::BitOr.apply(&int(-8), &int(3)).unwrap(), int(-5));
        assert_eq!(BinOp::BitXor.apply(&int(i64::MIN), &int(0)).unwrap(), int(i64::MIN));
    }

    #[test]
    fn test_bitwise_ints_outside_machine_word_abstain() {
        let big = BinOp::Pow.apply(&int(2), &int(63)).unwrap();
        let err = BinOp::BitOr.apply(&big, &int(0)).unwrap_err();
        assert!(matches!(err, Abstain::UnsupportedExpression(_)));
        let huge = Term::new(Sort::Int, "9223372036854775808");
        assert!(BinOp::BitAnd.apply(&huge, &int(1)).is_err());
        let x = Term::constant("x", Sort::Int);
        assert!(BinOp::BitXor.apply(&x, &int(1)).is_err());
    }

    #[test]
    fn test_shift_requires_ints() {
        assert!(BinOp::Shl.apply(&int(1), &int(2)).is_ok());
        assert!(BinOp::Shr.apply(&Term::real(1.0).unwrap(), &int(2)).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(UnaryOp::Neg.apply(&int(1)).unwrap().smt, "(- 1)");
        assert_eq!(UnaryOp::Pos.apply(&int(1)).unwrap().smt, "1");
        assert_eq!(UnaryOp::Invert.apply(&int(1)).unwrap().smt, "(- (- 1) 1)");
        assert!(UnaryOp::Neg.apply(&Term::string("x")).is_err());
    }

    #[test]
    fn test_invert_bool_is_int() {
        let t = UnaryOp::Invert.apply(&Term::bool(true)).unwrap();
        assert_eq!(t.sort, Sort::Int);
        assert_eq!(t.smt, "(- (- (ite true 1 0)) 1)");
    }

    #[test]
    fn test_compare_strings() {
        let t = CompareOp::Gt.apply(&Term::string("b"), &Term::string("a")).unwrap();
        assert_eq!(t.smt, "(str.< \"a\" \"b\")");
    }

    #[test]
    fn test_ordering_bools_is_mismatch() {
        assert!(CompareOp::Lt.apply(&Term::bool(true), &Term::bool(false)).is_err());
        assert!(CompareOp::Eq.apply(&Term::bool(true), &Term::bool(false)).is_ok());
    }

    #[test]
    fn test_bool_op_requires_bools() {
        assert_eq!(BoolOp::And.apply(&[]), Err(Abstain::EmptyBoolOp));
        assert!(BoolOp::Or.apply(&[int(1)]).is_err());
        let t = BoolOp::Or.apply(&[Term::bool(true), Term::bool(false)]).unwrap();
        assert_eq!(t.smt, "(or true false)");
    }

    #[test]
    fn test_ite_unifies_branches() {
        let t = ite(&Term::bool(true), &int(1), &Term::real(0.5).unwrap()).unwrap();
        assert_eq!(t.sort, Sort::Real);
        assert!(ite(&int(1), &int(1), &int(2)).is_err());
    }
}
