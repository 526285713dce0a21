use crate::value::Scalar;
use derive_more::Display;

///
/// BoundOp
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum BoundOp {
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
    #[display("=~")]
    Match,
    #[display("!=")]
    Ne,
    #[display("!~")]
    NotMatch,
}

///
/// Expr
///
/// Constraint expression behind a declared value, e.g.
/// `string & strings.MinRunes(3) & =~"^[a-z]+$"` or `"a" | "b"`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Conjunction `a & b & ...`.
    And(Vec<Self>),

    /// Unary bound such as `>=0` or `=~"^x"`.
    Bound { op: BoundOp, value: Scalar },

    /// Builtin call such as `strings.MaxRunes(10)`.
    Call { func: String, args: Vec<Scalar> },

    /// Type identifier (`string`, `int`, `#Order`).
    Ident(String),

    Literal(Scalar),

    /// Disjunction `a | b | ...`.
    Or(Vec<Self>),
}

impl Expr {
    #[must_use]
    pub fn bound(op: BoundOp, value: Scalar) -> Self {
        Self::Bound { op, value }
    }

    #[must_use]
    pub fn call(func: impl Into<String>, args: Vec<Scalar>) -> Self {
        Self::Call {
            func: func.into(),
            args,
        }
    }

    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Literal(Scalar::Text(s.into()))
    }

    /// Conjuncts of an `And`, or the expression itself.
    #[must_use]
    pub fn conjuncts(&self) -> Vec<&Self> {
        match self {
            Self::And(parts) => parts.iter().flat_map(Self::conjuncts).collect(),
            other => vec![other],
        }
    }

    /// String literals when the expression is a disjunction made only of
    /// them; `None` otherwise.
    #[must_use]
    pub fn string_disjuncts(&self) -> Option<Vec<&str>> {
        let Self::Or(parts) = self else {
            return None;
        };

        parts
            .iter()
            .map(|p| match p {
                Self::Literal(Scalar::Text(s)) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}
