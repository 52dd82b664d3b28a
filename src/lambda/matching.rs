//! ANY_MATCH, ALL_MATCH and NONE_MATCH.

use crate::error::Result;
use crate::expr::{EvalContext, Expr};
use crate::function::{lambda_args, Arity, LambdaBinding, ScalarFunction};
use crate::types::DataType;
use crate::vector::{ValueVector, VectorBuilder, VectorRef};

use super::{apply_lambda, ensure_predicate, predicate_at, LAMBDA_BINDINGS};

/// Which quantifier a match function folds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Any,
    All,
    None,
}

impl MatchKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MatchKind::Any => "ANY_MATCH",
            MatchKind::All => "ALL_MATCH",
            MatchKind::None => "NONE_MATCH",
        }
    }

    /// Result of a row whose elements decided nothing.
    #[must_use]
    pub fn identity(self) -> bool {
        !matches!(self, MatchKind::Any)
    }

    /// The final result if `element` settles the row.
    fn decide(self, element: bool) -> Option<bool> {
        match (self, element) {
            (MatchKind::Any, true) => Some(true),
            (MatchKind::All, false) => Some(false),
            (MatchKind::None, true) => Some(false),
            _ => None,
        }
    }

    /// Folds `predicates[positions]` with three-valued logic.
    ///
    /// Stops at the first deciding element. Undecided rows are null when a
    /// null was seen, otherwise the identity.
    #[must_use]
    pub fn fold(
        self,
        predicates: &dyn ValueVector,
        positions: impl IntoIterator<Item = usize>,
    ) -> Option<bool> {
        let mut saw_null = false;
        for i in positions {
            match predicate_at(predicates, i) {
                Some(element) => {
                    if let Some(decided) = self.decide(element) {
                        return Some(decided);
                    }
                }
                None => saw_null = true,
            }
        }
        if saw_null {
            None
        } else {
            Some(self.identity())
        }
    }
}

/// `ANY_MATCH` / `ALL_MATCH` / `NONE_MATCH(source, x -> predicate)`.
///
/// Over a non-list argument each row holds a single predicate result.
#[derive(Debug, Clone, Copy)]
pub struct MatchFunction {
    kind: MatchKind,
}

impl MatchFunction {
    #[must_use]
    pub fn new(kind: MatchKind) -> Self {
        MatchFunction { kind }
    }

    #[must_use]
    pub fn kind(&self) -> MatchKind {
        self.kind
    }
}

impl ScalarFunction for MatchFunction {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn lambda_bindings(&self) -> &[LambdaBinding] {
        LAMBDA_BINDINGS
    }

    fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
        let (_, body) = lambda_args(self.name(), args)?;
        ensure_predicate(self.name(), body)?;
        Ok(DataType::Boolean)
    }

    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
        let (source, lambda) = lambda_args(self.name(), args)?;
        let argument = ctx.evaluate(source)?;
        let mut builder = VectorBuilder::new(DataType::Boolean, argument.len());
        apply_lambda(self.name(), &argument, lambda, ctx, |out| {
            let folded = out
                .result
                .and_then(|result| self.kind.fold(result.as_ref(), out.positions()));
            match folded {
                Some(b) => builder.set_bool(out.row, b),
                None => builder.set_null(out.row),
            }
            Ok(())
        })?;
        builder.build()
    }
}
