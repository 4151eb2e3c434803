/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::ast::{ExprOp, ExprTerm, Expression};
use crate::errors::AssemblyError;
use std::collections::HashMap;

/// An expression is constant iff every term already reduced to a bare
/// number — no label, macro argument, or current-address marker remains.
pub fn is_constant(expr: &Expression) -> bool {
    expr.terms().all(|term| matches!(term, ExprTerm::Number(_)))
}

fn apply(op: ExprOp, acc: u32, n: u32) -> u32 {
    match op {
        ExprOp::Add => acc.wrapping_add(n),
        ExprOp::Sub => acc.wrapping_sub(n),
    }
}

/// Reduces a constant expression (see [`is_constant`]) to its value.
/// Panics if called on a non-constant expression — callers must check
/// first, mirroring the parser's own collapsing of single-term constants.
pub fn reduce_constant(expr: &Expression) -> u32 {
    let first = match expr.first {
        ExprTerm::Number(n) => n,
        ref other => panic!("reduce_constant called on non-constant term {:?}", other),
    };
    expr.rest.iter().fold(first, |acc, (op, term)| {
        let n = match term {
            ExprTerm::Number(n) => *n,
            other => panic!("reduce_constant called on non-constant term {:?}", other),
        };
        apply(*op, acc, n)
    })
}

/// Replaces every `$` (current-address) term with a concrete `Number`
/// carrying `current_offset`, fixed at the moment the containing
/// expression reaches the emitter — per the design note that `$` must
/// capture the call-site offset, not be re-derived later at finalize time.
pub fn materialize_current_address(expr: &Expression, current_offset: u32) -> Expression {
    let replace = |term: &ExprTerm| -> ExprTerm {
        match term {
            ExprTerm::CurrentAddress => ExprTerm::Number(current_offset),
            other => other.clone(),
        }
    };
    Expression {
        first: replace(&expr.first),
        rest: expr.rest.iter().map(|(op, term)| (*op, replace(term))).collect(),
        line: expr.line,
    }
}

/// Final-pass reduction: every `Jump` term is looked up in the resolved
/// label table and the whole expression is folded left-to-right modulo
/// 2^32. Called only after [`materialize_current_address`], constant
/// folding, and macro-argument substitution have already removed every
/// other kind of unknown term.
pub fn reduce_with_labels(expr: &Expression, labels: &HashMap<String, u32>) -> Result<u32, AssemblyError> {
    let term_value = |term: &ExprTerm| -> Result<u32, AssemblyError> {
        match term {
            ExprTerm::Number(n) => Ok(*n),
            ExprTerm::Jump(name) => labels.get(name).copied().ok_or_else(|| AssemblyError::Undefined {
                line: expr.line,
                reason: format!("unresolved label '{}'", name),
            }),
            ExprTerm::CurrentAddress => {
                unreachable!("current-address terms are materialized before finalize")
            }
            ExprTerm::ConstRef(name) => {
                unreachable!("constant reference '{}' survived constant folding", name)
            }
            ExprTerm::MacroArg(name) => {
                unreachable!("macro argument '@{}' survived macro expansion", name)
            }
        }
    };
    let first = term_value(&expr.first)?;
    expr.rest.iter().try_fold(first, |acc, (op, term)| -> Result<u32, AssemblyError> {
        Ok(apply(*op, acc, term_value(term)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_expression_reduces() {
        let expr = Expression {
            first: ExprTerm::Number(10),
            rest: vec![(ExprOp::Add, ExprTerm::Number(5)), (ExprOp::Sub, ExprTerm::Number(3))],
            line: 1,
        };
        assert!(is_constant(&expr));
        assert_eq!(reduce_constant(&expr), 12);
    }

    #[test]
    fn current_address_materializes_in_place() {
        let expr = Expression {
            first: ExprTerm::CurrentAddress,
            rest: vec![(ExprOp::Add, ExprTerm::Number(4))],
            line: 1,
        };
        let materialized = materialize_current_address(&expr, 0x100);
        assert_eq!(materialized.first, ExprTerm::Number(0x100));
    }

    #[test]
    fn label_expression_resolves_against_table() {
        let expr = Expression {
            first: ExprTerm::Jump("loop".to_string()),
            rest: vec![(ExprOp::Add, ExprTerm::Number(2))],
            line: 1,
        };
        let mut labels = HashMap::new();
        labels.insert("loop".to_string(), 0x10);
        assert_eq!(reduce_with_labels(&expr, &labels).unwrap(), 0x12);
    }

    #[test]
    fn unresolved_label_is_an_error() {
        let expr = Expression {
            first: ExprTerm::Jump("missing".to_string()),
            rest: vec![],
            line: 7,
        };
        let labels = HashMap::new();
        assert!(reduce_with_labels(&expr, &labels).is_err());
    }
}
