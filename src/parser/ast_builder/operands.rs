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

use crate::ast::{ExprOp, ExprTerm, Expression, Operand, RegModifier, RegName, RegisterOperand};
use crate::errors::AssemblyError;
use crate::parser::ast_builder::utility_functions::{line_of, parse_number, strip_string_lit};
use crate::parser::Rule;
use pest::iterators::Pair;

pub fn build_register_operand(pair: Pair<Rule>) -> RegisterOperand {
    let line = line_of(&pair);
    let full = pair.as_str();
    let reg_name_pair = pair.into_inner().next().expect("register_operand has a register_name");
    let reg = RegName::from_ident(reg_name_pair.as_str()).expect("grammar only admits known register names");

    let (indirect, modifier) = if full.starts_with("[++") {
        (true, RegModifier::PreInc)
    } else if full.starts_with("[--") {
        (true, RegModifier::PreDec)
    } else if full.ends_with("++]") {
        (true, RegModifier::PostInc)
    } else if full.ends_with("--]") {
        (true, RegModifier::PostDec)
    } else if full.starts_with('[') {
        (true, RegModifier::None)
    } else {
        (false, RegModifier::None)
    };

    RegisterOperand {
        reg,
        indirect,
        modifier,
        line,
    }
}

fn build_expr_term(pair: Pair<Rule>) -> Result<ExprTerm, AssemblyError> {
    match pair.as_rule() {
        Rule::current_address => Ok(ExprTerm::CurrentAddress),
        Rule::macro_arg => Ok(ExprTerm::MacroArg(pair.as_str()[1..].to_string())),
        Rule::jump_target => Ok(ExprTerm::Jump(pair.as_str()[1..].to_string())),
        Rule::number => Ok(ExprTerm::Number(parse_number(pair)?)),
        Rule::ident => Ok(ExprTerm::ConstRef(pair.as_str().to_string())),
        other => unreachable!("unexpected expr_term rule: {:?}", other),
    }
}

pub fn build_expression(pair: Pair<Rule>) -> Result<Expression, AssemblyError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let first = build_expr_term(inner.next().expect("expression has at least one term"))?;
    let mut rest = Vec::new();
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "+" => ExprOp::Add,
            "-" => ExprOp::Sub,
            other => unreachable!("unexpected expr_op text: {}", other),
        };
        let term_pair = inner.next().expect("expr_op is always followed by a term");
        rest.push((op, build_expr_term(term_pair)?));
    }
    Ok(Expression { first, rest, line })
}

pub fn build_operand(pair: Pair<Rule>) -> Result<Operand, AssemblyError> {
    let line = line_of(&pair);
    match pair.as_rule() {
        Rule::register_operand => Ok(Operand::Register(build_register_operand(pair))),
        Rule::string_lit => Ok(Operand::Str(strip_string_lit(pair), line)),
        Rule::expression => {
            let expr = build_expression(pair)?;
            Ok(if expr.is_single() {
                match &expr.first {
                    ExprTerm::Number(n) => Operand::Number(*n, line),
                    ExprTerm::Jump(name) => Operand::Jump(name.clone(), line),
                    _ => Operand::Expression(expr),
                }
            } else {
                Operand::Expression(expr)
            })
        }
        other => unreachable!("unexpected operand rule: {:?}", other),
    }
}

pub fn build_operand_list(pair: Pair<Rule>) -> Result<Vec<Operand>, AssemblyError> {
    pair.into_inner().map(build_operand).collect()
}
