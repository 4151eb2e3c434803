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

use crate::ast::{
    DataDirective, ExprTerm, Expression, Instruction, MacroDecl, Operand, RegisterOperand, Stmt,
    TopItem, WordBodyToken,
};
use crate::errors::AssemblyError;
use std::collections::HashMap;

pub type MacroTable = HashMap<String, MacroDecl>;

pub fn build_macro_table(items: &[TopItem]) -> Result<MacroTable, AssemblyError> {
    let mut table = MacroTable::new();
    for item in items {
        if let TopItem::MacroDef(decl) = item {
            if table.contains_key(&decl.name) {
                return Err(AssemblyError::DuplicateDefinition {
                    line: decl.line,
                    reason: format!("macro '{}' is already defined", decl.name),
                });
            }
            table.insert(decl.name.clone(), decl.clone());
        }
    }
    Ok(table)
}

/// Identifiers beginning with `'` are private to one macro expansion; this
/// appends the call's monotonic number so two expansions of the same (or
/// different) macros never collide, while leaving ordinary names alone.
fn mangle(name: &str, call_num: usize) -> String {
    if name.starts_with('\'') {
        format!("{}__{}", name, call_num)
    } else {
        name.to_string()
    }
}

fn substitute_term(
    term: ExprTerm,
    scope: &HashMap<String, Operand>,
    call_num: usize,
    line: usize,
) -> Result<ExprTerm, AssemblyError> {
    match term {
        ExprTerm::MacroArg(name) => {
            let bound = scope.get(&name).ok_or_else(|| AssemblyError::Undefined {
                line,
                reason: format!("unknown macro parameter '@{}'", name),
            })?;
            match bound {
                Operand::Number(n, _) => Ok(ExprTerm::Number(*n)),
                Operand::Jump(name, _) => Ok(ExprTerm::Jump(name.clone())),
                Operand::Expression(e) if e.is_single() => Ok(e.first.clone()),
                other => Err(AssemblyError::Encoding {
                    line,
                    reason: format!(
                        "macro argument '@{}' cannot appear inside an arithmetic expression ({:?})",
                        name, other
                    ),
                }),
            }
        }
        ExprTerm::Jump(name) => Ok(ExprTerm::Jump(mangle(&name, call_num))),
        other => Ok(other),
    }
}

fn substitute_expression(
    expr: Expression,
    scope: &HashMap<String, Operand>,
    call_num: usize,
) -> Result<Expression, AssemblyError> {
    let line = expr.line;
    let first = substitute_term(expr.first, scope, call_num, line)?;
    let mut rest = Vec::with_capacity(expr.rest.len());
    for (op, term) in expr.rest {
        rest.push((op, substitute_term(term, scope, call_num, line)?));
    }
    Ok(Expression { first, rest, line })
}

/// Substitutes `@param` references and mangles `'local` labels throughout
/// one operand. A bare `@param` operand is replaced wholesale by the bound
/// argument; `@param` nested in a larger expression is replaced term-wise.
fn substitute_operand(
    op: Operand,
    scope: &HashMap<String, Operand>,
    call_num: usize,
) -> Result<Operand, AssemblyError> {
    match op {
        Operand::Register(r) => Ok(Operand::Register(r)),
        Operand::Number(n, l) => Ok(Operand::Number(n, l)),
        Operand::Str(s, l) => Ok(Operand::Str(s, l)),
        Operand::Jump(name, l) => Ok(Operand::Jump(mangle(&name, call_num), l)),
        Operand::Expression(expr) => {
            let line = expr.line;
            if expr.is_single() {
                if let ExprTerm::MacroArg(name) = &expr.first {
                    return scope.get(name).cloned().ok_or_else(|| AssemblyError::Undefined {
                        line,
                        reason: format!("unknown macro parameter '@{}'", name),
                    });
                }
            }
            let resolved = substitute_expression(expr, scope, call_num)?;
            Ok(if resolved.is_single() {
                match &resolved.first {
                    ExprTerm::Number(n) => Operand::Number(*n, resolved.line),
                    ExprTerm::Jump(name) => Operand::Jump(name.clone(), resolved.line),
                    _ => Operand::Expression(resolved),
                }
            } else {
                Operand::Expression(resolved)
            })
        }
    }
}

fn substitute_register(reg: RegisterOperand, _scope: &HashMap<String, Operand>, _call_num: usize) -> RegisterOperand {
    // Register choice is not itself parameterisable in this language; the
    // register name is always a literal in the macro body.
    reg
}

fn substitute_instruction(
    instr: Instruction,
    scope: &HashMap<String, Operand>,
    call_num: usize,
) -> Result<Instruction, AssemblyError> {
    Ok(match instr {
        Instruction::Nop => Instruction::Nop,
        Instruction::Illegal => Instruction::Illegal,
        Instruction::Mov { width, dst, src, line } => Instruction::Mov {
            width,
            dst: substitute_operand(dst, scope, call_num)?,
            src: substitute_operand(src, scope, call_num)?,
            line,
        },
        Instruction::Alu { op, width, dst, s1, s2, line } => Instruction::Alu {
            op,
            width,
            dst: substitute_register(dst, scope, call_num),
            s1: substitute_register(s1, scope, call_num),
            s2: substitute_register(s2, scope, call_num),
            line,
        },
        Instruction::Shift { op, width, reg, imm, line } => Instruction::Shift {
            op,
            width,
            reg: substitute_register(reg, scope, call_num),
            imm: substitute_operand(imm, scope, call_num)?,
            line,
        },
        Instruction::Stack { kind, op, width, reg, line } => Instruction::Stack {
            kind,
            op,
            width,
            reg: substitute_register(reg, scope, call_num),
            line,
        },
        Instruction::JmpIndirect { reg, line } => Instruction::JmpIndirect {
            reg: substitute_register(reg, scope, call_num),
            line,
        },
        Instruction::JmpLabel { target, line } => Instruction::JmpLabel {
            target: substitute_operand(target, scope, call_num)?,
            line,
        },
        Instruction::Jz { target, line } => Instruction::Jz {
            target: substitute_operand(target, scope, call_num)?,
            line,
        },
        Instruction::Jc { target, line } => Instruction::Jc {
            target: substitute_operand(target, scope, call_num)?,
            line,
        },
        Instruction::Call { target, line } => Instruction::Call {
            target: substitute_operand(target, scope, call_num)?,
            line,
        },
        Instruction::Ifkt { imm, line } => Instruction::Ifkt {
            imm: substitute_operand(imm, scope, call_num)?,
            line,
        },
    })
}

fn substitute_data(
    data: DataDirective,
    scope: &HashMap<String, Operand>,
    call_num: usize,
) -> Result<DataDirective, AssemblyError> {
    let substitute_list = |ops: Vec<Operand>| -> Result<Vec<Operand>, AssemblyError> {
        ops.into_iter().map(|o| substitute_operand(o, scope, call_num)).collect()
    };
    Ok(match data {
        DataDirective::Db(ops) => DataDirective::Db(substitute_list(ops)?),
        DataDirective::Dw(ops) => DataDirective::Dw(substitute_list(ops)?),
        DataDirective::Ds(ops) => DataDirective::Ds(substitute_list(ops)?),
    })
}

fn substitute_word_token(token: WordBodyToken, call_num: usize) -> WordBodyToken {
    match token {
        WordBodyToken::JumpTarget(name) => WordBodyToken::JumpTarget(mangle(&name, call_num)),
        other => other,
    }
}

/// Expands one macro invocation into a flat statement list: binds
/// parameters to (already-substituted) arguments, mangles `'local` labels
/// with a freshly assigned call number, and recursively expands any nested
/// macro call the body contains using the same global counter — so two
/// interleaved expansions, nested or not, never share a disambiguator.
pub fn expand_macro_call(
    name: &str,
    args: Vec<Operand>,
    macro_table: &MacroTable,
    call_counter: &mut usize,
    line: usize,
) -> Result<Vec<Stmt>, AssemblyError> {
    let decl = macro_table.get(name).ok_or_else(|| AssemblyError::Undefined {
        line,
        reason: format!("call to undefined macro '{}'", name),
    })?;
    if decl.params.len() != args.len() {
        return Err(AssemblyError::MacroArity {
            line,
            reason: format!(
                "macro '{}' expects {} argument(s), found {}",
                name,
                decl.params.len(),
                args.len()
            ),
        });
    }

    let call_num = *call_counter;
    *call_counter += 1;

    let scope: HashMap<String, Operand> = decl.params.iter().cloned().zip(args).collect();
    let body = decl.body.clone();

    let mut out = Vec::new();
    for stmt in body {
        out.extend(expand_stmt(stmt, &scope, call_num, macro_table, call_counter)?);
    }
    Ok(out)
}

fn expand_stmt(
    stmt: Stmt,
    scope: &HashMap<String, Operand>,
    call_num: usize,
    macro_table: &MacroTable,
    call_counter: &mut usize,
) -> Result<Vec<Stmt>, AssemblyError> {
    Ok(match stmt {
        Stmt::Label(name, line) => vec![Stmt::Label(mangle(&name, call_num), line)],
        Stmt::Instr(instr, line) => vec![Stmt::Instr(substitute_instruction(instr, scope, call_num)?, line)],
        Stmt::Data(data, line) => vec![Stmt::Data(substitute_data(data, scope, call_num)?, line)],
        Stmt::WordBody(token, line) => vec![Stmt::WordBody(substitute_word_token(token, call_num), line)],
        Stmt::MacroCall(inner_name, args, inner_line) => {
            let substituted_args = args
                .into_iter()
                .map(|a| substitute_operand(a, scope, call_num))
                .collect::<Result<Vec<_>, _>>()?;
            expand_macro_call(&inner_name, substituted_args, macro_table, call_counter, inner_line)?
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MacroDecl;

    fn sample_macro() -> MacroDecl {
        MacroDecl {
            name: "dup".to_string(),
            params: vec!["x".to_string()],
            body: vec![Stmt::Label("'top".to_string(), 1)],
            line: 1,
        }
    }

    #[test]
    fn two_expansions_get_distinct_call_numbers() {
        let mut table = MacroTable::new();
        let decl = sample_macro();
        table.insert(decl.name.clone(), decl);

        let mut counter = 0usize;
        let first = expand_macro_call("dup", vec![Operand::Number(1, 1)], &table, &mut counter, 1).unwrap();
        let second = expand_macro_call("dup", vec![Operand::Number(2, 1)], &table, &mut counter, 1).unwrap();

        let Stmt::Label(first_name, _) = &first[0] else { panic!("expected label") };
        let Stmt::Label(second_name, _) = &second[0] else { panic!("expected label") };
        assert_ne!(first_name, second_name);
        assert_eq!(first_name, "'top__0");
        assert_eq!(second_name, "'top__1");
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let mut table = MacroTable::new();
        let decl = sample_macro();
        table.insert(decl.name.clone(), decl);
        let mut counter = 0usize;
        let result = expand_macro_call("dup", vec![], &table, &mut counter, 1);
        assert!(matches!(result, Err(AssemblyError::MacroArity { .. })));
    }
}
