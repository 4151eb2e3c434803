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
    DataDirective, DefDecl, Expression, ExprTerm, Instruction, MacroDecl, Operand, Stmt, TopItem,
};
use crate::errors::AssemblyError;
use std::collections::HashMap;

pub type ConstantTable = HashMap<String, u32>;

/// First pass over the flattened source: collects every top-level `const`
/// into a table, rejecting a name seen twice.
pub fn build_constant_table(items: &[TopItem]) -> Result<ConstantTable, AssemblyError> {
    let mut table = ConstantTable::new();
    for item in items {
        if let TopItem::Const { name, value, line } = item {
            if table.insert(name.clone(), *value).is_some() {
                return Err(AssemblyError::DuplicateDefinition {
                    line: *line,
                    reason: format!("constant '{}' is already defined", name),
                });
            }
        }
    }
    Ok(table)
}

fn resolve_expression(expr: Expression, table: &ConstantTable) -> Result<Expression, AssemblyError> {
    let line = expr.line;
    let resolve_term = |term: ExprTerm| -> Result<ExprTerm, AssemblyError> {
        match term {
            ExprTerm::ConstRef(name) => table
                .get(&name)
                .copied()
                .map(ExprTerm::Number)
                .ok_or_else(|| AssemblyError::Undefined {
                    line,
                    reason: format!("undefined constant '{}'", name),
                }),
            other => Ok(other),
        }
    };
    let first = resolve_term(expr.first)?;
    let mut rest = Vec::with_capacity(expr.rest.len());
    for (op, term) in expr.rest {
        rest.push((op, resolve_term(term)?));
    }
    Ok(Expression { first, rest, line })
}

/// Folds named-constant references into literal numbers throughout an
/// operand, re-collapsing single-term expressions into `Number`/`Jump`
/// operands the same way the parser would, so the closed operand set stays
/// canonical after folding.
pub fn resolve_operand(op: Operand, table: &ConstantTable) -> Result<Operand, AssemblyError> {
    match op {
        Operand::Expression(expr) => {
            let resolved = resolve_expression(expr, table)?;
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
        other => Ok(other),
    }
}

fn resolve_instruction(instr: Instruction, table: &ConstantTable) -> Result<Instruction, AssemblyError> {
    Ok(match instr {
        Instruction::Mov { width, dst, src, line } => Instruction::Mov {
            width,
            dst: resolve_operand(dst, table)?,
            src: resolve_operand(src, table)?,
            line,
        },
        Instruction::Shift { op, width, reg, imm, line } => Instruction::Shift {
            op,
            width,
            reg,
            imm: resolve_operand(imm, table)?,
            line,
        },
        Instruction::JmpLabel { target, line } => Instruction::JmpLabel {
            target: resolve_operand(target, table)?,
            line,
        },
        Instruction::Jz { target, line } => Instruction::Jz {
            target: resolve_operand(target, table)?,
            line,
        },
        Instruction::Jc { target, line } => Instruction::Jc {
            target: resolve_operand(target, table)?,
            line,
        },
        Instruction::Call { target, line } => Instruction::Call {
            target: resolve_operand(target, table)?,
            line,
        },
        Instruction::Ifkt { imm, line } => Instruction::Ifkt {
            imm: resolve_operand(imm, table)?,
            line,
        },
        other @ (Instruction::Nop
        | Instruction::Illegal
        | Instruction::Alu { .. }
        | Instruction::Stack { .. }
        | Instruction::JmpIndirect { .. }) => other,
    })
}

fn resolve_data(data: DataDirective, table: &ConstantTable) -> Result<DataDirective, AssemblyError> {
    let resolve_list = |ops: Vec<Operand>| -> Result<Vec<Operand>, AssemblyError> {
        ops.into_iter().map(|o| resolve_operand(o, table)).collect()
    };
    Ok(match data {
        DataDirective::Db(ops) => DataDirective::Db(resolve_list(ops)?),
        DataDirective::Dw(ops) => DataDirective::Dw(resolve_list(ops)?),
        DataDirective::Ds(ops) => DataDirective::Ds(resolve_list(ops)?),
    })
}

fn resolve_stmt(stmt: Stmt, table: &ConstantTable) -> Result<Stmt, AssemblyError> {
    Ok(match stmt {
        Stmt::Instr(instr, line) => Stmt::Instr(resolve_instruction(instr, table)?, line),
        Stmt::Data(data, line) => Stmt::Data(resolve_data(data, table)?, line),
        Stmt::MacroCall(name, args, line) => {
            let args = args
                .into_iter()
                .map(|a| resolve_operand(a, table))
                .collect::<Result<Vec<_>, _>>()?;
            Stmt::MacroCall(name, args, line)
        }
        other @ (Stmt::Label(..) | Stmt::WordBody(..)) => other,
    })
}

fn resolve_stmts(stmts: Vec<Stmt>, table: &ConstantTable) -> Result<Vec<Stmt>, AssemblyError> {
    stmts.into_iter().map(|s| resolve_stmt(s, table)).collect()
}

fn resolve_macro_decl(decl: MacroDecl, table: &ConstantTable) -> Result<MacroDecl, AssemblyError> {
    Ok(MacroDecl {
        body: resolve_stmts(decl.body, table)?,
        ..decl
    })
}

fn resolve_def_decl(decl: DefDecl, table: &ConstantTable) -> Result<DefDecl, AssemblyError> {
    let flags = decl
        .flags
        .into_iter()
        .map(|f| resolve_expression(f, table))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DefDecl {
        flags,
        body: resolve_stmts(decl.body, table)?,
        ..decl
    })
}

/// Second pass: substitutes every `ConstRef` term throughout the program
/// (codeblocks, def bodies, and stored macro bodies alike) with the literal
/// value from the constant table, mirroring a constant-folding
/// preprocessing pass over the whole AST before any byte is emitted.
pub fn resolve_constants(items: Vec<TopItem>, table: &ConstantTable) -> Result<Vec<TopItem>, AssemblyError> {
    items
        .into_iter()
        .map(|item| {
            Ok(match item {
                TopItem::CodeBlock { body, line } => TopItem::CodeBlock {
                    body: resolve_stmts(body, table)?,
                    line,
                },
                TopItem::MacroDef(decl) => TopItem::MacroDef(resolve_macro_decl(decl, table)?),
                TopItem::Def(decl) => TopItem::Def(resolve_def_decl(decl, table)?),
                other @ (TopItem::Const { .. } | TopItem::Include { .. }) => other,
            })
        })
        .collect()
}
