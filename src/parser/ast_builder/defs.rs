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

use crate::ast::{DefDecl, DefType, Expression, MacroDecl, Stmt, TopItem, WordBodyToken};
use crate::errors::AssemblyError;
use crate::parser::ast_builder::directives::build_data_directive;
use crate::parser::ast_builder::instructions::build_instruction;
use crate::parser::ast_builder::operands::{build_expression, build_operand, build_operand_list};
use crate::parser::ast_builder::utility_functions::{line_of, parse_ident, parse_number};
use crate::parser::Rule;
use pest::iterators::Pair;

fn build_word_body_item(pair: Pair<Rule>) -> Result<Stmt, AssemblyError> {
    let line = line_of(&pair);
    let inner = pair
        .into_inner()
        .next()
        .expect("word_body_item always wraps a jump_target, number, or ident");
    let token = match inner.as_rule() {
        Rule::jump_target => WordBodyToken::JumpTarget(inner.as_str()[1..].to_string()),
        Rule::number => WordBodyToken::Number(parse_number(inner)?),
        Rule::ident => WordBodyToken::BareIdent(inner.as_str().to_string()),
        other => unreachable!("unexpected word_body_item inner rule: {:?}", other),
    };
    Ok(Stmt::WordBody(token, line))
}

fn build_label(pair: Pair<Rule>) -> Stmt {
    let line = line_of(&pair);
    let text = pair.as_str();
    let name = text[..text.len() - 1].to_string();
    Stmt::Label(name, line)
}

fn build_macro_call(pair: Pair<Rule>) -> Result<Stmt, AssemblyError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = parse_ident(inner.next().expect("macro_call always names a macro"));
    let args = match inner.next() {
        Some(operand_list) => build_operand_list(operand_list)?,
        None => Vec::new(),
    };
    Ok(Stmt::MacroCall(name, args, line))
}

fn build_stmt(pair: Pair<Rule>) -> Result<Option<Stmt>, AssemblyError> {
    let line = line_of(&pair);
    match pair.as_rule() {
        Rule::label => Ok(Some(build_label(pair))),
        Rule::macro_call => Ok(Some(build_macro_call(pair)?)),
        Rule::instruction => {
            let mut inner = pair.into_inner();
            let mnemonic_pair = inner.next().expect("instruction always has a mnemonic");
            let mnemonic = mnemonic_pair.as_str().to_string();
            let operands = inner.map(build_operand).collect::<Result<Vec<_>, _>>()?;
            Ok(Some(Stmt::Instr(build_instruction(&mnemonic, operands, line)?, line)))
        }
        Rule::data_directive => Ok(Some(Stmt::Data(build_data_directive(pair)?, line))),
        Rule::word_body_item => Ok(Some(build_word_body_item(pair)?)),
        _ => Ok(None),
    }
}

fn collect_stmts<'a>(pairs: impl Iterator<Item = Pair<'a, Rule>>) -> Result<Vec<Stmt>, AssemblyError> {
    let mut out = Vec::new();
    for pair in pairs {
        if let Some(stmt) = build_stmt(pair)? {
            out.push(stmt);
        }
    }
    Ok(out)
}

pub fn build_const_decl(pair: Pair<Rule>) -> Result<TopItem, AssemblyError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = parse_ident(inner.next().expect("const_decl always names a constant"));
    let value = parse_number(inner.next().expect("const_decl always has a value"))?;
    Ok(TopItem::Const { name, value, line })
}

pub fn build_include_decl(pair: Pair<Rule>) -> Result<TopItem, AssemblyError> {
    let line = line_of(&pair);
    let string_pair = pair.into_inner().next().expect("include_decl always names a path");
    let text = string_pair.as_str();
    let path = text[1..text.len() - 1].to_string();
    Ok(TopItem::Include { path, line })
}

pub fn build_macro_decl(pair: Pair<Rule>) -> Result<TopItem, AssemblyError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = parse_ident(inner.next().expect("macro_decl always names a macro"));

    let mut rest: Vec<Pair<Rule>> = inner.by_ref().collect();
    let mut params = Vec::new();
    if let Some(first) = rest.first() {
        if first.as_rule() == Rule::macro_params {
            let params_pair = rest.remove(0);
            params = params_pair.into_inner().map(parse_ident).collect();
        }
    }

    let body = collect_stmts(rest.into_iter())?;
    Ok(TopItem::MacroDef(MacroDecl {
        name,
        params,
        body,
        line,
    }))
}

pub fn build_code_block(pair: Pair<Rule>) -> Result<TopItem, AssemblyError> {
    let line = line_of(&pair);
    let body = collect_stmts(pair.into_inner())?;
    Ok(TopItem::CodeBlock { body, line })
}

fn build_def_flags(rest: &mut Vec<Pair<Rule>>) -> Result<Vec<Expression>, AssemblyError> {
    let mut flags = Vec::new();
    if !rest.is_empty() && rest[0].as_rule() == Rule::def_flags {
        let flags_pair = rest.remove(0);
        for expr_pair in flags_pair.into_inner() {
            flags.push(build_expression(expr_pair)?);
        }
    }
    Ok(flags)
}

// The grammar yields one bare `ident` pair when a def has no alias clause,
// or two (alias, then name) when it does — these are the only un-wrapped
// `ident` pairs a def's pair stream ever produces, since every body
// statement wraps its identifiers inside a more specific rule.
fn take_alias_and_name(rest: &mut Vec<Pair<Rule>>) -> (Option<String>, String) {
    let mut leading = Vec::new();
    while !rest.is_empty() && rest[0].as_rule() == Rule::ident {
        leading.push(rest.remove(0));
    }
    match leading.len() {
        1 => (None, parse_ident(leading.into_iter().next().unwrap())),
        2 => {
            let mut it = leading.into_iter();
            let alias = parse_ident(it.next().unwrap());
            let name = parse_ident(it.next().unwrap());
            (Some(alias), name)
        }
        n => unreachable!("def clause must yield 1 or 2 leading idents, got {}", n),
    }
}

pub fn build_def_decl(pair: Pair<Rule>) -> Result<TopItem, AssemblyError> {
    let line = line_of(&pair);
    let def_type = match pair.as_rule() {
        Rule::def_asm_decl => DefType::Asm,
        Rule::def_word_decl => DefType::Word,
        other => unreachable!("unexpected def rule: {:?}", other),
    };

    let mut rest: Vec<Pair<Rule>> = pair.into_inner().collect();

    let flags = build_def_flags(&mut rest)?;
    let subkind = parse_ident(rest.remove(0));
    let (alias, name) = take_alias_and_name(&mut rest);

    let body = collect_stmts(rest.into_iter())?;
    Ok(TopItem::Def(DefDecl {
        def_type,
        flags,
        subkind,
        alias,
        name,
        body,
        line,
    }))
}
