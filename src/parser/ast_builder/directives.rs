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

use crate::ast::{DataDirective, Operand};
use crate::errors::AssemblyError;
use crate::parser::ast_builder::operands::build_operand;
use crate::parser::Rule;
use pest::iterators::Pair;

fn build_operand_vec(pair: Pair<Rule>) -> Result<Vec<Operand>, AssemblyError> {
    pair.into_inner().map(build_operand).collect()
}

pub fn build_db(pair: Pair<Rule>) -> Result<DataDirective, AssemblyError> {
    Ok(DataDirective::Db(build_operand_vec(pair)?))
}

pub fn build_dw(pair: Pair<Rule>) -> Result<DataDirective, AssemblyError> {
    Ok(DataDirective::Dw(build_operand_vec(pair)?))
}

pub fn build_ds(pair: Pair<Rule>) -> Result<DataDirective, AssemblyError> {
    Ok(DataDirective::Ds(build_operand_vec(pair)?))
}

pub fn build_data_directive(pair: Pair<Rule>) -> Result<DataDirective, AssemblyError> {
    let inner = pair
        .into_inner()
        .next()
        .expect("data_directive always wraps exactly one concrete directive");
    match inner.as_rule() {
        Rule::db_directive => build_db(inner),
        Rule::dw_directive => build_dw(inner),
        Rule::ds_directive => build_ds(inner),
        other => unreachable!("unexpected data_directive rule: {:?}", other),
    }
}
