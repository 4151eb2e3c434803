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

use crate::errors::AssemblyError;
use crate::parser::Rule;
use pest::iterators::Pair;

pub fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

pub fn parse_number(pair: Pair<Rule>) -> Result<u32, AssemblyError> {
    let line = line_of(&pair);
    let text = pair.as_str().strip_prefix('#').unwrap_or(pair.as_str());
    let value = if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else {
        text.parse::<i64>()
    }
    .map_err(|e| AssemblyError::Encoding {
        line,
        reason: format!("invalid numeric literal '{}': {}", text, e),
    })?;
    Ok(value as u32)
}

pub fn parse_ident(pair: Pair<Rule>) -> String {
    pair.as_str().to_string()
}

pub fn strip_string_lit(pair: Pair<Rule>) -> String {
    let text = pair.as_str();
    text[1..text.len() - 1].to_string()
}
