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

use anyhow::{Context, Result};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

/// Append-only record of (word name, start, end) triples, populated as
/// `def` blocks are processed and serialised on demand.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String, start: u32, end: u32) {
        self.entries.push(SymbolEntry { name, start, end });
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    /// One line per entry, `name,start,end` in decimal.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("{},{},{}\n", entry.name, entry.start, entry.end));
        }
        out
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        writer
            .write_all(self.to_text().as_bytes())
            .context("failed to write symbol table")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_decimal_csv_lines() {
        let mut table = SymbolTable::new();
        table.push("dup".to_string(), 0, 12);
        table.push("drop".to_string(), 12, 20);
        assert_eq!(table.to_text(), "dup,0,12\ndrop,12,20\n");
    }
}
