pub mod ast_builder;

use crate::ast::TopItem;
use crate::errors::AssemblyError;
use crate::file_reader::FileReader;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(PestParser)]
#[grammar = "parser/grammar.pest"]
pub struct AsmParser;

/// Parses a single source string (no `include` resolution) into its
/// top-level items, in source order.
pub fn parse_source(input: &str) -> Result<Vec<TopItem>, AssemblyError> {
    let mut pairs = AsmParser::parse(Rule::file, input)?;
    let file_pair = pairs.next().expect("the file rule always produces exactly one pair");

    let mut items = Vec::new();
    for pair in file_pair.into_inner() {
        let item = match pair.as_rule() {
            Rule::const_decl => ast_builder::defs::build_const_decl(pair)?,
            Rule::include_decl => ast_builder::defs::build_include_decl(pair)?,
            Rule::macro_decl => ast_builder::defs::build_macro_decl(pair)?,
            Rule::def_asm_decl | Rule::def_word_decl => ast_builder::defs::build_def_decl(pair)?,
            Rule::code_block => ast_builder::defs::build_code_block(pair)?,
            Rule::EOI => continue,
            other => unreachable!("unexpected top-level rule: {:?}", other),
        };
        items.push(item);
    }
    Ok(items)
}

/// Parses `path` through `reader`, recursively flattening `include`
/// directives in place. `include_stack` carries the set of files
/// currently open so a file that includes itself (directly or through a
/// chain of includes) is caught as a fatal cycle rather than recursing
/// forever.
pub fn parse_source_recursive(
    path: &Path,
    reader: &dyn FileReader,
    include_stack: &mut HashSet<PathBuf>,
) -> Result<Vec<TopItem>, AssemblyError> {
    let key = path.to_path_buf();
    if !include_stack.insert(key.clone()) {
        return Err(AssemblyError::IncludeCycle {
            line: 0,
            reason: format!("'{}' includes itself", path.display()),
        });
    }

    let text = reader.read_to_string(path).map_err(|e| AssemblyError::Undefined {
        line: 0,
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;

    let mut items = Vec::new();
    for item in parse_source(&text)? {
        match item {
            TopItem::Include { path: inc_path, line } => {
                // spec sec 4.7: include paths are resolved relative to the
                // process's working directory, not the including file's own
                // directory, so a relative path is passed through unchanged
                // -- a relative path is already interpreted against the
                // process cwd by the OS (and, for `MockFileReader`, by
                // whatever key the test registered it under).
                let resolved = PathBuf::from(&inc_path);
                let nested = parse_source_recursive(&resolved, reader, include_stack).map_err(|e| {
                    match e {
                        AssemblyError::IncludeCycle { reason, .. } => {
                            AssemblyError::IncludeCycle { line, reason }
                        }
                        other => other,
                    }
                })?;
                items.extend(nested);
            }
            other => items.push(other),
        }
    }

    include_stack.remove(&key);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprTerm, Instruction, Operand, TopItem};

    #[test]
    fn test_parse_nop() {
        let items = parse_source("codeblock\nnop\nend\n").unwrap();
        assert_eq!(items.len(), 1);
        match &items[0] {
            TopItem::CodeBlock { body, .. } => {
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0], crate::ast::Stmt::Instr(Instruction::Nop, _)));
            }
            other => panic!("expected CodeBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_mov_registers() {
        let items = parse_source("codeblock\nmov.w %acc1, %acc2\nend\n").unwrap();
        match &items[0] {
            TopItem::CodeBlock { body, .. } => match &body[0] {
                crate::ast::Stmt::Instr(Instruction::Mov { dst, src, .. }, _) => {
                    assert!(matches!(dst, Operand::Register(_)));
                    assert!(matches!(src, Operand::Register(_)));
                }
                other => panic!("expected Mov, got {:?}", other),
            },
            other => panic!("expected CodeBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_const_and_expression() {
        let items = parse_source("const FOO = 0x10\ncodeblock\ndb FOO + 1\nend\n").unwrap();
        assert!(matches!(items[0], TopItem::Const { value: 0x10, .. }));
    }

    #[test]
    fn test_parse_macro_call_with_args() {
        let items = parse_source("codeblock\ndup(%acc1)\nend\n").unwrap();
        match &items[0] {
            TopItem::CodeBlock { body, .. } => {
                assert!(matches!(body[0], crate::ast::Stmt::MacroCall(ref n, _, _) if n == "dup"));
            }
            other => panic!("expected CodeBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_current_address_term() {
        let items = parse_source("codeblock\ndw $\nend\n").unwrap();
        match &items[0] {
            TopItem::CodeBlock { body, .. } => match &body[0] {
                crate::ast::Stmt::Data(crate::ast::DataDirective::Dw(ops), _) => {
                    match &ops[0] {
                        Operand::Expression(e) => {
                            assert_eq!(e.first, ExprTerm::CurrentAddress);
                        }
                        other => panic!("expected Expression($), got {:?}", other),
                    }
                }
                other => panic!("expected Dw, got {:?}", other),
            },
            other => panic!("expected CodeBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_include_cycle_detected() {
        let mut reader = crate::file_reader::MockFileReader::default();
        reader.add_file("a.asm", "include \"b.asm\"\n");
        reader.add_file("b.asm", "include \"a.asm\"\n");
        let mut stack = HashSet::new();
        let result = parse_source_recursive(Path::new("a.asm"), &reader, &mut stack);
        assert!(matches!(result, Err(AssemblyError::IncludeCycle { .. })));
    }
}
