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

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use ftasm::file_reader::AsmFileReader;
use ftasm::{assemble_source, assemble_source_disassembly, to_carray};

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Bin,
    Carray,
    Disassembly,
}

#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Source file to assemble.
    #[clap(value_name = "INFILE")]
    infile: PathBuf,

    /// Output file path.
    #[clap(short, long)]
    output: PathBuf,

    /// Output format.
    #[clap(short, long, value_enum, default_value = "bin")]
    format: Format,

    /// Also write a sibling `.sym` symbol-table file.
    #[clap(long)]
    sym: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let reader = AsmFileReader;

    let (bytes, symbol_table) = match opts.format {
        Format::Bin => {
            let (bytes, symbols) = assemble_source(&opts.infile, &reader)
                .with_context(|| format!("Failed to assemble '{}'", opts.infile.display()))?;
            (bytes, symbols)
        }
        Format::Carray => {
            let (bytes, symbols) = assemble_source(&opts.infile, &reader)
                .with_context(|| format!("Failed to assemble '{}'", opts.infile.display()))?;
            (to_carray(&bytes).into_bytes(), symbols)
        }
        Format::Disassembly => {
            let (listing, symbols) = assemble_source_disassembly(&opts.infile, &reader)
                .with_context(|| format!("Failed to assemble '{}'", opts.infile.display()))?;
            (listing.into_bytes(), symbols)
        }
    };

    fs::write(&opts.output, &bytes)
        .with_context(|| format!("Failed to write output file '{}'", opts.output.display()))?;

    if opts.sym {
        let sym_path = opts.output.with_extension("sym");
        let mut sym_file = fs::File::create(&sym_path)
            .with_context(|| format!("Failed to create symbol file '{}'", sym_path.display()))?;
        symbol_table
            .write_to(&mut sym_file)
            .with_context(|| format!("Failed to write symbol file '{}'", sym_path.display()))?;
    }

    println!(
        "Successfully assembled {} to {}",
        opts.infile.display(),
        opts.output.display()
    );

    Ok(())
}
