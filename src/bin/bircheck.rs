//! BIR test driver.
//!
//! Parses a BIR file and either prints the IR, reports per-candidate
//! analysis verdicts, applies the rewrite to fixpoint, or runs the file's
//! embedded RUN/CHECK directives like a lit test.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bufopt::test_ir::{analyze_module, rewrite_to_fixpoint, TestIR, TestRunner, TestSpec};

#[derive(Parser)]
#[command(name = "bircheck", about = "Bufferization analysis test driver")]
struct Args {
    /// BIR input file
    input: PathBuf,

    /// Print the parsed IR
    #[arg(long)]
    print_ir: bool,

    /// Print per-candidate analysis verdicts
    #[arg(long)]
    analyze: bool,

    /// Apply accepted rewrites to fixpoint and print the result
    #[arg(long)]
    rewrite: bool,

    /// Run the file's RUN/CHECK directives
    #[arg(long)]
    check: bool,

    /// Verbose CHECK matching
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<(), String> {
    let content = fs::read_to_string(&args.input)
        .map_err(|e| format!("failed to read {}: {}", args.input.display(), e))?;

    if args.check {
        let spec = TestSpec::parse(&content)?;
        TestRunner::new(args.verbose).run_test(&spec)?;
        println!("PASS: {}", args.input.display());
        return Ok(());
    }

    // Directives are comments to the parser, so strip them the same way
    // the runner does.
    let spec = TestSpec::parse(&content)?;
    let mut ir = TestIR::parse(&spec.bir_content)?;

    if args.print_ir {
        print!("{}", ir.print());
    }
    if args.analyze {
        print!("{}", analyze_module(&ir));
    }
    if args.rewrite {
        print!("{}", rewrite_to_fixpoint(&mut ir));
        print!("{}", ir.print());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
