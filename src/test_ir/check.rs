//! FileCheck-style test validation for BIR files.
//!
//! This module parses CHECK directives from BIR files and validates the
//! analysis output against the expected patterns, similar to LLVM's
//! FileCheck tool but implemented in a Rust-native way.

use super::{analyze_module, rewrite_to_fixpoint, TestIR};
use std::collections::VecDeque;

/// A CHECK directive extracted from a BIR file
#[derive(Debug, Clone)]
pub enum CheckDirective {
    /// CHECK: pattern - Match exact pattern
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to execute the test
#[derive(Debug, Clone)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

/// Test specification extracted from a BIR file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub bir_content: String,
}

impl TestSpec {
    /// Parse a BIR file to extract test specifications
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut bir_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let parts: Vec<&str> = run_cmd.split_whitespace().collect();
                if !parts.is_empty() {
                    run_directives.push(RunDirective {
                        command: parts[0].to_string(),
                        args: parts[1..].iter().map(|s| s.to_string()).collect(),
                    });
                }
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else {
                // Regular BIR content
                bir_lines.push(line);
            }
        }

        Ok(TestSpec {
            run_directives,
            check_directives,
            bir_content: bir_lines.join("\n"),
        })
    }
}

/// Test runner that executes BIR tests
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run a BIR test and validate output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        let ir = TestIR::parse(&spec.bir_content)?;

        for run_dir in &spec.run_directives {
            let output = self.execute_command(&ir, run_dir)?;
            self.validate_output(&output, &spec.check_directives)?;
        }

        Ok(())
    }

    /// Execute a test command and return the output
    fn execute_command(&self, ir: &TestIR, run_dir: &RunDirective) -> Result<String, String> {
        let mut print_ir = false;
        let mut analyze = false;
        let mut rewrite = false;

        for arg in &run_dir.args {
            match arg.as_str() {
                "--print-ir" => print_ir = true,
                "--analyze" => analyze = true,
                "--rewrite" => rewrite = true,
                _ => {}
            }
        }

        let mut output = String::new();

        if print_ir {
            output.push_str(&ir.print());
        }

        if analyze {
            output.push_str(&analyze_module(ir));
        }

        if rewrite {
            let mut rewritten = ir.clone();
            output.push_str(&rewrite_to_fixpoint(&mut rewritten));
            output.push_str(&rewritten.print());
        }

        Ok(output)
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: VecDeque<_> = output.lines().collect();
        let mut line_idx = 0;

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern));

                    match found {
                        Some(idx) => {
                            line_idx += idx + 1;
                            if self.verbose {
                                println!("CHECK: '{}' found at line {}", pattern, line_idx - 1);
                            }
                        }
                        None => {
                            return Err(format!(
                                "CHECK: pattern '{}' not found in output",
                                pattern
                            ));
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    if line_idx >= output_lines.len() {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{}'", pattern));
                    }

                    let line = output_lines[line_idx];
                    if !line.contains(pattern) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }

                    if self.verbose {
                        println!("CHECK-NEXT: '{}' matches at line {}", pattern, line_idx);
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    if line_idx >= output_lines.len() {
                        continue; // End of output counts as empty
                    }

                    let line = output_lines[line_idx];
                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }
                    line_idx += 1;
                }
            }
        }

        Ok(())
    }
}
