use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};

use lumos::runtime;

fn main() -> Result<ExitCode> {
    let mut args = std::env::args().skip(1);
    let mut target: Option<String> = None;
    let mut analyze = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--target" | "-t" => {
                target = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("Missing target name after {arg}"))?,
                );
            }
            "--analyze" => analyze = true,
            "--targets" => {
                for target in runtime::list_targets() {
                    println!("{target}");
                }
                return Ok(ExitCode::SUCCESS);
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    if analyze {
        let analysis = runtime::analyze(&source);
        if let Some(error) = analysis.error {
            eprintln!("{error}");
            return Ok(ExitCode::FAILURE);
        }
        println!("tokens: {}", analysis.token_count);
        println!("{}", analysis.ast_dump);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(target) = target {
        let compilation = runtime::compile(&source, &target);
        if let Some(error) = compilation.error {
            eprintln!("{error}");
            return Ok(ExitCode::FAILURE);
        }
        print!("{}", compilation.code);
        return Ok(ExitCode::SUCCESS);
    }

    let execution = runtime::execute(&source);
    if !execution.output.is_empty() {
        println!("{}", execution.output);
    }
    if let Some(error) = execution.error {
        eprintln!("{error}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
