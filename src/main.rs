use std::io::{self, IsTerminal, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use hlb::cli::{Cli, Command, LogOutputArg, RunArgs};
use hlb::codegen::debug::InteractiveDebugger;
use hlb::codegen::CodeGen;
use hlb::codegen::CodegenError;
use hlb::Config;
use opgraph::Value;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let color = match cli.log_output {
        LogOutputArg::Auto => io::stderr().is_terminal(),
        LogOutputArg::Tty => true,
        LogOutputArg::Plain => false,
    };

    match run(&cli, color) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, color: bool) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let default = Path::new("hlb.toml");
            if default.exists() {
                Config::load(default)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env();
    if let Some(addr) = &cli.addr {
        config.addr = Some(addr.clone());
    }
    if cli.backtrace {
        config.backtrace = true;
    }

    match &cli.cmd {
        Command::Run(args) => run_targets(cli, &config, args, color),
        Command::Publish(_) => bail!("publish requires a connection to a build daemon"),
        Command::Get(_) => bail!("get requires a connection to a build daemon"),
        Command::Format(_) => bail!("format is not supported by this build"),
    }
}

fn run_targets(cli: &Cli, config: &Config, args: &RunArgs, color: bool) -> Result<()> {
    let (filename, bytes) = match &args.path {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("read {path:?}"))?;
            (path.display().to_string(), bytes)
        }
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .context("read stdin")?;
            ("<stdin>".to_string(), bytes)
        }
    };

    let compiled = match hlb::parse_and_check(&filename, &bytes, config.lint_config()) {
        Ok(c) => c,
        Err(failure) => {
            eprint!("{}", failure.render(color));
            bail!("compile failed");
        }
    };
    for warning in &compiled.warnings {
        eprint!("{}", warning.render(&compiled.sources, color));
    }

    for target in &args.target {
        let mut cg = CodeGen::new(&compiled.module, &compiled.analysis);
        if cli.debug {
            let stdin = io::stdin();
            let debugger = InteractiveDebugger::new(
                &compiled.module,
                compiled.sources.clone(),
                stdin.lock(),
                io::stderr(),
            );
            cg = cg.with_debugger(Box::new(debugger));
        }

        let value = match hlb::compile_target(&mut cg, target) {
            Ok(Some(v)) => v,
            // the debugger exited; a clean early return
            Ok(None) => return Ok(()),
            Err(CodegenError::Diag(d)) => {
                eprint!("{}", d.render(&compiled.sources, color));
                if config.backtrace {
                    let paint = hlblang::diag::Paint { on: color };
                    eprint!("{}", d.render_backtrace(&compiled.sources, &paint, true));
                }
                bail!("codegen failed for target {target}");
            }
            Err(CodegenError::Debug(_)) => return Ok(()),
        };

        emit_output(cli, target, &value)?;
    }
    Ok(())
}

fn emit_output(cli: &Cli, target: &str, value: &Value) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match value {
        Value::Filesystem(fs) => {
            if cli.tree {
                opgraph::write_tree(fs, &mut out)?;
            } else {
                let def = opgraph::marshal(fs);
                serde_json::to_writer_pretty(&mut out, &def)?;
                writeln!(out)?;
            }
        }
        Value::Str(s) => writeln!(out, "{s}")?,
        Value::Int(i) => writeln!(out, "{i}")?,
        Value::Bool(b) => writeln!(out, "{b}")?,
        Value::Options(_) => bail!("target {target} is an option function"),
    }
    Ok(())
}
