use std::env;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::process::ExitCode;

use rill::stdlib;
use rill::{RillVM, Value, VmOptions};

const VERSION: &str = "rill 0.1.0";

fn print_usage() {
    eprintln!("usage: rill [options] [script]");
    eprintln!("Available options are:");
    eprintln!("  -e stat   execute string 'stat'");
    eprintln!("  -i        enter interactive mode after executing 'script'");
    eprintln!("  -v        show version information");
    eprintln!("  --        stop handling options");
    eprintln!("  -         stop handling options and execute stdin");
}

#[derive(Default)]
struct Options {
    execute_strings: Vec<String>,
    interactive: bool,
    script_file: Option<String>,
    show_version: bool,
    read_stdin: bool,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::default();
    let mut stop_options = false;
    let mut i = 1;

    while i < args.len() {
        let arg = &args[i];
        if !stop_options && arg.starts_with('-') && arg.len() > 1 {
            match arg.as_str() {
                "-e" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("'-e' needs argument".to_string());
                    }
                    opts.execute_strings.push(args[i].clone());
                }
                "-i" => opts.interactive = true,
                "-v" => opts.show_version = true,
                "--" => stop_options = true,
                _ => return Err(format!("unrecognized option '{}'", arg)),
            }
        } else if !stop_options && arg == "-" {
            opts.read_stdin = true;
            stop_options = true;
        } else {
            opts.script_file = Some(arg.clone());
            break;
        }
        i += 1;
    }
    Ok(opts)
}

/// Run one source unit under protection; report faults without aborting.
fn run_source(vm: &mut RillVM, source: &str, name: &str) -> bool {
    match vm.peval_string_with_name(source, name) {
        Ok(_) => true,
        Err(err) => {
            eprintln!("rill: {}: {}", name, err);
            false
        }
    }
}

fn run_repl(vm: &mut RillVM) {
    println!("{}", VERSION);
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("rill: {}", e);
                break;
            }
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match vm.peval_string_with_name(line, "stdin") {
            Ok(Value::Undefined) => {}
            Ok(value) => println!("{}", value),
            Err(err) => eprintln!("rill: {}", err),
        }
    }
}

fn main() -> ExitCode {
    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("rill: {}", msg);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    if opts.show_version {
        println!("{}", VERSION);
        if opts.execute_strings.is_empty() && opts.script_file.is_none() && !opts.interactive {
            return ExitCode::SUCCESS;
        }
    }

    let mut vm = RillVM::new(VmOptions::default());
    stdlib::open_stdlib(&mut vm);

    for stat in &opts.execute_strings {
        if !run_source(&mut vm, stat, "command line") {
            return ExitCode::FAILURE;
        }
    }

    if let Some(path) = &opts.script_file {
        let source = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("rill: cannot open {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        };
        if !run_source(&mut vm, &source, path) {
            return ExitCode::FAILURE;
        }
    } else if opts.read_stdin {
        let mut source = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut source) {
            eprintln!("rill: {}", e);
            return ExitCode::FAILURE;
        }
        if !run_source(&mut vm, &source, "stdin") {
            return ExitCode::FAILURE;
        }
    }

    let no_work =
        opts.execute_strings.is_empty() && opts.script_file.is_none() && !opts.read_stdin;
    if opts.interactive || (no_work && !opts.show_version) {
        run_repl(&mut vm);
    }

    ExitCode::SUCCESS
}
