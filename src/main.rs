use std::path::PathBuf;

use vita_reader::RunOptions;

const HELP: &str = "vita-reader - Read the Daily AI Research blog from the terminal.

  --version, -V          Show version and exit
  --help,    -h          Show this help message
  --list                 Print featured posts and the archive, then exit
  --posts <file>         Read posts from a YAML or JSON file
  --config <file>        Use this config file instead of the default";

enum Mode {
    Run,
    List,
    Exit,
}

fn main() {
    let (mode, opts) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    let result = match mode {
        Mode::Exit => return,
        Mode::List => vita_reader::list(opts, &mut std::io::stdout().lock()),
        Mode::Run => vita_reader::run(opts),
    };
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<(Mode, RunOptions), String> {
    let mut mode = Mode::Run;
    let mut opts = RunOptions::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("vita-reader {}", vita_reader::VERSION);
                mode = Mode::Exit;
            }
            "--help" | "-h" => {
                println!("{HELP}");
                mode = Mode::Exit;
            }
            "--list" => {
                if !matches!(mode, Mode::Exit) {
                    mode = Mode::List;
                }
            }
            "--posts" | "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("{arg} requires a file path"))?;
                if arg == "--posts" {
                    opts.posts_file = Some(PathBuf::from(value));
                } else {
                    opts.config_file = Some(PathBuf::from(value));
                }
            }
            other => return Err(format!("unknown argument {other}")),
        }
    }
    Ok((mode, opts))
}
