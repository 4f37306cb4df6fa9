use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tpth::printer::PrintConfig;
use tpth::{run, PipelineOptions};

#[derive(Parser)]
#[command(name = "tpth")]
#[command(about = "Render a shell-script template into a checked, formatted script")]
#[command(version)]
struct Cli {
    /// Prelude prepended to the template
    #[arg(short = 'i', long = "include", value_name = "FILE")]
    include: Option<PathBuf>,

    /// Directory of partial templates
    #[arg(short = 'I', long = "incpath", value_name = "DIR")]
    incpath: Option<PathBuf>,

    /// Directory of YAML variable files, merged in name order
    #[arg(short = 'S', long = "secpath", value_name = "DIR")]
    secpath: Option<PathBuf>,

    /// YAML file of additional variables
    #[arg(short = 's', long = "secrets", value_name = "FILE")]
    secrets: Option<PathBuf>,

    /// Indentation width (0 indents with tabs)
    #[arg(long = "indent", value_name = "N", default_value_t = 2)]
    indent: usize,

    /// Print the parsed shell AST as JSON
    #[arg(long = "ast", conflicts_with = "diff")]
    ast: bool,

    /// Print a unified diff of the rendered text against the formatted script
    #[arg(long = "diff")]
    diff: bool,

    /// Verbose logging to stderr
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Template file
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Variables as KEY=VALUE
    #[arg(value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

/// Diagnostics go to stdout as a shell comment.
fn fail(message: impl std::fmt::Display) -> ExitCode {
    println!("# {}", message);
    ExitCode::from(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let options = PipelineOptions {
        template: cli.template,
        include: cli.include,
        incpath: cli.incpath,
        secpath: cli.secpath,
        secrets: cli.secrets,
        vars: cli.vars,
        print: PrintConfig::with_indent(cli.indent),
    };

    let generated = match run(&options) {
        Ok(generated) => generated,
        Err(e) => return fail(e),
    };

    if cli.ast {
        match serde_json::to_string_pretty(&generated.script) {
            Ok(json) => println!("{}", json),
            Err(e) => return fail(e),
        }
    } else if cli.diff {
        print!("{}", generated.diff());
    } else {
        print!("{}", generated.formatted);
    }
    ExitCode::SUCCESS
}
