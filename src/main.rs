//! Punto de entrada ("driver").
//!
//! Este módulo orquesta lectura, traducción y reporte de errores, y
//! expone una CLI. Los códigos de salida son 0 en éxito, 1 ante errores
//! de uso o de traducción, y un `abort()` ante defectos internos.

use anyhow::{self, bail, Context};
use clap::{crate_version, error::ErrorKind, Arg, ArgAction, ArgMatches, Command};
use pl0c::{
    error::Diagnostics,
    source::Source,
    translate::{self, Translate},
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    process,
    rc::Rc,
};

fn main() -> anyhow::Result<()> {
    let args = parse_args();
    init_logging(args.get_count("verbose"));

    // Se extraen argumentos necesarios
    let input = args
        .get_one::<String>("input")
        .expect("clap allowed a missing input file");

    let output = args
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or("-");

    let tokens = args.get_flag("tokens");

    if Path::new(input).extension().and_then(|ext| ext.to_str()) != Some("pl0") {
        bail!("File must end in '.pl0': {}", input);
    }

    let source = Source::read(input).with_context(|| format!("Failed to read {}", input))?;
    debug!(input = %input, output = %output, tokens, "starting");

    let result = match output {
        // Salida a stdout
        "-" => {
            let stdout = io::stdout();
            run(&source, stdout.lock(), tokens)
        }

        // Salida a archivo
        path => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            run(&source, file, tokens)
        }
    };

    if let Err(failure) = result {
        let kind = failure.as_ref().kind();
        let internal = failure.as_ref().is_internal();

        eprint!("{}", Diagnostics::from(failure).kind(kind));
        if internal {
            error!("translator invariant violated, aborting");
            process::abort();
        }

        process::exit(1);
    }

    Ok(())
}

/// Traduce o lista tokens hacia `output`.
fn run<W: Write>(source: &Rc<Source>, output: W, tokens: bool) -> Translate<()> {
    let mut output = BufWriter::new(output);
    let result = if tokens {
        translate::dump_tokens(source, &mut output)
    } else {
        translate::translate(source, &mut output)
    };

    // Lo ya emitido permanece escrito aun si hubo error
    if let Err(error) = output.flush() {
        debug!(%error, "failed to flush output");
    }

    result
}

/// Parsing de CLI.
///
/// Cualquier error de uso termina el proceso con código 1, con excepción
/// de `--help` y `--version`.
fn parse_args() -> ArgMatches {
    let command = Command::new("pl0c")
        .about("PL/0 to C translator")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .required(true)
                .help("Source file, must end in '.pl0'"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .action(ArgAction::SetTrue)
                .help("List tokens instead of translating"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase logging verbosity (repeatable)"),
        );

    match command.try_get_matches() {
        Ok(args) => args,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => error.exit(),
            _ => {
                // Si stderr no está disponible, no hay a dónde reportar
                let _ = error.print();
                process::exit(1);
            }
        },
    }
}

/// Los registros van a stderr, ya que stdout lleva el código generado.
fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
