//! S-expression command-line tool for parsing, validating, and transcoding
//! Rivest S-expressions.
//!
//! Usage: sexp [OPTIONS] [FILE|DIR]
//!
//! Options:
//!   -f, --from <FORMAT>    Input format (sexp, cbor) [default: sexp]
//!   -t, --to <FORMAT>      Output format (canonical, advanced, compact, transport, cbor, diag)
//!                          [default: advanced]
//!   -x, --hex              Write binary atoms as hex instead of base64
//!   -w, --write            Write output to file with inferred name
//!   -o, --output <FILE>    Write output to specified file
//!   --check                Check if input is valid (exit 0 if valid, 1 if invalid)
//!   -h, --help             Print help
//!   -V, --version          Print version

use libsexp::{encode, parse, Fallback, Format, Node};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

mod transcode;

/// Output format, including the ones handled by transcoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Sexp(Format),
    Cbor,
    CborDiag,
}

/// Check whether a string is a recognized input format name for -f.
fn is_input_format(s: &str) -> bool {
    matches!(s, "sexp" | "cbor")
}

/// Check whether a string is a recognized output format name for -t.
fn is_output_format(s: &str) -> bool {
    matches!(
        s,
        "canonical"
            | "csexp"
            | "advanced"
            | "adv"
            | "compact"
            | "transport"
            | "cbor"
            | "diag"
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    let mut from_format: Option<&str> = None;
    let mut to_format: Option<&str> = None;
    let mut fallback = Fallback::Base64;
    let mut write_back = false;
    let mut output_file: Option<&str> = None;
    let mut check_only = false;
    let mut input_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-V" | "--version" => {
                println!("sexp {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "-f" | "--from" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: -f requires a format argument");
                    process::exit(1);
                }
                if !is_input_format(&args[i]) {
                    eprintln!("Error: Unknown input format: {}", args[i]);
                    process::exit(1);
                }
                from_format = Some(&args[i]);
            }
            "-t" | "--to" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: -t requires a format argument");
                    process::exit(1);
                }
                if !is_output_format(&args[i]) {
                    eprintln!("Error: Unknown output format: {}", args[i]);
                    process::exit(1);
                }
                to_format = Some(&args[i]);
            }
            "-x" | "--hex" => {
                fallback = Fallback::Hex;
            }
            "-w" | "--write" => {
                write_back = true;
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output requires an argument");
                    process::exit(1);
                }
                output_file = Some(&args[i]);
            }
            "--check" => {
                check_only = true;
            }
            "-" => {
                // Explicit stdin
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                process::exit(1);
            }
            _ => {
                if input_path.is_some() {
                    eprintln!("Error: Multiple input paths not supported");
                    process::exit(1);
                }
                input_path = Some(&args[i]);
            }
        }
        i += 1;
    }

    let from_format = from_format.unwrap_or("sexp");

    if write_back && output_file.is_some() {
        eprintln!("Error: --write and --output are mutually exclusive");
        process::exit(1);
    }

    let output = parse_output(to_format.unwrap_or("advanced"));

    if let Some(path) = input_path {
        if Path::new(path).is_dir() {
            if output_file.is_some() {
                eprintln!("Error: --output cannot be used with directory input");
                process::exit(1);
            }
            process_directory(path, from_format, output, fallback, write_back, check_only);
            return;
        }
    }

    let input: Vec<u8> = match input_path {
        Some(path) => match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                process::exit(1);
            }
        },
        None => {
            let mut buffer = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut buffer) {
                eprintln!("Error reading stdin: {}", e);
                process::exit(1);
            }
            buffer
        }
    };

    let exit_code = process_input(
        &input,
        input_path,
        from_format,
        output,
        fallback,
        output_file,
        write_back,
        check_only,
    );
    process::exit(exit_code);
}

fn parse_output(s: &str) -> Output {
    match s {
        "canonical" | "csexp" => Output::Sexp(Format::Canonical),
        "advanced" | "adv" => Output::Sexp(Format::Advanced),
        "compact" => Output::Sexp(Format::Compact),
        "transport" => Output::Sexp(Format::Transport),
        "cbor" => Output::Cbor,
        "diag" => Output::CborDiag,
        _ => {
            eprintln!("Error: Unknown output format: {}", s);
            process::exit(1);
        }
    }
}

fn output_extension(output: Output) -> &'static str {
    match output {
        Output::Sexp(Format::Canonical) => "csexp",
        Output::Sexp(Format::Advanced) | Output::Sexp(Format::Compact) => "sexp",
        Output::Sexp(Format::Transport) => "tsexp",
        Output::Cbor => "cbor",
        Output::CborDiag => "diag",
    }
}

fn process_directory(
    dir_path: &str,
    from_format: &str,
    output: Output,
    fallback: Fallback,
    write_back: bool,
    check_only: bool,
) {
    let entries = match fs::read_dir(dir_path) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error reading directory {}: {}", dir_path, e);
            process::exit(1);
        }
    };

    let mut had_errors = false;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "sexp").unwrap_or(false) {
            let path_str = path.to_string_lossy();
            let input = match fs::read(&path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading {}: {}", path_str, e);
                    had_errors = true;
                    continue;
                }
            };

            let exit_code = process_input(
                &input,
                Some(&path_str),
                from_format,
                output,
                fallback,
                None,
                write_back,
                check_only,
            );

            if exit_code != 0 {
                had_errors = true;
            }
        }
    }

    process::exit(if had_errors { 1 } else { 0 });
}

#[allow(clippy::too_many_arguments)]
fn process_input(
    input: &[u8],
    input_file: Option<&str>,
    from_format: &str,
    output: Output,
    fallback: Fallback,
    output_file: Option<&str>,
    write_back: bool,
    check_only: bool,
) -> i32 {
    tracing::debug!(
        file = input_file.unwrap_or("<stdin>"),
        from = from_format,
        bytes = input.len(),
        "processing input"
    );

    let decoded: Result<Option<Node>, String> = match from_format {
        "cbor" => transcode::cbor::decode(input),
        _ => parse(input).map_err(|e| e.to_string()),
    };

    let tree = match decoded {
        Ok(tree) => tree,
        Err(e) => {
            if let Some(path) = input_file {
                eprintln!("{}: {}", path, e);
            } else {
                eprintln!("Parse error: {}", e);
            }
            return 1;
        }
    };

    if check_only {
        if let Some(path) = input_file {
            println!("{}: ok", path);
        }
        return 0;
    }

    let Some(tree) = tree else {
        tracing::warn!(file = input_file.unwrap_or("<stdin>"), "input holds no object");
        return 0;
    };

    output_tree(&tree, output, fallback, output_file, write_back, input_file)
}

/// Encode a parsed tree and write it out.
fn output_tree(
    tree: &Node,
    output: Output,
    fallback: Fallback,
    output_file: Option<&str>,
    write_back: bool,
    input_file: Option<&str>,
) -> i32 {
    match output {
        Output::Sexp(Format::Canonical) => {
            let bytes = encode(tree, Format::Canonical, fallback);
            write_binary_output(&bytes, output_file, write_back, input_file, output);
        }
        Output::Sexp(format) => {
            let bytes = encode(tree, format, fallback);
            let text = String::from_utf8_lossy(&bytes);
            write_text_output(&text, output_file, write_back, input_file, output);
        }
        Output::Cbor => {
            let bytes = transcode::cbor::encode(tree);
            write_binary_output(&bytes, output_file, write_back, input_file, output);
        }
        Output::CborDiag => {
            let bytes = transcode::cbor::encode(tree);
            match transcode::cbor::diagnostic(&bytes) {
                Ok(text) => {
                    write_text_output(&text, output_file, write_back, input_file, output);
                }
                Err(e) => {
                    eprintln!("Error: Cannot render CBOR diagnostic notation: {}", e);
                    return 1;
                }
            }
        }
    }

    0
}

fn write_text_output(
    output: &str,
    output_file: Option<&str>,
    write_back: bool,
    input_file: Option<&str>,
    format: Output,
) {
    if let Some(path) = output_file {
        if let Err(e) = fs::write(path, output) {
            eprintln!("Error writing {}: {}", path, e);
            process::exit(1);
        }
    } else if write_back {
        write_beside_input(output.as_bytes(), input_file, format);
    } else {
        print!("{}", output);
        // Ensure output ends with newline
        if !output.ends_with('\n') {
            println!();
        }
    }
}

fn write_binary_output(
    output: &[u8],
    output_file: Option<&str>,
    write_back: bool,
    input_file: Option<&str>,
    format: Output,
) {
    if let Some(path) = output_file {
        if let Err(e) = fs::write(path, output) {
            eprintln!("Error writing {}: {}", path, e);
            process::exit(1);
        }
    } else if write_back {
        write_beside_input(output, input_file, format);
    } else {
        // Write raw bytes to stdout
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = handle.write_all(output) {
            eprintln!("Error writing to stdout: {}", e);
            process::exit(1);
        }
    }
}

fn write_beside_input(output: &[u8], input_file: Option<&str>, format: Output) {
    let Some(input_path) = input_file else {
        eprintln!("Error: --write requires an input file");
        process::exit(1);
    };
    let output_path = Path::new(input_path).with_extension(output_extension(format));
    if let Err(e) = fs::write(&output_path, output) {
        eprintln!("Error writing {}: {}", output_path.display(), e);
        process::exit(1);
    }
    tracing::info!(path = %output_path.display(), bytes = output.len(), "wrote output");
}

fn print_help() {
    println!(
        "sexp - Rivest S-expression command-line tool

USAGE:
    sexp [OPTIONS] [FILE|DIR]

ARGS:
    [FILE|DIR]    Input file or directory (reads from stdin if not provided)
                  When a directory is given, processes all .sexp files in it

OPTIONS:
    -f, --from <FORMAT>    Input format [default: sexp]
                           Supported: sexp, cbor

                           'sexp' accepts any mix of canonical, advanced and
                           transport encodings.

    -t, --to <FORMAT>      Output format [default: advanced]
                           Supported: canonical, advanced, compact, transport,
                                      cbor, diag

    -x, --hex              Write binary atoms as #hex# instead of |base64|

    -w, --write            Write output to file with inferred extension

    -o, --output <FILE>    Write output to specified file (not valid with directory input)

    --check                Check if input is valid (exit 0 if valid, 1 if invalid)

    -h, --help             Print help

    -V, --version          Print version

ENVIRONMENT:
    RUST_LOG               Log filter for diagnostics on stderr [default: warn]

EXAMPLES:
    # Pretty-print an S-expression
    sexp key.sexp

    # Validate every S-expression in a directory
    sexp --check ./keys/

    # Canonicalize for hashing or signing
    sexp -t canonical key.sexp -o key.csexp

    # Wrap for transport in mail or URLs
    sexp -t transport key.sexp

    # Single line, binary atoms in hex
    sexp -t compact -x key.sexp

    # Convert to CBOR and back
    sexp -t cbor key.sexp -o key.cbor
    sexp -f cbor key.cbor

    # View the CBOR encoding in diagnostic notation (RFC 8949 §8)
    sexp -t diag key.sexp
"
    );
}
