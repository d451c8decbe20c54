//! Print an S-expression in every encoding.
//!
//! Reads the file named on the command line, or every fixture under
//! test/sexp/ when no file is given.

use libsexp::{encode, parse, Fallback, Format};
use std::fs;
use std::path::{Path, PathBuf};

fn show(path: &Path) -> Result<(), String> {
    let input = fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let Some(tree) = parse(&input).map_err(|e| format!("{}: {}", path.display(), e))? else {
        println!("== {} (empty)", path.display());
        return Ok(());
    };

    println!("== {}", path.display());
    let forms = [
        ("canonical", Format::Canonical, Fallback::Base64),
        ("advanced", Format::Advanced, Fallback::Base64),
        ("advanced/hex", Format::Advanced, Fallback::Hex),
        ("compact", Format::Compact, Fallback::Base64),
        ("transport", Format::Transport, Fallback::Base64),
    ];
    for (name, format, fallback) in forms {
        let bytes = encode(&tree, format, fallback);
        println!("-- {}", name);
        println!("{}", String::from_utf8_lossy(&bytes).escape_debug());
    }
    Ok(())
}

fn main() {
    let paths: Vec<PathBuf> = match std::env::args().nth(1) {
        Some(path) => vec![PathBuf::from(path)],
        None => {
            let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
                .parent()
                .unwrap()
                .join("test")
                .join("sexp");
            let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
                .unwrap()
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().map(|e| e == "sexp").unwrap_or(false))
                .collect();
            paths.sort();
            paths
        }
    };

    let mut failed = 0;
    for path in &paths {
        if let Err(e) = show(path) {
            eprintln!("{}", e);
            failed += 1;
        }
    }
    if failed > 0 {
        std::process::exit(1);
    }
}
