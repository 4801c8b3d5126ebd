//! Tenet compiler driver CLI.
//!
//! This build has no lexer/parser front end — it wires up and reports on the
//! type-checking/lowering pipeline itself. Embedding tools that already have
//! a parsed AST call [`tenetc::compile_program`] directly.

fn main() {
    tenetc::tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("version" | "--version" | "-v") => print_version(),
        Some("help" | "--help" | "-h") | None => print_usage(),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Tenet compiler driver");
    println!();
    println!("Usage: tenetc <command>");
    println!();
    println!("Commands:");
    println!("  help                Show this help message");
    println!("  version             Show version information");
    println!();
    println!("This build has no lexer/parser front end — it exposes the");
    println!("checking/lowering pipeline as a library (`tenetc::compile_program`)");
    println!("for a tool that already has a parsed `tenet_ir::ast::Module` tree.");
}

fn print_version() {
    println!("tenetc {}", env!("CARGO_PKG_VERSION"));
}
