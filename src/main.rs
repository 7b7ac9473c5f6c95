fn main() {
    if let Err(err) = parley::cli::main() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
