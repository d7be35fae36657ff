fn main() {
    if let Err(err) = brrtcontroller::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
