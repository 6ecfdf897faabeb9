//! Binary entrypoint for extmk-cli

fn main() {
    if let Err(err) = extmk_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
