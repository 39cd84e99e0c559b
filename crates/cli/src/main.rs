use std::process::ExitCode;

fn main() -> ExitCode {
    deckfill_cli::run()
}
