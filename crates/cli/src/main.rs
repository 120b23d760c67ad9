use std::process::ExitCode;

fn main() -> ExitCode {
    planpal_cli::run()
}
