use std::process::ExitCode;

fn main() -> ExitCode {
    paramres_cli::run()
}
