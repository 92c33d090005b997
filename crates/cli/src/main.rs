use std::process::ExitCode;

fn main() -> ExitCode {
    correduria_cli::run()
}
