use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    zen_cli::run()
}
