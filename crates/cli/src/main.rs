use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    expireassist_cli::run()
}
