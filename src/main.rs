use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    mim_lib::run().await
}
