//! webshell-bundler - packages webshell desktop applications into OS-native
//! distributable bundles.

use std::process;

use webshell_bundler::cli;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
