//! Shared entry point for the proxy binaries.
//!
//! Each proxy binary (`tofu`, `terraform`, ...) resolves the version for
//! its tool, then executes the real binary with the proxy's arguments and
//! terminates with the child's exit code.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use terv_core::config::{Config, Tool};
use terv_core::manager::VersionManager;
use terv_core::proxy;
use terv_core::reporter::ConsoleReporter;

/// Run the proxy for `tool`; always terminates the process.
pub async fn run(tool: Tool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let reporter = Arc::new(ConsoleReporter::new(false));
    let mut conf = match Config::from_env(reporter) {
        Ok(conf) => conf,
        Err(err) => fail(&err),
    };
    proxy::update_work_path(&mut conf.work_path, &args);

    let manager = VersionManager::new(Arc::new(conf), tool);
    match proxy::run(&manager, &args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => fail(&err),
    }
}

fn fail(err: &terv_core::TervError) -> ! {
    eprintln!("terv proxy error: {err}");
    std::process::exit(1);
}
