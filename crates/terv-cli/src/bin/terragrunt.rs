//! Terragrunt proxy binary.

use terv_core::config::Tool;

#[tokio::main]
async fn main() {
    terv_cli::proxy_main::run(Tool::Terragrunt).await
}
