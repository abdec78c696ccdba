//! qbvm Language Server - Entry Point
//!
//! Sets up the tower-lsp service and runs it over stdio.
//!
//! # Usage
//!
//! The LSP server is typically started by an editor/IDE:
//!
//! ```bash
//! qbvm-lsp
//! ```
//!
//! For debugging, you can run with logging:
//!
//! ```bash
//! RUST_LOG=debug qbvm-lsp 2>lsp.log
//! ```

use tower_lsp::{LspService, Server};

use qbvm::lsp::QbLanguageServer;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries JSON-RPC.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting qbvm LSP server v{}", env!("CARGO_PKG_VERSION"));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(QbLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
