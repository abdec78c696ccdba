//! Language Server Protocol implementation for qbvm.
//!
//! A diagnostics-only server: every time a document is opened or changed,
//! the lexer, parser and type checker run over it and their errors are
//! published back to the editor.
//!
//! # Architecture
//!
//! The LSP server uses `tower-lsp` and communicates via JSON-RPC over stdio.
//! It keeps the text of open documents; analysis is cheap enough to rerun
//! from scratch on each change.
//!
//! ```text
//! Editor (VSCode, etc.)
//!     ↓ JSON-RPC over stdio
//! QbLanguageServer
//!     ↓ Uses
//! qbvm front end (lexer, parser, semantic)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::ast::Locus;
use crate::builtins::Registry;
use crate::lexer::tokenize;
use crate::parser::Parser;
use crate::semantic::SemanticAnalyzer;

/// State for a single open document.
#[derive(Debug)]
pub struct DocumentState {
    /// The document's content.
    pub content: String,
    /// The document's version (for incremental updates).
    pub version: i32,
}

/// Shared state for the language server.
#[derive(Debug, Default)]
pub struct ServerState {
    /// Open documents indexed by URI.
    pub documents: HashMap<Url, DocumentState>,
}

/// The qbvm Language Server.
pub struct QbLanguageServer {
    /// Client handle for sending notifications.
    client: Client,
    /// Shared server state.
    state: Arc<RwLock<ServerState>>,
}

impl QbLanguageServer {
    /// Creates a new language server instance.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(ServerState::default())),
        }
    }

    /// Analyzes a document and publishes diagnostics.
    async fn analyze_document(&self, uri: &Url, content: &str, version: i32) {
        let diagnostics = diagnostics(content);
        log::debug!("{}: {} diagnostic(s)", uri, diagnostics.len());
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(version))
            .await;
    }
}

/// Runs the front end over `source` and converts every error it reports.
///
/// Lex errors do not stop parsing, since the lexer skips the bad input;
/// parse errors stop before type checking.
pub fn diagnostics(source: &str) -> Vec<Diagnostic> {
    let (tokens, lex_errors) = tokenize(source);
    let mut diagnostics: Vec<Diagnostic> = lex_errors
        .iter()
        .map(|err| error_diagnostic(source, err.locus(), err.to_string()))
        .collect();

    let mut program = match Parser::new(&tokens).parse() {
        Ok(program) => program,
        Err(errors) => {
            diagnostics.extend(
                errors
                    .iter()
                    .map(|err| error_diagnostic(source, err.locus(), err.to_string())),
            );
            return diagnostics;
        }
    };

    let registry = Registry::standard();
    let errors = SemanticAnalyzer::new(&registry).analyze(&mut program);
    diagnostics.extend(
        errors
            .iter()
            .map(|err| error_diagnostic(source, err.locus(), err.to_string())),
    );
    diagnostics
}

fn error_diagnostic(source: &str, locus: Locus, message: String) -> Diagnostic {
    Diagnostic {
        range: locus_to_range(source, locus),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("qbvm".to_string()),
        message,
        ..Default::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for QbLanguageServer {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Document sync - we want full content on each change
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                // Diagnostics are published proactively (no explicit capability needed)
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "qbvm-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "qbvm LSP server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let content = params.text_document.text;
        let version = params.text_document.version;

        {
            let mut state = self.state.write().await;
            state.documents.insert(
                uri.clone(),
                DocumentState {
                    content: content.clone(),
                    version,
                },
            );
        }

        self.analyze_document(&uri, &content, version).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // FULL sync: the last change holds the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            let content = change.text;
            {
                let mut state = self.state.write().await;
                if let Some(doc) = state.documents.get_mut(&uri) {
                    doc.content = content.clone();
                    doc.version = version;
                }
            }
            self.analyze_document(&uri, &content, version).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut state = self.state.write().await;
            state.documents.remove(&uri);
        }
        // Clear diagnostics
        self.client.publish_diagnostics(uri, vec![], None).await;
    }
}

/// The range of the word starting at `locus`, or one character when no
/// word starts there.
fn locus_to_range(source: &str, locus: Locus) -> Range {
    let line_index = locus.line.saturating_sub(1);
    let Some(line) = source.lines().nth(line_index) else {
        let start = Position::new(line_index as u32, 0);
        return Range::new(start, start);
    };

    let mut start_byte = locus.column.saturating_sub(1).min(line.len());
    while !line.is_char_boundary(start_byte) {
        start_byte -= 1;
    }
    let rest = &line[start_byte..];
    let word_len: usize = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || "$%&!#_.".contains(*c))
        .map(char::len_utf8)
        .sum();
    let end_byte = if word_len == 0 {
        start_byte + rest.chars().next().map_or(0, char::len_utf8)
    } else {
        start_byte + word_len
    };

    Range::new(
        Position::new(line_index as u32, utf16_len(&line[..start_byte])),
        Position::new(line_index as u32, utf16_len(&line[..end_byte])),
    )
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}
