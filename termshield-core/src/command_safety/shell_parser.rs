//! Grammar-backed queries over shell command lines.
//!
//! Command lines are parsed with tree-sitter (bash or PowerShell) and then
//! queried for the pieces the safety pipeline cares about:
//! ```text
//! Input:  "echo hello > out.txt && cat < out.txt"
//! sub-commands: ["echo hello", "cat"]
//! file writes:  ["out.txt"]
//! ```
//!
//! Grammars are loaded lazily on first use, compiled queries are kept for the
//! parser's lifetime and trees are kept in a [`SyntaxTreeCache`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::OnceCell;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

use termshield_config::TerminalSafetyConfig;
use termshield_config::constants::defaults;

use crate::error::{CommandParserError, ParserResult};
use crate::grammar::{BundledGrammars, GrammarLibrary, QueryKind, SyntaxTreeCache};
use crate::shell::ShellLanguage;

/// A node matched by a query, detached from its tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxCapture {
    /// Capture name from the query (without the leading `@`)
    pub name: String,
    /// Grammar node type
    pub kind: String,
    pub text: String,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl SyntaxCapture {
    fn new(name: &str, node: Node<'_>, source: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: node.kind().to_owned(),
            text: node_text(node, source).to_owned(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }
}

/// Parses command lines and answers structural queries about them.
///
/// Safe to share between tasks; the only lock held while parsing is the
/// per-language parser lock, and no lock is held across an await.
pub struct TreeSitterCommandParser {
    library: Arc<dyn GrammarLibrary>,
    bash: OnceCell<Language>,
    powershell: OnceCell<Language>,
    queries: Mutex<HashMap<(ShellLanguage, QueryKind), Arc<Query>>>,
    parsers: Mutex<HashMap<ShellLanguage, Parser>>,
    trees: SyntaxTreeCache,
}

impl TreeSitterCommandParser {
    pub fn new() -> Self {
        Self::with_library(
            Arc::new(BundledGrammars),
            Duration::from_millis(defaults::SYNTAX_TREE_CACHE_IDLE_MS),
        )
    }

    pub fn from_config(config: &TerminalSafetyConfig) -> Self {
        Self::with_library(Arc::new(BundledGrammars), config.syntax_tree_cache_idle())
    }

    pub fn with_library(library: Arc<dyn GrammarLibrary>, cache_idle: Duration) -> Self {
        Self {
            library,
            bash: OnceCell::new(),
            powershell: OnceCell::new(),
            queries: Mutex::new(HashMap::new()),
            parsers: Mutex::new(HashMap::new()),
            trees: SyntaxTreeCache::new(cache_idle),
        }
    }

    pub fn tree_cache(&self) -> &SyntaxTreeCache {
        &self.trees
    }

    /// Text of every simple command, in source order.
    ///
    /// Redirections belong to the enclosing statement, not the command, so
    /// `echo hi > out.txt` yields `echo hi`.
    pub async fn extract_sub_commands(
        &self,
        language: ShellLanguage,
        command_line: &str,
    ) -> ParserResult<Vec<String>> {
        self.query_tree(language, command_line, QueryKind::SubCommands, |_, node| {
            Some(node_text(node, command_line).to_owned())
        })
        .await
    }

    /// Every `&&` in a PowerShell command line that acts as an operator.
    ///
    /// Occurrences inside string literals and comments are ignored. Results
    /// are ordered by position with one entry per source range.
    pub async fn extract_pwsh_double_ampersand_chain_operators(
        &self,
        command_line: &str,
    ) -> ParserResult<Vec<SyntaxCapture>> {
        let mut captures = self
            .query_tree(
                ShellLanguage::PowerShell,
                command_line,
                QueryKind::DoubleAmpersand,
                |name, node| {
                    (!is_inside_literal(node))
                        .then(|| SyntaxCapture::new(name, node, command_line))
                },
            )
            .await?;
        captures.sort_by_key(|capture| (capture.start_byte, capture.end_byte));
        captures.dedup_by_key(|capture| (capture.start_byte, capture.end_byte));
        Ok(captures)
    }

    /// Raw destination text of every output redirection, in source order.
    ///
    /// Input redirections and descriptor duplications (`2>&1`) are skipped.
    /// Destinations are returned exactly as written, quotes included.
    pub async fn get_file_writes(
        &self,
        language: ShellLanguage,
        command_line: &str,
    ) -> ParserResult<Vec<String>> {
        self.query_tree(language, command_line, QueryKind::FileWrites, |_, node| {
            match language {
                ShellLanguage::Bash => bash_write_destination(node, command_line),
                ShellLanguage::PowerShell => powershell_write_destination(node, command_line),
            }
        })
        .await
    }

    async fn query_tree<T>(
        &self,
        language: ShellLanguage,
        command_line: &str,
        kind: QueryKind,
        mut map: impl FnMut(&str, Node<'_>) -> Option<T> + Send,
    ) -> ParserResult<Vec<T>> {
        let grammar = self.language(language).await?;
        let query = self.query(language, kind, &grammar)?;
        let tree = self.parse(language, command_line, &grammar)?;

        let names = query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&query, tree.root_node(), command_line.as_bytes());
        let mut results = Vec::new();
        while let Some((query_match, capture_index)) = captures.next() {
            let Some(capture) = query_match.captures.get(*capture_index) else {
                continue;
            };
            let name = names
                .get(capture.index as usize)
                .copied()
                .unwrap_or_default();
            if let Some(value) = map(name, capture.node) {
                results.push(value);
            }
        }
        Ok(results)
    }

    async fn language(&self, language: ShellLanguage) -> ParserResult<Language> {
        let cell = match language {
            ShellLanguage::Bash => &self.bash,
            ShellLanguage::PowerShell => &self.powershell,
        };
        let grammar = cell
            .get_or_try_init(|| async {
                tracing::debug!(language = %language, "loading shell grammar");
                self.library.load(language).await
            })
            .await?;
        Ok(grammar.clone())
    }

    fn query(
        &self,
        language: ShellLanguage,
        kind: QueryKind,
        grammar: &Language,
    ) -> ParserResult<Arc<Query>> {
        let mut queries = self.queries.lock();
        if let Some(query) = queries.get(&(language, kind)) {
            return Ok(Arc::clone(query));
        }

        let mut last_error = None;
        for source in kind.sources(language) {
            match Query::new(grammar, source) {
                Ok(query) => {
                    let query = Arc::new(query);
                    queries.insert((language, kind), Arc::clone(&query));
                    return Ok(query);
                }
                Err(error) => {
                    tracing::debug!(
                        language = %language,
                        query = %kind,
                        %error,
                        "query candidate rejected by grammar"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(match last_error {
            Some(source) => CommandParserError::QueryCompile {
                language,
                kind,
                source,
            },
            None => CommandParserError::GrammarUnavailable {
                language,
                reason: format!("no {kind} query is defined"),
            },
        })
    }

    fn parse(
        &self,
        language: ShellLanguage,
        command_line: &str,
        grammar: &Language,
    ) -> ParserResult<Tree> {
        if let Some(tree) = self.trees.get(language, command_line) {
            return Ok(tree);
        }

        let tree = {
            let mut parsers = self.parsers.lock();
            let parser = match parsers.entry(language) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut parser = Parser::new();
                    parser
                        .set_language(grammar)
                        .map_err(|source| CommandParserError::LanguageLoad { language, source })?;
                    entry.insert(parser)
                }
            };
            parser.parse(command_line, None)
        }
        .ok_or(CommandParserError::ParseFailed { language })?;

        self.trees.set(language, command_line, tree.clone());
        Ok(tree)
    }
}

impl Default for TreeSitterCommandParser {
    fn default() -> Self {
        Self::new()
    }
}

fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Whether `node` sits inside a string, here-string or comment
fn is_inside_literal(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        let kind = ancestor.kind();
        if kind.contains("string") || kind.contains("comment") {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

/// Destination of a bash `file_redirect` when it writes to a file.
///
/// ```text
/// echo hi > out.txt     -> out.txt
/// cmd 2>> err.log       -> err.log
/// cmd &> all.log        -> all.log
/// cmd 2>&1              -> (duplication, skipped)
/// cat < in.txt          -> (input, skipped)
/// ```
fn bash_write_destination(redirect: Node<'_>, source: &str) -> Option<String> {
    let mut operator = "";
    let mut destination = None;
    let mut cursor = redirect.walk();
    for child in redirect.children(&mut cursor) {
        if child.kind() == "file_descriptor" {
            continue;
        }
        if child.is_named() {
            if destination.is_none() {
                destination = Some(child);
            }
        } else if operator.is_empty() {
            operator = child.kind();
        }
    }

    let destination = destination?;
    let text = node_text(destination, source);
    match operator {
        ">" | ">>" | ">|" | "&>" | "&>>" => Some(text.to_owned()),
        // `>&` doubles as descriptor duplication when the target is a number or `-`.
        ">&" if !is_descriptor_reference(destination, text) => Some(text.to_owned()),
        _ => None,
    }
}

fn is_descriptor_reference(destination: Node<'_>, text: &str) -> bool {
    destination.kind() == "number"
        || text == "-"
        || (!text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()))
}

/// Destination of a PowerShell `redirection` when it writes to a file.
///
/// ```text
/// Get-Process > out.txt   -> out.txt
/// cmd 2>> err.log         -> err.log
/// cmd *> all.log          -> all.log
/// cmd 2>&1                -> (merge, skipped)
/// ```
fn powershell_write_destination(redirection: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = redirection.walk();
    let mut children = redirection.children(&mut cursor);
    let operator = children.next()?;
    let operator_text = node_text(operator, source).trim();
    if operator_text.starts_with('<') || operator_text.contains('&') {
        return None;
    }

    let mut file_name = None;
    let mut fallback = None;
    for child in children.filter(|child| child.is_named()) {
        if child.kind() == "redirected_file_name" {
            file_name = Some(child);
            break;
        }
        fallback = Some(child);
    }

    let destination = file_name.or(fallback)?;
    let text = node_text(destination, source).trim();
    (!text.is_empty()).then(|| text.to_owned())
}
