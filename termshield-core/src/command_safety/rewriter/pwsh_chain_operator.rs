use std::sync::Arc;

use async_trait::async_trait;

use super::{CommandLineRewriteOptions, CommandLineRewriter, RewriteResult};
use crate::command_safety::shell_parser::TreeSitterCommandParser;
use crate::shell::is_powershell;

const REASONING: &str = "&& re-written to ;";

/// Rewrites PowerShell `&&` chain operators to `;`.
///
/// Windows PowerShell 5.1 has no `&&` operator. Occurrences inside strings
/// and comments are left alone.
pub struct PwshChainOperatorRewriter {
    parser: Arc<TreeSitterCommandParser>,
}

impl PwshChainOperatorRewriter {
    pub fn new(parser: Arc<TreeSitterCommandParser>) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl CommandLineRewriter for PwshChainOperatorRewriter {
    fn name(&self) -> &'static str {
        "PwshChainOperatorRewriter"
    }

    async fn rewrite(&self, options: &CommandLineRewriteOptions) -> Option<RewriteResult> {
        if !is_powershell(&options.shell, options.os) {
            return None;
        }

        let operators = match self
            .parser
            .extract_pwsh_double_ampersand_chain_operators(&options.command_line)
            .await
        {
            Ok(operators) => operators,
            Err(error) => {
                tracing::debug!(%error, "skipping && rewrite; command line could not be parsed");
                return None;
            }
        };
        if operators.is_empty() {
            return None;
        }

        let rewritten = replace_ranges(
            &options.command_line,
            operators
                .iter()
                .map(|capture| (capture.start_byte, capture.end_byte)),
            ";",
        );
        Some(RewriteResult {
            rewritten,
            reasoning: REASONING.to_owned(),
        })
    }
}

/// Replace each `(start, end)` byte range, last range first so earlier offsets
/// stay valid. Ranges that do not fall on character boundaries are skipped.
fn replace_ranges(
    text: &str,
    ranges: impl IntoIterator<Item = (usize, usize)>,
    replacement: &str,
) -> String {
    let mut ranges: Vec<(usize, usize)> = ranges.into_iter().collect();
    ranges.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    let mut rewritten = text.to_owned();
    for (start, end) in ranges {
        if start <= end
            && end <= rewritten.len()
            && rewritten.is_char_boundary(start)
            && rewritten.is_char_boundary(end)
        {
            rewritten.replace_range(start..end, replacement);
        }
    }
    rewritten
}
