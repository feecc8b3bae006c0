use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use termshield_core::{
    BundledGrammars, CommandParserError, GrammarLibrary, ParserResult, ShellLanguage,
    TreeSitterCommandParser,
};
use tree_sitter::Language;

async fn sub_commands(language: ShellLanguage, command_line: &str) -> Vec<String> {
    TreeSitterCommandParser::new()
        .extract_sub_commands(language, command_line)
        .await
        .unwrap()
}

async fn file_writes(language: ShellLanguage, command_line: &str) -> Vec<String> {
    TreeSitterCommandParser::new()
        .get_file_writes(language, command_line)
        .await
        .unwrap()
}

async fn chain_operators(command_line: &str) -> Vec<String> {
    TreeSitterCommandParser::new()
        .extract_pwsh_double_ampersand_chain_operators(command_line)
        .await
        .unwrap()
        .into_iter()
        .map(|capture| capture.text)
        .collect()
}

#[tokio::test]
async fn bash_sub_commands() {
    let cases: &[(&str, &[&str])] = &[
        ("ls -la", &["ls -la"]),
        ("echo hello && ls -la", &["echo hello", "ls -la"]),
        ("test -f file.txt || touch file.txt", &["test -f file.txt", "touch file.txt"]),
        ("cd /tmp; ls; pwd", &["cd /tmp", "ls", "pwd"]),
        (
            "cat file.txt | grep pattern | sort | uniq",
            &["cat file.txt", "grep pattern", "sort", "uniq"],
        ),
        ("echo $(date +%Y) && ls", &["echo $(date +%Y)", "date +%Y", "ls"]),
        (
            "echo \"hello && world\" && echo 'test'",
            &["echo \"hello && world\"", "echo 'test'"],
        ),
        ("sleep 10 & echo done", &["sleep 10", "echo done"]),
        ("echo hello > file.txt && cat < file.txt", &["echo hello", "cat"]),
        (
            "echo $(cat $(echo file.txt)) && ls",
            &["echo $(cat $(echo file.txt))", "cat $(echo file.txt)", "echo file.txt", "ls"],
        ),
        (
            "cmd1 && cmd2 || cmd3; cmd4 | cmd5 & cmd6",
            &["cmd1", "cmd2", "cmd3", "cmd4", "cmd5", "cmd6"],
        ),
        (
            "git add . && git commit -m \"Update feature\" && git push origin main",
            &["git add .", "git commit -m \"Update feature\"", "git push origin main"],
        ),
        ("echo a\necho b", &["echo a", "echo b"]),
    ];

    for (command_line, expected) in cases {
        assert_eq!(
            sub_commands(ShellLanguage::Bash, command_line).await,
            expected.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "{command_line}"
        );
    }
}

#[tokio::test]
async fn bash_control_flow_yields_inner_commands() {
    assert_eq!(
        sub_commands(
            ShellLanguage::Bash,
            "if [ -f file.txt ]; then cat file.txt; else echo \"not found\"; fi"
        )
        .await,
        vec!["cat file.txt", "echo \"not found\""]
    );
    assert_eq!(
        sub_commands(ShellLanguage::Bash, "for file in *.txt; do cat \"$file\"; done").await,
        vec!["cat \"$file\""]
    );
}

#[tokio::test]
async fn malformed_input_degrades_without_error() {
    let parser = TreeSitterCommandParser::new();
    for command_line in ["echo \"unclosed quote && ls", "&& || ;", "echo $(missing closing && ls"] {
        assert!(
            parser
                .extract_sub_commands(ShellLanguage::Bash, command_line)
                .await
                .is_ok(),
            "{command_line}"
        );
    }
}

#[tokio::test]
async fn blank_input_has_no_sub_commands() {
    for language in [ShellLanguage::Bash, ShellLanguage::PowerShell] {
        assert!(sub_commands(language, "").await.is_empty());
        assert!(sub_commands(language, "   \n\t  ").await.is_empty());
    }
}

#[tokio::test]
async fn powershell_sub_commands() {
    assert_eq!(
        sub_commands(
            ShellLanguage::PowerShell,
            "Get-Date; Get-Location; Write-Host \"done\""
        )
        .await,
        vec!["Get-Date", "Get-Location", "Write-Host \"done\""]
    );
    assert_eq!(
        sub_commands(ShellLanguage::PowerShell, "Get-ChildItem -Path C:\\").await,
        vec!["Get-ChildItem -Path C:\\"]
    );
}

#[tokio::test]
async fn bash_file_writes() {
    let cases: &[(&str, &[&str])] = &[
        ("echo hello > file.txt", &["file.txt"]),
        ("echo hello >> file.txt", &["file.txt"]),
        (
            "echo hello > file1.txt && echo world > file2.txt",
            &["file1.txt", "file2.txt"],
        ),
        ("command 2> error.log", &["error.log"]),
        ("command > output.txt 2>&1", &["output.txt"]),
        ("cat > file.txt << EOF\nhello\nworld\nEOF", &["file.txt"]),
        ("echo hello > \"file with spaces.txt\"", &["\"file with spaces.txt\""]),
        ("echo hello > 'file.txt'", &["'file.txt'"]),
        ("echo hello > $HOME/file.txt", &["$HOME/file.txt"]),
        ("echo hello > /tmp/file.txt", &["/tmp/file.txt"]),
        ("command 1> stdout.txt 2> stderr.txt", &["stdout.txt", "stderr.txt"]),
        ("command >> output.log 2>> error.log", &["output.log", "error.log"]),
        ("cat input.txt | grep pattern > output.txt", &["output.txt"]),
        ("(echo hello; echo world) > combined.txt", &["combined.txt"]),
        ("command > /dev/null", &["/dev/null"]),
        ("echo hello > 测试文件.txt", &["测试文件.txt"]),
        ("echo hello", &[]),
        ("echo hello | grep hello", &[]),
    ];

    for (command_line, expected) in cases {
        assert_eq!(
            file_writes(ShellLanguage::Bash, command_line).await,
            expected.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "{command_line}"
        );
    }
}

#[tokio::test]
async fn input_redirections_are_not_writes() {
    assert!(file_writes(ShellLanguage::Bash, "sort < input.txt").await.is_empty());
    assert_eq!(
        file_writes(ShellLanguage::Bash, "sort < input.txt > sorted.txt").await,
        vec!["sorted.txt"]
    );
}

#[tokio::test]
async fn powershell_file_writes() {
    let cases: &[(&str, &[&str])] = &[
        ("Write-Host \"hello\" > file.txt", &["file.txt"]),
        ("Write-Host \"hello\" >> file.txt", &["file.txt"]),
        ("Get-Content missing.txt 2> error.log", &["error.log"]),
        ("Get-Process *> all.log", &["all.log"]),
        ("Write-Host \"hello\" > $null", &["$null"]),
        ("Write-Host \"hello\" > C:\\temp\\file.txt", &["C:\\temp\\file.txt"]),
        ("Write-Host \"test > redirect\" > file.txt", &["file.txt"]),
        (
            "Get-Content missing.txt > output.txt 2> error.txt 3> warning.txt",
            &["output.txt", "error.txt", "warning.txt"],
        ),
        ("Write-Host \"hello\"", &[]),
    ];

    for (command_line, expected) in cases {
        assert_eq!(
            file_writes(ShellLanguage::PowerShell, command_line).await,
            expected.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "{command_line}"
        );
    }
}

#[tokio::test]
async fn powershell_chain_operators() {
    assert_eq!(chain_operators("Get-Date && Get-Location").await, vec!["&&"]);
    assert_eq!(
        chain_operators("echo first && echo second && echo third").await,
        vec!["&&", "&&"]
    );
    assert_eq!(
        chain_operators("echo hello && echo world ; echo done").await,
        vec!["&&"]
    );
    assert!(chain_operators("Get-Date ; Get-Location").await.is_empty());
    assert!(chain_operators("Write-Host \"test && test\"").await.is_empty());
    assert!(chain_operators("Write-Host 'test && test'").await.is_empty());
    assert!(chain_operators("").await.is_empty());
    assert!(chain_operators("echo hello & & echo world").await.is_empty());
}

#[tokio::test]
async fn triple_ampersand_yields_one_operator() {
    assert_eq!(chain_operators("echo hello &&& echo world").await, vec!["&&"]);
}

#[tokio::test]
async fn powershell_script_block_body_is_a_sub_command() {
    // The pipeline element wrapping the script block is not reported by this grammar.
    assert_eq!(
        sub_commands(ShellLanguage::PowerShell, "ForEach-Object { Write-Host $_.Name } ; Get-Date").await,
        vec!["Write-Host $_.Name", "Get-Date"]
    );
}

#[tokio::test]
async fn powershell_quoted_targets_keep_their_quotes() {
    for target in [r"'~\secret.txt'", "'C:evil.txt'", "'env:X'"] {
        let command_line = format!("Write-Host hi > {target}");
        assert_eq!(
            file_writes(ShellLanguage::PowerShell, &command_line).await,
            vec![target],
            "{command_line}"
        );
    }
}

#[tokio::test]
async fn chain_operator_captures_are_ordered_and_exact() {
    let command_line = "git add . && git commit -m \"message\" && git push";
    let captures = TreeSitterCommandParser::new()
        .extract_pwsh_double_ampersand_chain_operators(command_line)
        .await
        .unwrap();

    assert_eq!(captures.len(), 2);
    assert!(captures.first().unwrap().start_byte < captures.last().unwrap().start_byte);
    for capture in &captures {
        assert_eq!(command_line.get(capture.start_byte..capture.end_byte), Some("&&"));
    }
}

#[tokio::test]
async fn repeated_parses_hit_the_tree_cache() {
    let parser = TreeSitterCommandParser::new();
    parser
        .extract_sub_commands(ShellLanguage::Bash, "echo hello > out.txt")
        .await
        .unwrap();
    parser
        .get_file_writes(ShellLanguage::Bash, "echo hello > out.txt")
        .await
        .unwrap();

    let stats = parser.tree_cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(parser.tree_cache().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_cache_is_cleared_and_reparsed() {
    let parser = TreeSitterCommandParser::with_library(
        Arc::new(BundledGrammars),
        Duration::from_millis(200),
    );
    parser
        .extract_sub_commands(ShellLanguage::Bash, "ls")
        .await
        .unwrap();
    assert_eq!(parser.tree_cache().len(), 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(parser.tree_cache().is_empty());

    assert_eq!(
        parser
            .extract_sub_commands(ShellLanguage::Bash, "ls")
            .await
            .unwrap(),
        vec!["ls"]
    );
    assert_eq!(parser.tree_cache().stats().misses, 2);
}

struct MissingGrammars;

#[async_trait]
impl GrammarLibrary for MissingGrammars {
    async fn load(&self, language: ShellLanguage) -> ParserResult<Language> {
        Err(CommandParserError::GrammarUnavailable {
            language,
            reason: "grammar not installed".into(),
        })
    }
}

#[tokio::test]
async fn grammar_failures_are_errors() {
    let parser =
        TreeSitterCommandParser::with_library(Arc::new(MissingGrammars), Duration::from_secs(1));

    let error = parser
        .get_file_writes(ShellLanguage::PowerShell, "echo hi > out.txt")
        .await
        .unwrap_err();

    assert!(matches!(error, CommandParserError::GrammarUnavailable { .. }));
    assert_eq!(error.language(), ShellLanguage::PowerShell);
    assert!(error.to_string().contains("grammar not installed"));
}
