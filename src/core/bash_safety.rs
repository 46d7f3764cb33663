//! Read-only classification for shell commands.
//!
//! A command is read-only only when every segment of it is provably incapable of
//! mutating the filesystem or external state:
//! - any redirection (`>`, `>>`, `<`, `<<`, `<<<`, `2>&1`, `&>`) vetoes the whole command
//! - command substitution (`$(...)`, backticks) vetoes the whole command
//! - pipelines and `&&`/`||`/`;`/`&` chains are split and every segment must pass
//! - package managers, interpreters, `git`, `sed`, `awk`, `find`, `fd`, `xargs` and `env`
//!   inspect their arguments, and forwarded commands are classified recursively
//! - in strict mode, anything not on the allow-list is write-like

use std::fmt;
use std::path::Path;

const READ_ONLY_COMMANDS: &[&str] = &[
    "ls", "ll", "la", "dir", "cat", "head", "tail", "less", "more", "grep", "egrep", "fgrep",
    "rg", "ag", "ack", "fd", "tree", "pwd", "echo", "printf", "wc", "sort", "uniq", "cut",
    "tr", "diff", "cmp", "comm", "file", "stat", "du", "df", "which", "whereis", "type",
    "whoami", "id", "date", "uname", "hostname", "printenv", "basename", "dirname",
    "realpath", "readlink", "jq", "yq", "column", "nl", "od", "hexdump", "strings", "true",
    "false", "test", "[", "sleep", "ps", "uptime", "free", "lsof", "man", "seq", "expr",
    "md5sum", "sha1sum", "sha256sum", "shasum", "cksum", "tac", "rev", "fold", "paste",
    "join", "look", "locate", "getconf", "tty", "groups", "who", "w", "cal", "history",
    "git", "sed", "gsed", "awk", "gawk", "mawk", "nawk", "find", "xargs", "cd",
];

const WRITE_COMMANDS: &[&str] = &[
    "rm", "rmdir", "mv", "cp", "mkdir", "touch", "chmod", "chown", "chgrp", "ln", "dd",
    "truncate", "shred", "install", "tee", "patch", "unlink", "make", "cmake", "ninja",
    "cargo", "rustc", "rustup", "go", "gcc", "g++", "clang", "javac", "mvn", "gradle", "ant",
    "docker", "podman", "kubectl", "helm", "terraform", "ansible", "sudo", "su", "doas",
    "kill", "killall", "pkill", "reboot", "shutdown", "halt", "poweroff", "systemctl",
    "service", "launchctl", "mount", "umount", "mkfs", "fdisk", "parted", "apt", "apt-get",
    "yum", "dnf", "brew", "pacman", "apk", "snap", "gem", "bundle", "composer", "poetry",
    "pipenv", "pipx", "uv", "conda", "npx", "bunx", "curl", "wget", "scp", "rsync", "ssh",
    "sftp", "ftp", "vim", "vi", "nvim", "nano", "emacs", "ed", "crontab", "useradd",
    "userdel", "usermod", "passwd", "node", "deno", "bun", "ruby", "perl", "php", "bash",
    "sh", "zsh", "fish", "eval", "exec", "source", ".", "tar", "zip", "unzip", "gzip",
    "gunzip", "bzip2", "xz", "7z", "split", "csplit", "mktemp", "git-lfs", "gh",
];

const WRAPPER_COMMANDS: &[&str] = &["time", "nice", "nohup", "timeout", "command"];

const PIP_READ_SUBCOMMANDS: &[&str] = &[
    "list", "show", "search", "freeze", "check", "help", "index", "--version", "-V",
];
const NPM_READ_SUBCOMMANDS: &[&str] = &[
    "list", "ls", "la", "ll", "view", "info", "show", "search", "outdated", "why", "explain",
    "help", "root", "prefix", "--version", "-v",
];
const YARN_READ_SUBCOMMANDS: &[&str] = &["list", "info", "why", "outdated", "help", "--version", "-v"];
const PNPM_READ_SUBCOMMANDS: &[&str] = &[
    "list", "ls", "why", "outdated", "view", "info", "help", "root", "--version", "-v",
];

const GIT_READ_SUBCOMMANDS: &[&str] = &[
    "status", "log", "diff", "show", "blame", "grep", "ls-files", "ls-tree", "ls-remote",
    "rev-parse", "rev-list", "describe", "shortlog", "cat-file", "whatchanged", "name-rev",
    "merge-base", "for-each-ref", "show-ref", "count-objects", "var", "help", "version",
    "check-ignore", "check-attr", "diff-tree", "diff-files", "diff-index", "show-branch",
    "verify-commit", "verify-tag",
];

const GIT_WRITE_SUBCOMMANDS: &[&str] = &[
    "commit", "push", "pull", "fetch", "reset", "checkout", "switch", "restore", "merge",
    "rebase", "cherry-pick", "revert", "add", "rm", "mv", "clean", "init", "clone", "am",
    "apply", "gc", "prune", "filter-branch", "update-ref", "update-index", "notes",
    "bisect", "submodule", "worktree", "stash", "config", "tag", "branch", "remote", "reflog",
];

/// Why a command was classified write-like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReason {
    pub segment: String,
    pub reason: String,
}

impl fmt::Display for WriteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segment.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "`{}`: {}", self.segment, self.reason)
        }
    }
}

fn write_like(segment: &str, reason: impl Into<String>) -> Result<(), WriteReason> {
    Err(WriteReason {
        segment: segment.trim().to_string(),
        reason: reason.into(),
    })
}

pub fn is_read_only(command: &str, strict: bool) -> bool {
    check_command(command, strict).is_ok()
}

/// Classify a full command line, reporting the first segment that is not read-only.
pub fn check_command(command: &str, strict: bool) -> Result<(), WriteReason> {
    check_command_with(command, strict, |_| false)
}

/// Like [`check_command`], but segments whose tokens satisfy `trusted` pass as-is.
/// Redirection and command substitution still veto the whole command.
pub fn check_command_with<F>(command: &str, strict: bool, trusted: F) -> Result<(), WriteReason>
where
    F: Fn(&[String]) -> bool,
{
    let command = command.trim();
    if command.is_empty() {
        return Ok(());
    }
    if has_redirection(command) {
        return write_like("", "redirection can write to any file");
    }
    if command.contains("$(") || command.contains('`') {
        return write_like("", "command substitution cannot be inspected");
    }
    for segment in split_segments(command) {
        if let Ok(tokens) = shell_words::split(&segment)
            && trusted(&tokens)
        {
            continue;
        }
        check_segment(&segment, strict)?;
    }
    Ok(())
}

fn has_redirection(command: &str) -> bool {
    command.contains('>') || command.contains('<')
}

/// Split on `|`, `||`, `&&`, `&`, `;` and newlines outside quotes.
pub(crate) fn split_segments(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == '\\' && q == '"' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '\\' => {
                    current.push(ch);
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '|' | '&' => {
                    if chars.peek() == Some(&ch) {
                        chars.next();
                    }
                    segments.push(std::mem::take(&mut current));
                }
                ';' | '\n' => segments.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }
    segments.push(current);
    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn command_name(token: &str) -> &str {
    Path::new(token)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(token)
}

fn is_env_assignment(token: &str) -> bool {
    match token.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name
                    .chars()
                    .enumerate()
                    .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()))
        }
        None => false,
    }
}

pub(crate) fn check_segment(segment: &str, strict: bool) -> Result<(), WriteReason> {
    let tokens = match shell_words::split(segment) {
        Ok(tokens) => tokens,
        Err(_) => return write_like(segment, "unbalanced quoting"),
    };
    check_tokens(segment, &tokens, strict)
}

fn check_tokens(segment: &str, tokens: &[String], strict: bool) -> Result<(), WriteReason> {
    let start = tokens
        .iter()
        .position(|t| !is_env_assignment(t))
        .unwrap_or(tokens.len());
    let tokens = &tokens[start..];
    let Some(first) = tokens.first() else {
        return Ok(());
    };
    let name = command_name(first);
    let args = &tokens[1..];

    if name == "cd" {
        return Ok(());
    }
    if name == "env" {
        return check_env(segment, args, strict);
    }
    if WRAPPER_COMMANDS.contains(&name) {
        return check_tokens(segment, strip_wrapper(name, args), strict);
    }
    match name {
        "pip" | "pip3" => return check_subcommand(segment, name, args, PIP_READ_SUBCOMMANDS),
        "npm" => return check_subcommand(segment, name, args, NPM_READ_SUBCOMMANDS),
        "yarn" => return check_subcommand(segment, name, args, YARN_READ_SUBCOMMANDS),
        "pnpm" => return check_subcommand(segment, name, args, PNPM_READ_SUBCOMMANDS),
        "python" | "python3" => {
            return match args.first().map(String::as_str) {
                Some("-c" | "-m") => Ok(()),
                _ => write_like(segment, format!("`{name}` may run arbitrary scripts")),
            };
        }
        _ => {}
    }
    if WRITE_COMMANDS.contains(&name) {
        return write_like(segment, format!("`{name}` modifies files or system state"));
    }
    match name {
        "git" => check_git(segment, args),
        "sed" | "gsed" => check_sed(segment, args),
        "awk" | "gawk" | "mawk" | "nawk" => check_awk(segment, args),
        "find" => check_find(segment, args, strict),
        "fd" => check_fd(segment, args, strict),
        "xargs" => check_xargs(segment, args, strict),
        "sort" if args.iter().any(|a| a == "-o" || a.starts_with("--output")) => {
            write_like(segment, "`sort -o` writes its output file")
        }
        "yq" if args.iter().any(|a| a == "-i" || a == "--inplace") => {
            write_like(segment, "`yq -i` edits files in place")
        }
        "rg" if args.iter().any(|a| a == "--pre" || a.starts_with("--pre=")) => {
            write_like(segment, "`rg --pre` runs a preprocessor command")
        }
        "tree" if args.iter().any(|a| a.starts_with("-o")) => {
            write_like(segment, "`tree -o` writes its output file")
        }
        "uniq" if operands(args, &["-f", "-s", "-w"]).len() > 1 => {
            write_like(segment, "`uniq` with two operands writes the second one")
        }
        "date" if args.iter().any(|a| a.starts_with("-s") || a.starts_with("--set")) => {
            write_like(segment, "`date -s` sets the system clock")
        }
        "hostname" if args.iter().any(|a| !a.starts_with('-') || a == "-F" || a.starts_with("--file")) => {
            write_like(segment, "`hostname <name>` sets the host name")
        }
        "history" if args.iter().any(|a| a.starts_with('-')) => {
            write_like(segment, "`history` options rewrite the history file")
        }
        _ if READ_ONLY_COMMANDS.contains(&name) => Ok(()),
        _ if strict => write_like(segment, format!("`{name}` is not a known read-only command")),
        _ => Ok(()),
    }
}

fn strip_wrapper<'a>(name: &str, args: &'a [String]) -> &'a [String] {
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        match name {
            "nice" if arg == "-n" => idx += 1,
            "nice" | "time" | "nohup" | "command" if arg.starts_with('-') => {}
            "timeout" if arg.starts_with('-') => {
                if matches!(arg, "-s" | "-k" | "--signal" | "--kill-after") {
                    idx += 1;
                }
            }
            "timeout" if arg.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
                idx += 1;
                break;
            }
            _ => break,
        }
        idx += 1;
    }
    &args[idx.min(args.len())..]
}

/// `env` runs its trailing command, and `-S` packs a whole command line into one argument.
fn check_env(segment: &str, args: &[String], strict: bool) -> Result<(), WriteReason> {
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        let packed = if matches!(arg, "-S" | "--split-string") {
            idx += 1;
            Some(args.get(idx).map(String::as_str).unwrap_or(""))
        } else if let Some(packed) = arg.strip_prefix("--split-string=") {
            Some(packed)
        } else if !arg.starts_with("--") {
            arg.strip_prefix("-S")
        } else {
            None
        };
        if let Some(packed) = packed {
            let Ok(mut tokens) = shell_words::split(packed) else {
                return write_like(segment, "unbalanced quoting in `env -S`");
            };
            tokens.extend(args[(idx + 1).min(args.len())..].iter().cloned());
            return check_tokens(segment, &tokens, strict);
        }
        if matches!(arg, "-u" | "-C" | "--unset" | "--chdir") {
            idx += 1;
        } else if !arg.starts_with('-') && !is_env_assignment(arg) {
            break;
        }
        idx += 1;
    }
    check_tokens(segment, &args[idx.min(args.len())..], strict)
}

/// Non-option arguments, skipping the values of `value_flags`.
fn operands<'a>(args: &'a [String], value_flags: &[&str]) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if value_flags.contains(&arg.as_str()) {
            iter.next();
        } else if arg == "-" || !arg.starts_with('-') {
            found.push(arg.as_str());
        }
    }
    found
}

fn check_subcommand(
    segment: &str,
    name: &str,
    args: &[String],
    allowed: &[&str],
) -> Result<(), WriteReason> {
    match args.first() {
        Some(sub) if allowed.contains(&sub.as_str()) => Ok(()),
        Some(sub) => write_like(segment, format!("`{name} {sub}` may install or modify packages")),
        None => write_like(segment, format!("`{name}` without a read-only subcommand")),
    }
}

fn check_git(segment: &str, args: &[String]) -> Result<(), WriteReason> {
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        if matches!(arg, "-c" | "--config-env") || arg.starts_with("--config-env=") {
            return write_like(segment, "`git -c` can configure commands for git to run");
        }
        if matches!(arg, "-C" | "--git-dir" | "--work-tree" | "--namespace") {
            idx += 2;
        } else if arg.starts_with('-') {
            if matches!(arg, "--version" | "--help") {
                return Ok(());
            }
            idx += 1;
        } else {
            break;
        }
    }
    let Some(sub) = args.get(idx).map(String::as_str) else {
        return Ok(());
    };
    let rest = &args[idx + 1..];
    let positional = rest.iter().filter(|a| !a.starts_with('-')).count();

    let read_only = match sub {
        s if GIT_READ_SUBCOMMANDS.contains(&s) => true,
        "branch" => {
            positional == 0
                && !rest.iter().any(|a| {
                    matches!(
                        a.as_str(),
                        "-d" | "-D" | "-m" | "-M" | "-c" | "-C" | "-f" | "--delete" | "--move"
                            | "--copy" | "--force" | "--set-upstream-to" | "-u"
                            | "--unset-upstream" | "--edit-description"
                    )
                })
        }
        "tag" => {
            rest.is_empty()
                || rest.iter().any(|a| a == "-l" || a == "--list")
                    && !rest.iter().any(|a| a == "-d" || a == "--delete")
        }
        "remote" => matches!(
            rest.first().map(String::as_str),
            None | Some("-v" | "--verbose" | "show" | "get-url")
        ),
        "stash" => matches!(rest.first().map(String::as_str), Some("list" | "show")),
        "reflog" => matches!(rest.first().map(String::as_str), None | Some("show")),
        "worktree" => matches!(rest.first().map(String::as_str), Some("list")),
        "submodule" => matches!(rest.first().map(String::as_str), None | Some("status")),
        "config" => rest.iter().any(|a| {
            matches!(a.as_str(), "--get" | "--get-all" | "--get-regexp" | "--list" | "-l")
        }),
        _ => false,
    };
    if read_only && rest.iter().any(|a| a == "--output" || a.starts_with("--output=")) {
        write_like(segment, format!("`git {sub} --output` writes a file"))
    } else if read_only
        && sub == "grep"
        && rest
            .iter()
            .any(|a| a.starts_with("-O") || a.starts_with("--open-files-in-pager"))
    {
        write_like(segment, "`git grep -O` runs a pager command")
    } else if read_only {
        Ok(())
    } else if GIT_WRITE_SUBCOMMANDS.contains(&sub) {
        write_like(segment, format!("`git {sub}` changes repository state"))
    } else {
        write_like(segment, format!("`git {sub}` is not a known read-only subcommand"))
    }
}

fn check_sed(segment: &str, args: &[String]) -> Result<(), WriteReason> {
    const SCRIPT_FILE: &str = "`sed -f` loads a script that cannot be inspected";

    let mut scripts: Vec<&str> = Vec::new();
    let mut inputs: Vec<&str> = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        if arg == "--in-place" || arg.starts_with("--in-place=") {
            return write_like(segment, "`sed --in-place` edits files");
        }
        if arg == "--file" || arg.starts_with("--file=") {
            return write_like(segment, SCRIPT_FILE);
        }
        if arg == "--expression" {
            idx += 1;
            scripts.extend(args.get(idx).map(String::as_str));
        } else if let Some(script) = arg.strip_prefix("--expression=") {
            scripts.push(script);
        } else if arg == "--line-length" {
            idx += 1;
        } else if arg.len() > 1 && arg.starts_with('-') {
            if let Some(flags) = arg.strip_prefix('-').filter(|f| !f.starts_with('-')) {
                for (pos, flag) in flags.char_indices() {
                    let rest = &flags[pos + flag.len_utf8()..];
                    match flag {
                        'i' => return write_like(segment, "`sed -i` edits files in place"),
                        'f' => return write_like(segment, SCRIPT_FILE),
                        'e' | 'l' => {
                            let value = if rest.is_empty() {
                                idx += 1;
                                args.get(idx).map(String::as_str)
                            } else {
                                Some(rest)
                            };
                            if flag == 'e' {
                                scripts.extend(value);
                            }
                            break;
                        }
                        _ => {}
                    }
                }
            }
        } else {
            inputs.push(arg);
        }
        idx += 1;
    }
    if scripts.is_empty() {
        scripts.extend(inputs.first().copied());
    }
    match scripts.into_iter().find_map(sed_script_danger) {
        Some(reason) => write_like(segment, reason),
        None => Ok(()),
    }
}

fn sed_script_danger(script: &str) -> Option<&'static str> {
    script.split([';', '\n']).find_map(|cmd| {
        let body = sed_command_body(cmd);
        match body.chars().next() {
            Some('w' | 'W') => Some("sed script writes to a file"),
            Some('e') => Some("sed script executes shell commands"),
            Some('s') => {
                let flags = sed_substitute_flags(body);
                let before_write = flags.split('w').next().unwrap_or("");
                if before_write.contains('e') {
                    Some("sed `s///e` executes shell commands")
                } else if flags.contains('w') {
                    Some("sed script writes to a file")
                } else {
                    None
                }
            }
            _ => None,
        }
    })
}

/// Strip line-number, `$` and `/regex/` addresses in front of a sed command.
fn sed_command_body(cmd: &str) -> &str {
    let mut rest = cmd;
    loop {
        rest = rest.trim_start_matches(|c: char| {
            c.is_ascii_digit() || c.is_whitespace() || matches!(c, '$' | ',' | '!' | '~' | '+' | '{' | '}')
        });
        match rest
            .strip_prefix('/')
            .and_then(|tail| tail.find('/').map(|end| &tail[end + 1..]))
        {
            Some(after) => rest = after,
            None => return rest,
        }
    }
}

/// Flags after the closing delimiter of `s<d>regex<d>replacement<d>`.
fn sed_substitute_flags(body: &str) -> &str {
    let mut chars = body.char_indices().skip(1);
    let Some((_, delim)) = chars.next() else {
        return "";
    };
    let mut seen = 0;
    let mut escaped = false;
    for (pos, ch) in chars {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == delim {
            seen += 1;
            if seen == 2 {
                return &body[pos + ch.len_utf8()..];
            }
        }
    }
    ""
}

fn check_awk(segment: &str, args: &[String]) -> Result<(), WriteReason> {
    for arg in args {
        if arg.starts_with('-') {
            if arg == "-i" || arg == "--inplace" || arg.starts_with("-iinplace") {
                return write_like(segment, "`awk -i inplace` edits files");
            }
            if arg.starts_with("-f") || arg.starts_with("--file") || arg == "-E" || arg == "--exec" {
                return write_like(segment, "`awk -f` loads a program that cannot be inspected");
            }
            if arg.starts_with("-l") || arg.starts_with("--load") {
                return write_like(segment, "`awk -l` loads an extension");
            }
            continue;
        }
        if awk_script_writes(arg) {
            return write_like(segment, "awk script writes output or runs commands");
        }
    }
    Ok(())
}

fn awk_script_writes(script: &str) -> bool {
    let compact: String = script.split_whitespace().collect::<Vec<_>>().join(" ");
    let print_redirect = ["print", "printf"].iter().any(|kw| {
        compact.match_indices(kw).any(|(pos, _)| {
            let tail = &compact[pos + kw.len()..];
            let stmt_end = tail.find([';', '}']).unwrap_or(tail.len());
            tail[..stmt_end].contains('>') || tail[..stmt_end].contains('|')
        })
    });
    print_redirect || compact.contains("system(") || compact.contains("| getline")
}

fn check_find(segment: &str, args: &[String], strict: bool) -> Result<(), WriteReason> {
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        match arg {
            "-delete" | "-fprint" | "-fprint0" | "-fprintf" | "-fls" => {
                return write_like(segment, format!("`find {arg}` modifies files"));
            }
            "-exec" | "-execdir" | "-ok" | "-okdir" => {
                let end = args[idx + 1..]
                    .iter()
                    .position(|a| a == ";" || a == "\\;" || a == "+")
                    .map(|p| idx + 1 + p)
                    .unwrap_or(args.len());
                let target: Vec<String> = args[idx + 1..end]
                    .iter()
                    .filter(|a| a.as_str() != "{}")
                    .cloned()
                    .collect();
                if target.is_empty() {
                    return write_like(segment, format!("`find {arg}` without a command"));
                }
                if let Err(inner) = check_tokens(segment, &target, strict) {
                    return write_like(segment, format!("`find {arg}` runs {}", inner.reason));
                }
                idx = end;
            }
            _ => {}
        }
        idx += 1;
    }
    Ok(())
}

const FD_PLACEHOLDERS: &[&str] = &["{}", "{/}", "{//}", "{.}", "{/.}"];

fn check_fd(segment: &str, args: &[String], strict: bool) -> Result<(), WriteReason> {
    let Some(pos) = args
        .iter()
        .position(|a| matches!(a.as_str(), "-x" | "--exec" | "-X" | "--exec-batch"))
    else {
        return Ok(());
    };
    let flag = args[pos].as_str();
    let end = args[pos + 1..]
        .iter()
        .position(|a| a == ";")
        .map(|p| pos + 1 + p)
        .unwrap_or(args.len());
    let target: Vec<String> = args[pos + 1..end]
        .iter()
        .filter(|a| !FD_PLACEHOLDERS.contains(&a.as_str()))
        .cloned()
        .collect();
    if target.is_empty() {
        return write_like(segment, format!("`fd {flag}` without a command"));
    }
    if let Err(inner) = check_tokens(segment, &target, strict) {
        return write_like(segment, format!("`fd {flag}` runs {}", inner.reason));
    }
    Ok(())
}

fn check_xargs(segment: &str, args: &[String], strict: bool) -> Result<(), WriteReason> {
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        if !arg.starts_with('-') {
            break;
        }
        if matches!(arg, "-n" | "-I" | "-P" | "-L" | "-s" | "-d" | "-E" | "-a") {
            idx += 1;
        }
        idx += 1;
    }
    let forwarded = &args[idx.min(args.len())..];
    if forwarded.is_empty() {
        return Ok(());
    }
    check_tokens(segment, forwarded, strict).map_err(|inner| WriteReason {
        segment: segment.trim().to_string(),
        reason: format!("`xargs` forwards to {}", inner.reason),
    })
}
