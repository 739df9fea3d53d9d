use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

/// Patterns inside a test body that mean it bailed out instead of failing.
const SKIP_PATTERNS: &[&str] = &[
    "Skipping test",
    "skipping test",
    "Test skipped",
    "test skipped",
    "arbiter not available",
    "not connected, skipping",
];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=POWERD_GIT_SHA={}", sha);

    let root = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"));
    let sources = source_files(&root);
    for file in &sources {
        println!("cargo:rerun-if-changed={}", file.path.display());
    }

    let mut violations = Vec::new();
    for file in &sources {
        check_line_limit(file, &mut violations);
        check_dead_code_allows(file, &mut violations);
        check_nested_runtimes(file, &mut violations);
        check_tests(file, &mut violations);
    }

    if !violations.is_empty() {
        eprintln!("\n========================================");
        eprintln!("SOURCE CHECKS FAILED");
        eprintln!("========================================");
        for violation in &violations {
            eprintln!(
                "  {}:{} - {}",
                violation.path.display(),
                violation.line,
                violation.message
            );
        }
        eprintln!("========================================\n");
        eprintln!("Files stay under {} non-empty lines.", MAX_LINES);
        eprintln!("No #[allow(dead_code)]: delete the dead code instead.");
        eprintln!("No threads that build their own tokio runtime: tarpc clients");
        eprintln!("die with the runtime that created them.");
        eprintln!("Tests fail instead of skipping, and tests that touch env vars");
        eprintln!("are marked #[serial].\n");
        panic!("Build failed: {} source check violation(s)", violations.len());
    }
}

struct SourceFile {
    path: PathBuf,
    rel_path: PathBuf,
    content: String,
}

struct Violation {
    path: PathBuf,
    line: usize,
    message: String,
}

impl SourceFile {
    fn violation(&self, line: usize, message: String) -> Violation {
        Violation {
            path: self.rel_path.clone(),
            line,
            message,
        }
    }
}

/// Rust sources under `src/`.
fn source_files(root: &Path) -> Vec<SourceFile> {
    let mut paths = Vec::new();
    walk_directory(&root.join("src"), &mut paths);
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            let rel_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            Some(SourceFile {
                path,
                rel_path,
                content,
            })
        })
        .collect()
}

fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_directory(&path, files);
        } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
            files.push(path);
        }
    }
}

fn check_line_limit(file: &SourceFile, violations: &mut Vec<Violation>) {
    let count = file
        .content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count();
    if count > MAX_LINES {
        violations.push(file.violation(
            1,
            format!("{} lines (exceeds by {})", count, count - MAX_LINES),
        ));
    }
}

fn check_dead_code_allows(file: &SourceFile, violations: &mut Vec<Violation>) {
    for (i, line) in file.content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#") && trimmed.contains("allow") && trimmed.contains("dead_code") {
            violations.push(file.violation(i + 1, "#[allow(dead_code)]".to_string()));
        }
    }
}

fn check_nested_runtimes(file: &SourceFile, violations: &mut Vec<Violation>) {
    let lines: Vec<&str> = file.content.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") || !trimmed.contains("thread::spawn") {
            continue;
        }
        let end = (i + 20).min(lines.len());
        let context = lines[i..end].join("\n");
        if context.contains("Runtime::new()") || context.contains("runtime::Builder") {
            violations.push(file.violation(i + 1, "thread with its own runtime".to_string()));
        }
    }
}

/// Flags tests that skip silently or mutate env vars without `#[serial]`.
fn check_tests(file: &SourceFile, violations: &mut Vec<Violation>) {
    let lines: Vec<&str> = file.content.lines().collect();

    let mut in_test_fn = false;
    let mut test_fn_start = 0;
    let mut test_fn_name = String::new();
    let mut has_serial = false;
    let mut brace_depth = 0i32;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
            has_serial = true;
        }

        if trimmed == "#[test]" || trimmed.starts_with("#[tokio::test") {
            for candidate in lines.iter().skip(i + 1).take(4) {
                if let Some(fn_pos) = candidate.find("fn ") {
                    let after_fn = candidate.get(fn_pos + 3..).unwrap_or("");
                    test_fn_name = after_fn
                        .split('(')
                        .next()
                        .unwrap_or("")
                        .trim()
                        .to_string();
                    test_fn_start = i + 1;
                    in_test_fn = true;
                    brace_depth = 0;
                    break;
                }
            }
        }

        if !in_test_fn {
            continue;
        }

        for c in line.chars() {
            if c == '{' {
                brace_depth += 1;
            } else if c == '}' {
                brace_depth -= 1;
                if brace_depth == 0 {
                    in_test_fn = false;
                    has_serial = false;
                }
            }
        }

        let problem = if SKIP_PATTERNS.iter().any(|p| line.contains(p)) {
            Some("contains a skip message")
        } else if trimmed == "return;" && brace_depth > 1 {
            Some("has a conditional early return")
        } else if !has_serial && !trimmed.starts_with("//") && trimmed.contains("env::") && (trimmed.contains("set_var") || trimmed.contains("remove_var")) {
            Some("mutates env without #[serial]")
        } else {
            None
        };

        if let Some(problem) = problem {
            violations.push(file.violation(
                test_fn_start,
                format!("test `{}` {}", test_fn_name, problem),
            ));
            // One report per test.
            in_test_fn = false;
            has_serial = false;
        }
    }
}
