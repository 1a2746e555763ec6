use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;

use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    work: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let work = base.join("work");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&work).expect("failed to create work dir");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            work,
            xdg_state,
        }
    }

    fn write_config(&self, contents: &str) {
        fs::write(self.work.join("config.yml"), contents).expect("failed to write config");
    }

    fn history_path(&self) -> PathBuf {
        self.home.join("history.jsonl")
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str], vars: &[(&str, &str)]) -> Output {
    let mut command = Command::new(assert_cmd::cargo::cargo_bin!("ai-feed"));

    command
        .args(args)
        .current_dir(&env.work)
        .env("HOME", &env.home)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env_remove("RUST_LOG")
        .env_remove("GEMINI_API_KEY")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy");
    for (key, value) in vars {
        command.env(key, value);
    }

    command
        .output()
        .unwrap_or_else(|e| panic!("failed to execute ai-feed: {e}"))
}

fn render_args(args: &[&str]) -> String {
    args.iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "ai-feed {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        render_args(args),
        output.status,
        stdout,
        stderr
    );
}

fn assert_failure(args: &[&str], output: &Output) {
    assert!(
        !output.status.success(),
        "ai-feed {} unexpectedly succeeded\nstdout:\n{}",
        render_args(args),
        String::from_utf8_lossy(&output.stdout)
    );
}

/// Serve `body` as an RSS document to `requests` sequential clients.
fn serve_feed(body: &'static str, requests: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");

    thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{}/feed.xml", addr)
}

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com/</link>
    <description>test</description>
    <item>
      <title>Only Article</title>
      <link>https://example.com/only/</link>
      <description>Something worth reading</description>
    </item>
  </channel>
</rss>"#;

const MOCK_CONFIG: &str = r#"
default_profile:
  ai:
    mock:
      enabled: true
      selector_mode: first
      comment: "Nice one."
  system_prompt: sys
  selector_prompt: pick
  comment_prompt_template: "Comment on {{TITLE}}"
cache:
  enabled: true
  file_path: ~/history.jsonl
  max_entries: 10
  retention_days: 30
"#;

#[test]
fn init_writes_config_and_refuses_to_overwrite() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["init"], &[]);
    assert_success(&["init"], &output);
    let written = fs::read_to_string(env.work.join("config.yml")).expect("config not written");
    assert!(written.contains("default_profile:"));

    fs::write(env.work.join("config.yml"), "logging:\n  level: warn\n").unwrap();
    let again = run_bin(&env, &["init"], &[]);
    assert_failure(&["init"], &again);
    assert!(String::from_utf8_lossy(&again.stderr).contains("refusing to overwrite"));
    assert_eq!(
        fs::read_to_string(env.work.join("config.yml")).unwrap(),
        "logging:\n  level: warn\n"
    );
}

#[test]
fn config_check_passes_on_starter_config() {
    let env = CliTestEnv::new();
    assert_success(&["init"], &run_bin(&env, &["init"], &[]));

    let args = ["config", "check", "--verbose"];
    let output = run_bin(&env, &args, &[("GEMINI_API_KEY", "test-key")]);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration OK: no issues found"), "{stdout}");
    assert!(stdout.contains("AI backend:     gemini (gemini-2.5-flash)"));
    assert!(stdout.contains("no output destination is enabled"));
}

#[test]
fn config_check_names_missing_env_var() {
    let env = CliTestEnv::new();
    assert_success(&["init"], &run_bin(&env, &["init"], &[]));

    let args = ["config", "check"];
    let output = run_bin(&env, &args, &[]);
    assert_failure(&args, &output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("GEMINI_API_KEY"));
}

#[test]
fn config_check_without_config_suggests_init() {
    let env = CliTestEnv::new();

    let args = ["config", "check"];
    let output = run_bin(&env, &args, &[]);
    assert_failure(&args, &output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("ai-feed init"));
}

#[test]
fn profile_init_then_check_flags_dummy_values() {
    let env = CliTestEnv::new();
    env.write_config(MOCK_CONFIG);

    let init_args = ["profile", "init", "profile.yml"];
    assert_success(&init_args, &run_bin(&env, &init_args, &[]));
    assert!(env.work.join("profile.yml").exists());

    let again = run_bin(&env, &init_args, &[]);
    assert_failure(&init_args, &again);

    // The starter profile switches the mock off, so Gemini is validated.
    fs::write(
        env.work.join("profile.yml"),
        fs::read_to_string(env.work.join("profile.yml"))
            .unwrap()
            .replace("ai:\n  gemini:", "ai:\n  mock:\n    enabled: false\n  gemini:"),
    )
    .unwrap();

    let check_args = ["profile", "check", "profile.yml"];
    let output = run_bin(&env, &check_args, &[]);
    assert_failure(&check_args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Profile has 2 error(s):"), "{stdout}");
    assert!(stdout.contains("ai.gemini.api_key"));
    assert!(stdout.contains("output.slack_api.api_token"));
    assert!(stdout.contains("[dummy value]"));
    assert!(!stdout.contains("misskey"));
}

#[test]
fn recommend_posts_once_then_reports_nothing_new() {
    let env = CliTestEnv::new();
    env.write_config(MOCK_CONFIG);
    let url = serve_feed(FEED, 2);

    let args = ["recommend", "--url", url.as_str()];
    let first = run_bin(&env, &args, &[]);
    assert_success(&args, &first);
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("Only Article"), "{stdout}");
    assert!(stdout.contains("https://example.com/only/"));
    assert!(stdout.contains("Nice one."));

    let history = fs::read_to_string(env.history_path()).expect("history not written");
    assert_eq!(history.lines().count(), 1);
    assert!(history.contains(r#""url":"https://example.com/only""#));
    assert!(!env.home.join("history.jsonl.lock").exists());

    let second = run_bin(&env, &args, &[]);
    assert_success(&args, &second);
    assert!(String::from_utf8_lossy(&second.stdout).contains("No new articles"));
}

#[test]
fn recommend_reports_held_lock() {
    let env = CliTestEnv::new();
    env.write_config(MOCK_CONFIG);
    fs::write(env.home.join("history.jsonl.lock"), "").unwrap();
    let url = serve_feed(FEED, 1);

    let args = ["recommend", "--url", url.as_str()];
    let output = run_bin(&env, &args, &[]);
    assert_failure(&args, &output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("history.jsonl.lock"));
    assert!(!env.history_path().exists());
}

#[test]
fn recommend_reads_source_file() {
    let env = CliTestEnv::new();
    env.write_config(MOCK_CONFIG);
    let url = serve_feed(FEED, 1);
    fs::write(
        env.work.join("feeds.txt"),
        format!("# my feeds\n\n{}\n", url),
    )
    .unwrap();

    let args = ["recommend", "--source", "feeds.txt"];
    let output = run_bin(&env, &args, &[]);
    assert_success(&args, &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Only Article"));
}
