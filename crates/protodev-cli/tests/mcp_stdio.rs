use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn spawn_server(projects: &Path, workspace: &Path) -> std::io::Result<Child> {
    Command::new(env!("CARGO_BIN_EXE_protodev"))
        .arg("mcp")
        .arg("--projects-dir")
        .arg(projects)
        .arg("--workspace-dir")
        .arg(workspace)
        .arg("--interpreter")
        .arg("sh")
        .env("RUST_LOG", "info")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Kills the server on drop so a failed assertion never leaves it running.
struct ProcessGuard(Option<Child>);

impl ProcessGuard {
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    fn child_mut(&mut self) -> &mut Child {
        self.0.as_mut().expect("child taken")
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Some(mut c) = self.0.take() {
            let _ = c.kill();
            let _ = c.wait();
        }
    }
}

/// Client side of a stdio session
struct Session {
    guard: ProcessGuard,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    fn start(projects: &Path, workspace: &Path) -> Self {
        let mut child = spawn_server(projects, workspace).expect("Failed to spawn server");
        let stdout = BufReader::new(child.stdout.take().expect("stdout should be piped"));
        Self {
            guard: ProcessGuard::new(child),
            stdout,
        }
    }

    fn send_raw(&mut self, line: &str) {
        let stdin = self
            .guard
            .child_mut()
            .stdin
            .as_mut()
            .expect("child process should have stdin piped");
        writeln!(stdin, "{}", line).expect("write request");
        stdin.flush().expect("flush request");
    }

    fn read_response(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read response");
        serde_json::from_str(&line).expect("stdout should carry only JSON frames")
    }

    fn request(&mut self, request: Value) -> Value {
        self.send_raw(&request.to_string());
        self.read_response()
    }

    /// Wait for the server to exit on its own, returning its stderr
    fn wait_for_exit(&mut self, limit: Duration) -> (std::process::ExitStatus, String) {
        let server = self.guard.child_mut();
        let start = Instant::now();
        let status = loop {
            match server.try_wait().expect("Failed to check server status") {
                Some(status) => break status,
                None => {
                    if start.elapsed() > limit {
                        panic!("Server did not exit within {:?}", limit);
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        };

        let mut stderr = String::new();
        if let Some(mut err) = server.stderr.take() {
            err.read_to_string(&mut stderr).ok();
        }
        (status, stderr)
    }

    /// Close stdin and wait for the server to exit, returning its stderr
    fn finish(mut self) -> (std::process::ExitStatus, String) {
        drop(self.guard.child_mut().stdin.take());
        self.wait_for_exit(Duration::from_secs(5))
    }

    /// Deliver SIGINT as a terminal Ctrl-C would
    #[cfg(unix)]
    fn interrupt(&mut self) {
        let pid = self.guard.child_mut().id().to_string();
        let status = Command::new("kill")
            .args(["-INT", &pid])
            .status()
            .expect("run kill");
        assert!(status.success(), "kill -INT {} failed", pid);
    }
}

#[test]
fn test_stdio_session_round_trip() {
    let projects = TempDir::new().unwrap();
    std::fs::create_dir(projects.path().join("alpha")).unwrap();
    let mut session = Session::start(projects.path(), projects.path());

    let response = session.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {}
    }));
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["serverInfo"]["name"], "protodev");

    session.send_raw(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);

    let response = session.request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
    assert_eq!(response["id"], 2, "notification must not produce a frame");
    assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 4);

    let response = session.request(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": { "name": "list_projects", "arguments": {} }
    }));
    assert_eq!(
        response["result"]["content"][0]["text"],
        "Projects:\n  - alpha"
    );

    let (status, stderr) = session.finish();
    assert!(status.success(), "server should exit cleanly on EOF");
    assert!(stderr.contains("MCP server initialized"));
    assert!(stderr.contains("Client disconnected (EOF)"));
}

#[test]
fn test_stdio_errors_keep_session_alive() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::start(dir.path(), dir.path());

    session.send_raw("this is not json");
    let response = session.read_response();
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());

    let response = session.request(json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "nonexistent_tool", "arguments": {} }
    }));
    assert_eq!(response["error"]["code"], -32601);

    let response = session.request(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": { "name": "run_script", "arguments": {} }
    }));
    assert_eq!(response["error"]["code"], -32602);

    let response = session.request(json!({"jsonrpc": "2.0", "id": 4, "method": "ping"}));
    assert_eq!(response["id"], 4);

    let (status, _) = session.finish();
    assert!(status.success());
}

#[cfg(unix)]
#[test]
fn test_sigint_exits_with_stdin_open() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::start(dir.path(), dir.path());

    // A reply proves the loop is running and the signal handler is installed.
    let response = session.request(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
    assert_eq!(response["id"], 1);

    session.interrupt();
    let (status, stderr) = session.wait_for_exit(Duration::from_secs(5));
    assert!(status.success(), "server should exit cleanly on Ctrl-C");
    assert!(stderr.contains("Shutdown complete"));
}

#[cfg(unix)]
#[test]
fn test_sigint_abandons_running_tool() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::start(dir.path(), dir.path());

    let response = session.request(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
    assert_eq!(response["id"], 1);

    session.send_raw(
        &json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": "run_script", "arguments": { "code": "sleep 30" } }
        })
        .to_string(),
    );
    std::thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    session.interrupt();
    let (status, _) = session.wait_for_exit(Duration::from_secs(5));
    assert!(status.success());
    assert!(started.elapsed() < Duration::from_secs(5));
}
