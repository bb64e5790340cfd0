#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// A running `esteira-server` instance for e2e testing.
///
/// Spawns the server binary on random ports with a temporary data directory.
/// The server is killed when this struct is dropped.
pub struct TestServer {
    child: Option<Child>,
    addr: String,
    metrics_addr: String,
    /// Kept alive for the duration of the test. `None` after
    /// `kill_and_take_data()` transfers ownership for a restart.
    data_dir: Option<tempfile::TempDir>,
}

#[derive(Default)]
struct TestServerOptions {
    visibility_timeout_ms: Option<u64>,
    sweep_interval_ms: Option<u64>,
}

impl TestServer {
    /// Start a new esteira-server instance on random ports.
    pub fn start() -> Self {
        Self::start_with_options(TestServerOptions::default())
    }

    /// Start with a custom visibility timeout and sweep interval.
    pub fn start_with_timeouts(visibility_timeout_ms: u64, sweep_interval_ms: u64) -> Self {
        Self::start_with_options(TestServerOptions {
            visibility_timeout_ms: Some(visibility_timeout_ms),
            sweep_interval_ms: Some(sweep_interval_ms),
        })
    }

    fn start_with_options(opts: TestServerOptions) -> Self {
        let addr = format!("127.0.0.1:{}", free_port());
        let metrics_addr = format!("127.0.0.1:{}", free_port());
        let data_dir = tempfile::tempdir().expect("create temp dir");

        let mut config = format!(
            "[server]\nlisten_addr = \"{addr}\"\nmetrics_addr = \"{metrics_addr}\"\n"
        );
        if let Some(vt) = opts.visibility_timeout_ms {
            config.push_str(&format!("\n[queue]\nvisibility_timeout_ms = {vt}\n"));
        }
        if let Some(sweep) = opts.sweep_interval_ms {
            config.push_str(&format!("\n[sweeper]\ninterval_ms = {sweep}\n"));
        }
        std::fs::write(data_dir.path().join("esteira.toml"), config).expect("write config");

        let child = spawn_server(&data_dir);
        wait_reachable(&addr);

        Self {
            child: Some(child),
            addr,
            metrics_addr,
            data_dir: Some(data_dir),
        }
    }

    /// The broker's host:port address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The metrics endpoint's host:port address.
    pub fn metrics_addr(&self) -> &str {
        &self.metrics_addr
    }

    /// Kill the server with SIGKILL (simulating a crash) and hand back the
    /// data directory for a restart on the same config.
    pub fn kill_and_take_data(mut self) -> (tempfile::TempDir, String, String) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let addr = self.addr.clone();
        let metrics_addr = self.metrics_addr.clone();
        let data_dir = self.data_dir.take().expect("data_dir already taken");
        (data_dir, addr, metrics_addr)
    }

    /// Restart a server on the same data directory; the config file written
    /// at first start (ports included) is reused.
    pub fn restart_on(data_dir: tempfile::TempDir, addr: String, metrics_addr: String) -> Self {
        let child = spawn_server(&data_dir);
        wait_reachable(&addr);

        Self {
            child: Some(child),
            addr,
            metrics_addr,
            data_dir: Some(data_dir),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn spawn_server(data_dir: &tempfile::TempDir) -> Child {
    let binary = server_binary();
    assert!(
        binary.exists(),
        "esteira-server binary not found at {binary:?}. Run `cargo build` first."
    );

    let mut child = Command::new(&binary)
        .env(
            "ESTEIRA_DATA_DIR",
            data_dir.path().join("data").to_str().unwrap(),
        )
        .current_dir(data_dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("start esteira-server");

    // Drain stderr so the process doesn't block on a full pipe.
    let stderr = child.stderr.take().expect("stderr");
    std::thread::spawn(move || {
        for _line in BufReader::new(stderr).lines() {}
    });

    child
}

/// Poll TCP until the server is reachable.
fn wait_reachable(addr: &str) {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    panic!("esteira-server did not become reachable at {addr} within 10s");
}

/// A line-protocol client: one command out, one reply line back.
pub struct BrokerClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl BrokerClient {
    pub fn connect(addr: &str) -> Self {
        let writer = TcpStream::connect(addr).expect("connect to broker");
        writer
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("set read timeout");
        let reader = BufReader::new(writer.try_clone().expect("clone stream"));
        Self { writer, reader }
    }

    /// Send one raw command line and return the reply (newline stripped).
    pub fn send(&mut self, line: &str) -> String {
        writeln!(self.writer, "{line}").expect("write command");
        let mut reply = String::new();
        self.reader.read_line(&mut reply).expect("read reply");
        assert!(!reply.is_empty(), "broker closed the connection");
        reply.trim_end().to_string()
    }

    pub fn produce(&mut self, topic: &str, partition: u32, body: &str) -> String {
        self.send(&format!("PRODUCE {topic} {partition} {body}"))
    }

    pub fn consume(&mut self, topic: &str, partition: u32) -> String {
        self.send(&format!("CONSUME {topic} {partition}"))
    }

    pub fn ack(&mut self, topic: &str, partition: u32, id: &str) -> String {
        self.send(&format!("ACK {topic} {partition} {id}"))
    }

    /// Consume and split the reply into (id, body), panicking on an empty
    /// queue or an error reply.
    pub fn consume_message(&mut self, topic: &str, partition: u32) -> (String, String) {
        let reply = self.consume(topic, partition);
        let (id, body) = reply
            .split_once(' ')
            .unwrap_or_else(|| panic!("expected '<id> <body>', got: {reply}"));
        (id.to_string(), body.to_string())
    }
}

/// Fetch and decode the metrics endpoint with a minimal HTTP/1.0 GET.
pub fn fetch_metrics(metrics_addr: &str) -> serde_json::Value {
    let mut stream = TcpStream::connect(metrics_addr).expect("connect to metrics endpoint");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set read timeout");
    write!(stream, "GET /metrics HTTP/1.0\r\nHost: localhost\r\n\r\n").expect("send request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .expect("read metrics response");
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("");
    serde_json::from_str(body).expect("metrics endpoint returned invalid JSON")
}

/// Find a free TCP port.
fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to free port");
    listener.local_addr().unwrap().port()
}

/// Resolve the path to the esteira-server binary in the workspace target dir.
fn server_binary() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates/
    path.pop(); // workspace root
    path.push("target");
    path.push("debug");
    path.push("esteira-server");
    path
}
