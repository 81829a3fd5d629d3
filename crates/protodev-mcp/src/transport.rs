//! Newline-delimited JSON transport and the server loop
//!
//! One JSON value per line in each direction. Only protocol frames are
//! written to the output stream; logging must go elsewhere (stderr).

use std::future::Future;
use std::io;

use serde_json::Value;
use tokio::io::{
    stdin, stdout, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin,
    Stdout,
};
use tokio::select;

use crate::server::McpServerState;

/// Line-framed JSON transport over any async reader/writer pair
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

/// Transport bound to the process's stdin/stdout
pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(stdin(), stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Read the next non-blank line. Returns Ok(None) on EOF.
    pub async fn read_frame(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes = self.reader.read_until(b'\n', &mut buf).await?;
            if bytes == 0 {
                return Ok(None);
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Write one JSON frame followed by a newline and flush
    pub async fn write_message(&mut self, msg: &Value) -> io::Result<()> {
        let s = serde_json::to_string(msg)?;
        self.writer.write_all(s.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Run the server loop until EOF, a broken pipe, or `shutdown` resolves
///
/// `shutdown` is polled first and is honoured while a request is in flight
/// too; the pending handler is dropped, which kills any subprocess it spawned.
pub async fn run_until<R, W, F>(
    transport: &mut LineTransport<R, W>,
    server: &McpServerState,
    shutdown: F,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let line = select! {
            biased;

            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal, exiting gracefully");
                break;
            }

            frame = transport.read_frame() => match frame {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Client disconnected (EOF)");
                    break;
                }
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    return Err(e);
                }
            },
        };

        let response = select! {
            biased;

            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal, abandoning in-flight request");
                break;
            }

            response = server.handle_line(&line) => response,
        };

        let Some(response) = response else {
            continue;
        };

        match transport.write_message(&response).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::info!("Client disconnected (broken pipe)");
                break;
            }
            Err(e) => {
                tracing::error!("Transport error: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Serve MCP over stdio until EOF or Ctrl-C
pub async fn run_server_loop(mut transport: StdioTransport, server: McpServerState) -> io::Result<()> {
    server.initialize().await.map_err(io::Error::other)?;
    tracing::info!("MCP server initialized, waiting for requests...");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run_until(&mut transport, &server, shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn server() -> McpServerState {
        McpServerState::new(ServerConfig::default())
    }

    fn frames(output: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_skips_blank_lines_and_notifications() {
        let input = b"\n   \n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
        let mut transport = LineTransport::new(&input[..], Vec::new());

        run_until(&mut transport, &server(), std::future::pending())
            .await
            .unwrap();

        let out = frames(&transport.into_writer());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_parse_error_keeps_session_alive() {
        let input = b"{{not valid json}}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n";
        let mut transport = LineTransport::new(&input[..], Vec::new());

        run_until(&mut transport, &server(), std::future::pending())
            .await
            .unwrap();

        let out = frames(&transport.into_writer());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"]["code"], -32700);
        assert!(out[0]["id"].is_null());
        assert_eq!(out[1]["result"]["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let (_client, server_side) = tokio::io::duplex(64);
        let mut transport = LineTransport::new(server_side, Vec::new());

        run_until(&mut transport, &server(), async {}).await.unwrap();
        assert!(transport.into_writer().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_in_flight_call() {
        use std::time::{Duration, Instant};
        use tokio::io::AsyncWriteExt;

        let server = McpServerState::new(ServerConfig {
            interpreter: "sh".to_string(),
            ..ServerConfig::default()
        });
        let (mut client, server_side) = tokio::io::duplex(1024);
        client
            .write_all(
                b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"run_script\",\"arguments\":{\"code\":\"sleep 6\"}}}\n",
            )
            .await
            .unwrap();
        let mut transport = LineTransport::new(server_side, Vec::new());

        let started = Instant::now();
        run_until(
            &mut transport,
            &server,
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await
        .unwrap();

        assert!(
            started.elapsed() < Duration::from_secs(3),
            "loop kept waiting on the script for {:?}",
            started.elapsed()
        );
        assert!(transport.into_writer().is_empty());
        drop(client);
    }
}
