use cem_lsp::server::Backend;
use futures::{Sink, Stream, StreamExt};
use std::collections::VecDeque;
use std::env;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tower_lsp_server::{LspService, Server};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_TCP_PORT: u16 = 8080;
const DEFAULT_WEBSOCKET_PORT: u16 = 8081;

enum Transport {
    Stdio,
    Tcp(u16),
    WebSocket(u16),
}

fn print_help() {
    eprintln!("cem-lsp {VERSION} - Language Server for Custom Elements Manifests");
    eprintln!();
    eprintln!("Usage: cem-lsp [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --stdio              Use stdio transport (default)");
    eprintln!("  --tcp [PORT]         Serve over TCP (default port {DEFAULT_TCP_PORT})");
    eprintln!("  --websocket [PORT]   Serve over WebSocket (default port {DEFAULT_WEBSOCKET_PORT})");
    eprintln!("  --version            Print version information");
    eprintln!("  --help               Print this help message");
}

fn parse_transport(args: &[String]) -> Result<Transport, String> {
    let mut transport = Transport::Stdio;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-V" => {
                println!("cem-lsp {VERSION}");
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--stdio" => transport = Transport::Stdio,
            "--tcp" => {
                let port = args
                    .get(i + 1)
                    .and_then(|a| a.parse::<u16>().ok())
                    .inspect(|_| i += 1)
                    .unwrap_or(DEFAULT_TCP_PORT);
                transport = Transport::Tcp(port);
            }
            "--websocket" => {
                let port = args
                    .get(i + 1)
                    .and_then(|a| a.parse::<u16>().ok())
                    .inspect(|_| i += 1)
                    .unwrap_or(DEFAULT_WEBSOCKET_PORT);
                transport = Transport::WebSocket(port);
            }
            other => return Err(format!("Unknown option: {other}")),
        }
        i += 1;
    }
    Ok(transport)
}

/// Adapts a `tokio-tungstenite` websocket connection's `Message` stream/sink
/// to `futures::io::{AsyncRead, AsyncWrite}`, so it can be bridged into
/// `tokio`'s traits with `tokio_util::compat` and fed to the same
/// `Server::new` used for stdio and TCP.
struct WsByteStream {
    read: futures::stream::SplitStream<WebSocketStream<tokio::net::TcpStream>>,
    write: futures::stream::SplitSink<WebSocketStream<tokio::net::TcpStream>, Message>,
    pending: VecDeque<u8>,
}

impl futures::io::AsyncRead for WsByteStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<std::io::Result<usize>> {
        loop {
            if !self.pending.is_empty() {
                let n = buf.len().min(self.pending.len());
                for (dst, src) in buf[..n].iter_mut().zip(self.pending.drain(..n)) {
                    *dst = src;
                }
                return Poll::Ready(Ok(n));
            }
            match Pin::new(&mut self.read).poll_next(cx) {
                Poll::Ready(Some(Ok(Message::Text(text)))) => self.pending.extend(text.into_bytes()),
                Poll::Ready(Some(Ok(Message::Binary(data)))) => self.pending.extend(data),
                Poll::Ready(Some(Ok(Message::Close(_)))) | Poll::Ready(None) => return Poll::Ready(Ok(0)),
                Poll::Ready(Some(Ok(_))) => {}
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::Other, e))),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl futures::io::AsyncWrite for WsByteStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match Pin::new(&mut self.write).poll_ready(cx) {
            Poll::Ready(Ok(())) => match Pin::new(&mut self.write).start_send(Message::Binary(buf.to_vec())) {
                Ok(()) => Poll::Ready(Ok(buf.len())),
                Err(e) => Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::Other, e))),
            },
            Poll::Ready(Err(e)) => Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::Other, e))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.write)
            .poll_flush(cx)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.write)
            .poll_close(cx)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

async fn serve_stdio() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

async fn serve_tcp(port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(port, "cem-lsp listening on TCP, awaiting a single connection");
    let (stream, peer) = listener.accept().await?;
    tracing::info!(%peer, "accepted TCP connection");

    let (read, write) = tokio::io::split(stream);
    let (service, socket) = LspService::new(Backend::new);
    Server::new(read, write, socket).serve(service).await;
    Ok(())
}

async fn serve_websocket(port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(port, "cem-lsp listening for WebSocket, awaiting a single connection");
    let (stream, peer) = listener.accept().await?;
    tracing::info!(%peer, "accepted TCP connection for WebSocket upgrade");

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let (write, read) = ws_stream.split();
    let io = WsByteStream {
        read,
        write,
        pending: VecDeque::new(),
    }
    .compat();

    let (read_half, write_half) = tokio::io::split(io);
    let (service, socket) = LspService::new(Backend::new);
    Server::new(read_half, write_half, socket).serve(service).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let transport = match parse_transport(&args) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Run 'cem-lsp --help' for usage information.");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting cem-lsp v{VERSION}");

    let result = match transport {
        Transport::Stdio => {
            serve_stdio().await;
            Ok(())
        }
        Transport::Tcp(port) => serve_tcp(port).await,
        Transport::WebSocket(port) => serve_websocket(port).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "cem-lsp transport failed");
        std::process::exit(1);
    }
}
