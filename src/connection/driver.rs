//! Tokio transport driver.
//!
//! Owns the socket and nothing else. Every decision is made by the
//! [`Session`]; this loop performs the [`LinkAction`]s it emits and feeds
//! back transport events, inbound lines, timer deadlines and Ctrl-C.

use std::future::{Future, pending};
use std::pin::Pin;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use slirc_proto::{LineCodec, ProtocolError};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, info_span, warn};

use super::{DisconnectCause, LinkAction};
use crate::error::LinkError;
use crate::session::Session;

type Link = Framed<TcpStream, LineCodec>;
type Connecting = Pin<Box<dyn Future<Output = Result<Link, LinkError>>>>;

/// Drive `session` until it terminates.
///
/// Returns an error only if the process cannot listen for Ctrl-C; link
/// failures are fed to the reconnect policy instead.
pub async fn run(session: &mut Session) -> Result<(), LinkError> {
    let span = info_span!("link", server = %session.connection().settings().host);
    drive(session).instrument(span).await
}

async fn drive(session: &mut Session) -> Result<(), LinkError> {
    let max_len = session.connection().settings().max_line_len;
    let mut link: Option<Link> = None;
    let mut connecting: Option<Connecting> = None;

    session.start(Instant::now());

    loop {
        for action in session.take_actions() {
            match action {
                LinkAction::Open { host, port } => {
                    link = None;
                    connecting = Some(Box::pin(open(host, port, max_len)));
                }
                LinkAction::Write(line) => {
                    let Some(framed) = link.as_mut() else {
                        debug!(line = %line, "no transport, write skipped");
                        continue;
                    };
                    if let Err(e) = framed.send(line).await {
                        if e.is_recoverable() {
                            warn!(error = %e, "outbound line rejected");
                            continue;
                        }
                        warn!(error = %LinkError::from(e), "write failed");
                        link = None;
                        session.on_disconnect(Instant::now(), DisconnectCause::Error);
                    }
                }
                LinkAction::Close => {
                    link = None;
                    connecting = None;
                }
                LinkAction::Terminate => {
                    info!("session terminated");
                    return Ok(());
                }
            }
        }

        let deadline = session.next_deadline();
        tokio::select! {
            result = wait_connect(&mut connecting) => {
                connecting = None;
                match result {
                    Ok(framed) => {
                        link = Some(framed);
                        session.on_transport_connected(Instant::now());
                    }
                    Err(e) => {
                        warn!(error = %e, "connect failed");
                        session.on_disconnect(Instant::now(), DisconnectCause::Error);
                    }
                }
            }
            result = next_line(&mut link) => match result {
                Some(Ok(line)) => {
                    if let Err(e) = session.on_line(Instant::now(), &line) {
                        debug!(error = %e, "line not applied");
                    }
                }
                Some(Err(e)) if e.is_recoverable() => {
                    warn!(error = %e, "inbound line rejected");
                }
                Some(Err(e)) => {
                    warn!(error = %LinkError::from(e), "read failed");
                    link = None;
                    session.on_disconnect(Instant::now(), DisconnectCause::Error);
                }
                None => {
                    info!("server closed the connection");
                    link = None;
                    session.on_disconnect(Instant::now(), DisconnectCause::Hangup);
                }
            },
            () = wait_until(deadline) => session.on_timers(Instant::now()),
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("interrupt received, shutting down");
                session.shutdown("Shutting down");
            }
        }
    }
}

async fn open(host: String, port: u16, max_len: usize) -> Result<Link, LinkError> {
    let stream = TcpStream::connect((host.as_str(), port)).await?;
    stream.set_nodelay(true)?;
    info!(peer = ?stream.peer_addr().ok(), "transport up");
    Ok(Framed::new(stream, LineCodec::with_max_len(max_len)))
}

async fn wait_connect(connecting: &mut Option<Connecting>) -> Result<Link, LinkError> {
    match connecting {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn next_line(link: &mut Option<Link>) -> Option<Result<String, ProtocolError>> {
    match link {
        Some(framed) => framed.next().await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => pending().await,
    }
}
