//! Test-only fixture binary: binds every `PORT_<N>` environment variable it
//! finds on `::1` and echoes back whatever it reads. Stands in for "the
//! backing executable" in the end-to-end scenario tests, the way the
//! teacher's own `tests/utils/test_sup.rs` drives a real child binary rather
//! than mocking process spawn.
//!
//! Two optional env knobs the scenario tests use:
//! - `ECHO_DELAY_MS`: sleep this long before binding (S3 backend slow start).
//! - `ECHO_EXIT_IMMEDIATELY=1`: exit right after binding, before serving any
//!   connections (S6 flap suppression under pressure).

use std::env;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Ok(raw) = env::var("ECHO_DELAY_MS") {
        if let Ok(ms) = raw.parse::<u64>() {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    let ports: Vec<u16> = env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix("PORT_")
                .and_then(|_| value.parse::<u16>().ok())
        })
        .collect();

    let mut listeners = Vec::new();
    for port in ports {
        match TcpListener::bind(("::1", port)).await {
            Ok(listener) => listeners.push(listener),
            Err(err) => eprintln!("echo-service: failed to bind port {port}: {err}"),
        }
    }

    if env::var("ECHO_EXIT_IMMEDIATELY").as_deref() == Ok("1") {
        return;
    }

    let mut accepts = Vec::new();
    for listener in listeners {
        accepts.push(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut stream, _)) => {
                        tokio::spawn(async move {
                            let mut buf = [0u8; 4096];
                            loop {
                                match stream.read(&mut buf).await {
                                    Ok(0) | Err(_) => break,
                                    Ok(n) => {
                                        if stream.write_all(&buf[..n]).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                        });
                    }
                    Err(_) => break,
                }
            }
        }));
    }

    for accept in accepts {
        let _ = accept.await;
    }
}
