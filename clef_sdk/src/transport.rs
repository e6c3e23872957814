use std::io;
use std::path::PathBuf;

use reqwest::Client;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{ClefError, Result};
use crate::types::{Endpoint, RpcRequest, RpcResponse};

#[cfg(unix)]
type IpcStream = tokio::net::UnixStream;

#[cfg(windows)]
type IpcStream = tokio::net::windows::named_pipe::NamedPipeClient;

/// Platform default location of the clef IPC endpoint.
pub fn default_ipc_path() -> Result<PathBuf> {
    if cfg!(windows) {
        return Ok(PathBuf::from(r"\\.\pipe\clef.ipc"));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        ClefError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "could not find home directory",
        ))
    })?;

    if cfg!(target_os = "macos") {
        Ok(home.join("Library").join("Signer").join("clef.ipc"))
    } else {
        Ok(home.join(".clef").join("clef.ipc"))
    }
}

pub(crate) enum Transport {
    Http { client: Client, url: String },
    Ipc(Mutex<BufReader<IpcStream>>),
}

impl Transport {
    pub async fn open(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Http(url) => Ok(Transport::Http {
                client: Client::new(),
                url: url.clone(),
            }),
            Endpoint::Ipc(path) => {
                let stream = open_ipc(path).await?;
                Ok(Transport::Ipc(Mutex::new(BufReader::new(stream))))
            }
        }
    }

    pub async fn call(&self, request: &RpcRequest<'_>) -> Result<Value> {
        match self {
            Transport::Http { client, url } => {
                let response: RpcResponse = client
                    .post(url)
                    .json(request)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                response.into_result()
            }
            Transport::Ipc(stream) => {
                let mut frame = serde_json::to_vec(request)?;
                frame.push(b'\n');

                // Held for the full round trip so concurrent calls cannot interleave frames
                let mut stream = stream.lock().await;
                stream.get_mut().write_all(&frame).await?;
                stream.get_mut().flush().await?;

                loop {
                    let mut line = String::new();
                    if stream.read_line(&mut line).await? == 0 {
                        return Err(ClefError::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "signer closed the connection",
                        )));
                    }
                    if line.trim().is_empty() {
                        continue;
                    }

                    let response: RpcResponse = serde_json::from_str(&line)?;
                    if !response.answers(request.id) {
                        tracing::trace!("skipping unrelated signer message");
                        continue;
                    }
                    return response.into_result();
                }
            }
        }
    }
}

#[cfg(unix)]
async fn open_ipc(path: &std::path::Path) -> Result<IpcStream> {
    Ok(tokio::net::UnixStream::connect(path).await?)
}

#[cfg(windows)]
async fn open_ipc(path: &std::path::Path) -> Result<IpcStream> {
    Ok(tokio::net::windows::named_pipe::ClientOptions::new().open(path)?)
}
