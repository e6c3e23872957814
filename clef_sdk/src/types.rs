use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClefError, Result};

/// Content type for plain data signing. Clef applies the Ethereum message prefix.
pub const TEXT_PLAIN: &str = "text/plain";

/// Where the external signer listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `http://` or `https://` URL
    Http(String),
    /// Unix domain socket, or a named pipe on windows
    Ipc(PathBuf),
}

impl FromStr for Endpoint {
    type Err = ClefError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ClefError::UnsupportedEndpoint("empty endpoint".into()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(Endpoint::Http(s.trim_end_matches('/').to_string()));
        }
        if s.contains("://") {
            return Err(ClefError::UnsupportedEndpoint(s.to_string()));
        }
        Ok(Endpoint::Ipc(PathBuf::from(s)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Http(url) => f.write_str(url),
            Endpoint::Ipc(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    pub fn answers(&self, id: u64) -> bool {
        self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    pub fn into_result(self) -> Result<Value> {
        if let Some(err) = self.error {
            return Err(ClefError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsing() {
        assert_eq!(
            "http://localhost:8550/".parse::<Endpoint>().unwrap(),
            Endpoint::Http("http://localhost:8550".into())
        );
        assert_eq!(
            "/home/ant/.clef/clef.ipc".parse::<Endpoint>().unwrap(),
            Endpoint::Ipc(PathBuf::from("/home/ant/.clef/clef.ipc"))
        );
        assert!(matches!(
            "ws://localhost:8550".parse::<Endpoint>(),
            Err(ClefError::UnsupportedEndpoint(_))
        ));
        assert!("".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_response_error_maps_to_rpc() {
        let resp: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32000,"message":"Request denied"}}"#,
        )
        .unwrap();
        assert!(resp.answers(3));
        match resp.into_result() {
            Err(ClefError::Rpc { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "Request denied");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
