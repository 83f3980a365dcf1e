//! Scripted stand-ins for the network and the shell.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use abfs_azure_dfs::provide_credential::StaticCredentialProvider;
use abfs_azure_dfs::{AppendUploader, Config, ObjectKeyFormat, RequestSigner, StorageGateway};
use abfs_core::{CommandExecute, CommandOutput, Context, Error, HttpSend, Result, Signer};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};

/// base64 of `test_storage_access_key`.
pub const ACCOUNT_KEY: &str = "dGVzdF9zdG9yYWdlX2FjY2Vzc19rZXk=";

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    /// `METHOD /path?query`, the shape assertions compare against.
    pub fn line(&self) -> String {
        if self.query.is_empty() {
            format!("{} {}", self.method, self.path)
        } else {
            format!("{} {}?{}", self.method, self.path, self.query)
        }
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<http::Response<Bytes>>>,
    requests: Vec<Recorded>,
}

/// Answers requests from a queue of canned replies and records every request.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHttpSend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply with `status` and an empty body.
    pub fn reply(&self, status: u16) -> &Self {
        self.reply_with(status, &[], "")
    }

    /// Queue a reply with headers and body.
    pub fn reply_with(&self, status: u16, headers: &[(&str, &str)], body: &str) -> &Self {
        let mut builder = http::Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let resp = builder.body(Bytes::from(body.to_string())).unwrap();
        self.script.lock().unwrap().replies.push_back(Ok(resp));
        self
    }

    /// Queue a timed out exchange.
    pub fn time_out(&self) -> &Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .push_back(Err(Error::timeout("request timed out")));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().unwrap().requests.clone()
    }

    /// Request lines in the order they were sent.
    pub fn lines(&self) -> Vec<String> {
        self.requests().iter().map(Recorded::line).collect()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().replies.len()
    }
}

#[async_trait]
impl HttpSend for ScriptedHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let recorded = Recorded {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts.headers.clone(),
            body,
        };

        let mut script = self.script.lock().unwrap();
        let line = recorded.line();
        script.requests.push(recorded);
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(Error::unexpected(format!("no scripted reply for {line}"))))
    }
}

/// Command executor returning one canned output and recording the invocation.
#[derive(Debug, Clone)]
pub struct ScriptedCommand {
    output: CommandOutput,
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl ScriptedCommand {
    pub fn new(status: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            output: CommandOutput {
                status,
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
            },
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecute for ScriptedCommand {
    async fn command_execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|v| v.to_string()).collect(),
        ));
        Ok(self.output.clone())
    }
}

/// Shared key config writing to `/logs/app/blob_<index>.log`.
pub fn config() -> Config {
    Config {
        account_name: Some("account".to_string()),
        account_key: Some(ACCOUNT_KEY.to_string()),
        container: Some("logs".to_string()),
        path: "app/".to_string(),
        object_key_format: "%{path}blob_%{index}.log".to_string(),
        ..Default::default()
    }
}

pub fn context(http: &ScriptedHttpSend) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::new().with_http_send(http.clone())
}

pub fn gateway(http: &ScriptedHttpSend) -> StorageGateway {
    let signer = Signer::new(
        context(http),
        StaticCredentialProvider::new("account", ACCOUNT_KEY),
        RequestSigner::new(),
    );
    StorageGateway::new(signer, "account.dfs.core.windows.net", "logs")
}

pub fn uploader(http: &ScriptedHttpSend, config: &Config) -> AppendUploader {
    AppendUploader::new(
        gateway(http),
        Arc::new(ObjectKeyFormat::from_config(config).unwrap()),
    )
}

/// HMAC-SHA256 signature computed without going through the crate.
pub fn reference_signature(key_b64: &str, string_to_sign: &str) -> String {
    use base64::Engine;
    use hmac::{Hmac, Mac};

    let key = base64::engine::general_purpose::STANDARD
        .decode(key_b64)
        .unwrap();
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(&key).unwrap();
    mac.update(string_to_sign.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
