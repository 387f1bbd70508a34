//! Test doubles shared by the unit tests
//!
//! - `FakeChain`: a scripted `ChainClient`
//! - `serve_once`: a one-shot HTTP responder on a local port

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::chain::{
    BlockhashInfo, ChainClient, Hash, RpcError, SendOptions, Signature, SignatureStatus,
    SimulationResult, VersionedTransaction,
};

/// Scripted chain: pops one status and one block height per poll
#[derive(Default)]
pub struct FakeChain {
    pub simulation_err: Option<Value>,
    pub statuses: Mutex<Vec<Option<SignatureStatus>>>,
    pub heights: Mutex<Vec<u64>>,
    pub sent: Mutex<Vec<(VersionedTransaction, Option<usize>)>>,
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn latest_blockhash(&self) -> Result<BlockhashInfo, RpcError> {
        Ok(BlockhashInfo {
            blockhash: Hash::new([1; 32]),
            last_valid_block_height: 100,
        })
    }

    async fn minimum_balance_for_rent_exemption(&self, _data_len: u64) -> Result<u64, RpcError> {
        Ok(1_461_600)
    }

    async fn simulate_transaction(
        &self,
        _tx: &VersionedTransaction,
    ) -> Result<SimulationResult, RpcError> {
        Ok(SimulationResult {
            err: self.simulation_err.clone(),
            logs: vec!["Program log: insufficient funds".to_string()],
            units_consumed: Some(1_200),
        })
    }

    async fn send_transaction(
        &self,
        tx: &VersionedTransaction,
        options: &SendOptions,
    ) -> Result<Signature, RpcError> {
        self.sent
            .lock()
            .unwrap()
            .push((tx.clone(), options.max_retries));
        Ok(tx.signatures[0])
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let mut statuses = self.statuses.lock().unwrap();
        Ok(if statuses.is_empty() {
            None
        } else {
            statuses.remove(0)
        })
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        let mut heights = self.heights.lock().unwrap();
        Ok(if heights.len() > 1 {
            heights.remove(0)
        } else {
            heights.first().copied().unwrap_or_default()
        })
    }
}

/// Answer a single HTTP request with `status_line` and `body`, returning
/// the base URL to call
pub async fn serve_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{}", addr)
}

/// Read headers and a `Content-Length` body
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}
