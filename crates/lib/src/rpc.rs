//! HTTP gateway implementation of [`ChainClient`].
//!
//! The engine talks to a node-side gateway that owns transport, ABI
//! encoding and signing, exposing three JSON endpoints: `POST /deploy`,
//! `POST /call` and `POST /send`. The gateway holds the signing key; this
//! client only carries the account address so the reconciler can compare it
//! against contract owners.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifact::Abi;
use crate::chain::{ChainClient, ChainError, Deployment};
use crate::value::{Address, TxnRef, Value};

#[derive(Debug, Serialize)]
struct DeployRequest<'a> {
  source: &'a str,
  abi: &'a Abi,
  bytecode: &'a str,
  args: &'a [Value],
  from: &'a Address,
}

#[derive(Debug, Deserialize)]
struct DeployResponse {
  address: Address,
  txn: String,
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
  address: &'a Address,
  abi: &'a Abi,
  method: &'a str,
  args: &'a [Value],
  from: &'a Address,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
  result: Value,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
  txn: String,
}

/// A [`ChainClient`] backed by an HTTP node gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
  http: reqwest::Client,
  base_url: String,
  account: Address,
}

impl GatewayClient {
  pub fn new(base_url: impl Into<String>, account: Address) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Self {
      http: reqwest::Client::new(),
      base_url,
      account,
    }
  }

  fn endpoint(&self, name: &str) -> String {
    format!("{}/{}", self.base_url, name)
  }

  async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
    &self,
    name: &str,
    request: &Req,
  ) -> Result<Resp, ChainError> {
    let url = self.endpoint(name);
    debug!(url = %url, "gateway request");

    let response = self
      .http
      .post(&url)
      .json(request)
      .send()
      .await
      .map_err(|e| ChainError::Gateway(e.to_string()))?;

    let response = response
      .error_for_status()
      .map_err(|e| ChainError::Gateway(e.to_string()))?;

    response.json().await.map_err(|e| ChainError::Gateway(e.to_string()))
  }
}

impl ChainClient for GatewayClient {
  async fn deploy(&self, source: &str, abi: &Abi, bytecode: &str, args: &[Value]) -> Result<Deployment, ChainError> {
    let request = DeployRequest {
      source,
      abi,
      bytecode,
      args,
      from: &self.account,
    };

    let response: DeployResponse = self.post("deploy", &request).await.map_err(|e| match e {
      ChainError::Gateway(message) => ChainError::DeployFailed {
        source_id: source.to_string(),
        message,
      },
      other => other,
    })?;

    Ok(Deployment {
      address: response.address,
      txn: TxnRef(response.txn),
    })
  }

  async fn call(&self, address: &Address, abi: &Abi, method: &str, args: &[Value]) -> Result<Value, ChainError> {
    let request = InvokeRequest {
      address,
      abi,
      method,
      args,
      from: &self.account,
    };

    let response: CallResponse = self.post("call", &request).await.map_err(|e| match e {
      ChainError::Gateway(message) => ChainError::CallFailed {
        address: address.clone(),
        method: method.to_string(),
        message,
      },
      other => other,
    })?;

    Ok(response.result)
  }

  async fn send(&self, address: &Address, abi: &Abi, method: &str, args: &[Value]) -> Result<TxnRef, ChainError> {
    let request = InvokeRequest {
      address,
      abi,
      method,
      args,
      from: &self.account,
    };

    let response: SendResponse = self.post("send", &request).await.map_err(|e| match e {
      ChainError::Gateway(message) => ChainError::SendFailed {
        address: address.clone(),
        method: method.to_string(),
        message,
      },
      other => other,
    })?;

    Ok(TxnRef(response.txn))
  }

  fn account(&self) -> &Address {
    &self.account
  }
}
