//! HTTP client for the ledger API

use crate::{ClientConfig, ClientError, ClientResult};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::error::{ApiResponse, ErrorCode};
use shared::models::{
    Account, AccountCreate, ActiveRequest, AmountRequest, Currency, TransferRecord,
    TransferRequest, Wallet, WalletCreate,
};
use uuid::Uuid;

/// HTTP client for the wallet/ledger endpoints of an exchange-server
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    base_url: String,
}

impl LedgerClient {
    /// Create a new ledger client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Unwrap the `ApiResponse` envelope
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(Self::api_error(status, &bytes));
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)?;
        if envelope.is_success() {
            return envelope
                .data
                .ok_or_else(|| ClientError::InvalidResponse("missing data".to_string()));
        }

        let code = envelope.code.unwrap_or(ErrorCode::Unknown.code());
        Err(match ErrorCode::try_from(code) {
            Ok(code) => ClientError::Api {
                code,
                message: envelope.message,
            },
            Err(e) => ClientError::InvalidResponse(e.to_string()),
        })
    }

    fn api_error(status: reqwest::StatusCode, body: &[u8]) -> ClientError {
        let envelope = serde_json::from_slice::<ApiResponse<serde_json::Value>>(body).ok();
        let code = envelope
            .as_ref()
            .and_then(|e| e.code)
            .and_then(|c| ErrorCode::try_from(c).ok());

        match (code, envelope) {
            (Some(code), Some(envelope)) => ClientError::Api {
                code,
                message: envelope.message,
            },
            _ => ClientError::InvalidResponse(format!(
                "HTTP {}: {}",
                status,
                String::from_utf8_lossy(body)
            )),
        }
    }

    // ========== Accounts ==========

    pub async fn account(&self, number: &str) -> ClientResult<Account> {
        self.get(&format!("api/accounts/{number}")).await
    }

    /// Open a standalone account (not attached to any wallet)
    pub async fn open_account(&self, currency: &Currency) -> ClientResult<Account> {
        let body = AccountCreate {
            currency: currency.clone(),
        };
        self.post("api/accounts", &body).await
    }

    pub async fn deposit(&self, number: &str, amount: Decimal) -> ClientResult<Account> {
        self.post(
            &format!("api/accounts/{number}/deposit"),
            &AmountRequest { amount },
        )
        .await
    }

    pub async fn withdraw(&self, number: &str, amount: Decimal) -> ClientResult<Account> {
        self.post(
            &format!("api/accounts/{number}/withdraw"),
            &AmountRequest { amount },
        )
        .await
    }

    pub async fn set_active(&self, number: &str, active: bool) -> ClientResult<Account> {
        self.post(
            &format!("api/accounts/{number}/active"),
            &ActiveRequest { active },
        )
        .await
    }

    // ========== Transfers ==========

    /// Submit a transfer. Re-sending the same request id is safe.
    pub async fn transfer(&self, request: &TransferRequest) -> ClientResult<TransferRecord> {
        tracing::debug!(
            transfer_id = %request.id,
            from = %request.from_account,
            to = %request.to_account,
            amount = %request.amount,
            "Remote transfer"
        );
        self.post("api/transfers", request).await
    }

    /// Look up a committed transfer. `None` means the server has no record of it.
    pub async fn transfer_status(&self, id: Uuid) -> ClientResult<Option<TransferRecord>> {
        match self.get(&format!("api/transfers/{id}")).await {
            Ok(record) => Ok(Some(record)),
            Err(ClientError::Api {
                code: ErrorCode::TransferNotFound,
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ========== Wallets ==========

    pub async fn wallet(&self, user_id: i64) -> ClientResult<Wallet> {
        self.get(&format!("api/wallets/{user_id}")).await
    }

    pub async fn create_wallet(
        &self,
        user_id: i64,
        base_currency: Option<Currency>,
    ) -> ClientResult<Wallet> {
        let body = WalletCreate {
            user_id,
            base_currency,
        };
        self.post("api/wallets", &body).await
    }

    pub async fn wallet_accounts(&self, user_id: i64) -> ClientResult<Vec<Account>> {
        self.get(&format!("api/wallets/{user_id}/accounts")).await
    }

    /// Open an account in `currency` inside the user's wallet
    pub async fn create_account(&self, user_id: i64, currency: &Currency) -> ClientResult<Account> {
        let body = AccountCreate {
            currency: currency.clone(),
        };
        self.post(&format!("api/wallets/{user_id}/accounts"), &body)
            .await
    }
}
