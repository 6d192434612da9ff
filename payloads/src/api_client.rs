use crate::{CaseId, DependantId, MemberId, ResidenceId, requests, responses};
use reqwest::StatusCode;
use serde::Serialize;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path)).json(body);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.get(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn login(
        &self,
        details: &requests::LoginCredentials,
    ) -> Result<(), ClientError> {
        let response = self.post("login", &details).await?;
        ok_empty(response).await
    }

    /// Check if the user is logged in.
    pub async fn login_check(&self) -> Result<bool, ClientError> {
        let response = self.empty_post("login_check").await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            _ => Err(ClientError::APIError(
                response.status(),
                response.text().await?,
            )),
        }
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.empty_post("logout").await?;
        ok_empty(response).await
    }

    /// Create a portal user (admin only, except for the first user).
    pub async fn create_user(
        &self,
        details: &requests::CreateUser,
    ) -> Result<(), ClientError> {
        let response = self.post("create_user", details).await?;
        ok_empty(response).await
    }

    /// Get the current user's profile information.
    pub async fn user_profile(
        &self,
    ) -> Result<responses::UserProfile, ClientError> {
        let response = self.empty_get("user_profile").await?;
        ok_body(response).await
    }

    pub async fn register_member(
        &self,
        details: &requests::RegisterMember,
    ) -> Result<MemberId, ClientError> {
        let response = self.post("register_member", details).await?;
        ok_body(response).await
    }

    pub async fn get_member(
        &self,
        member_id: &MemberId,
    ) -> Result<responses::Member, ClientError> {
        let response = self.post("get_member", member_id).await?;
        ok_body(response).await
    }

    pub async fn list_members(
        &self,
        details: &requests::ListMembers,
    ) -> Result<Vec<responses::Member>, ClientError> {
        let response = self.post("list_members", details).await?;
        ok_body(response).await
    }

    pub async fn update_member(
        &self,
        details: &requests::UpdateMember,
    ) -> Result<responses::Member, ClientError> {
        let response = self.post("update_member", details).await?;
        ok_body(response).await
    }

    pub async fn create_residence(
        &self,
        details: &requests::CreateResidence,
    ) -> Result<ResidenceId, ClientError> {
        let response = self.post("create_residence", details).await?;
        ok_body(response).await
    }

    pub async fn list_residences(
        &self,
    ) -> Result<Vec<responses::Residence>, ClientError> {
        let response = self.empty_post("list_residences").await?;
        ok_body(response).await
    }

    pub async fn create_dependant(
        &self,
        details: &requests::CreateDependant,
    ) -> Result<DependantId, ClientError> {
        let response = self.post("create_dependant", details).await?;
        ok_body(response).await
    }

    pub async fn list_dependants(
        &self,
        details: &requests::ListDependants,
    ) -> Result<Vec<responses::Dependant>, ClientError> {
        let response = self.post("list_dependants", details).await?;
        ok_body(response).await
    }

    /// Get the ledger-derived wallet balance for a member.
    pub async fn get_wallet_balance(
        &self,
        member_id: &MemberId,
    ) -> Result<responses::WalletBalance, ClientError> {
        let response = self.post("get_wallet_balance", member_id).await?;
        ok_body(response).await
    }

    pub async fn list_member_transactions(
        &self,
        details: &requests::ListMemberTransactions,
    ) -> Result<Vec<responses::Transaction>, ClientError> {
        let response = self.post("list_member_transactions", details).await?;
        ok_body(response).await
    }

    pub async fn get_account_view(
        &self,
        details: &requests::GetAccountView,
    ) -> Result<responses::AccountView, ClientError> {
        let response = self.post("get_account_view", details).await?;
        ok_body(response).await
    }

    pub async fn list_suspense(
        &self,
        details: &requests::ListSuspense,
    ) -> Result<responses::SuspenseView, ClientError> {
        let response = self.post("list_suspense", details).await?;
        ok_body(response).await
    }

    pub async fn create_case(
        &self,
        details: &requests::CreateCase,
    ) -> Result<CaseId, ClientError> {
        let response = self.post("create_case", details).await?;
        ok_body(response).await
    }

    pub async fn get_case(
        &self,
        case_id: &CaseId,
    ) -> Result<responses::Case, ClientError> {
        let response = self.post("get_case", case_id).await?;
        ok_body(response).await
    }

    pub async fn list_cases(
        &self,
        details: &requests::ListCases,
    ) -> Result<Vec<responses::Case>, ClientError> {
        let response = self.post("list_cases", details).await?;
        ok_body(response).await
    }

    pub async fn update_case(
        &self,
        details: &requests::UpdateCase,
    ) -> Result<responses::Case, ClientError> {
        let response = self.post("update_case", details).await?;
        ok_body(response).await
    }

    pub async fn activate_case(
        &self,
        case_id: &CaseId,
    ) -> Result<responses::Case, ClientError> {
        let response = self.post("activate_case", case_id).await?;
        ok_body(response).await
    }

    pub async fn finalize_case(
        &self,
        case_id: &CaseId,
    ) -> Result<responses::Case, ClientError> {
        let response = self.post("finalize_case", case_id).await?;
        ok_body(response).await
    }

    pub async fn delete_case(
        &self,
        case_id: &CaseId,
    ) -> Result<(), ClientError> {
        let response = self.post("delete_case", case_id).await?;
        ok_empty(response).await
    }

    pub async fn collect_fee(
        &self,
        details: &requests::CollectFee,
    ) -> Result<responses::Transaction, ClientError> {
        let response = self.post("collect_fee", details).await?;
        ok_body(response).await
    }

    pub async fn collect_renewal_fees(
        &self,
        details: &requests::CollectRenewalFees,
    ) -> Result<responses::BulkRenewalResult, ClientError> {
        let response = self.post("collect_renewal_fees", details).await?;
        ok_body(response).await
    }

    pub async fn collect_contribution(
        &self,
        details: &requests::CollectContribution,
    ) -> Result<responses::Transaction, ClientError> {
        let response = self.post("collect_contribution", details).await?;
        ok_body(response).await
    }

    pub async fn fund_wallet(
        &self,
        details: &requests::FundWallet,
    ) -> Result<responses::Transaction, ClientError> {
        let response = self.post("fund_wallet", details).await?;
        ok_body(response).await
    }

    pub async fn create_transfer(
        &self,
        details: &requests::CreateTransfer,
    ) -> Result<(), ClientError> {
        let response = self.post("create_transfer", details).await?;
        ok_empty(response).await
    }

    pub async fn resolve_suspense(
        &self,
        details: &requests::ResolveSuspense,
    ) -> Result<(), ClientError> {
        let response = self.post("resolve_suspense", details).await?;
        ok_empty(response).await
    }

    pub async fn get_settings(
        &self,
    ) -> Result<responses::Settings, ClientError> {
        let response = self.empty_post("get_settings").await?;
        ok_body(response).await
    }

    pub async fn update_settings(
        &self,
        details: &requests::UpdateSettings,
    ) -> Result<responses::Settings, ClientError> {
        let response = self.post("update_settings", details).await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
