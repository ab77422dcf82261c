use crate::dtos::admin_dto::{MediaDeleteResponse, MediaUploadResponse};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tracing::{error, info};
use utils::{AppConfig, AppError, AppResult};

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_FOLDER: &str = "rewards";

pub type DynMediaStorage = Arc<dyn MediaStorageTrait + Send + Sync>;

#[async_trait]
pub trait MediaStorageTrait {
    async fn upload(&self, data_uri: &str, folder: Option<&str>) -> AppResult<MediaUploadResponse>;

    async fn destroy(&self, public_id: &str) -> AppResult<MediaDeleteResponse>;
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResult {
    result: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

/// Cloudinary 签名上传客户端
#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(
            CLOUDINARY_API_BASE,
            &config.cloudinary_cloud_name,
            &config.cloudinary_api_key,
            &config.cloudinary_api_secret,
        )
    }

    pub fn with_base_url(base_url: &str, cloud_name: &str, api_key: &str, api_secret: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    /// 按Cloudinary规则签名：参数按名称排序拼接成 `k=v&k=v`，末尾追加secret后取SHA-256
    pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// 在已签名参数之外补上 api_key、signature
    fn signed_form(&self, params: BTreeMap<&'static str, String>) -> Vec<(&'static str, String)> {
        let signature = Self::sign(&params, &self.api_secret);

        let mut form: Vec<(&'static str, String)> = params.into_iter().collect();
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));
        form
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(&self, url: &str, form: &[(&str, String)]) -> AppResult<T> {
        let response = self.client.post(url).form(form).send().await.map_err(|e| {
            error!("❌ Cloudinary请求失败: {}", e);
            AppError::BadGateway(format!("Media service unreachable: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CloudinaryErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            error!("❌ Cloudinary返回错误 ({}): {}", status, message);
            return Err(AppError::BadGateway(format!("Media service error ({}): {}", status, message)));
        }

        response.json::<T>().await.map_err(|e| {
            error!("❌ 解析Cloudinary响应失败: {}", e);
            AppError::BadGateway(format!("Invalid media service response: {}", e))
        })
    }
}

#[async_trait]
impl MediaStorageTrait for CloudinaryClient {
    async fn upload(&self, data_uri: &str, folder: Option<&str>) -> AppResult<MediaUploadResponse> {
        let folder = folder.unwrap_or(DEFAULT_FOLDER);
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let mut form = self.signed_form(params);
        form.push(("file", data_uri.to_string()));

        let result: UploadResult = self.post_form(&self.endpoint("upload"), &form).await?;
        info!("🖼️ 媒体文件已上传: {}", result.public_id);

        Ok(MediaUploadResponse {
            public_id: result.public_id,
            secure_url: result.secure_url,
        })
    }

    async fn destroy(&self, public_id: &str) -> AppResult<MediaDeleteResponse> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let form = self.signed_form(params);
        let result: DestroyResult = self.post_form(&self.endpoint("destroy"), &form).await?;
        info!("🗑️ 媒体文件删除: {} -> {}", public_id, result.result);

        Ok(MediaDeleteResponse {
            public_id: public_id.to_string(),
            result: result.result,
        })
    }
}
