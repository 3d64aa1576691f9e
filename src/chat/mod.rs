//! 업스트림 챗 컴플리션 프록시
//!
//! OpenAI 호환 업스트림에 메시지 목록을 전달하고 생성된 텍스트를
//! 돌려줍니다. 호출자 신원 검증은 디렉터리가 먼저 수행하며, 업스트림
//! 자격 증명은 어떤 응답이나 오류에도 싣지 않습니다.

use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// 기본 모델 (도구에 모델이 지정되지 않은 경우)
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// 기본 온도
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// 챗 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

/// 프록시 오류
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("업스트림 API 키가 서버에 설정되지 않았습니다")]
    NotConfigured,

    #[error("업스트림 오류 ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("업스트림 연결 실패: {0}")]
    Network(String),
}

/// 챗 컴플리션 클라이언트
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// 생성 프록시 설정 여부
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// 챗 컴플리션 호출
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::NotConfigured)?;

        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                // reqwest 오류 문자열에는 헤더(자격 증명)가 포함되지 않는다
                error!("업스트림 연결 실패: {}", err);
                ChatError::Network(err.to_string())
            })?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.map_err(|err| {
            error!("업스트림 응답 파싱 실패: {}", err);
            ChatError::Network(err.to_string())
        })?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("업스트림 API 호출에 실패했습니다")
                .to_string();
            warn!("업스트림 오류 응답: {} ({})", status.as_u16(), message);
            return Err(ChatError::Upstream { status: status.as_u16(), message });
        }

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ChatError::Upstream {
                status: status.as_u16(),
                message: "업스트림 응답에 생성 결과가 없습니다".into(),
            })?;

        Ok(content.to_string())
    }
}
