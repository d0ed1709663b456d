//! Deterministic gateway for local runs (`LLM_MODE=fake`). Never touches the network.

use async_trait::async_trait;

use super::{LlmError, LlmGateway, LlmRewrite};

pub const FAKE_REWRITE: &str = "FAKE";

#[derive(Debug, Clone, Default)]
pub struct FakeLlmClient;

#[async_trait]
impl LlmGateway for FakeLlmClient {
    async fn rewrite(&self, _system_prompt: &str, _user_prompt: &str) -> Result<LlmRewrite, LlmError> {
        Ok(LlmRewrite {
            rewrite: FAKE_REWRITE.to_string(),
            jd_insert: vec!["fake".to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_client_returns_fixed_rewrite() {
        let out = FakeLlmClient.rewrite("sys", "user").await.unwrap();
        assert_eq!(out.rewrite, FAKE_REWRITE);
        assert_eq!(out.jd_insert, vec!["fake"]);
    }
}
