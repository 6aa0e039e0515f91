use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use url::form_urlencoded;

/// Server酱 微信推送。每个 key 独立投递，单个失败不影响其余
pub struct ServerChanNotifier {
    client: Client,
    keys: Vec<String>,
}

impl ServerChanNotifier {
    pub fn new(client: Client, keys: Vec<String>) -> Self {
        Self { client, keys }
    }

    pub async fn send(&self, title: &str, body: &str) {
        for key in &self.keys {
            let url = format!("https://sctapi.ftqq.com/{}.send", key);
            let form = [("title", title), ("desp", body)];

            match self.client.post(&url).form(&form).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("✅ 推送成功: {}", mask_key(key));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    error!("❌ 推送失败: {}, 状态 {}, 响应：{}", mask_key(key), status, text);
                }
                Err(e) => error!("❌ 推送网络错误: {}: {}", mask_key(key), e),
            }
        }
    }
}

// 日志里不落完整 SendKey
fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(6).collect();
    format!("{}***", head)
}

/// 钉钉群机器人（可选通道）。带加签与关键词兜底
pub struct DingTalkNotifier {
    client: Client,
    webhook_url: String,
    secret: String,
    keyword: String,
}

impl DingTalkNotifier {
    /// 未配置 DINGTALK_WEBHOOK 时返回 None，该通道整体跳过
    pub fn from_env(client: Client) -> Option<Self> {
        let webhook_url = env::var("DINGTALK_WEBHOOK").unwrap_or_default();
        if webhook_url.is_empty() {
            return None;
        }
        Some(Self {
            client,
            webhook_url,
            secret: env::var("DINGTALK_SECRET").unwrap_or_default(),
            keyword: env::var("DINGTALK_KEYWORD").unwrap_or("财经".to_string()),
        })
    }

    fn get_signed_url(&self) -> String {
        if self.secret.is_empty() {
            return self.webhook_url.clone();
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
            .to_string();

        let string_to_sign = format!("{}\n{}", timestamp, self.secret);

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let encoded_val: String = form_urlencoded::byte_serialize(signature.as_bytes()).collect();

        if self.webhook_url.contains('?') {
            format!("{}&timestamp={}&sign={}", self.webhook_url, timestamp, encoded_val)
        } else {
            format!("{}?timestamp={}&sign={}", self.webhook_url, timestamp, encoded_val)
        }
    }

    // 机器人配置了自定义关键词时，缺关键词的消息会被钉钉静默丢弃
    fn attach_keyword(&self, content: &str) -> String {
        if self.keyword.is_empty() || content.contains(&self.keyword) {
            return content.to_string();
        }
        format!("{}\n\n[{}]", content, self.keyword)
    }

    pub async fn send_markdown(&self, title: &str, text: &str) {
        let safe_text = self.attach_keyword(text);
        let body = json!({
            "msgtype": "markdown",
            "markdown": {
                "title": title,
                "text": safe_text
            }
        });

        let url = self.get_signed_url();
        match self.client.post(&url).json(&body).send().await {
            Ok(resp) => match resp.text().await {
                Ok(text) => {
                    if let Ok(json_resp) = serde_json::from_str::<serde_json::Value>(&text) {
                        if json_resp["errcode"].as_i64().unwrap_or(-1) != 0 {
                            error!("❌ DingTalk Error: {}", text);
                        } else {
                            info!("✅ 钉钉推送成功");
                        }
                    }
                }
                Err(e) => error!("❌ Failed to read DingTalk response: {}", e),
            },
            Err(e) => error!("❌ DingTalk Network Error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_key_keeps_prefix_only() {
        assert_eq!(mask_key("SCT123456789"), "SCT123***");
        assert_eq!(mask_key("ab"), "ab***");
    }
}
