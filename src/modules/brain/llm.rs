use reqwest::Client;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::env;
use tracing::{info, warn};

use crate::modules::perception::sentiment::LinkageRule;

const SYSTEM_PROMPT: &str = r#"你是一名专业的财经新闻分析师，请根据以下新闻内容和全球市场联动分析，按照以下步骤完成任务：

**分析步骤：**
1. 提取新闻中涉及的主要行业和主题，找出近1天涨幅最高的3个行业或主题，以及近3天涨幅较高且此前2周表现平淡的3个行业/主题。
2. 针对每个热点，输出：
   - 催化剂：分析近期上涨的可能原因（政策、数据、事件、情绪等）
   - 复盘：梳理过去3个月该行业/主题的核心逻辑、关键动态与阶段性走势
   - 展望：判断该热点是短期炒作还是有持续行情潜力

**全球联动分析：**
3. 分析全球事件对国内市场的联动影响：
   - 资金流向影响
   - 情绪传导机制
   - 供应链影响
   - 政策传导效应

**投资建议：**
4. 基于以上分析，在「## 🎯 A股投资机会」小节下给出投资建议，按板块分小节（### 开头），
   每只推荐股票单独一行列表项，格式：
   - **股票代码 股票名称**：推荐理由，建议买入价 ¥XX.XX
   股票代码必须是6位数字；买入价必须贴近当前市场价，避免"等大跌再买"式建议。

5. 将以上分析整合为一篇1500字以内的财经热点摘要，包含：
   - 市场热点分析
   - 全球联动影响
   - 投资建议和风险提示

注意：分析要结合国内外市场联动逻辑，避免无根据的推荐。"#;

/// DeepSeek 摘要器。单次调用（RSS 之外不做重试），
/// 任何失败都降级为确定性的截断摘要，绝不让整次运行失败
pub struct Summarizer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Summarizer {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: env::var("DEEPSEEK_BASE_URL")
                .unwrap_or("https://api.deepseek.com".to_string()),
            model: env::var("DEEPSEEK_MODEL").unwrap_or("deepseek-chat".to_string()),
        }
    }

    pub async fn summarize(&self, corpus: &str, events: &[&LinkageRule]) -> String {
        // 语料太短（源站全挂）时没有分析价值，不浪费一次调用
        if corpus_too_short(corpus) {
            warn!("⚠️ 语料过短 ({} 字符)，跳过 AI 分析", corpus.chars().count());
            return fallback_summary(corpus);
        }

        info!("🧠 [DeepSeek] 正在生成财经摘要 ({} chars)...", corpus.len());
        match self.call_llm(corpus, events).await {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ AI 分析失败: {}，使用降级摘要", e);
                fallback_summary(corpus)
            }
        }
    }

    async fn call_llm(&self, corpus: &str, events: &[&LinkageRule]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let user_prompt = build_user_prompt(corpus, events);

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0.3
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("DeepSeek 请求发送失败")?;

        let status = resp.status();
        if !status.is_success() {
            let err_body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("DeepSeek API 状态异常 {}: {}", status, err_body));
        }

        let json_res: Value = resp.json().await.context("DeepSeek 响应不是合法 JSON")?;
        extract_content(&json_res)
    }
}

fn build_user_prompt(corpus: &str, events: &[&LinkageRule]) -> String {
    let mut prompt = format!("新闻内容：{}", corpus);
    if !events.is_empty() {
        prompt.push_str("\n\n全球联动事件分析：\n");
        for event in events {
            prompt.push_str(&format!(
                "- {}: {} -> 影响{} -> 国内映射{}\n",
                event.event,
                event.logic,
                event.industries.join("、"),
                event.domestic.join("、"),
            ));
        }
    }
    prompt
}

fn extract_content(v: &Value) -> Result<String> {
    v["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .context("DeepSeek 响应缺少 message.content")
}

const MIN_CORPUS_CHARS: usize = 100;

fn corpus_too_short(corpus: &str) -> bool {
    corpus.chars().count() < MIN_CORPUS_CHARS
}

/// AI 不可用时的确定性降级摘要：直接截断语料
pub fn fallback_summary(corpus: &str) -> String {
    let head: String = corpus.chars().take(1000).collect();
    format!(
        "📊 今日财经新闻摘要\n\n由于 AI 分析服务暂时不可用，以下是今日收集的主要财经新闻：\n\n{}...\n\n请关注以上新闻对市场的影响。",
        head
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_content_from_chat_completion() {
        let resp = json!({
            "choices": [{"message": {"role": "assistant", "content": "  今日热点分析…  "}}]
        });
        assert_eq!(extract_content(&resp).unwrap(), "今日热点分析…");
    }

    #[test]
    fn missing_or_empty_content_is_an_error() {
        assert!(extract_content(&json!({"choices": []})).is_err());
        assert!(extract_content(&json!({"error": {"message": "quota"}})).is_err());
        let blank = json!({"choices": [{"message": {"content": "   "}}]});
        assert!(extract_content(&blank).is_err());
    }

    #[test]
    fn fallback_truncates_corpus_by_chars() {
        let corpus = "新闻".repeat(2000);
        let out = fallback_summary(&corpus);
        assert!(out.starts_with("📊 今日财经新闻摘要"));
        assert!(out.contains(&"新闻".repeat(500)));
        // 1000 字符截断，不应包含整段语料
        assert!(!out.contains(&corpus));
    }

    #[test]
    fn empty_corpus_takes_the_short_circuit_path() {
        assert!(corpus_too_short(""));
        assert!(corpus_too_short("短语料"));
        assert!(!corpus_too_short(&"新闻".repeat(100)));
        // 空语料的降级摘要依然是合法正文，整次运行不会失败
        let out = fallback_summary("");
        assert!(out.contains("今日财经新闻摘要"));
    }

    #[test]
    fn user_prompt_injects_linkage_events() {
        let rule = LinkageRule {
            event: "美联储",
            industries: &["银行"],
            logic: "利率政策影响资金成本",
            domestic: &["银行股"],
        };
        let prompt = build_user_prompt("今日新闻正文", &[&rule]);
        assert!(prompt.starts_with("新闻内容：今日新闻正文"));
        assert!(prompt.contains("全球联动事件分析"));
        assert!(prompt.contains("美联储"));

        let bare = build_user_prompt("正文", &[]);
        assert!(!bare.contains("全球联动事件分析"));
    }
}
