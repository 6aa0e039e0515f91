use reqwest::Client;
use std::time::Duration;
use anyhow::Result;

// 部分 RSS 源（道琼斯、百度等）会拒绝默认 UA，统一伪装成桌面浏览器
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// 通用 Client：RSS 抓取 / 文章正文 / 行情 / 推送
    pub fn create() -> Result<Client> {
        let builder = Client::builder()
            .user_agent(BROWSER_UA)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(30)));

        let client = builder.build()?;
        Ok(client)
    }

    /// LLM 专用 Client：DeepSeek 生成 1500 字摘要耗时较长，超时放宽
    /// 强制 HTTP/1.1，避免部分网络下 HTTP/2 断流
    pub fn create_llm() -> Result<Client> {
        let builder = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .http1_only()
            .pool_max_idle_per_host(0);

        let client = builder.build()?;
        Ok(client)
    }
}
