use reqwest::Client;
use regex::Regex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::bot_config::{FeedCategory, FetchConfig};
use super::structs::FeedDigest;

const ARTICLE_FALLBACK: &str = "（未能获取文章正文）";

#[derive(Debug, PartialEq)]
struct FeedEntry {
    title: String,
    link: String,
}

/// RSS 采集器：逐源抓取（带有界重试），爬正文进语料，攒分类链接列表。
/// 任何一个源整体失败只会被跳过，不影响其余源
pub struct NewsCollector {
    client: Client,
    feeds: Vec<FeedCategory>,
    cfg: FetchConfig,
}

impl NewsCollector {
    pub fn new(client: Client, feeds: Vec<FeedCategory>, cfg: FetchConfig) -> Self {
        Self { client, feeds, cfg }
    }

    pub async fn collect(&self) -> FeedDigest {
        let mut digest = FeedDigest::default();

        for category in &self.feeds {
            let mut category_md = String::new();

            for source in &category.sources {
                info!("📡 正在获取 {} 的 RSS 源: {}", source.name, source.url);
                let xml = match self.fetch_feed_with_retry(&source.url).await {
                    Some(x) => x,
                    None => {
                        warn!("⚠️ 无法获取 {} 的 RSS 数据", source.name);
                        continue;
                    }
                };

                let entries = parse_entries(&xml, self.cfg.max_entries_per_source);
                if entries.is_empty() {
                    warn!("⚠️ {} 未解析出任何新闻条目", source.name);
                    continue;
                }
                info!("✅ {} RSS 获取成功，共 {} 条新闻", source.name, entries.len());

                let mut links = Vec::new();
                for entry in &entries {
                    if entry.link.is_empty() {
                        warn!("⚠️ {} 的新闻 '{}' 没有链接，跳过", source.name, entry.title);
                        continue;
                    }

                    let body = self.fetch_article_text(&entry.link).await;
                    digest
                        .corpus
                        .push_str(&format!("【{}】\n{}\n\n", entry.title, body));
                    links.push(format!("- [{}]({})", entry.title, entry.link));
                    info!("🔹 {} - {} 获取成功", source.name, entry.title);
                }

                if !links.is_empty() {
                    category_md.push_str(&format!("### {}\n{}\n\n", source.name, links.join("\n")));
                }
            }

            if !category_md.trim().is_empty() {
                digest.sections.push((category.title.clone(), category_md));
            }
        }

        digest
    }

    /// 固定间隔的有界重试，最多 feed_retries 次；全部失败返回 None
    async fn fetch_feed_with_retry(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.cfg.feed_retries {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    if let Ok(text) = resp.text().await {
                        if text.contains("<item") {
                            return Some(text);
                        }
                        warn!("⚠️ 第 {} 次请求 {} 返回内容不含条目", attempt, url);
                    }
                }
                Ok(resp) => warn!("⚠️ 第 {} 次请求 {} 失败: 状态 {}", attempt, url, resp.status()),
                Err(e) => warn!("⚠️ 第 {} 次请求 {} 失败: {}", attempt, url, e),
            }
            if attempt < self.cfg.feed_retries {
                sleep(Duration::from_secs(self.cfg.retry_delay_sec)).await;
            }
        }
        warn!("❌ 跳过 {}, 尝试 {} 次后仍失败。", url, self.cfg.feed_retries);
        None
    }

    /// 爬文章正文并截断，仅供 AI 分析，不进最终报告
    async fn fetch_article_text(&self, url: &str) -> String {
        info!("📰 正在爬取文章内容: {}", url);
        let html = match self.client.get(url).send().await {
            Ok(resp) => resp.text().await.unwrap_or_default(),
            Err(e) => {
                warn!("❌ 文章爬取失败: {}，错误: {}", url, e);
                return ARTICLE_FALLBACK.to_string();
            }
        };

        let text = html_to_text(&html, self.cfg.article_char_cap);
        if text.is_empty() {
            warn!("⚠️ 文章内容为空: {}", url);
            return ARTICLE_FALLBACK.to_string();
        }
        text
    }
}

/// 从 RSS XML 中提取前 limit 条 (title, link)。
/// 按 <item> 切块做定界解析，link 缺失时回退 guid
fn parse_entries(xml: &str, limit: usize) -> Vec<FeedEntry> {
    xml.split("<item")
        .skip(1)
        .take(limit)
        .filter_map(|part| {
            let title = extract_tag(part, "title")?;
            let link = extract_tag(part, "link")
                .or_else(|| extract_tag(part, "guid"))
                .unwrap_or_default();
            Some(FeedEntry { title, link })
        })
        .collect()
}

fn extract_tag(part: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let start = part.find(&open)?;
    let after = &part[start..];
    let gt = after.find('>')?;
    let end = after.find(&close)?;
    if end <= gt {
        return None;
    }
    let raw = &after[gt + 1..end];
    let clean = raw.replace("<![CDATA[", "").replace("]]>", "");
    let clean = unescape(clean.trim());
    if clean.is_empty() { None } else { Some(clean) }
}

fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// HTML → 纯文本：去 script/style，剥标签，压空白，按字符数截断
fn html_to_text(html: &str, char_cap: usize) -> String {
    let script_re = Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap();
    let tag_re = Regex::new(r"(?s)<[^>]+>").unwrap();
    let ws_re = Regex::new(r"\s+").unwrap();

    let stripped = script_re.replace_all(html, " ");
    let stripped = tag_re.replace_all(&stripped, " ");
    let text = unescape(&stripped);
    let text = ws_re.replace_all(text.trim(), " ");

    // 截断必须按字符数，避免切在多字节边界上
    text.chars().take(char_cap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>测试频道</title>
<item>
  <title><![CDATA[央行宣布降准 0.5 个百分点]]></title>
  <link>https://example.com/a1</link>
</item>
<item>
  <title>新能源车销量创新高 &amp; 出口回暖</title>
  <guid>https://example.com/a2</guid>
</item>
<item>
  <title>第三条（超出限制）</title>
  <link>https://example.com/a3</link>
</item>
</channel></rss>"#;

    #[test]
    fn parses_items_with_cdata_and_guid_fallback() {
        let entries = parse_entries(SAMPLE_RSS, 5);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "央行宣布降准 0.5 个百分点");
        assert_eq!(entries[0].link, "https://example.com/a1");
        // link 缺失时回退 guid，实体被还原
        assert_eq!(entries[1].title, "新能源车销量创新高 & 出口回暖");
        assert_eq!(entries[1].link, "https://example.com/a2");
    }

    #[test]
    fn respects_entry_limit() {
        let entries = parse_entries(SAMPLE_RSS, 2);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn entry_without_any_link_yields_empty_link() {
        let xml = "<item><title>无链接新闻</title></item>";
        let entries = parse_entries(xml, 5);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].link.is_empty());
    }

    #[test]
    fn strips_tags_scripts_and_truncates_by_chars() {
        let html = r#"<html><head><style>p{color:red}</style>
<script>var x = "<p>fake</p>";</script></head>
<body><h1>标题</h1><p>第一段正文。</p><p>第二段正文。</p></body></html>"#;
        let text = html_to_text(html, 1500);
        assert!(text.contains("标题"));
        assert!(text.contains("第一段正文。"));
        assert!(!text.contains("color"));
        assert!(!text.contains("var x"));
        assert!(!text.contains('<'));

        let short = html_to_text(html, 4);
        assert_eq!(short.chars().count(), 4);
    }

    #[test]
    fn garbage_html_degrades_to_empty() {
        assert_eq!(html_to_text("", 100), "");
        assert_eq!(html_to_text("<div></div>", 100), "");
    }
}
