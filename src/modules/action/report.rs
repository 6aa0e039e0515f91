use crate::modules::guard::ScrubOutcome;
use crate::modules::perception::sentiment::{self, LinkageRule};

/// 把各固定小节拼成最终推送正文。纯字符串拼接，无 I/O
pub fn build(
    date: &str,
    indices: &[(String, String)],
    events: &[&LinkageRule],
    analysis: &ScrubOutcome,
    news_sections: &[(String, String)],
) -> String {
    let mut out = format!("📅 **{} 财经新闻摘要**\n\n", date);

    out.push_str("## 📈 大盘指数\n");
    for (name, value) in indices {
        out.push_str(&format!("- **{}**: {}\n", name, value));
    }
    out.push('\n');

    out.push_str("## 📊 市场情绪概览\n");
    for (key, value) in sentiment::market_sentiment() {
        out.push_str(&format!("- **{}**: {}\n", key, value));
    }
    out.push('\n');

    out.push_str("## ⏰ 市场时机分析\n");
    for (key, value) in sentiment::timing_analysis() {
        out.push_str(&format!("- **{}**: {}\n", key, value));
    }
    out.push('\n');

    if !events.is_empty() {
        out.push_str("## 🌍 全球市场联动分析\n");
        for event in events {
            out.push_str(&format!("- **{}**\n", event.event));
            out.push_str(&format!("  - 影响逻辑: {}\n", event.logic));
            out.push_str(&format!("  - 影响行业: {}\n", event.industries.join(", ")));
            out.push_str(&format!("  - 国内映射: {}\n\n", event.domestic.join(", ")));
        }
        out.push_str("💡 **联动提示**: 全球事件通过资金流向、情绪传导、供应链影响等方式影响A股市场\n\n");
    }

    out.push_str("✍️ **今日分析总结：**\n");
    out.push_str(&analysis.text);
    out.push_str("\n\n");

    // 有存活推荐才附策略与风险提醒，空推荐不摆架子
    if analysis.kept > 0 {
        out.push_str(strategy_section());
        out.push_str("⚠️ **投资提醒**: 以上推荐基于今日新闻动态生成，仅供参考，投资有风险，入市需谨慎！\n\n");
    }

    out.push_str("---\n\n");
    for (category, content) in news_sections {
        if !content.trim().is_empty() {
            out.push_str(&format!("## {}\n{}\n\n", category, content));
        }
    }

    out
}

fn strategy_section() -> &'static str {
    "## 💡 投资策略建议\n\n\
     ### 📈 建仓策略\n\
     - **分批建仓**: 建议分3-5次逐步建仓，降低单次风险\n\
     - **仓位控制**: 单只股票不超过总仓位的10-15%\n\
     - **时机把握**: 关注回调机会，避免追高\n\n\
     ### 🛡️ 风险控制\n\
     - **止损设置**: 严格执行止损，一般不超过-8%\n\
     - **止盈策略**: 分批止盈，锁定部分利润\n\
     - **分散投资**: 避免过度集中在单一行业\n\n\
     ### 📊 持仓管理\n\
     - **定期检视**: 每周评估持仓表现\n\
     - **动态调整**: 根据市场变化调整仓位\n\
     - **长期思维**: 优质股票可长期持有\n\n"
}
