/// 市场情绪与全球联动的静态口径。
/// 情绪/时机两张表是固定文案（占位数据源），联动表用于
/// 从语料里检出全球事件，喂给 AI 提示词并生成报告小节

pub fn market_sentiment() -> Vec<(&'static str, &'static str)> {
    vec![
        ("上证指数", "📈 上涨趋势"),
        ("深证成指", "📊 震荡整理"),
        ("创业板指", "📈 强势反弹"),
        ("北向资金", "💰 净流入"),
        ("市场情绪", "😊 偏乐观"),
        ("成交量", "📊 温和放量"),
        ("板块轮动", "🔄 科技→消费→新能源"),
        ("资金流向", "💸 主力资金净流入"),
        ("技术形态", "📈 突破关键阻力位"),
    ]
}

pub fn timing_analysis() -> Vec<(&'static str, &'static str)> {
    vec![
        ("整体时机", "🟡 中性偏乐观"),
        ("建仓建议", "分批建仓，控制仓位"),
        ("风险提示", "关注外部风险事件"),
        ("重点关注", "业绩确定性强的龙头股"),
        ("操作策略", "逢低买入，不追高"),
    ]
}

/// 一条全球事件 → 国内行业的联动规则
#[derive(Debug)]
pub struct LinkageRule {
    pub event: &'static str,
    pub industries: &'static [&'static str],
    pub logic: &'static str,
    pub domestic: &'static [&'static str],
}

const LINKAGE_RULES: &[LinkageRule] = &[
    LinkageRule {
        event: "美联储",
        industries: &["银行", "地产", "消费", "科技"],
        logic: "利率政策影响资金成本和投资偏好",
        domestic: &["银行股", "地产股", "消费股", "科技股"],
    },
    LinkageRule {
        event: "美股科技",
        industries: &["科技", "半导体", "新能源"],
        logic: "美股科技股表现影响国内科技板块情绪",
        domestic: &["中概股", "半导体", "新能源车"],
    },
    LinkageRule {
        event: "原油价格",
        industries: &["新能源", "化工", "消费"],
        logic: "油价波动影响新能源替代需求和化工成本",
        domestic: &["新能源车", "光伏", "化工股"],
    },
    LinkageRule {
        event: "欧央行",
        industries: &["银行", "出口", "消费"],
        logic: "欧元区货币政策影响全球贸易和消费",
        domestic: &["银行股", "出口股", "消费股"],
    },
    LinkageRule {
        event: "日央行",
        industries: &["科技", "制造", "消费"],
        logic: "日元政策影响亚洲供应链和消费市场",
        domestic: &["科技股", "制造股", "消费股"],
    },
    LinkageRule {
        event: "黄金",
        industries: &["银行", "消费", "科技"],
        logic: "避险情绪影响资金流向",
        domestic: &["银行股", "消费股", "科技股"],
    },
    LinkageRule {
        event: "铜价",
        industries: &["新能源", "制造", "基建"],
        logic: "铜价反映全球经济和新能源需求",
        domestic: &["新能源", "制造股", "基建股"],
    },
    LinkageRule {
        event: "中美关系",
        industries: &["科技", "半导体", "新能源", "消费"],
        logic: "贸易政策影响供应链和市场需求",
        domestic: &["科技股", "半导体", "新能源", "消费股"],
    },
];

const INDUSTRY_KEYWORDS: &[(&str, &[&str])] = &[
    ("新能源", &["新能源", "光伏", "风电", "储能", "电池", "电动车"]),
    ("半导体", &["芯片", "半导体", "集成电路", "晶圆", "封测"]),
    ("医药", &["医药", "生物", "疫苗", "创新药", "医疗器械"]),
    ("消费", &["消费", "白酒", "食品", "饮料", "零售", "电商"]),
    ("科技", &["科技", "互联网", "软件", "人工智能", "云计算", "5G"]),
    ("银行", &["银行", "金融", "保险", "券商"]),
    ("地产", &["房地产", "地产", "建筑", "建材"]),
    ("化工", &["化工", "化学", "材料"]),
    ("制造", &["制造", "工业", "机械", "装备"]),
    ("军工", &["军工", "国防", "航天", "航空"]),
    ("农业", &["农业", "粮食", "种植", "养殖"]),
    ("基建", &["基建", "工程", "水泥"]),
];

/// 语料里出现事件关键词即算命中
pub fn detect_global_events(corpus: &str) -> Vec<&'static LinkageRule> {
    LINKAGE_RULES
        .iter()
        .filter(|rule| corpus.contains(rule.event))
        .collect()
}

/// 行业关键词命中 + 联动规则波及行业，按出现顺序去重
pub fn extract_industries(corpus: &str, events: &[&'static LinkageRule]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();

    for (industry, keywords) in INDUSTRY_KEYWORDS {
        if keywords.iter().any(|k| corpus.contains(k)) && !out.contains(industry) {
            out.push(industry);
        }
    }
    for rule in events {
        for industry in rule.industries {
            if !out.contains(industry) {
                out.push(industry);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_events_mentioned_in_corpus() {
        let corpus = "今日美联储宣布维持利率不变，原油价格大幅波动。";
        let events = detect_global_events(corpus);
        let names: Vec<&str> = events.iter().map(|e| e.event).collect();
        assert_eq!(names, vec!["美联储", "原油价格"]);
    }

    #[test]
    fn no_events_on_unrelated_corpus() {
        assert!(detect_global_events("今日无大事。").is_empty());
    }

    #[test]
    fn industries_deduplicate_across_keywords_and_linkage() {
        let corpus = "光伏装机量大增，芯片国产化提速，美联储按兵不动。";
        let events = detect_global_events(corpus);
        let industries = extract_industries(corpus, &events);
        // 关键词命中在前，联动波及补在后，不重复
        assert_eq!(industries[0], "新能源");
        assert!(industries.contains(&"半导体"));
        assert!(industries.contains(&"银行"));
        let unique: std::collections::HashSet<_> = industries.iter().collect();
        assert_eq!(unique.len(), industries.len());
    }
}
