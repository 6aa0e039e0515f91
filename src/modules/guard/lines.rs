/// 把 markdown 报告解析成带类型的行块，过滤后再序列化回去。
/// 避免直接在原始字符串上做正则拼接（嵌套/交叠匹配太脆）

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: usize, text: String },
    /// 一条推荐：列表首行 + 归属它的缩进续行
    ListItem { lines: Vec<String> },
    Text(String),
}

pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        let indented = line.len() != trimmed.len();

        if trimmed.starts_with('#') {
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            blocks.push(Block::Heading {
                level,
                text: line.to_string(),
            });
        } else if (trimmed.starts_with("- ") || trimmed.starts_with("* ")) && !indented {
            // 顶层列表项开启新块
            blocks.push(Block::ListItem {
                lines: vec![line.to_string()],
            });
        } else if indented && !trimmed.is_empty() {
            // 缩进行（含嵌套列表）归属上一个列表块
            match blocks.last_mut() {
                Some(Block::ListItem { lines }) => lines.push(line.to_string()),
                _ => blocks.push(Block::Text(line.to_string())),
            }
        } else {
            blocks.push(Block::Text(line.to_string()));
        }
    }

    blocks
}

pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for block in blocks {
        match block {
            Block::Heading { text, .. } => out.push(text),
            Block::ListItem { lines } => out.extend(lines.iter().map(|s| s.as_str())),
            Block::Text(text) => out.push(text),
        }
    }
    out.join("\n")
}

/// 清理空小节：标题之后（直到同级或更高级标题）既无列表项
/// 也无正文的，标题本身一并剔除
pub fn drop_empty_headings(blocks: Vec<Block>) -> Vec<Block> {
    let mut keep = vec![true; blocks.len()];

    for (i, block) in blocks.iter().enumerate() {
        let Block::Heading { level, .. } = block else {
            continue;
        };

        let mut has_content = false;
        for candidate in blocks.iter().skip(i + 1) {
            match candidate {
                Block::Heading { level: l, .. } if l <= level => break,
                Block::Heading { .. } => {}
                Block::ListItem { .. } => {
                    has_content = true;
                    break;
                }
                Block::Text(text) => {
                    if !text.trim().is_empty() {
                        has_content = true;
                        break;
                    }
                }
            }
        }
        if !has_content {
            keep[i] = false;
        }
    }

    blocks
        .into_iter()
        .zip(keep)
        .filter_map(|(b, k)| if k { Some(b) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "## 🎯 A股投资机会\n\n### 📈 新能源板块\n- **300750 宁德时代**：动力电池龙头\n  - 推荐理由: 技术领先\n  - 风险等级: 中\n- **002594 比亚迪**：全产业链布局\n\n### 📊 银行板块\n- **600036 招商银行**：零售银行领先\n";

    #[test]
    fn groups_indented_lines_under_list_item() {
        let blocks = parse_blocks(SAMPLE);
        let items: Vec<&Block> = blocks
            .iter()
            .filter(|b| matches!(b, Block::ListItem { .. }))
            .collect();
        assert_eq!(items.len(), 3);
        if let Block::ListItem { lines } = items[0] {
            assert_eq!(lines.len(), 3);
            assert!(lines[0].contains("300750"));
            assert!(lines[2].contains("风险等级"));
        }
    }

    #[test]
    fn heading_levels_are_counted() {
        let blocks = parse_blocks(SAMPLE);
        assert!(matches!(&blocks[0], Block::Heading { level: 2, .. }));
        assert!(matches!(&blocks[2], Block::Heading { level: 3, .. }));
    }

    #[test]
    fn render_round_trips_untouched_text() {
        let blocks = parse_blocks(SAMPLE);
        assert_eq!(render_blocks(&blocks), SAMPLE.trim_end_matches('\n'));
    }

    #[test]
    fn drops_heading_with_no_surviving_items() {
        // 清洗后"空板块"小节下已没有任何列表项
        let text = "## 机会\n### 空板块\n\n### 有货板块\n- 600036 推荐\n";
        let cleaned = drop_empty_headings(parse_blocks(text));
        let out = render_blocks(&cleaned);
        assert!(!out.contains("空板块"));
        assert!(out.contains("有货板块"));
        assert!(out.contains("600036"));
    }

    #[test]
    fn cascade_drops_parent_when_all_children_empty() {
        let text = "## 机会\n### 板块A\n\n### 板块B\n";
        let cleaned = drop_empty_headings(parse_blocks(text));
        let out = render_blocks(&cleaned);
        assert!(!out.contains("板块A"));
        assert!(!out.contains("板块B"));
        assert!(!out.contains("机会"));
    }

    #[test]
    fn keeps_prose_only_sections() {
        let text = "## 市场热点分析\n今日市场整体震荡上行。\n";
        let cleaned = drop_empty_headings(parse_blocks(text));
        assert!(render_blocks(&cleaned).contains("市场热点分析"));
    }
}
