//! Static Q&A content: the offline answer table and the chat persona prompt.

/// Quick-entry questions offered to parents.
pub const COMMON_QUESTIONS: [&str; 5] = [
    "要不要提前学小学内容？",
    "孩子不想去小学怎么办？",
    "孩子注意力不集中怎么办？",
    "如何培养时间观念？",
    "需要提前学拼音吗？",
];

/// Keyword → answer. Checked in order; the first key contained in the
/// question wins.
pub const FALLBACK_ANSWERS: [(&str, &str); 5] = [
    (
        "要不要提前学小学内容",
        "不建议系统学习小学内容，但可以通过游戏方式接触：\n\n1. **亲子阅读** - 培养语感和文字认知\n2. **数学游戏** - 通过积木、扑克牌等理解数概念\n3. **生活实践** - 认识时间、钱币等\n\n避免超前学习导致孩子入学后失去新鲜感，产生厌学情绪。",
    ),
    (
        "孩子不想去小学",
        "可以尝试以下方法：\n\n1. **参观小学** - 熟悉校园环境\n2. **读绘本** - 《我上小学了》《小魔怪要上学》\n3. **认识新朋友** - 了解邻居的哥哥姐姐\n4. **正向引导** - 避免用'小学很辛苦'恐吓",
    ),
    (
        "孩子注意力不集中",
        "建议：\n\n1. **时间管理** - 从15分钟开始训练\n2. **环境营造** - 保持安静，关掉电视\n3. **游戏培养** - 拼图、积木、棋类\n4. **一次一件事** - 避免边玩边学",
    ),
    (
        "如何培养时间观念",
        "方法：\n\n1. **可视化计时器** - 沙漏、番茄钟\n2. **固定作息表** - 严格执行\n3. **提前提醒** - 还有5分钟要出发\n4. **参与管理** - 再玩5分钟回家",
    ),
    (
        "需要提前学拼音",
        "不建议系统学习拼音，但可以：\n\n1. **亲子阅读** - 培养语感\n2. **拼音游戏** - 增加熟悉度\n3. **避免超前** - 以免入学后厌学",
    ),
];

/// Returned when no table entry matches.
pub const DEFAULT_ANSWER: &str = "这个问题建议咨询专业教育人士或查看当地教育部门官方指南。";

/// Answer a question from the static table.
pub fn local_answer(question: &str) -> &'static str {
    FALLBACK_ANSWERS
        .iter()
        .find(|(key, _)| question.contains(*key))
        .map(|(_, answer)| *answer)
        .unwrap_or(DEFAULT_ANSWER)
}

const CHAT_SYSTEM_PROMPT: &str = r#"你是"小桥"——幼小衔接规划专家，专为5-6岁儿童家庭和教育工作者服务。

## 你的专长
- 儿童发展评估与分析
- 个性化幼小衔接计划制定
- 入学准备指导
- 教育资源推荐

## 回答原则
1. 温暖、专业、实用
2. 给出具体可操作的建议
3. 根据孩子特点个性化建议
4. 必要时询问更多信息

## 知识库参考
"#;

/// System prompt for Q&A with the retrieved knowledge appended.
pub fn build_chat_system_prompt(knowledge: &str) -> String {
    format!("{CHAT_SYSTEM_PROMPT}{knowledge}")
}
