use moments_contracts::catalog::{
    MarketingTheme, SellingPoint, ART_STYLES, BACKGROUND_SETTINGS, MARKETING_THEMES,
    SELLING_POINTS,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// One independent uniform draw of theme, style and setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptPick {
    pub theme: &'static MarketingTheme,
    pub style: &'static str,
    pub setting: &'static str,
}

pub fn pick_concept<R: Rng + ?Sized>(rng: &mut R) -> ConceptPick {
    ConceptPick {
        theme: MARKETING_THEMES
            .choose(rng)
            .unwrap_or(&MARKETING_THEMES[0]),
        style: ART_STYLES.choose(rng).copied().unwrap_or(ART_STYLES[0]),
        setting: BACKGROUND_SETTINGS
            .choose(rng)
            .copied()
            .unwrap_or(BACKGROUND_SETTINGS[0]),
    }
}

pub fn pick_selling_point<R: Rng + ?Sized>(rng: &mut R) -> &'static SellingPoint {
    SELLING_POINTS.choose(rng).unwrap_or(&SELLING_POINTS[0])
}

pub fn gemini_image_prompt(pick: &ConceptPick) -> String {
    format!(
        "Create a high-quality educational concept illustration for social media (like Instagram or Xiaohongshu).

CONCEPT: {concept}.
SETTING: {setting}.
ART STYLE: {style}.

CRITICAL INSTRUCTIONS:
- The image must be visually striking, suitable for a marketing poster.
- Ensure text labels (like 'INPUT', 'TIME', 'ENGLISH') are minimal, spelled correctly, and integrated artistically.
- Color palette should be harmonious and aesthetically pleasing (e.g., Morandi colors, bright pastels, or clean high-contrast).
- Composition should leave some breathing room, not too cluttered.",
        concept = pick.theme.prompt,
        setting = pick.setting,
        style = pick.style,
    )
}

pub fn zhipu_image_prompt(pick: &ConceptPick) -> String {
    format!(
        "Create a high-quality educational concept illustration.
Theme: {concept}.
Setting: {setting}.
Style: {style}.
Requirements: Clean composition, suitable for social media marketing, aesthetic, inspiring.",
        concept = pick.theme.prompt,
        setting = pick.setting,
        style = pick.style,
    )
}

pub fn gemini_text_prompt(image_description: &str, selling_point: &str) -> String {
    format!(
        "The attached image is a visual metaphor for English learning: \"{image_description}\".

Write a 3-paragraph marketing post for WeChat Moments (朋友圈).

Structure:
1. Paragraph 1: Interpret the visual metaphor (e.g., urgency of time, the compound effect of persistence). Keep this paragraph VERY CONCISE (approx 40-50 Chinese characters).
2. Paragraph 2: Transition to 51Talk's solution. You MUST seamlessly integrate this specific advantage: \"{selling_point}\".
3. Paragraph 3: A short, punchy summary and a call to action.

FORMATTING RULES:
- You MUST add an emoji at the BEGINNING and at the END of EVERY paragraph.

Tone: Professional, Insightful (educational expert vibe), Encouraging.
Language: Simplified Chinese."
    )
}

pub fn zhipu_text_prompt(image_description: &str, selling_point: &str) -> String {
    format!(
        "你是51Talk的资深朋友圈营销文案专家。请根据以下信息写一条朋友圈文案。

【视觉隐喻/图片描述】: \"{image_description}\"
【必须植入的卖点】: \"{selling_point}\"

要求：
1. 第一段：解读视觉隐喻，引出教育痛点（如时间紧迫性、复利效应等）。(40-50字)
2. 第二段：自然通过逻辑转折，植入51Talk的卖点解决方案。
3. 第三段：精炼总结，仅一句金句加号召。

文风：要有“小红书”或“私域”感，像真人分享，专业且有温度。不要太硬广。
格式：返回JSON数组，包含3个字符串，分别对应三段话。
注意：每段开头和结尾都要带一个emoji。

Output JSON Format: {{ \"paragraphs\": [\"string\", \"string\", \"string\"] }}"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use moments_contracts::catalog::SELLING_POINTS;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn image_prompts_embed_all_three_choices() {
        let mut rng = StdRng::seed_from_u64(7);
        let pick = pick_concept(&mut rng);

        for prompt in [gemini_image_prompt(&pick), zhipu_image_prompt(&pick)] {
            assert!(prompt.contains(pick.theme.prompt));
            assert!(prompt.contains(pick.style));
            assert!(prompt.contains(pick.setting));
        }
    }

    #[test]
    fn text_prompts_embed_selling_point_verbatim() {
        let selling_point = SELLING_POINTS[3].content;
        let gemini = gemini_text_prompt("An iceberg", selling_point);
        let zhipu = zhipu_text_prompt("An iceberg", selling_point);
        assert!(gemini.contains(&format!("\"{selling_point}\"")));
        assert!(zhipu.contains(&format!("\"{selling_point}\"")));
        assert!(gemini.contains("\"An iceberg\""));
        assert!(zhipu.contains("{ \"paragraphs\": [\"string\", \"string\", \"string\"] }"));
    }

    #[test]
    fn concept_draws_cover_every_theme() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = HashMap::new();
        for _ in 0..2_000 {
            let pick = pick_concept(&mut rng);
            *seen.entry(pick.theme.id).or_insert(0) += 1;
        }
        assert_eq!(seen.len(), MARKETING_THEMES.len());
    }

    #[test]
    fn selling_points_are_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<u32, u32> = HashMap::new();
        let draws = 6_000;
        for _ in 0..draws {
            *counts.entry(pick_selling_point(&mut rng).id).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), SELLING_POINTS.len());
        for count in counts.values() {
            let share = *count as f64 / draws as f64;
            assert!((share - 1.0 / 6.0).abs() < 0.03, "share {share}");
        }
    }
}
