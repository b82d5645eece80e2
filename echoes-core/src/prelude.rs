//! Fixed opening segments shown before scripted or generated content.

use crate::story::{
    Choice, DialogueLine, Emotion, Protagonist, StorySegment, START_GAME_CHOICE_ID,
};

/// Narrator speaker name.
pub const NARRATOR: &str = "旁白";

/// The hand-authored prelude for `protagonist`, in play order.
///
/// The last segment offers the `start_game` choice that hands over to the
/// story-opening generator.
pub fn prelude(protagonist: Protagonist) -> Vec<StorySegment> {
    let city = StorySegment::new(
        "futuristic cyberpunk city Neovera, bright neon lights, glass skyscrapers, \
         holographic sky, anime style, wide angle, no characters",
    )
    .with_id("prelude_city")
    .with_line(
        DialogueLine::new(
            NARRATOR,
            "Neovera，这座建立在旧世界尸骸上的玻璃花园，今夜显得格外刺眼。\
             全息天空为了庆祝联姻，被强制调成了虚假的完美蔚蓝。",
        )
        .with_monologue("公元2147年。这是一个连'自由意志'都可以被标价出售的时代。"),
    )
    .with_choice(Choice::new("next1", "继续"));

    let speaker = protagonist.speaker_name();
    let intro = match protagonist {
        Protagonist::Male => StorySegment::new(
            "Kaelen looking at a mirror, wearing white tuxedo, young man 23 years old, \
             black short hair, visible scar, anime style",
        )
        .with_line(
            DialogueLine::new(
                speaker,
                "我叫凯伦。在那场被称为'绞肉机'的边境战争后，我以为自己已经流干了所有的血。\
                 此刻，我对着镜子整理领结。",
            )
            .with_emotion(Emotion::Determined)
            .with_monologue("颈侧的旧伤疤在隐隐作痛……这是危险逼近的信号。"),
        )
        .with_choice(Choice::new("next2", "检查武器")),
        Protagonist::Female => StorySegment::new(
            "Elara adjusting hair ribbon, wedding dress, gothic detective accessories, \
             golden monocle, silver twin-tails, anime style",
        )
        .with_line(
            DialogueLine::new(
                speaker,
                "我是艾拉拉。在这个充满谎言的城市里，我是唯一的'解题者'。我扶正了单片眼镜。",
            )
            .with_emotion(Emotion::Determined)
            .with_monologue("父亲留下的最后一条线索指向了今天的婚礼。"),
        )
        .with_choice(Choice::new("next2", "激活扫描")),
    }
    .with_id("prelude_intro");

    let wedding = StorySegment::new(
        "Grand futuristic wedding hall, Kaelen and Elara standing opposite, \
         tense atmosphere, anime style",
    )
    .with_id("prelude_wedding")
    .with_line(
        DialogueLine::new(speaker, "大门开启，圣咏声戛然而止。当我对上那一双眼睛时，世界仿佛静止。")
            .with_monologue("就在神父张开双臂的那一刻，头顶的彩绘玻璃发出了悲鸣。"),
    )
    .with_choice(Choice::new(START_GAME_CHOICE_ID, "仪式开始"));

    vec![city, intro, wedding]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_shape() {
        for protagonist in [Protagonist::Male, Protagonist::Female] {
            let segments = prelude(protagonist);
            assert_eq!(segments.len(), 3);
            assert!(segments.iter().all(|s| !s.lines.is_empty() && s.choices.len() == 1));
            assert_eq!(segments[2].choices[0].id, START_GAME_CHOICE_ID);
            assert_eq!(segments[1].lines[0].speaker, protagonist.speaker_name());
        }
    }

    #[test]
    fn test_intro_differs_by_protagonist() {
        let male = prelude(Protagonist::Male);
        let female = prelude(Protagonist::Female);
        assert_eq!(male[0], female[0]);
        assert_ne!(male[1], female[1]);
        assert!(male[1].visual_description.contains("Kaelen"));
    }
}
