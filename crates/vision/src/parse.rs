//! Extracts the structured fields out of a model reply that follows the
//! labelled-line format requested by [`crate::ANALYSIS_SYSTEM_PROMPT`].
//! Lines without a known label are ignored, so a chatty model degrades to
//! an unstructured record instead of a failure.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnalysis {
    pub objects_detected: Vec<String>,
    pub text_found: String,
    pub emotions: Vec<String>,
    pub scene_description: String,
    pub confidence: String,
}

const NONE_DETECTED: &str = "none detected";

fn is_none_marker(value: &str) -> bool {
    value.eq_ignore_ascii_case(NONE_DETECTED) || value.eq_ignore_ascii_case("none")
}

fn split_list(value: &str) -> Vec<String> {
    if is_none_marker(value) {
        return Vec::new();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty() && !is_none_marker(item))
        .map(str::to_owned)
        .collect()
}

pub fn parse_vision_reply(reply: &str) -> ParsedAnalysis {
    let mut parsed = ParsedAnalysis::default();
    for line in reply.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("OBJECTS:") {
            parsed.objects_detected = split_list(value.trim());
        } else if let Some(value) = line.strip_prefix("TEXT:") {
            // Stored verbatim, "None detected" included; readers decide
            // whether that counts as text.
            parsed.text_found = value.trim().to_owned();
        } else if let Some(value) = line.strip_prefix("EMOTIONS:") {
            parsed.emotions = split_list(value.trim());
        } else if let Some(value) = line.strip_prefix("SCENE:") {
            parsed.scene_description = value.trim().to_owned();
        } else if let Some(value) = line.strip_prefix("CONFIDENCE:") {
            parsed.confidence = value.trim().to_owned();
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPLY: &str = "DESCRIPTION: A golden retriever running on a beach at sunset.\n\
OBJECTS: dog, sand, ocean, sky\n\
TEXT: None detected\n\
EMOTIONS: joy, excitement\n\
SCENE: Outdoor beach scene during golden hour\n\
CONFIDENCE: High";

    #[test]
    fn parses_every_labelled_field() {
        let parsed = parse_vision_reply(FULL_REPLY);
        assert_eq!(parsed.objects_detected, vec!["dog", "sand", "ocean", "sky"]);
        assert_eq!(parsed.text_found, "None detected");
        assert_eq!(parsed.emotions, vec!["joy", "excitement"]);
        assert_eq!(
            parsed.scene_description,
            "Outdoor beach scene during golden hour"
        );
        assert_eq!(parsed.confidence, "High");
    }

    #[test]
    fn keeps_real_text_verbatim() {
        let parsed = parse_vision_reply("TEXT: STOP, one way");
        assert_eq!(parsed.text_found, "STOP, one way");
    }

    #[test]
    fn text_none_marker_is_preserved() {
        let parsed = parse_vision_reply("TEXT: None detected");
        assert_eq!(parsed.text_found, "None detected");
    }

    #[test]
    fn unformatted_reply_yields_empty_fields() {
        let parsed = parse_vision_reply("I see a dog playing on the beach.");
        assert_eq!(parsed, ParsedAnalysis::default());
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_blank_items() {
        let parsed = parse_vision_reply("  OBJECTS:  car ,  , road \n  CONFIDENCE:  Medium ");
        assert_eq!(parsed.objects_detected, vec!["car", "road"]);
        assert_eq!(parsed.confidence, "Medium");
    }

    #[test]
    fn none_marker_in_lists_is_dropped() {
        let parsed = parse_vision_reply("EMOTIONS: None detected\nOBJECTS: None");
        assert!(parsed.emotions.is_empty());
        assert!(parsed.objects_detected.is_empty());
    }
}
