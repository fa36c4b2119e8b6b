//! Typed output of one chat turn.

use std::sync::LazyLock;

use genome_core::{ImageRef, Message};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::intent::Intent;

static BOLD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*\s*(?:Competitor\s*\d+\s*[:.\-]\s*)?([^*]+?)\s*\*\*")
        .expect("valid bold name regex")
});
static HANDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(|:])@([A-Za-z0-9_.]{1,30})").expect("valid handle regex")
});
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)\]|>"']+"#).expect("valid url regex"));

/// One Instagram post drafted by a `ContentPost` turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub caption: String,
    pub hashtags: String,
    pub best_time: String,
    pub content_type: String,
}

/// A competitor named by a `CompetitorList` turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentResult {
    ContentPost {
        text: String,
        posts: Vec<PostDraft>,
    },
    ImageAsset {
        image: ImageRef,
        /// What the user asked for.
        prompt: String,
        /// The brand-styled prompt actually sent to the image model.
        enhanced_prompt: String,
    },
    CompetitorList {
        text: String,
        competitors: Vec<CompetitorEntry>,
    },
    AudiencePersonas {
        text: String,
    },
    EngagementPrediction {
        text: String,
    },
    WeeklyPlan {
        text: String,
    },
    CampaignPlan {
        text: String,
    },
    FreeformReply {
        text: String,
    },
}

impl IntentResult {
    /// Wrap a text completion for `intent`, parsing structure where the
    /// intent has any. Image intents never reach this path.
    #[must_use]
    pub fn from_text(intent: Intent, text: String) -> Self {
        match intent {
            Intent::ContentPost => {
                let posts = parse_posts(&text);
                IntentResult::ContentPost { text, posts }
            }
            Intent::CompetitorList => {
                let competitors = parse_competitors(&text);
                IntentResult::CompetitorList { text, competitors }
            }
            Intent::AudiencePersonas => IntentResult::AudiencePersonas { text },
            Intent::EngagementPrediction => IntentResult::EngagementPrediction { text },
            Intent::WeeklyPlan => IntentResult::WeeklyPlan { text },
            Intent::CampaignPlan => IntentResult::CampaignPlan { text },
            Intent::ImageAsset | Intent::FreeformReply => IntentResult::FreeformReply { text },
        }
    }

    #[must_use]
    pub fn intent(&self) -> Intent {
        match self {
            IntentResult::ContentPost { .. } => Intent::ContentPost,
            IntentResult::ImageAsset { .. } => Intent::ImageAsset,
            IntentResult::CompetitorList { .. } => Intent::CompetitorList,
            IntentResult::AudiencePersonas { .. } => Intent::AudiencePersonas,
            IntentResult::EngagementPrediction { .. } => Intent::EngagementPrediction,
            IntentResult::WeeklyPlan { .. } => Intent::WeeklyPlan,
            IntentResult::CampaignPlan { .. } => Intent::CampaignPlan,
            IntentResult::FreeformReply { .. } => Intent::FreeformReply,
        }
    }

    /// The assistant message recorded in history for this result.
    #[must_use]
    pub fn assistant_message(&self) -> Message {
        match self {
            IntentResult::ImageAsset { image, prompt, .. } => Message::assistant_with_image(
                format!(
                    "I've generated an image for you! Here's what I created:\n\n{prompt}\n\nWould you like me to create another variation or adjust anything?"
                ),
                image.clone(),
            ),
            IntentResult::ContentPost { text, .. }
            | IntentResult::CompetitorList { text, .. }
            | IntentResult::AudiencePersonas { text }
            | IntentResult::EngagementPrediction { text }
            | IntentResult::WeeklyPlan { text }
            | IntentResult::CampaignPlan { text }
            | IntentResult::FreeformReply { text } => Message::assistant(text.clone()),
        }
    }
}

/// Split a "Post N: / Caption: / Hashtags: / Best time: / Content type:"
/// response into drafts. Falls back to a single draft holding the whole
/// response when nothing recognisable is found.
#[must_use]
pub fn parse_posts(response: &str) -> Vec<PostDraft> {
    let mut posts = Vec::new();
    let mut current: Option<PostDraft> = None;

    for line in response.lines().map(str::trim) {
        let plain = line.trim_start_matches(['*', '#', ' ']);
        if plain.starts_with("Post ") {
            if let Some(done) = current.take().filter(|p| *p != PostDraft::default()) {
                posts.push(done);
            }
            current = Some(PostDraft::default());
            continue;
        }

        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.to_lowercase();
        let value = value.trim().trim_matches('*').trim().to_string();
        let post = current.get_or_insert_with(PostDraft::default);

        if label.contains("caption") {
            post.caption = value;
        } else if label.contains("hashtag") {
            post.hashtags = value;
        } else if label.contains("time") || label.contains("posting") {
            post.best_time = value;
        } else if label.contains("type") {
            post.content_type = value;
        }
    }

    if let Some(done) = current.filter(|p| *p != PostDraft::default()) {
        posts.push(done);
    }

    if posts.is_empty() {
        posts.push(PostDraft {
            caption: response.to_string(),
            hashtags: String::new(),
            best_time: "Peak hours".to_string(),
            content_type: "Static".to_string(),
        });
    }
    posts
}

/// Pull competitor names, Instagram handles and websites out of a
/// markdown list where each competitor starts with a `**bold**` name.
#[must_use]
pub fn parse_competitors(response: &str) -> Vec<CompetitorEntry> {
    let mut out: Vec<CompetitorEntry> = Vec::new();

    for line in response.lines() {
        let rest = match BOLD_NAME.captures(line) {
            Some(caps) if is_heading(line) => {
                let name = caps[1].trim().trim_end_matches(':').trim().to_string();
                out.push(CompetitorEntry {
                    name,
                    instagram: None,
                    website: None,
                });
                &line[caps.get(0).map_or(0, |m| m.end())..]
            }
            _ => line,
        };

        let Some(entry) = out.last_mut() else {
            continue;
        };
        if entry.instagram.is_none() {
            if let Some(caps) = HANDLE.captures(rest) {
                entry.instagram = Some(format!("@{}", caps[1].trim_end_matches('.')));
            }
        }
        if entry.website.is_none() {
            if let Some(m) = URL.find(rest) {
                entry.website = Some(m.as_str().trim_end_matches(['.', ',']).to_string());
            }
        }
    }
    out
}

/// A bold span starts a competitor only when it leads the line, so bold
/// labels inside descriptions are not mistaken for names.
fn is_heading(line: &str) -> bool {
    let lead = line.trim_start_matches(|c: char| {
        c.is_whitespace() || c == '-' || c == '#' || c == '.' || c.is_ascii_digit()
    });
    lead.starts_with("**")
}

#[cfg(test)]
mod tests {
    use genome_core::Role;

    use super::*;

    const POSTS: &str = "Here are your posts!

Post 1:
Caption: Launch day is here. Tap the link to see what's new!
Hashtags: #launch #acme #rockets
Best time: Tuesday 6pm
Content type: Carousel

**Post 2:**
Caption: Behind the scenes at the factory.
Hashtags: #bts #acme
Best time: Thursday 12pm
Content type: Reel";

    #[test]
    fn posts_are_split_by_heading() {
        let posts = parse_posts(POSTS);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].hashtags, "#launch #acme #rockets");
        assert_eq!(posts[0].best_time, "Tuesday 6pm");
        assert_eq!(posts[0].content_type, "Carousel");
        assert_eq!(posts[1].caption, "Behind the scenes at the factory.");
        assert_eq!(posts[1].content_type, "Reel");
    }

    #[test]
    fn unstructured_post_response_becomes_single_draft() {
        let posts = parse_posts("Just post a sunset photo");
        assert_eq!(
            posts,
            vec![PostDraft {
                caption: "Just post a sunset photo".to_string(),
                hashtags: String::new(),
                best_time: "Peak hours".to_string(),
                content_type: "Static".to_string(),
            }]
        );
    }

    #[test]
    fn competitors_from_block_layout() {
        let text = "**Competitor 1: Globex**
- Instagram: @globex_corp
- Website: https://globex.com
- Key Strength: pricing

**Competitor 2: Initech**
- Instagram: @initech
- Website: https://www.initech.io/home.";
        let competitors = parse_competitors(text);
        assert_eq!(competitors.len(), 2);
        assert_eq!(competitors[0].name, "Globex");
        assert_eq!(competitors[0].instagram.as_deref(), Some("@globex_corp"));
        assert_eq!(competitors[0].website.as_deref(), Some("https://globex.com"));
        assert_eq!(
            competitors[1].website.as_deref(),
            Some("https://www.initech.io/home")
        );
    }

    #[test]
    fn competitors_from_inline_layout() {
        let text = "- **HackerOne**: @hackerone | https://hackerone.com
- **Bugcrowd**: @bugcrowd | https://bugcrowd.com";
        let competitors = parse_competitors(text);
        assert_eq!(competitors.len(), 2);
        assert_eq!(competitors[1].name, "Bugcrowd");
        assert_eq!(competitors[1].instagram.as_deref(), Some("@bugcrowd"));
        assert_eq!(competitors[1].website.as_deref(), Some("https://bugcrowd.com"));
    }

    #[test]
    fn email_addresses_are_not_handles() {
        let text = "**Globex**\nContact sales@globex.com";
        let competitors = parse_competitors(text);
        assert_eq!(competitors[0].instagram, None);
    }

    #[test]
    fn image_result_message_carries_the_image() {
        let result = IntentResult::ImageAsset {
            image: ImageRef {
                url: "https://img.example/1.png".to_string(),
                revised_prompt: None,
            },
            prompt: "a logo".to_string(),
            enhanced_prompt: "a logo. High quality".to_string(),
        };
        let message = result.assistant_message();
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.contains("a logo"));
        assert!(message.image.is_some());
    }

    #[test]
    fn serialized_result_is_tagged() {
        let result = IntentResult::from_text(Intent::WeeklyPlan, "Monday: reel".to_string());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "weekly_plan");
        assert_eq!(json["text"], "Monday: reel");
    }
}
