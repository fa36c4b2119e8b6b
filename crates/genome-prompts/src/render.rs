//! Prompt text for every [`TemplateId`].
//!
//! Rendering is a pure function of the template id and the supplied
//! fields; nothing here reads clocks, environment or network.

use genome_llm::Prompt;

use crate::context::{fields, ContextFields};
use crate::error::TemplateError;
use crate::template::TemplateId;

/// Labels the intent classifier may answer with, one per chat intent.
pub const INTENT_LABELS: [&str; 8] = [
    "content_post",
    "image_asset",
    "competitor_list",
    "audience_personas",
    "engagement_prediction",
    "weekly_plan",
    "campaign_plan",
    "freeform_reply",
];

const POSTS_PER_REQUEST: u32 = 3;

/// Render `id` with `ctx`.
///
/// # Errors
///
/// Returns [`TemplateError::MissingField`] when a field the template needs
/// is absent or blank.
pub fn render(id: TemplateId, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let t = id.as_str();
    match id {
        TemplateId::BrandDna => brand_dna(t, ctx),
        TemplateId::CompetitorMap => competitor_map(t, ctx),
        TemplateId::GrowthRoadmap => growth_roadmap(t, ctx),
        TemplateId::ContentBlueprint => content_blueprint(t, ctx),
        TemplateId::AssistantPersona => Ok(Prompt::new(
            Some(persona(t, ctx)?),
            format!(
                "Introduce yourself to the team behind {} and suggest three things you can help with first.",
                require(ctx, t, fields::BRAND_NAME)?
            ),
        )),
        TemplateId::ContentPost => content_post(t, ctx),
        TemplateId::ImageAsset => image_asset(t, ctx),
        TemplateId::CompetitorList => competitor_list(t, ctx),
        TemplateId::AudiencePersonas => audience_personas(t, ctx),
        TemplateId::EngagementPrediction => engagement_prediction(t, ctx),
        TemplateId::WeeklyPlan => weekly_plan(t, ctx),
        TemplateId::CampaignPlan => campaign_plan(t, ctx),
        TemplateId::FreeformReply => freeform_reply(t, ctx),
        TemplateId::IntentClassifier => intent_classifier(t, ctx),
    }
}

/// Render a template looked up by its string id.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownTemplate`] for an unrecognised id, or
/// any error from [`render`].
pub fn render_named(id: &str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    render(id.parse()?, ctx)
}

fn require<'a>(
    ctx: &'a ContextFields,
    template: &'static str,
    field: &'static str,
) -> Result<&'a str, TemplateError> {
    ctx.get(field)
        .ok_or(TemplateError::MissingField { template, field })
}

fn brand_profile(ctx: &ContextFields, brand: &str) -> String {
    let mut out = format!("Brand: {brand}\n");
    if let Some(source) = ctx.get(fields::BRAND_SOURCE) {
        out.push_str(&format!("Identified by: {source}\n"));
    }
    out.push_str(&format!(
        "Industry: {}\n",
        ctx.get(fields::INDUSTRY).unwrap_or("Unknown")
    ));
    out.push_str("\nData Collected:\n");
    out.push_str(
        ctx.get(fields::WEBSITE_CONTEXT)
            .unwrap_or("No website data available; rely on the brand name and identifier."),
    );
    if let Some(knowledge) = ctx.get(fields::BRAND_KNOWLEDGE) {
        out.push_str("\n\nEarlier analysis:\n");
        out.push_str(knowledge);
    }
    out
}

fn history_block(ctx: &ContextFields) -> String {
    ctx.get(fields::HISTORY)
        .map(|h| format!("Recent conversation:\n{h}\n\n"))
        .unwrap_or_default()
}

fn brand_dna(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let system = "You are an expert brand strategist and marketing analyst.
Analyze the provided brand data and extract the brand's DNA - its core identity, positioning, and strategy.

Be specific, insightful, and data-driven. Focus on what makes this brand unique.";

    let user = format!(
        r#"Analyze this brand and extract its DNA:

{profile}

Provide a comprehensive brand DNA analysis covering:

1. BRAND PERSONALITY - tone & voice, core values, brand archetype
2. POSITIONING - market position, unique value proposition, differentiation
3. TARGET AUDIENCE - demographics, psychographics, pain points addressed
4. VISUAL IDENTITY - color psychology, design language, aesthetics
5. MESSAGING STRATEGY - key messages, communication style, emotional appeal

Return as JSON with these exact keys:
{{
  "personality": {{"tone": "", "values": [], "archetype": ""}},
  "positioning": {{"market_position": "", "uvp": "", "differentiation": ""}},
  "audience": {{"demographics": "", "psychographics": "", "pain_points": []}},
  "visual": {{"colors": [], "design_language": "", "aesthetics": ""}},
  "messaging": {{"key_messages": [], "style": "", "emotional_appeal": ""}}
}}"#,
        profile = brand_profile(ctx, brand)
    );
    Ok(Prompt::new(Some(system.to_string()), user))
}

fn competitor_map(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let system = "You are a competitive intelligence analyst.
Identify competitors and their weaknesses to find market opportunities.";

    let user = format!(
        r#"Identify the competitive landscape for this brand:

{profile}

Provide:
1. Top 3-5 direct competitors
2. Their key weaknesses
3. Market gaps/opportunities
4. Competitive advantages to leverage

Return as JSON:
{{
  "competitors": [
    {{"name": "", "weakness": "", "market_share": ""}}
  ],
  "market_gaps": [],
  "opportunities": [],
  "competitive_advantages": []
}}"#,
        profile = brand_profile(ctx, brand)
    );
    Ok(Prompt::new(Some(system.to_string()), user))
}

fn growth_roadmap(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let system = "You are a growth marketing strategist.
Create actionable growth roadmaps grounded in a brand's identity and market.";

    let user = format!(
        r#"Create a 90-day growth roadmap for this brand:

{profile}

Provide:
1. Month 1 priorities (quick wins)
2. Month 2 priorities (momentum building)
3. Month 3 priorities (scaling)
4. Key metrics to track
5. Resource requirements

Return as JSON:
{{
  "month_1": {{"focus": "", "actions": []}},
  "month_2": {{"focus": "", "actions": []}},
  "month_3": {{"focus": "", "actions": []}},
  "key_metrics": [],
  "resources": []
}}"#,
        profile = brand_profile(ctx, brand)
    );
    Ok(Prompt::new(Some(system.to_string()), user))
}

fn content_blueprint(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let system = "You are a content strategist.
Create content pillar frameworks that align with a brand's voice and audience.";

    let user = format!(
        r#"Create a content strategy framework for this brand:

{profile}

Provide:
1. 3-5 Content Pillars (core themes)
2. Topic clusters for each pillar
3. Content formats (blog, video, social, etc.)
4. Posting frequency recommendations
5. Platform-specific strategies

Return as JSON:
{{
  "content_pillars": [{{"name": "", "topics": []}}],
  "formats": [],
  "posting_frequency": {{}},
  "platform_strategies": {{}}
}}"#,
        profile = brand_profile(ctx, brand)
    );
    Ok(Prompt::new(Some(system.to_string()), user))
}

/// System prompt shared by every chat template.
fn persona(t: &'static str, ctx: &ContextFields) -> Result<String, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let mut out = format!(
        "You are Market Genome - a personal marketing strategist and brand assistant for {brand}.

YOUR ROLE:
You are an expert marketing strategist with deep knowledge of this brand's DNA, audience, competitors, and content performance. You provide actionable, data-driven insights and create ready-to-use marketing content.

YOUR CAPABILITIES:
1. Brand Strategy - Analyze brand positioning, voice, and growth opportunities
2. Content Creation - Generate Instagram posts, captions, email campaigns, ad copy
3. Image Generation - Create visual content and post designs
4. Audience Insights - Explain audience segments, preferences, and behaviors
5. Competitor Analysis - Identify competitor weaknesses and market gaps
6. Predictive Analytics - Forecast engagement and campaign performance
7. Report Generation - Create strategy reports on demand

RESPONSE STYLE:
- Professional yet conversational
- Concise but comprehensive
- Specific, actionable recommendations
- Bullet points for clarity
- Suggest next steps proactively
"
    );

    if let Some(knowledge) = ctx.get(fields::BRAND_KNOWLEDGE) {
        out.push_str("\nBRAND CONTEXT YOU KNOW:\n");
        out.push_str(knowledge);
        out.push('\n');
    }
    if let Some(website) = ctx.get(fields::WEBSITE_CONTEXT) {
        out.push_str("\nBRAND WEBSITE:\n");
        out.push_str(website);
        out.push('\n');
    }
    Ok(out)
}

fn content_post(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let request = require(ctx, t, fields::REQUEST)?;
    let user = format!(
        "{history}Create {POSTS_PER_REQUEST} Instagram posts for {brand} based on this request: {request}

Use exactly this layout for each post:

Post 1:
Caption: <engaging caption, 150-200 characters, with a call-to-action>
Hashtags: <5-8 relevant hashtags>
Best time: <best posting time>
Content type: <carousel, reel or static image>

Make sure captions match the brand voice and tone.",
        history = history_block(ctx)
    );
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn image_asset(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let request = require(ctx, t, fields::REQUEST)?;
    let mut style = String::new();
    if let Some(tone) = ctx.get(fields::STYLE_TONE) {
        style.push_str(&format!(" The style should be {tone}"));
        if let Some(values) = ctx.get(fields::STYLE_VALUES) {
            style.push_str(&format!(" and reflect values of {values}"));
        }
        style.push('.');
    }
    let request = request.trim_end_matches('.');
    Ok(Prompt::user_only(format!(
        "{request}.{style} High quality, professional social media post design."
    )))
}

fn competitor_list(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let request = require(ctx, t, fields::REQUEST)?;
    let user = format!(
        "{history}{request}

List 3-5 specific competitors of {brand} based on its industry and niche. For each competitor include its Instagram handle in @username form and its full website URL. Use exactly this layout:

**Competitor 1: CompanyName**
- Instagram: @companyname
- Website: https://companyname.com
- Key Strength: what they do well
- Opportunity for you: gap {brand} can fill",
        history = history_block(ctx)
    );
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn audience_personas(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let focus = ctx
        .get(fields::REQUEST)
        .map(|r| format!("\nThe user asked: {r}\n"))
        .unwrap_or_default();
    let user = format!(
        "{history}Create 4 detailed audience micro-personas for {brand}.{focus}
For each persona, provide:
1. Name & Age (e.g., \"Sarah, 28\")
2. Job Title & Industry
3. Key Characteristics (3-4 traits)
4. Pain Points (2-3 specific problems)
5. Content Preferences (what they engage with)
6. Best Way to Reach Them (channel + message type)
7. Engagement Behavior (when/how they interact)

Make them realistic and actionable for targeted marketing.",
        history = history_block(ctx)
    );
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn engagement_prediction(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let request = require(ctx, t, fields::REQUEST)?;
    let platform = ctx.get(fields::PLATFORM).unwrap_or("Instagram");
    let user = format!(
        "{history}Analyze this content idea for {platform}: \"{request}\"

Provide predictions for:
1. Engagement Rate (estimate %)
2. Expected Reach (Low/Medium/High)
3. Audience Sentiment (Positive/Neutral/Negative)
4. Viral Potential Score (1-10)
5. Best Day/Time to Post
6. Recommendations to improve engagement

Base predictions on the brand DNA and typical audience behavior for {brand}.",
        history = history_block(ctx)
    );
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn weekly_plan(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let focus = ctx
        .get(fields::REQUEST)
        .map(|r| format!("\nThe user asked: {r}\n"))
        .unwrap_or_default();
    let user = format!(
        "{history}Create a 7-day content strategy for {brand}.{focus}
For each day (Monday-Sunday), provide:
1. Content Theme/Topic
2. Platform (Instagram/LinkedIn/Twitter/etc.)
3. Content Format (Reel/Carousel/Story/Post)
4. Caption Template (with hashtags)
5. Best Posting Time
6. CTA (call-to-action)

Vary content types and themes. Align with brand DNA and audience preferences.",
        history = history_block(ctx)
    );
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn campaign_plan(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let brand = require(ctx, t, fields::BRAND_NAME)?;
    let goal = require(ctx, t, fields::REQUEST)?;
    let user = format!(
        "{history}Create a complete marketing campaign for {brand}.

Goal: {goal}

Provide:
1. Campaign Overview (objectives, KPIs)
2. Target Audience Segments
3. Content Calendar (week-by-week breakdown)
4. Channel Strategy (which platforms, why)
5. Creative Concepts (3-5 content ideas)
6. Budget Allocation
7. Success Metrics
8. Risk Mitigation

Make it actionable and specific to the brand's DNA and audience.",
        history = history_block(ctx)
    );
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn freeform_reply(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let request = require(ctx, t, fields::REQUEST)?;
    let user = format!("{history}{request}", history = history_block(ctx));
    Ok(Prompt::new(Some(persona(t, ctx)?), user))
}

fn intent_classifier(t: &'static str, ctx: &ContextFields) -> Result<Prompt, TemplateError> {
    let request = require(ctx, t, fields::REQUEST)?;
    let system = format!(
        "You route messages sent to a marketing assistant. Reply with exactly one label from this list and nothing else: {}.

content_post: social media posts or captions
image_asset: an image, photo, graphic or visual design
competitor_list: competitors, rivals or the competition
audience_personas: audience segments or personas
engagement_prediction: predictions, forecasts or what-if scenarios
weekly_plan: a weekly or 7-day content plan
campaign_plan: a marketing campaign or strategy
freeform_reply: anything else",
        INTENT_LABELS.join(", ")
    );
    Ok(Prompt::new(
        Some(system),
        format!("Message: {request}\nLabel:"),
    ))
}
