//! Content-based routing
//!
//! Classifies the concatenated user-message text against a
//! priority-ordered family of regular expressions. The family order is
//! part of the contract: Code beats Math beats Creative beats Analytical
//! beats LongForm, and General matches nothing. Patterns are compiled
//! once at first use.

use std::sync::LazyLock;

use prism_config::StrategyName;
use regex::Regex;

use crate::analysis::RouteQuery;
use crate::registry::ModelInfo;
use crate::router::RouterContext;
use crate::strategy::{RouteStrategy, RoutingResult};

/// Context window a LongForm candidate must offer
const LONG_FORM_MIN_CONTEXT: u32 = 32_000;

/// Prompt families, in match-priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFamily {
    Code,
    Math,
    Creative,
    Analytical,
    LongForm,
    General,
}

impl ContentFamily {
    const fn label(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Math => "math",
            Self::Creative => "creative",
            Self::Analytical => "analytical",
            Self::LongForm => "long-form",
            Self::General => "general",
        }
    }
}

struct FamilyRule {
    family: ContentFamily,
    pattern: Regex,
    preferred: &'static [&'static str],
}

static FAMILY_RULES: LazyLock<Vec<FamilyRule>> = LazyLock::new(|| {
    let rule = |family, pattern: &str, preferred| FamilyRule {
        family,
        pattern: Regex::new(pattern).expect("family pattern must compile"),
        preferred,
    };

    vec![
        rule(
            ContentFamily::Code,
            r"(?i)```|\b(?:fn|def|class|struct|function|import|println!|console\.log)\b|\b(?:debug|refactor|compile|stack trace|unit test|segfault)\b|\.(?:rs|py|js|ts|go|java|cpp|tsx)\b",
            &["openai.gpt-4-turbo", "anthropic.claude-3-opus", "openai.gpt-4"],
        ),
        rule(
            ContentFamily::Math,
            r"(?i)\b(?:solve|calculate|equation|integral|derivative|theorem|proof|probability|eigenvalue|matrix)\b|\d\s*[-+*/^=]\s*\d|[∫∑∏√]",
            &["openai.gpt-4", "anthropic.claude-3-opus", "openai.gpt-4-turbo"],
        ),
        rule(
            ContentFamily::Creative,
            r"(?i)\b(?:story|poem|poetry|fiction|novel|lyrics|screenplay)\b|write (?:me )?a (?:story|poem|song)|tell me a story",
            &["anthropic.claude-3-opus", "anthropic.claude-3-sonnet", "openai.gpt-4"],
        ),
        rule(
            ContentFamily::Analytical,
            r"(?i)\b(?:analy[sz]e|analysis|compare|contrast|evaluate|assess|summari[sz]e|critique)\b|pros and cons",
            &["anthropic.claude-3-opus", "openai.gpt-4-turbo", "anthropic.claude-3-sonnet"],
        ),
        rule(
            ContentFamily::LongForm,
            r"(?i)\b(?:essay|report|whitepaper|dissertation|comprehensive|in-depth)\b|\b\d{3,}[- ]word\b",
            &["anthropic.claude-3-sonnet", "anthropic.claude-3-opus", "openai.gpt-4-turbo"],
        ),
    ]
});

/// Classify user text into a content family
pub fn classify(text: &str) -> ContentFamily {
    FAMILY_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map_or(ContentFamily::General, |rule| rule.family)
}

pub struct ContentRouter;

impl ContentRouter {
    /// First preferred model that exists in the registry and serves completions
    fn pick_preferred<'a>(preferred: &[&str], ctx: &'a RouterContext<'_>) -> Option<&'a ModelInfo> {
        preferred
            .iter()
            .filter_map(|id| ctx.registry.get_model(id))
            .find(|info| info.capabilities.completions)
    }

    /// LongForm first wants the roomiest model above the context floor
    fn pick_long_form<'a>(preferred: &[&str], ctx: &'a RouterContext<'_>) -> Option<&'a ModelInfo> {
        let roomiest = ctx
            .registry
            .completion_models()
            .filter(|info| info.context_window >= LONG_FORM_MIN_CONTEXT)
            .max_by(|a, b| {
                a.context_window
                    .cmp(&b.context_window)
                    .then_with(|| b.id.cmp(&a.id))
            });

        roomiest.or_else(|| Self::pick_preferred(preferred, ctx))
    }
}

impl RouteStrategy for ContentRouter {
    fn name(&self) -> StrategyName {
        StrategyName::ContentBased
    }

    fn route(&self, query: &RouteQuery, ctx: &RouterContext<'_>) -> RoutingResult {
        let strategy = StrategyName::ContentBased.as_str();

        if !ctx.options.enable_content_routing {
            return RoutingResult::rejected(strategy, "content routing disabled");
        }

        let family = classify(&query.user_text);
        tracing::debug!(family = family.label(), "classified request content");

        let rule = FAMILY_RULES.iter().find(|r| r.family == family);

        let picked = match family {
            ContentFamily::General => None,
            ContentFamily::LongForm => rule.and_then(|r| Self::pick_long_form(r.preferred, ctx)),
            _ => rule.and_then(|r| Self::pick_preferred(r.preferred, ctx)),
        };

        picked.map_or_else(
            || {
                RoutingResult::rejected(
                    strategy,
                    format!("no preferred model available for {} content", family.label()),
                )
            },
            |info| {
                RoutingResult::selected(info, strategy, format!("classified as {} content", family.label()))
            },
        )
    }
}
