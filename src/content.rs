//! Entity substitution for tweet content.
//!
//! Pure string-rewriting passes that turn the entities embedded in a tweet's
//! text (hashtags, shortened URLs, mentions) into anchor markup. Hashtags are
//! matched by regex directly in the text; URLs and mentions come from the
//! tweet's parsed entity collections. All three share the same rendering
//! hooks so callers can restyle or fully replace the generated markup.

use crate::model::Tweet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));

/// Rendering hook: receives the default anchor markup, the resolved URL, and
/// the matched text, and returns the final substitution.
pub type RenderLink = dyn Fn(&str, &str, &str) -> String;

/// Styling and rendering options shared by the substitution passes.
pub struct LinkArgs {
    pub class: String,
    pub target: String,
    pub render: Option<Box<RenderLink>>,
}

impl LinkArgs {
    /// Options with the given anchor class and the standard `_blank` target.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            target: "_blank".to_string(),
            render: None,
        }
    }

    /// Default options for hashtag links.
    #[must_use]
    pub fn hashtag() -> Self {
        Self::new("hashtag")
    }

    /// Default options for expanded URL links.
    #[must_use]
    pub fn link() -> Self {
        Self::new("link")
    }

    /// Default options for mention links.
    #[must_use]
    pub fn mention() -> Self {
        Self::new("mention")
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[must_use]
    pub fn with_render(mut self, render: impl Fn(&str, &str, &str) -> String + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    /// Produce the substitution for one match, honoring the render hook.
    fn substitute(&self, url: &str, text: &str) -> String {
        let anchor = format!(
            r#"<a href="{url}" class="{class}" target="{target}">{text}</a>"#,
            class = self.class,
            target = self.target,
        );
        match &self.render {
            Some(render) => render(&anchor, url, text),
            None => anchor,
        }
    }
}

impl Default for LinkArgs {
    fn default() -> Self {
        Self::link()
    }
}

impl std::fmt::Debug for LinkArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkArgs")
            .field("class", &self.class)
            .field("target", &self.target)
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// Replace every `#\w+` token with a hashtag-search link.
///
/// Matching works on the text itself, not the tweet's parsed hashtag list;
/// archives routinely omit entities for older tweets. Replacement is a
/// single pass over the match spans, so a tag that prefixes a longer tag
/// (`#rust` / `#rustlang`) never corrupts its neighbor.
#[must_use]
pub fn populate_hashtags(content: &str, _tweet: &Tweet, args: &LinkArgs) -> String {
    HASHTAG_RE
        .replace_all(content, |caps: &Captures<'_>| {
            let matched = &caps[0];
            let tag = matched.trim_start_matches('#');
            let url = format!("https://x.com/hashtag/{tag}");
            args.substitute(&url, matched)
        })
        .into_owned()
}

/// Replace each parsed link's short form with an anchor to its expanded URL.
///
/// Links that no longer appear in the content are silently ignored. Running
/// the pass twice is harmless: the short form is gone after the first run.
#[must_use]
pub fn populate_urls(content: &str, tweet: &Tweet, args: &LinkArgs) -> String {
    let mut output = content.to_string();
    for link in &tweet.links {
        if link.url.is_empty() {
            continue;
        }
        let replacement = args.substitute(&link.expanded_url, &link.display_url);
        output = output.replace(&link.url, &replacement);
    }
    output
}

/// Replace `@screen_name` occurrences with profile links, one per parsed
/// mention.
#[must_use]
pub fn populate_mentions(content: &str, tweet: &Tweet, args: &LinkArgs) -> String {
    let mut output = content.to_string();
    for mention in &tweet.mentions {
        if mention.screen_name.is_empty() {
            continue;
        }
        let needle = format!("@{}", mention.screen_name);
        let url = format!("https://x.com/{}", mention.screen_name);
        let replacement = args.substitute(&url, &needle);
        output = output.replace(&needle, &replacement);
    }
    output
}
