use serde::Serialize;
use similar::TextDiff;

use crate::api::WikiSession;
use crate::discovery::discover;
use crate::error::BotResult;
use crate::template::TemplateName;
use crate::transform::TextTransformer;

#[derive(Debug, Clone, Serialize)]
pub struct PagePreview {
    pub title: String,
    pub replacements: usize,
    pub diff: String,
}

/// Discover and rewrite without submitting anything.
pub fn preview_run<S: WikiSession>(
    session: &S,
    template: &TemplateName,
) -> BotResult<Vec<PagePreview>> {
    let transformer = TextTransformer::new(template);
    let previews = discover(session, template)?
        .into_iter()
        .map(|page| {
            let rewritten = transformer.rewrite(&page.current_text);
            PagePreview {
                replacements: transformer.count_matches(&page.current_text),
                diff: unified_diff(&page.title, &page.current_text, &rewritten),
                title: page.title,
            }
        })
        .collect();
    Ok(previews)
}

fn unified_diff(title: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{title}"), &format!("b/{title}"))
        .to_string()
}
