use regex::{Captures, Regex};

use crate::template::TemplateName;

pub const SUBST_PREFIX: &str = "subst:";

/// Rewrites `{{Name}}` / `{{Name|...}}` transclusions into `{{subst:Name...}}`.
///
/// Whitespace inside the marker and everything after the name are kept byte for
/// byte. A name that is only a prefix of a longer template name does not match,
/// and already substituted markers are left alone.
#[derive(Debug, Clone)]
pub struct TextTransformer {
    template: TemplateName,
    pattern: Regex,
}

impl TextTransformer {
    pub fn new(template: &TemplateName) -> Self {
        let pattern = Regex::new(&format!(
            r"\{{\{{(\s*){}(\s*(?:\}}\}}|\|))",
            regex::escape(template.as_str())
        ))
        .unwrap_or_else(|error| unreachable!("escaped template pattern is valid: {error}"));
        Self {
            template: template.clone(),
            pattern,
        }
    }

    pub fn template(&self) -> &TemplateName {
        &self.template
    }

    pub fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures<'_>| {
                format!(
                    "{{{{{SUBST_PREFIX}{}{}{}",
                    &caps[1],
                    self.template.as_str(),
                    &caps[2]
                )
            })
            .into_owned()
    }

    /// Number of markers `rewrite` would change.
    pub fn count_matches(&self, text: &str) -> usize {
        self.pattern.find_iter(text).count()
    }
}

pub fn rewrite(text: &str, template: &TemplateName) -> String {
    TextTransformer::new(template).rewrite(text)
}

#[cfg(test)]
mod tests {
    use super::{TextTransformer, rewrite};
    use crate::template::TemplateName;

    fn name(value: &str) -> TemplateName {
        TemplateName::parse(value).expect("template name")
    }

    #[test]
    fn rewrites_bare_and_parameterised_markers() {
        let output = rewrite("Intro {{Clean}} middle {{Clean|x=1}} end", &name("Clean"));
        assert_eq!(
            output,
            "Intro {{subst:Clean}} middle {{subst:Clean|x=1}} end"
        );
    }

    #[test]
    fn keeps_whitespace_inside_marker() {
        let output = rewrite("{{ Clean }} and {{\nClean\n| a }}", &name("Clean"));
        assert_eq!(output, "{{subst: Clean }} and {{subst:\nClean\n| a }}");
    }

    #[test]
    fn ignores_longer_template_names() {
        let text = "{{FooBar}} {{Foo Bar}} {{Foo_bar|x}} {{Foo}}";
        assert_eq!(
            rewrite(text, &name("Foo")),
            "{{FooBar}} {{Foo Bar}} {{Foo_bar|x}} {{subst:Foo}}"
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let text = "{{clean}} {{CLEAN}}";
        assert_eq!(rewrite(text, &name("Clean")), text);
    }

    #[test]
    fn second_application_is_a_no_op() {
        let transformer = TextTransformer::new(&name("Clean"));
        let once = transformer.rewrite("a {{Clean}} b {{ Clean |y}}");
        let twice = transformer.rewrite(&once);
        assert_eq!(once, twice);
        assert_eq!(transformer.count_matches(&once), 0);
    }

    #[test]
    fn escapes_regex_metacharacters_in_name() {
        let template = name("Note (a.b)+");
        let text = "{{Note (a.b)+}} {{Note (aXb)+}} {{Note (a.b)b}}";
        assert_eq!(
            rewrite(text, &template),
            "{{subst:Note (a.b)+}} {{Note (aXb)+}} {{Note (a.b)b}}"
        );
    }

    #[test]
    fn handles_nested_and_adjacent_markers() {
        let text = "{{Clean|{{Clean}}}}{{Clean}}";
        assert_eq!(
            rewrite(text, &name("Clean")),
            "{{subst:Clean|{{subst:Clean}}}}{{subst:Clean}}"
        );
        assert_eq!(TextTransformer::new(&name("Clean")).count_matches(text), 3);
    }

    #[test]
    fn dollar_signs_in_name_are_literal() {
        let text = "{{Price$1}}";
        assert_eq!(rewrite(text, &name("Price$1")), "{{subst:Price$1}}");
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let text = "plain text with {{Other}} and {{Clean";
        assert_eq!(rewrite(text, &name("Clean")), text);
    }
}
