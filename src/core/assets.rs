//! Instruction templates compiled into the binary.
//!
//! Dispatcher responses are markdown documents injected into the agent's context.
//! Placeholders use `{{name}}` and are filled by [`render`].

macro_rules! embedded_templates {
    ($($path:expr => $const_name:ident),* $(,)?) => {
        $(
            pub const $const_name: &str =
                include_str!(concat!("../../templates/", $path));
        )*
    };
}

embedded_templates! {
    "propose.md" => TEMPLATE_PROPOSE,
    "start_confirm.md" => TEMPLATE_START_CONFIRM,
    "started.md" => TEMPLATE_STARTED,
    "checkpoint.md" => TEMPLATE_CHECKPOINT,
    "close_review.md" => TEMPLATE_CLOSE_REVIEW,
    "close_immediate.md" => TEMPLATE_CLOSE_IMMEDIATE,
}

/// Substitute `{{key}}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_are_embedded() {
        for body in [
            TEMPLATE_PROPOSE,
            TEMPLATE_START_CONFIRM,
            TEMPLATE_STARTED,
            TEMPLATE_CHECKPOINT,
            TEMPLATE_CLOSE_REVIEW,
            TEMPLATE_CLOSE_IMMEDIATE,
        ] {
            assert!(body.starts_with('#'), "template should start with a heading: {body}");
        }
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render("{{a}} and {{a}} but {{b}}", &[("a", "x")]);
        assert_eq!(out, "x and x but {{b}}");
    }

    #[test]
    fn close_templates_offer_archive_command() {
        let out = render(TEMPLATE_CLOSE_REVIEW, &[("work_item_id", "demo")]);
        assert!(out.contains("planlock archive demo"));
        assert!(out.contains("fix now"));
    }
}
