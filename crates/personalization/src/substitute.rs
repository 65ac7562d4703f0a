//! `{{var}}` placeholder substitution (§4.4). Deliberately not a templating
//! engine: unknown placeholders are left literal rather than raising or
//! rendering empty, which rules out minijinja's default undefined-variable
//! behavior and argues for a small hand-rolled scanner instead.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

/// Replaces every `{{key}}` occurrence found in `lead_data`, leaving any
/// placeholder whose key isn't present untouched (literal `{{key}}` in the
/// output).
pub fn substitute(template: &str, lead_data: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        match rest.find("{{") {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                out.push_str(&rest[..start]);
                let after_open = &rest[start + 2..];
                match after_open.find("}}") {
                    None => {
                        // Unterminated placeholder marker: emit literally.
                        out.push_str(&rest[start..]);
                        break;
                    }
                    Some(end) => {
                        let key = after_open[..end].trim();
                        match lead_data.get(key) {
                            Some(value) => out.push_str(value),
                            None => {
                                out.push_str("{{");
                                out.push_str(&after_open[..end]);
                                out.push_str("}}");
                            }
                        }
                        rest = &after_open[end + 2..];
                    }
                }
            }
        }
    }

    out
}

/// Subject defaults to `"{company_name} × Pipeline"` when the template
/// carries no subject line (§4.4).
pub fn default_subject(lead_data: &HashMap<String, String>) -> String {
    let company = lead_data
        .get("company_name")
        .map(String::as_str)
        .unwrap_or("Your company");
    format!("{company} \u{d7} Pipeline")
}

pub fn render(
    subject_line: Option<&str>,
    body_template: &str,
    lead_data: &HashMap<String, String>,
) -> Rendered {
    let subject = match subject_line {
        Some(s) if !s.is_empty() => substitute(s, lead_data),
        _ => default_subject(lead_data),
    };
    let body = substitute(body_template, lead_data);
    Rendered { subject, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("company_name".to_string(), "Acme".to_string());
        m.insert("contact_name".to_string(), "Jane".to_string());
        m
    }

    #[test]
    fn substitutes_known_placeholders() {
        let out = substitute("Hi {{contact_name}} from {{company_name}}!", &data());
        assert_eq!(out, "Hi Jane from Acme!");
    }

    #[test]
    fn leaves_unknown_placeholders_literal() {
        let out = substitute("Hi {{contact_name}}, re: {{deal_size}}", &data());
        assert_eq!(out, "Hi Jane, re: {{deal_size}}");
    }

    #[test]
    fn default_subject_uses_company_name() {
        let subj = default_subject(&data());
        assert_eq!(subj, "Acme \u{d7} Pipeline");
    }

    #[test]
    fn render_falls_back_to_default_subject_when_blank() {
        let rendered = render(None, "Body {{contact_name}}", &data());
        assert_eq!(rendered.subject, "Acme \u{d7} Pipeline");
        assert_eq!(rendered.body, "Body Jane");
    }

    #[test]
    fn render_prefers_explicit_subject() {
        let rendered = render(Some("Hello {{contact_name}}"), "Body", &data());
        assert_eq!(rendered.subject, "Hello Jane");
    }
}
