//! Template catalogue extraction from `#Templates` and the legacy
//! `#EmailTemplates` list.

use crate::{error::NormalizeError, helpers::unique_strings};
use archon_ir::model::Template;
use archon_tree::{ConfigValue, ValueKind};
use std::path::Path;

const TEMPLATES: &str = "#Templates";
const EMAIL_TEMPLATES: &str = "#EmailTemplates";
const DEFAULT_KIND: &str = "generic";

/// The catalogue: `#Templates` items in order, then `#EmailTemplates`
/// entries whose id is not already taken.
pub fn extract_templates(tree: &dyn ConfigValue) -> Result<Vec<Template>, NormalizeError> {
    let mut out = Vec::new();

    if let Some(block) = tree.field(TEMPLATES) {
        let (dir, items) = catalogue_items(block, TEMPLATES)?;
        for item in items {
            out.push(parse_template(item, &dir)?);
        }
    }

    if let Some(block) = tree.field(EMAIL_TEMPLATES) {
        let (dir, items) = catalogue_items(block, EMAIL_TEMPLATES)?;
        for item in items {
            let email = parse_email_template(item, &dir)?;
            if out.iter().all(|t: &Template| t.id != email.id) {
                out.push(email);
            }
        }
    }

    tracing::debug!(templates = out.len(), "extracted templates");

    Ok(out)
}

// A bare list, or `{dir, items}`.
fn catalogue_items<'a>(
    block: &'a dyn ConfigValue,
    label: &'static str,
) -> Result<(String, Vec<&'a dyn ConfigValue>), NormalizeError> {
    let (dir, items) = if block.kind() == ValueKind::Struct {
        let items = block.field("items").ok_or(NormalizeError::TemplateItems(label))?;
        (block.string_at("dir"), items)
    } else {
        (String::new(), block)
    };

    if items.kind() != ValueKind::List {
        return Err(NormalizeError::shape(label, "list"));
    }

    Ok((dir, items.elements()))
}

fn parse_template(v: &dyn ConfigValue, dir: &str) -> Result<Template, NormalizeError> {
    let mut id = v.string_at("id");
    if id.is_empty() {
        id = v.string_at("name");
    }
    if id.is_empty() {
        return Err(NormalizeError::TemplateId);
    }

    let mut kind = v.string_at("kind");
    if kind.is_empty() {
        kind = DEFAULT_KIND.to_string();
    }
    let mut channel = v.string_at("channel");
    if channel.is_empty() && kind.eq_ignore_ascii_case("email") {
        channel = "email".to_string();
    }
    let mut engine = v.string_at("engine");
    if engine.is_empty() {
        engine = Template::DEFAULT_ENGINE.to_string();
    }

    let mut required_vars = unique_strings(v, "requiredVars");
    if required_vars.is_empty() {
        required_vars = unique_strings(v, "vars.required");
    }
    let mut optional_vars = unique_strings(v, "optionalVars");
    if optional_vars.is_empty() {
        optional_vars = unique_strings(v, "vars.optional");
    }

    let template = Template {
        id,
        kind,
        channel,
        locale: v.string_at("locale"),
        version: v.string_at("version"),
        engine,
        subject: raw_string(v, "subject"),
        text: raw_string(v, "text"),
        html: raw_string(v, "html"),
        body: raw_string(v, "body"),
        subject_file: file_ref(dir, &v.string_at("subjectFile")),
        text_file: file_ref(dir, &v.string_at("textFile")),
        html_file: file_ref(dir, &v.string_at("htmlFile")),
        body_file: file_ref(dir, &v.string_at("bodyFile")),
        required_vars,
        optional_vars,
    };

    let has_inline = [&template.subject, &template.text, &template.html, &template.body]
        .iter()
        .any(|s| !s.is_empty());
    let has_file = [
        &template.subject_file,
        &template.text_file,
        &template.html_file,
        &template.body_file,
    ]
    .iter()
    .any(|s| !s.is_empty());
    if !has_inline && !has_file {
        return Err(NormalizeError::TemplateContent(template.id));
    }

    Ok(template)
}

// Legacy entries: name and subject are required, plus text or html content.
fn parse_email_template(v: &dyn ConfigValue, dir: &str) -> Result<Template, NormalizeError> {
    let name = v.string_at("name");
    if name.is_empty() {
        return Err(NormalizeError::EmailTemplateName);
    }
    let subject = raw_string(v, "subject");
    if subject.is_empty() {
        return Err(NormalizeError::EmailTemplateSubject(name));
    }

    let template = Template {
        kind: "email".to_string(),
        channel: "email".to_string(),
        engine: Template::DEFAULT_ENGINE.to_string(),
        subject,
        text: raw_string(v, "text"),
        html: raw_string(v, "html"),
        text_file: file_ref(dir, &v.string_at("textFile")),
        html_file: file_ref(dir, &v.string_at("htmlFile")),
        ..Template::default()
    };
    if [&template.text, &template.html, &template.text_file, &template.html_file]
        .iter()
        .all(|s| s.is_empty())
    {
        return Err(NormalizeError::EmailTemplateBody(name));
    }

    Ok(Template { id: name, ..template })
}

// Content strings keep their whitespace.
fn raw_string(v: &dyn ConfigValue, key: &str) -> String {
    v.str_at(key).unwrap_or_default().to_string()
}

// Relative references resolve against the catalogue directory.
fn file_ref(dir: &str, file: &str) -> String {
    if file.is_empty() || dir.is_empty() || Path::new(file).is_absolute() {
        return file.to_string();
    }

    Path::new(dir).join(file).to_string_lossy().into_owned()
}
