//! Server rendered HTML pages for the submission form and the admin area.
//!
//! Every interpolated value goes through [`escape_html`]; stored signature
//! documents are embedded as escaped `srcdoc`/`textarea` content so the
//! preview never runs in the page's own context.

use sigforge_core::escape::escape_html;
use sigforge_core::types::{FormError, FormField, SignatureForm, SignatureRecord};
use sigforge_core::OrganizationProfile;

const STYLE: &str = r#"
body { font-family: system-ui, -apple-system, 'Segoe UI', Roboto, sans-serif; background: #f1f5f9; color: #0f172a; margin: 0; }
main { max-width: 960px; margin: 0 auto; padding: 32px 16px; }
h1 { font-size: 28px; margin-bottom: 8px; }
.card { background: #fff; border-radius: 8px; box-shadow: 0 1px 4px rgba(15, 23, 42, 0.12); padding: 24px; margin-bottom: 24px; }
label { display: block; font-weight: 600; margin: 12px 0 4px; }
input, textarea { width: 100%; box-sizing: border-box; padding: 8px; border: 1px solid #cbd5e1; border-radius: 6px; font-size: 15px; }
textarea { font-family: ui-monospace, monospace; font-size: 12px; min-height: 180px; }
button, .button { display: inline-block; background: #dc2626; color: #fff; border: 0; border-radius: 6px; padding: 10px 18px; font-size: 15px; cursor: pointer; text-decoration: none; margin-top: 16px; }
.secondary { background: #334155; }
.field-error { color: #b91c1c; font-size: 13px; margin-top: 4px; }
.banner { background: #fee2e2; color: #991b1b; padding: 12px; border-radius: 6px; margin-bottom: 16px; }
.notice { margin-left: 12px; font-size: 14px; color: #334155; }
table.listing { width: 100%; border-collapse: collapse; }
table.listing th, table.listing td { text-align: left; padding: 8px; border-bottom: 1px solid #e2e8f0; font-size: 14px; }
.stats { display: flex; gap: 24px; }
.stats .card { flex: 1; }
.stat-value { font-size: 26px; font-weight: 700; }
iframe.preview { width: 100%; min-height: 420px; border: 1px solid #e2e8f0; border-radius: 6px; background: #fff; }
dl.fields { display: grid; grid-template-columns: 160px 1fr; gap: 6px 16px; }
dl.fields dt { font-weight: 600; }
.topbar { display: flex; justify-content: space-between; align-items: center; }
"#;

// Tries a rich `text/html` clipboard write first and falls back to plain text.
const COPY_SCRIPT: &str = r#"
<script>
async function copySignature() {
  const source = document.getElementById('signature-html');
  const status = document.getElementById('copy-status');
  const html = source.value;
  try {
    const blob = new Blob([html], { type: 'text/html' });
    await navigator.clipboard.write([new ClipboardItem({ 'text/html': blob })]);
    status.textContent = 'Signature copied! You can now paste it into your email settings.';
  } catch (richError) {
    try {
      await navigator.clipboard.writeText(html);
      status.textContent = 'Rich copy failed, but HTML code was copied as a fallback.';
    } catch (plainError) {
      status.textContent = 'Failed to copy signature.';
    }
  }
}
</script>
"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
    )
}

fn input_field(
    out: &mut String,
    field: FormField,
    label: &str,
    value: &str,
    kind: &str,
    required: bool,
    errors: Option<&FormError>,
) {
    let name = field.as_str();
    out.push_str(&format!(
        r#"<label for="{name}">{label}</label>
<input id="{name}" name="{name}" type="{kind}" value="{value}"{required}>"#,
        label = escape_html(label),
        value = escape_html(value),
        required = if required { " required" } else { "" },
    ));
    if let Some(message) = errors.and_then(|err| err.message_for(field)) {
        out.push_str(&format!(
            r#"<p class="field-error">{label} {message}</p>"#,
            label = escape_html(label.trim_end_matches(" *")),
        ));
    }
    out.push('\n');
}

/// The public submission form, optionally showing validation errors or a
/// failure banner.
pub fn form_page(form: &SignatureForm, errors: Option<&FormError>, banner: Option<&str>) -> String {
    let mut body = String::from(
        r#"<h1>Email Signature Generator</h1>
<p>Fill in your details below and generate a professional HTML signature for your emails.</p>
<section class="card">
<h2>Your Information</h2>
"#,
    );
    if let Some(message) = banner {
        body.push_str(&format!(
            "<div class=\"banner\">{}</div>\n",
            escape_html(message)
        ));
    }
    body.push_str("<form method=\"post\" action=\"/\">\n");
    input_field(&mut body, FormField::Name, "Full Name *", &form.name, "text", true, errors);
    input_field(&mut body, FormField::Title, "Job Title *", &form.title, "text", true, errors);
    input_field(
        &mut body,
        FormField::PhoneNumber,
        "Phone Number *",
        &form.phone_number,
        "tel",
        true,
        errors,
    );
    input_field(&mut body, FormField::Email, "Email *", &form.email, "email", true, errors);
    input_field(
        &mut body,
        FormField::MeetingLink,
        "Meeting Link",
        form.meeting_link.as_deref().unwrap_or_default(),
        "url",
        false,
        errors,
    );
    body.push_str("<button type=\"submit\">Generate Signature</button>\n</form>\n</section>\n");
    layout("Email Signature Generator", &body)
}

fn preview_block(html: &str) -> String {
    let escaped = escape_html(html);
    format!(
        r#"<h2>Preview</h2>
<iframe class="preview" sandbox srcdoc="{escaped}" title="Signature preview"></iframe>
<h2>HTML</h2>
<textarea id="signature-html" readonly>{escaped}</textarea>
<button type="button" onclick="copySignature()">Copy Signature</button><span id="copy-status" class="notice" role="status"></span>
"#
    )
}

/// Shown after a successful submission.
pub fn result_page(record: &SignatureRecord) -> String {
    let body = format!(
        r#"<h1>Your signature is ready</h1>
<section class="card">
{preview}
<a class="button secondary" href="/">Create another</a>
</section>
{COPY_SCRIPT}"#,
        preview = preview_block(&record.template_html),
    );
    layout("Your Email Signature", &body)
}

pub fn login_page(error: Option<&str>, email: &str) -> String {
    let banner = error
        .map(|message| format!(r#"<div class="banner">{}</div>"#, escape_html(message)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Admin Portal</h1>
<p>Sign in to view email signature submissions</p>
<section class="card">
{banner}
<form method="post" action="/admin/login">
<label for="email">Email</label>
<input id="email" name="email" type="email" value="{email}" required>
<label for="password">Password</label>
<input id="password" name="password" type="password" required>
<button type="submit">Sign In</button>
</form>
</section>"#,
        email = escape_html(email.trim()),
    );
    layout("Admin Login", &body)
}

fn logout_form() -> &'static str {
    r#"<form method="post" action="/admin/logout"><button type="submit" class="secondary">Log out</button></form>"#
}

/// Submission listing; `records` are expected newest first.
pub fn dashboard_page(admin_email: &str, records: &[SignatureRecord]) -> String {
    let latest = records
        .first()
        .map(|record| record.created_at.format("%b %d").to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut body = format!(
        r#"<div class="topbar"><div><h1>Admin Dashboard</h1><p>Signed in as {admin}</p></div>{logout}</div>
<div class="stats">
<section class="card"><div>Total Submissions</div><div class="stat-value">{total}</div><div>Email signatures generated</div></section>
<section class="card"><div>Latest Submission</div><div class="stat-value">{latest}</div><div>Most recent activity</div></section>
</div>
<section class="card">
<h2>All Submissions</h2>
"#,
        admin = escape_html(admin_email),
        logout = logout_form(),
        total = records.len(),
    );

    if records.is_empty() {
        body.push_str("<p>No submissions yet</p>\n");
    } else {
        body.push_str(
            "<table class=\"listing\">\n<thead><tr><th>Name</th><th>Title</th><th>Email</th><th>Phone</th><th>Created</th><th>Actions</th></tr></thead>\n<tbody>\n",
        );
        for record in records {
            body.push_str(&format!(
                r#"<tr><td>{name}</td><td>{title}</td><td>{email}</td><td>{phone}</td><td>{created}</td><td><a href="/admin/signatures/{id}">View</a></td></tr>"#,
                name = escape_html(&record.name),
                title = escape_html(&record.title),
                email = escape_html(&record.email),
                phone = escape_html(&record.phone_number),
                created = record.created_at.format("%b %d, %Y"),
                id = escape_html(&record.id),
            ));
            body.push('\n');
        }
        body.push_str("</tbody>\n</table>\n");
    }
    body.push_str("</section>\n");
    layout("Admin Dashboard", &body)
}

/// Every stored field of one submission plus the organization details that
/// went into its signature.
pub fn detail_page(record: &SignatureRecord, profile: &OrganizationProfile) -> String {
    let meeting = record
        .meeting_link
        .as_deref()
        .map(|link| escape_html(link).into_owned())
        .unwrap_or_else(|| "Not provided".to_string());
    let id = escape_html(&record.id);
    let body = format!(
        r#"<div class="topbar"><h1>{name}</h1><a class="button secondary" href="/admin/dashboard">Back to dashboard</a></div>
<section class="card">
<p>Created on {created}</p>
<dl class="fields">
<dt>Name</dt><dd>{name}</dd>
<dt>Title</dt><dd>{title}</dd>
<dt>Phone</dt><dd>{phone}</dd>
<dt>Email</dt><dd>{email}</dd>
<dt>Website</dt><dd><a href="{website_url}" target="_blank" rel="noopener noreferrer">{website}</a></dd>
<dt>Address</dt><dd>{address}</dd>
<dt>Meeting Link</dt><dd>{meeting}</dd>
</dl>
</section>
<section class="card">
{preview}
<p><a href="/admin/signatures/{id}/copy?format=text">Raw HTML</a></p>
</section>
{COPY_SCRIPT}"#,
        name = escape_html(&record.name),
        created = record.created_at.format("%B %d, %Y at %-I:%M %p UTC"),
        title = escape_html(&record.title),
        phone = escape_html(&record.phone_number),
        email = escape_html(&record.email),
        website_url = escape_html(&profile.website_url),
        website = escape_html(&profile.website_display),
        address = escape_html(&profile.address),
        preview = preview_block(&record.template_html),
    );
    layout("Signature Details", &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"<h1>Something went wrong</h1>
<section class="card"><div class="banner">{}</div><a class="button secondary" href="/">Home</a></section>"#,
        escape_html(message)
    );
    layout("Error", &body)
}
