//! Prompt assembly for website specification requests.
//!
//! [`website_spec`] is the single place where form data becomes the text
//! sent to the generation endpoint. It is pure: the same form always yields
//! the same bytes, and no input (empty strings, empty lists, missing
//! services section) can make it fail.
//!
//! Two text heuristics are kept on purpose because changing them changes
//! the prompt:
//!
//! - the target audience is split into bullets on every `", "`, including
//!   commas inside a phrase;
//! - service sub-pages come from the first parenthesised group in the
//!   description of the first section whose title mentions "services".

use std::sync::OnceLock;

use regex::Regex;

use crate::form::{SpecFormData, WebsiteSection};

/// Detail used for a tech requirement that has no `": "` separator.
pub const TECH_DETAIL_PLACEHOLDER: &str = "Details to be specified.";

/// Fixed subsection headings, in emission order.
pub const SECTION_HEADINGS: [&str; 8] = [
    "Client & Project Brief",
    "Project Overview & Core Objectives",
    "Target Audience",
    "Site Architecture & Sitemap",
    "Page-by-Page Feature Breakdown",
    "Functional & Technical Requirements",
    "Design & UX/UI Guidelines",
    "Recommended Technology Stack",
];

const BULLET: &str = "*   ";
const NESTED_BULLET: &str = "    *   ";
const RULE: &str = "\n---\n\n";

const PREAMBLE: &str = "You are an expert web development consultant and project manager. \
Your task is to generate a comprehensive, professional website specification document based on \
the following client requirements. The document must be well-structured, clear, and actionable \
for a web development team.\n\n\
Use Markdown for formatting. Ensure the output is detailed and covers all aspects of the project.\n";

const SITEMAP_TAIL: &str = "*   **/why-dubai**
*   **/case-studies**
*   **/insights** (Blog/Articles main page)
    *   /insights/[article-slug] (Individual article page)
*   **/about-us**
*   **/contact-us** (With a free consultation form)
*   **/privacy-policy**
*   **/terms-of-service**
";

const STANDARD_TECH_REQUIREMENTS: &str = "*   **Analytics:** Integration with Google Analytics 4 for traffic analysis and conversion tracking.
*   **SEO:** Implementation of SEO best practices including semantic HTML, meta tags, structured data (Schema.org), and an auto-generated sitemap.xml.
*   **Security:** Standard security measures including HTTPS, protection against common vulnerabilities (XSS, CSRF), and secure handling of form data.
";

const DESIGN_GUIDELINES: &str = "*   **Color Palette:** A corporate and trustworthy palette. Suggested: Deep Navy Blue (#0A2342), Gold Accent (#D4AF37), Light Gray (#F5F5F5), and Crisp White (#FFFFFF).
*   **Typography:** A clean, sans-serif font pairing. E.g., 'Inter' or 'Poppins' for headings and 'Open Sans' for body text.
*   **Imagery:** High-quality, professional photography of Dubai's business districts (DIFC, Downtown), modern office interiors, and diverse teams. Avoid generic stock photos.
*   **Layout:** A clean, grid-based layout with ample white space to convey sophistication and readability. The layout must be fully responsive and optimized for all screen sizes, from mobile to large desktops.
";

const TECHNOLOGY_STACK: &str = "*   **Frontend:** React (with Next.js) for high performance, SEO benefits, and a modern development experience.
*   **Styling:** Tailwind CSS for a utility-first, highly customizable, and maintainable design system.
*   **Content Management:** A Headless CMS (e.g., Sanity, Contentful, or Strapi) to allow the client to easily update content for services, case studies, and blog posts without developer intervention.
*   **Deployment:** Vercel or Netlify for seamless CI/CD, scalability, and performance.
";

static PAREN_GROUP_RE: OnceLock<Regex> = OnceLock::new();

fn paren_group_re() -> &'static Regex {
    PAREN_GROUP_RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("valid literal regex"))
}

/// Build the full generation prompt for `form`.
pub fn website_spec(form: &SpecFormData) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str(PREAMBLE);
    out.push_str(RULE);

    push_heading(&mut out, None, SECTION_HEADINGS[0]);
    out.push_str(&format!("{BULLET}**Client Name:** {}\n", form.client_name));
    out.push_str(&format!("{BULLET}**Industry:** {}\n", form.industry));
    out.push_str(&format!(
        "{BULLET}**Design Aesthetic Keywords:** {}\n",
        form.design_aesthetic
    ));
    out.push_str(RULE);

    push_heading(&mut out, Some(1), SECTION_HEADINGS[1]);
    out.push_str(&format!(
        "The primary goal is to develop a professional, lead-generating website for {}. \
         The website must serve as a digital flagship, establishing credibility and authority \
         in the competitive Dubai market.\n\n",
        form.client_name
    ));
    out.push_str("**Key business objectives are:**\n");
    out.push_str(&objectives_list(&form.objectives));
    out.push('\n');
    out.push_str(RULE);

    push_heading(&mut out, Some(2), SECTION_HEADINGS[2]);
    out.push_str(
        "The website must be designed and written to appeal to the following audience segments:\n",
    );
    out.push_str(&audience_list(&form.target_audience));
    out.push('\n');
    out.push_str(RULE);

    push_heading(&mut out, Some(3), SECTION_HEADINGS[3]);
    out.push_str("Based on the required sections, here is a proposed sitemap:\n\n");
    out.push_str(&format!("{BULLET}**/ (Homepage)**\n"));
    out.push_str(&format!(
        "{BULLET}**/services** (Main services overview page)\n"
    ));
    for slug in service_slugs(&form.sections) {
        out.push_str(&format!("{NESTED_BULLET}/services/{slug}\n"));
    }
    out.push_str(SITEMAP_TAIL);
    out.push_str(RULE);

    push_heading(&mut out, Some(4), SECTION_HEADINGS[4]);
    out.push_str(
        "Below is a detailed breakdown of the content, features, and call-to-actions (CTAs) \
         for each key page.\n\n",
    );
    out.push_str(&section_breakdown(&form.sections));
    out.push_str(RULE);

    push_heading(&mut out, Some(5), SECTION_HEADINGS[5]);
    out.push_str(
        "This section outlines the non-page-specific technical requirements for the project.\n\n",
    );
    for req in &form.tech_requirements {
        out.push_str(&tech_requirement_line(req));
        out.push('\n');
    }
    out.push_str(STANDARD_TECH_REQUIREMENTS);
    out.push_str(RULE);

    push_heading(&mut out, Some(6), SECTION_HEADINGS[6]);
    out.push_str(DESIGN_GUIDELINES);
    out.push_str(RULE);

    push_heading(&mut out, Some(7), SECTION_HEADINGS[7]);
    out.push_str(TECHNOLOGY_STACK);

    out
}

fn push_heading(out: &mut String, number: Option<u32>, title: &str) {
    match number {
        Some(n) => out.push_str(&format!("## **{n}. {title}**\n\n")),
        None => out.push_str(&format!("## **{title}**\n\n")),
    }
}

/// One bullet per objective, in order. Blank objectives still get a bullet.
pub fn objectives_list(objectives: &[String]) -> String {
    objectives
        .iter()
        .map(|o| format!("{BULLET}{o}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split free-text audience into bullets on every literal `", "`.
pub fn audience_list(audience: &str) -> String {
    format!("{BULLET}{}", audience.replace(", ", &format!("\n{BULLET}")))
}

/// Slugs for nested `/services/...` sitemap entries.
///
/// Looks only at the first section whose title contains "services"
/// (case-insensitive) and only at the first `( ... )` group in its
/// description. Anything missing yields an empty list.
pub fn service_slugs(sections: &[WebsiteSection]) -> Vec<String> {
    let Some(services) = sections
        .iter()
        .find(|s| s.title.to_lowercase().contains("services"))
    else {
        return Vec::new();
    };

    let Some(caps) = paren_group_re().captures(&services.description) else {
        return Vec::new();
    };

    caps[1].split(", ").map(slugify).collect()
}

/// Lowercase and replace spaces with hyphens.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Every section, in order, as a level-3 heading followed by its description.
pub fn section_breakdown(sections: &[WebsiteSection]) -> String {
    let mut out = String::new();
    for s in sections {
        out.push_str(&format!("### {}\n{}\n\n", s.title, s.description));
    }
    out
}

/// `"Label: detail"` becomes `*   **Label**: detail`; without a `": "`
/// the whole entry is the label and the detail is a placeholder.
pub fn tech_requirement_line(requirement: &str) -> String {
    let (label, detail) = requirement
        .split_once(": ")
        .unwrap_or((requirement, TECH_DETAIL_PLACEHOLDER));
    format!("{BULLET}**{label}**: {detail}")
}
