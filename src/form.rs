//! Client requirements: the data a specification request is built from.
//!
//! Everything here is plain data plus the small edit operations a form
//! front-end needs. Edits never fail; an index or id that does not exist
//! leaves the form untouched.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// One page or content block of the website being specified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteSection {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A complete generation request.
///
/// `sections` is declared last so the TOML form places `[[sections]]`
/// tables after the plain keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecFormData {
    pub client_name: String,
    pub industry: String,
    pub objectives: Vec<String>,
    pub target_audience: String,
    pub tech_requirements: Vec<String>,
    pub design_aesthetic: String,
    pub sections: Vec<WebsiteSection>,
}

impl SpecFormData {
    /// The pre-populated request the tool ships with.
    pub fn sample() -> Self {
        let section = |id: u32, title: &str, description: &str| WebsiteSection {
            id,
            title: title.to_owned(),
            description: description.to_owned(),
        };

        Self {
            client_name: "Dubai Strategy Partners".to_owned(),
            industry: "Boutique business setup and strategy consultancy".to_owned(),
            objectives: vec![
                "Lead Generation: Capture contact details of potential business clients.".to_owned(),
                "Establish Credibility: Position the firm as a trusted, expert authority.".to_owned(),
                "Educate Visitors: Provide valuable information about setting up a business in Dubai.".to_owned(),
            ],
            target_audience: "International entrepreneurs, existing UAE SMEs, and foreign companies exploring UAE market entry.".to_owned(),
            tech_requirements: vec![
                "Clean, corporate, and trustworthy design aesthetic.".to_owned(),
                "Mobile-first, responsive layout.".to_owned(),
                "Fast page load speeds.".to_owned(),
                "Integration with a CRM (like HubSpot or Zoho) for lead management.".to_owned(),
            ],
            design_aesthetic: "Clean, corporate, trustworthy, modern, premium.".to_owned(),
            sections: vec![
                section(
                    1,
                    "Homepage",
                    "A professional hero section with a clear value proposition (e.g., \"Your Expert Partner for Business Success in the UAE\"). Include trust signals like \"As seen in...\" or client logos.",
                ),
                section(
                    2,
                    "Our Services",
                    "A detailed breakdown of offerings (e.g., Mainland Company Formation, Free Zone Setup, Corporate Banking Assistance). Each service should have its own page.",
                ),
                section(
                    3,
                    "Why Dubai?",
                    "An informational section that 'sells' Dubai as a business hub, providing value to the visitor.",
                ),
                section(
                    4,
                    "Case Studies/Client Success",
                    "A portfolio showcasing successful projects and client testimonials.",
                ),
                section(
                    5,
                    "Insights/Blog",
                    "Expert articles on topics like \"Choosing the Right Free Zone\" or \"UAE Corporate Tax Explained\".",
                ),
                section(
                    6,
                    "About Us",
                    "Bios of the key partners, company mission, and values.",
                ),
                section(
                    7,
                    "Contact Us",
                    "A prominent \"Request a Free Consultation\" call-to-action, a detailed contact form, office address, and phone number.",
                ),
            ],
        }
    }

    // -- objectives --

    pub fn add_objective(&mut self) {
        self.objectives.push(String::new());
    }

    pub fn set_objective(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.objectives.get_mut(index) {
            *slot = value.into();
        }
    }

    pub fn remove_objective(&mut self, index: usize) {
        if index < self.objectives.len() {
            self.objectives.remove(index);
        }
    }

    // -- sections --

    /// Id the next added section receives: one past the largest id in use.
    pub fn next_section_id(&self) -> u32 {
        self.sections.iter().map(|s| s.id).max().map_or(1, |m| m + 1)
    }

    /// Append an empty section and return its id.
    ///
    /// Ids are never reused while a larger one exists, so removing a
    /// section in the middle does not make a later insert collide.
    pub fn add_section(&mut self) -> u32 {
        let id = self.next_section_id();
        self.sections.push(WebsiteSection {
            id,
            title: String::new(),
            description: String::new(),
        });
        id
    }

    pub fn section(&self, id: u32) -> Option<&WebsiteSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn set_section_title(&mut self, id: u32, title: impl Into<String>) {
        if let Some(s) = self.sections.iter_mut().find(|s| s.id == id) {
            s.title = title.into();
        }
    }

    pub fn set_section_description(&mut self, id: u32, description: impl Into<String>) {
        if let Some(s) = self.sections.iter_mut().find(|s| s.id == id) {
            s.description = description.into();
        }
    }

    pub fn remove_section(&mut self, id: u32) {
        self.sections.retain(|s| s.id != id);
    }

    // -- tech requirements --

    pub fn add_tech_requirement(&mut self) {
        self.tech_requirements.push(String::new());
    }

    pub fn set_tech_requirement(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.tech_requirements.get_mut(index) {
            *slot = value.into();
        }
    }

    pub fn remove_tech_requirement(&mut self, index: usize) {
        if index < self.tech_requirements.len() {
            self.tech_requirements.remove(index);
        }
    }

    /// Check the one structural invariant: section ids are unique.
    ///
    /// Empty strings are accepted everywhere.
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut seen = HashSet::with_capacity(self.sections.len());
        for s in &self.sections {
            if !seen.insert(s.id) {
                return Err(SpecError::DuplicateSectionId { id: s.id });
            }
        }
        Ok(())
    }

    /// Serialize to the TOML form accepted by [`load_form_file`].
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("failed to serialize form: {e}"))
    }
}

/// Read and validate a TOML form file.
pub fn load_form_file(path: &Path) -> Result<SpecFormData, SpecError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SpecError::FormFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            SpecError::InvalidFormFile {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        }
    })?;

    parse_form(&contents).map_err(|e| match e {
        SpecError::InvalidFormFile { detail, .. } => SpecError::InvalidFormFile {
            path: path.to_path_buf(),
            detail,
        },
        other => other,
    })
}

/// Parse TOML text into a validated form.
pub fn parse_form(contents: &str) -> Result<SpecFormData, SpecError> {
    let form: SpecFormData =
        toml::from_str(contents).map_err(|e| SpecError::InvalidFormFile {
            path: Default::default(),
            detail: e.to_string(),
        })?;
    form.validate()?;
    Ok(form)
}
