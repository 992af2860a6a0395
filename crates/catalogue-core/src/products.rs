use serde::{Deserialize, Serialize};

pub type ProductId = i32;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 50;
pub const DETAILS_MAX_CHARS: usize = 1000;

/// A catalogue entry as stored and as served over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub details: Option<String>,
}

/// Title/details submitted for a create or an update, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub title: Option<String>,
    pub details: Option<String>,
}

/// A payload that passed every field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidProduct {
    pub title: String,
    pub details: Option<String>,
}

/// Which operation a payload is validated for; selects the message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Create,
    Update,
}

impl PayloadKind {
    fn key_prefix(self) -> &'static str {
        match self {
            PayloadKind::Create => "catalogue.products.create.errors.",
            PayloadKind::Update => "catalogue.products.update.errors.",
        }
    }
}

/// A failed field rule, carrying the message key to localize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message_key: String,
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Required,
    NotBlank,
    /// Inclusive bounds, counted in chars. Absent values pass.
    Length { min: usize, max: usize },
}

impl Rule {
    fn accepts(self, value: Option<&str>) -> bool {
        match (self, value) {
            (Rule::Required, v) => v.is_some(),
            (_, None) => true,
            (Rule::NotBlank, Some(v)) => !v.trim().is_empty(),
            (Rule::Length { min, max }, Some(v)) => (min..=max).contains(&v.chars().count()),
        }
    }
}

type FieldRules = (&'static str, &'static [(Rule, &'static str)]);

// Checked in order; only the first failure per field is reported.
const RULES: &[FieldRules] = &[
    (
        "title",
        &[
            (Rule::Required, "title_is_null"),
            (Rule::NotBlank, "title_is_blank"),
            (
                Rule::Length {
                    min: TITLE_MIN_CHARS,
                    max: TITLE_MAX_CHARS,
                },
                "title_size_is_invalid",
            ),
        ],
    ),
    (
        "details",
        &[(
            Rule::Length {
                min: 0,
                max: DETAILS_MAX_CHARS,
            },
            "details_size_is_invalid",
        )],
    ),
];

impl ProductPayload {
    #[must_use]
    pub fn new(title: impl Into<String>, details: Option<String>) -> Self {
        Self {
            title: Some(title.into()),
            details,
        }
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => self.title.as_deref(),
            "details" => self.details.as_deref(),
            _ => None,
        }
    }

    /// Run the field rules for `kind`.
    ///
    /// # Errors
    ///
    /// Returns every violation found, in field order, when any rule fails.
    pub fn validate(self, kind: PayloadKind) -> Result<ValidProduct, Vec<FieldViolation>> {
        let violations: Vec<FieldViolation> = RULES
            .iter()
            .filter_map(|&(field, rules)| {
                let value = self.field(field);
                rules
                    .iter()
                    .find(|(rule, _)| !rule.accepts(value))
                    .map(|(_, suffix)| FieldViolation {
                        field,
                        message_key: format!("{}{suffix}", kind.key_prefix()),
                    })
            })
            .collect();

        if !violations.is_empty() {
            return Err(violations);
        }

        match self.title {
            Some(title) => Ok(ValidProduct {
                title,
                details: self.details,
            }),
            // Unreachable: `Required` rejected a missing title above.
            None => Err(vec![FieldViolation {
                field: "title",
                message_key: format!("{}title_is_null", kind.key_prefix()),
            }]),
        }
    }
}
