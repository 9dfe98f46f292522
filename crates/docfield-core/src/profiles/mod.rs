//! Built-in document profiles.
//!
//! Each profile is plain [`DocumentProfile`] data; callers can serialize one
//! to JSON, edit it, and load it back with [`DocumentProfile::from_file`].

mod article;
mod invoice;
pub mod patterns;
mod payment;
mod quotation;

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::ProfileError;
use crate::extraction::ValueProcessor;
use crate::models::profile::{
    ColumnRole, ColumnSpec, DocumentProfile, FieldConfig, PatternConfig, SemanticGroup, TableSpec,
};

/// Document kinds with a built-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Article,
    Invoice,
    Payment,
    Quotation,
}

impl DocumentKind {
    pub fn all() -> [DocumentKind; 4] {
        [
            DocumentKind::Article,
            DocumentKind::Invoice,
            DocumentKind::Payment,
            DocumentKind::Quotation,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DocumentKind::Article => "article",
            DocumentKind::Invoice => "invoice",
            DocumentKind::Payment => "payment",
            DocumentKind::Quotation => "quotation",
        }
    }

    /// Build the profile for this kind.
    pub fn profile(&self) -> DocumentProfile {
        match self {
            DocumentKind::Article => article::profile(),
            DocumentKind::Invoice => invoice::profile(),
            DocumentKind::Payment => payment::profile(),
            DocumentKind::Quotation => quotation::profile(),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentKind {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "article" | "product" | "produit" => Ok(DocumentKind::Article),
            "invoice" | "facture" => Ok(DocumentKind::Invoice),
            "payment" | "paiement" | "reglement" | "règlement" => Ok(DocumentKind::Payment),
            "quotation" | "quote" | "devis" => Ok(DocumentKind::Quotation),
            other => Err(ProfileError::UnknownKind(other.to_string())),
        }
    }
}

fn pattern(regex: &Regex, example: &str, priority: u32) -> PatternConfig {
    PatternConfig::new(regex.clone(), example, priority)
}

fn processed(regex: &Regex, example: &str, priority: u32, processor: ValueProcessor) -> PatternConfig {
    pattern(regex, example, priority).with_processor(processor)
}

/// HT, VAT and TTC totals shared by invoices and quotations.
fn total_fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::new("total_ht")
            .with_synonyms(&["montant ht", "total hors taxe", "total hors taxes", "net ht"])
            .with_pattern(processed(&patterns::TOTAL_HT, "Total HT: 1 250,00", 1, ValueProcessor::Amount)),
        FieldConfig::new("total_tva")
            .with_synonyms(&["montant tva", "vat amount"])
            .with_pattern(processed(&patterns::TOTAL_TVA, "TVA 20%: 250,00", 1, ValueProcessor::Amount)),
        FieldConfig::new("total_ttc")
            .with_synonyms(&["montant ttc", "net à payer", "total à payer", "amount due"])
            .with_pattern(processed(&patterns::TOTAL_TTC, "Total TTC: 1 500,00", 1, ValueProcessor::Amount)),
    ]
}

fn total_groups() -> Vec<SemanticGroup> {
    vec![
        SemanticGroup::new("total_ht", Some("total_ht"), &["total", "montant", "hors", "taxe", "taxes", "ht"]),
        SemanticGroup::new("total_tva", Some("total_tva"), &["total", "montant", "tva", "taxe", "vat"]),
        SemanticGroup::new("total_ttc", Some("total_ttc"), &["total", "montant", "ttc", "net", "payer", "toutes", "taxes"]),
    ]
}

/// Line-item table of invoices and quotations.
fn line_item_table() -> TableSpec {
    TableSpec::new(vec![
        ColumnSpec::new(
            ColumnRole::Description,
            &["désignation", "description", "article", "libellé", "produit", "prestation"],
        ),
        ColumnSpec::new(ColumnRole::Quantity, &["qté", "quantité", "qty", "quantity", "qte"]),
        ColumnSpec::new(
            ColumnRole::UnitPrice,
            &["prix unitaire", "p.u.", "pu", "prix", "unit price"],
        ),
        ColumnSpec::new(ColumnRole::Discount, &["remise", "discount"]),
        ColumnSpec::new(ColumnRole::Total, &["total", "montant", "total_ht", "total_ttc", "amount"]),
    ])
    .with_summary_keywords(&["acompte", "remise globale", "frais de port"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_profiles_validate() {
        for kind in DocumentKind::all() {
            let profile = kind.profile();
            assert_eq!(profile.name, kind.name());
            profile.validate().unwrap();
            assert!(!profile.fields.is_empty());
            for field in &profile.fields {
                assert!(profile.weight(&field.name).is_some(), "{} has no weight", field.name);
            }
        }
    }

    #[test]
    fn test_builtin_profiles_survive_json() {
        for kind in DocumentKind::all() {
            let profile = kind.profile();
            let json = profile.to_json_pretty().unwrap();
            let parsed = DocumentProfile::from_json(&json).unwrap();
            assert_eq!(parsed.fields.len(), profile.fields.len());
            assert_eq!(parsed.table.is_some(), profile.table.is_some());
            assert_eq!(
                parsed.fields[0].patterns[0].regex.as_str(),
                profile.fields[0].patterns[0].regex.as_str()
            );
        }
    }

    #[test]
    fn test_examples_match_their_patterns() {
        for kind in DocumentKind::all() {
            for field in kind.profile().fields {
                for pattern in &field.patterns {
                    assert!(
                        pattern.regex.is_match(&pattern.example),
                        "{} pattern {} does not match {:?}",
                        field.name,
                        pattern.priority,
                        pattern.example
                    );
                }
            }
        }
    }

    #[test]
    fn test_patterns_accept_canonical_labels() {
        for kind in DocumentKind::all() {
            let profile = kind.profile();
            for field in profile.fields.iter().filter(|f| !f.synonyms.is_empty()) {
                let labelled = field
                    .patterns
                    .iter()
                    .any(|p| p.regex.as_str().contains(field.name.as_str()));
                assert!(labelled, "{}: no pattern reads the canonical label", field.name);
            }
        }
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Invoice".parse::<DocumentKind>().unwrap(), DocumentKind::Invoice);
        assert_eq!("devis".parse::<DocumentKind>().unwrap(), DocumentKind::Quotation);
        assert!(matches!(
            "receipt".parse::<DocumentKind>(),
            Err(ProfileError::UnknownKind(_))
        ));
    }
}
