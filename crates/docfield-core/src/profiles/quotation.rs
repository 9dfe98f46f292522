//! Quotations and estimates.

use crate::extraction::ValueProcessor;
use crate::models::profile::{DocumentProfile, FieldConfig, SemanticGroup};

use super::patterns::*;
use super::{line_item_table, processed, total_fields, total_groups};

pub(super) fn profile() -> DocumentProfile {
    let mut profile = DocumentProfile::new("quotation")
        .with_field(
            FieldConfig::new("quotation_number")
                .with_synonyms(&["numéro de devis", "n° de devis", "quote no"])
                .with_pattern(processed(
                    &QUOTATION_NUMBER,
                    "Devis N° DV-2024-015",
                    1,
                    ValueProcessor::Uppercase,
                )),
        )
        .with_field(
            FieldConfig::new("quotation_date")
                .with_synonyms(&["date du devis", "date de devis", "quote date"])
                .with_pattern(processed(&QUOTATION_DATE, "Date du devis: 10/01/2024", 1, ValueProcessor::Date)),
        )
        .with_field(
            FieldConfig::new("validity_date")
                .with_synonyms(&["valable jusqu'au", "valide jusqu'au", "date de validité", "valid until"])
                .with_pattern(processed(
                    &VALIDITY_DATE,
                    "Valable jusqu'au 10/02/2024",
                    1,
                    ValueProcessor::Date,
                )),
        )
        .with_field(
            FieldConfig::new("validity_days")
                .with_pattern(processed(&VALIDITY_DAYS, "Offre valable 30 jours", 1, ValueProcessor::Quantity)),
        )
        .with_field(
            FieldConfig::new("client")
                .with_synonyms(&["destinataire", "customer"])
                .with_pattern(processed(
                    &CLIENT,
                    "Client: Martin Bâtiment SARL",
                    1,
                    ValueProcessor::CollapseWhitespace,
                )),
        );

    for field in total_fields() {
        profile = profile.with_field(field);
    }

    let mut profile = profile
        .with_weight("quotation_number", 2.0)
        .with_weight("quotation_date", 1.5)
        .with_weight("validity_date", 0.5)
        .with_weight("validity_days", 0.5)
        .with_weight("client", 1.0)
        .with_weight("total_ht", 1.5)
        .with_weight("total_tva", 1.0)
        .with_weight("total_ttc", 2.0)
        .with_table(line_item_table())
        .with_semantic_group(SemanticGroup::new(
            "quotation_number",
            Some("quotation_number"),
            &["devis", "numéro", "offre", "quotation"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "quotation_date",
            Some("quotation_date"),
            &["date", "devis", "établi"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "validity_date",
            Some("validity_date"),
            &["valable", "valide", "validité", "jusqu'au"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "client",
            Some("client"),
            &["client", "destinataire", "attention"],
        ));

    for group in total_groups() {
        profile = profile.with_semantic_group(group);
    }
    profile
}
