//! Supplier invoices.

use crate::extraction::ValueProcessor;
use crate::models::profile::{DocumentProfile, FieldConfig, SemanticGroup};

use super::patterns::*;
use super::{line_item_table, processed, total_fields, total_groups};

pub(super) fn profile() -> DocumentProfile {
    let mut profile = DocumentProfile::new("invoice")
        .with_field(
            FieldConfig::new("invoice_number")
                .with_synonyms(&["numéro de facture", "n° de facture", "invoice no"])
                .with_pattern(processed(
                    &INVOICE_NUMBER,
                    "Facture N° FA-2024-0042",
                    1,
                    ValueProcessor::Uppercase,
                ))
                .with_pattern(processed(
                    &INVOICE_NUMBER_BARE,
                    "Facture FA-2024-0042",
                    2,
                    ValueProcessor::Uppercase,
                )),
        )
        .with_field(
            FieldConfig::new("invoice_date")
                .with_synonyms(&["date de facture", "date d'émission", "invoice date"])
                .with_pattern(processed(&INVOICE_DATE, "Date de facture: 15/01/2024", 1, ValueProcessor::Date)),
        )
        .with_field(
            FieldConfig::new("due_date")
                .with_synonyms(&["date d'échéance", "échéance", "due date"])
                .with_pattern(processed(&DUE_DATE, "Date d'échéance: 14/02/2024", 1, ValueProcessor::Date)),
        )
        .with_field(
            FieldConfig::new("supplier")
                .with_synonyms(&["fournisseur", "émetteur", "vendor"])
                .with_pattern(processed(
                    &SUPPLIER,
                    "Fournisseur: Outils Dupont SA",
                    1,
                    ValueProcessor::CollapseWhitespace,
                )),
        );

    for field in total_fields() {
        profile = profile.with_field(field);
    }

    let mut profile = profile
        .with_field(
            FieldConfig::new("currency")
                .with_synonyms(&["devise"])
                .with_pattern(processed(&CURRENCY, "Devise: EUR", 1, ValueProcessor::Currency))
                .with_pattern(processed(&CURRENCY_AFTER_AMOUNT, "120,00 €", 2, ValueProcessor::Currency)),
        )
        .with_field(
            FieldConfig::new("vat_rate")
                .with_synonyms(&["taux de tva", "taux tva", "vat rate"])
                .with_pattern(processed(&VAT_RATE, "TVA 20%", 1, ValueProcessor::Percentage)),
        )
        .with_weight("invoice_number", 2.0)
        .with_weight("invoice_date", 1.5)
        .with_weight("due_date", 0.5)
        .with_weight("supplier", 1.0)
        .with_weight("total_ht", 1.5)
        .with_weight("total_tva", 1.0)
        .with_weight("total_ttc", 2.0)
        .with_weight("currency", 0.5)
        .with_weight("vat_rate", 0.5)
        .with_table(line_item_table())
        .with_semantic_group(SemanticGroup::new(
            "invoice_number",
            Some("invoice_number"),
            &["facture", "numéro", "invoice", "number"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "invoice_date",
            Some("invoice_date"),
            &["date", "facture", "émission", "émise"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "due_date",
            Some("due_date"),
            &["échéance", "date", "payable", "limite", "due"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "supplier",
            Some("supplier"),
            &["fournisseur", "émetteur", "vendeur", "société"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "currency",
            Some("currency"),
            &["devise", "monnaie", "eur", "euros"],
        ))
        .with_semantic_group(SemanticGroup::new("vat_rate", Some("vat_rate"), &["taux", "tva", "vat"]));

    for group in total_groups() {
        profile = profile.with_semantic_group(group);
    }
    profile
}
