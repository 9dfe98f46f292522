//! Payment notices and remittance advices.

use crate::extraction::{LookupEntry, ValueProcessor};
use crate::models::profile::{DocumentProfile, FieldConfig, SemanticGroup};

use super::patterns::*;
use super::processed;

fn payment_methods() -> ValueProcessor {
    ValueProcessor::Lookup {
        entries: vec![
            LookupEntry::new("virement", "transfer"),
            LookupEntry::new("transfer", "transfer"),
            LookupEntry::new("cheque", "check"),
            LookupEntry::new("especes", "cash"),
            LookupEntry::new("cash", "cash"),
            LookupEntry::new("prelevement", "direct_debit"),
            LookupEntry::new("carte", "card"),
            LookupEntry::new("card", "card"),
        ],
        fallback: None,
    }
}

pub(super) fn profile() -> DocumentProfile {
    DocumentProfile::new("payment")
        .with_field(
            FieldConfig::new("payment_reference")
                .with_synonyms(&["référence du virement", "référence de paiement", "réf. paiement"])
                .with_pattern(processed(
                    &PAYMENT_REFERENCE,
                    "Référence du paiement: VIR-2024-5581",
                    1,
                    ValueProcessor::Uppercase,
                )),
        )
        .with_field(
            FieldConfig::new("payment_date")
                .with_synonyms(&["date de paiement", "date du règlement", "payé le"])
                .with_pattern(processed(&PAYMENT_DATE, "Date de paiement: 20/03/2024", 1, ValueProcessor::Date)),
        )
        .with_field(
            FieldConfig::new("amount")
                .with_synonyms(&["montant payé", "montant réglé", "somme versée"])
                .with_pattern(processed(&PAYMENT_AMOUNT, "Montant payé: 1 500,00", 1, ValueProcessor::Amount)),
        )
        .with_field(
            FieldConfig::new("payment_method")
                .with_synonyms(&["mode de paiement", "mode de règlement", "moyen de paiement"])
                .with_pattern(processed(&PAYMENT_METHOD, "Mode de paiement: Virement", 1, payment_methods()))
                .with_pattern(processed(&PAYMENT_METHOD_BARE, "Réglé par chèque", 2, payment_methods())),
        )
        .with_field(
            FieldConfig::new("invoice_number")
                .with_synonyms(&["facture n°", "n° facture", "numéro de facture"])
                .with_pattern(processed(
                    &PAID_INVOICE,
                    "Facture n° FA-2024-0042",
                    1,
                    ValueProcessor::Uppercase,
                )),
        )
        .with_field(
            FieldConfig::new("payer")
                .with_synonyms(&["payeur", "donneur d'ordre"])
                .with_pattern(processed(
                    &PAYER,
                    "Donneur d'ordre: Martin Bâtiment SARL",
                    1,
                    ValueProcessor::CollapseWhitespace,
                )),
        )
        .with_field(
            FieldConfig::new("bank")
                .with_synonyms(&["banque"])
                .with_pattern(processed(&BANK, "Banque: Crédit Agricole", 1, ValueProcessor::CollapseWhitespace)),
        )
        .with_weight("payment_reference", 1.5)
        .with_weight("payment_date", 1.5)
        .with_weight("amount", 2.0)
        .with_weight("payment_method", 1.0)
        .with_weight("invoice_number", 1.0)
        .with_weight("payer", 1.0)
        .with_weight("bank", 0.5)
        .with_semantic_group(SemanticGroup::new(
            "payment_reference",
            Some("payment_reference"),
            &["référence", "virement", "transaction", "paiement"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "payment_date",
            Some("payment_date"),
            &["date", "paiement", "règlement", "payé"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "amount",
            Some("amount"),
            &["montant", "somme", "payé", "réglé", "versé"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "payment_method",
            Some("payment_method"),
            &["mode", "moyen", "paiement", "règlement"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "invoice_number",
            Some("invoice_number"),
            &["facture", "numéro"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "payer",
            Some("payer"),
            &["payeur", "donneur", "ordre", "client"],
        ))
        .with_semantic_group(SemanticGroup::new("bank", Some("bank"), &["banque", "établissement"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{FieldCorrector, PatternExtractor};
    use pretty_assertions::assert_eq;

    const NOTICE: &str = "Avis de virement\n\
                          Référence du virement: VIR-2024-5581\n\
                          Date de paiement: 20/03/2024\n\
                          Montant payé: 1 500,00 EUR\n\
                          Mode de paiement: Virement bancaire\n\
                          Facture n° FA-2024-0042\n\
                          Donneur d'ordre: Martin Bâtiment SARL\n\
                          Banque: Crédit Agricole";

    fn extract(text: &str, field: &str) -> Option<String> {
        let profile = profile();
        let corrected = FieldCorrector::default().correct(text, &profile).text;
        PatternExtractor::default()
            .extract_field(&corrected, profile.field(field)?)
            .map(|f| f.value)
    }

    #[test]
    fn test_notice_fields() {
        assert_eq!(extract(NOTICE, "payment_reference").as_deref(), Some("VIR-2024-5581"));
        assert_eq!(extract(NOTICE, "payment_date").as_deref(), Some("2024-03-20"));
        assert_eq!(extract(NOTICE, "amount").as_deref(), Some("1500.00"));
        assert_eq!(extract(NOTICE, "payment_method").as_deref(), Some("transfer"));
        assert_eq!(extract(NOTICE, "invoice_number").as_deref(), Some("FA-2024-0042"));
        assert_eq!(extract(NOTICE, "payer").as_deref(), Some("Martin Bâtiment SARL"));
        assert_eq!(extract(NOTICE, "bank").as_deref(), Some("Crédit Agricole"));
    }

    #[test]
    fn test_bank_name_repeating_the_label() {
        let correction = FieldCorrector::default().correct("Banque: Banque Populaire", &profile());
        assert_eq!(correction.corrections.len(), 1);
        assert_eq!(extract("Banque: Banque Populaire", "bank").as_deref(), Some("Banque Populaire"));
    }

    #[test]
    fn test_method_without_label() {
        assert_eq!(
            extract("Réglé par chèque le 05/04/2024", "payment_method").as_deref(),
            Some("check")
        );
    }

    #[test]
    fn test_unknown_method_kept_as_written() {
        assert_eq!(
            extract("Mode de paiement: Bitcoin", "payment_method").as_deref(),
            Some("Bitcoin")
        );
    }
}
