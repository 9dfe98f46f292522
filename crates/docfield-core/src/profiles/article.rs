//! Product sheets and catalogue entries.

use crate::extraction::ValueProcessor;
use crate::models::profile::{DocumentProfile, FieldConfig, SemanticGroup};

use super::patterns::*;
use super::{pattern, processed};

pub(super) fn profile() -> DocumentProfile {
    DocumentProfile::new("article")
        .with_field(
            FieldConfig::new("reference")
                .with_synonyms(&["réf", "ref", "code article", "sku"])
                .with_pattern(processed(
                    &ARTICLE_REFERENCE,
                    "Référence: PROD-2024-789",
                    1,
                    ValueProcessor::Uppercase,
                ))
                .with_pattern(processed(&ARTICLE_CODE, "Code: AB-1200", 2, ValueProcessor::Uppercase)),
        )
        .with_field(
            FieldConfig::new("designation")
                .with_synonyms(&["libellé", "description", "nom du produit"])
                .with_pattern(processed(
                    &DESIGNATION,
                    "Désignation: Perceuse sans fil 18V",
                    1,
                    ValueProcessor::CollapseWhitespace,
                )),
        )
        .with_field(
            FieldConfig::new("quantity")
                .with_synonyms(&["qté", "qty", "qte"])
                .with_pattern(processed(&QUANTITY, "Quantité: 25", 1, ValueProcessor::Quantity)),
        )
        .with_field(
            FieldConfig::new("price")
                .with_synonyms(&["pu", "p.u.", "tarif", "prix de vente"])
                .with_pattern(processed(&PRICE, "Prix unitaire: 89.99", 1, ValueProcessor::Amount))
                .with_pattern(processed(&PRICE_WITH_CURRENCY, "89,99 €", 2, ValueProcessor::Amount)),
        )
        .with_field(
            FieldConfig::new("unit")
                .with_synonyms(&["unité de mesure", "uom"])
                .with_pattern(processed(&UNIT, "Unité: pièce", 1, ValueProcessor::Lowercase)),
        )
        .with_field(
            FieldConfig::new("category")
                .with_synonyms(&["catégorie", "famille"])
                .with_pattern(processed(
                    &CATEGORY,
                    "Catégorie: Outillage électrique",
                    1,
                    ValueProcessor::CollapseWhitespace,
                )),
        )
        .with_field(
            FieldConfig::new("supplier")
                .with_synonyms(&["fournisseur", "vendor"])
                .with_pattern(processed(
                    &SUPPLIER,
                    "Fournisseur: Outils Dupont SA",
                    1,
                    ValueProcessor::CollapseWhitespace,
                )),
        )
        .with_field(
            FieldConfig::new("barcode")
                .with_synonyms(&["ean", "ean13", "code-barres", "code barre", "gencod"])
                .with_pattern(pattern(&BARCODE, "EAN: 3401234567890", 1))
                .with_pattern(pattern(&BARE_EAN, "3401234567890", 2)),
        )
        .with_weight("reference", 2.0)
        .with_weight("designation", 1.5)
        .with_weight("quantity", 1.0)
        .with_weight("price", 1.5)
        .with_weight("unit", 0.5)
        .with_weight("category", 0.5)
        .with_weight("supplier", 0.5)
        .with_weight("barcode", 1.0)
        .with_semantic_group(SemanticGroup::new(
            "price",
            Some("price"),
            &["prix", "unitaire", "tarif", "montant", "eur", "euros", "ht", "ttc"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "quantity",
            Some("quantity"),
            &["quantité", "quantite", "qté", "nombre", "unités", "pièces", "stock"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "reference",
            Some("reference"),
            &["référence", "réf", "code", "article", "sku"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "designation",
            Some("designation"),
            &["désignation", "libellé", "description", "produit", "nom"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "category",
            Some("category"),
            &["catégorie", "famille", "gamme", "rayon"],
        ))
        .with_semantic_group(SemanticGroup::new(
            "supplier",
            Some("supplier"),
            &["fournisseur", "fabricant", "marque", "vendeur"],
        ))
}
