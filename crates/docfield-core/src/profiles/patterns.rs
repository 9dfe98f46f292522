//! Regular expressions of the built-in profiles.
//!
//! Every labelled pattern accepts the canonical field name too, since the
//! corrector rewrites synonyms to it before extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Amount with optional thousands groups and up to two decimals
/// (`1 234,50`, `1.234,50`, `89.99`, `12`).
pub const AMOUNT: &str = r"\d{1,3}(?:[ \u{00a0}.]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?";

/// Numeric, ISO or long (`15 janvier 2024`) date.
pub const DATE: &str =
    r"\d{1,2}\s*[./\-]\s*\d{1,2}\s*[./\-]\s*\d{2,4}|\d{4}-\d{1,2}-\d{1,2}|\d{1,2}(?:er)?\s+\p{L}+\.?\s+\d{4}";

/// Document number: starts with a letter or digit and contains a digit.
pub const DOC_NUMBER: &str = r"[A-Z0-9][A-Z0-9\-/_.]*\d[A-Z0-9\-/_]*";

/// Follows an amount that must not be a percentage, including `20 %`.
const NOT_PERCENT: &str = r"[ \t]*(?:[^%\d.,\s]|\n|$)";

/// Free text after a label, up to the end of the line or the next
/// `Label:` on the same line.
const FREE_TEXT: &str = r"[^\s:][^\n:]*?";
const FREE_TEXT_END: &str = r"(?:[ \t]+[\p{L}_]+(?:[ \t]+[\p{L}_]+)?[ \t]*:|[ \t]*(?:\n|$))";

fn labelled(labels: &str, value: &str) -> Regex {
    build(&format!(r"(?i)\b(?:{labels})\b\s*[:#]?\s*({value})"))
}

fn labelled_text(labels: &str) -> Regex {
    build(&format!(
        r"(?i)\b(?:{labels})\b[ \t]*[:#][ \t]*({FREE_TEXT}){FREE_TEXT_END}"
    ))
}

fn build(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

lazy_static! {
    // Shared
    pub static ref SUPPLIER: Regex = labelled_text(r"supplier|fournisseur|vendor|[ée]metteur");

    pub static ref TOTAL_HT: Regex = build(&format!(
        r"(?i)\b(?:total_ht|total\s+h\.?t\.?|total\s+hors\s+taxes?|sous[- ]total|subtotal)\s*:?\s*({AMOUNT}){NOT_PERCENT}"
    ));

    pub static ref TOTAL_TVA: Regex = build(&format!(
        r"(?i)\b(?:total_tva|total\s+tva|tva|vat)(?:\s*\(?\s*\d+(?:[.,]\d+)?\s*%\s*\)?)?\s*:?\s*({AMOUNT}){NOT_PERCENT}"
    ));

    pub static ref TOTAL_TTC: Regex = build(&format!(
        r"(?i)\b(?:total_ttc|total\s+t\.?t\.?c\.?|net\s+[àa]\s+payer|total\s+[àa]\s+payer|amount\s+due|total)\s*:?\s*({AMOUNT}){NOT_PERCENT}"
    ));

    pub static ref VAT_RATE: Regex = build(
        r"(?i)\b(?:vat_rate|taux(?:\s+de)?\s+tva|tva|vat)\s*(?:\(\s*)?:?\s*(\d{1,2}(?:[.,]\d{1,2})?)\s*%"
    );

    // Article
    pub static ref ARTICLE_REFERENCE: Regex = build(
        r"(?i)\b(?:reference|r[ée]f[ée]rence)\s*[:#]?\s*([A-Z0-9][A-Z0-9\-_/.]*[A-Z0-9])"
    );

    pub static ref ARTICLE_CODE: Regex = build(
        r"(?i)\b(?:code(?:\s+article)?|sku|item\s+code)\s*[:#]?\s*([A-Z0-9][A-Z0-9\-_/.]*[A-Z0-9])"
    );

    pub static ref DESIGNATION: Regex = labelled_text(
        r"designation|d[ée]signation|description|libell[ée]|nom\s+du\s+produit|product\s+name"
    );

    pub static ref QUANTITY: Regex = build(
        r"(?i)\b(?:quantity|quantit[ée]|qt[ée])\s*:?\s*(\d+(?:[.,]\d+)?)"
    );

    pub static ref PRICE: Regex = build(&format!(
        r"(?i)\b(?:price|prix\s+unitaire|prix|unit\s+price)\s*(?:ht|ttc)?\s*:?\s*({AMOUNT}){NOT_PERCENT}"
    ));

    pub static ref PRICE_WITH_CURRENCY: Regex = build(&format!(
        r"(?i)({AMOUNT})\s*(?:€|eur\b|euros?\b)"
    ));

    pub static ref UNIT: Regex = labelled(
        r"unit|unit[ée](?:\s+de\s+mesure)?",
        r"(?:pi[èe]ces?|pcs?|kg|g|l|ml|m²|m2|m|cm|mm|bo[îi]tes?|cartons?|lots?|u)\b",
    );

    pub static ref CATEGORY: Regex = labelled_text(
        r"category|cat[ée]gorie|famille"
    );

    pub static ref BARCODE: Regex = labelled(
        r"barcode|code[- ]barres?|ean(?:13)?|gtin",
        r"(?:\d{12,14}|\d{8})\b",
    );

    pub static ref BARE_EAN: Regex = build(r"\b(\d{13})\b");

    // Invoice
    pub static ref INVOICE_NUMBER: Regex = build(&format!(
        r"(?i)\b(?:invoice_number\s*:?|(?:facture|invoice)\s*(?:n[°o]\.?|num[ée]ro|no\.?|number|#)\s*:?)\s*({DOC_NUMBER})"
    ));

    pub static ref INVOICE_NUMBER_BARE: Regex = build(&format!(
        r"(?i)\b(?:facture|invoice)\s+({DOC_NUMBER})"
    ));

    pub static ref INVOICE_DATE: Regex = build(&format!(
        r"(?i)\b(?:invoice_date|date\s+(?:de\s+(?:la\s+)?)?facture|date\s+d['’]?[ée]mission|invoice\s+date|date)\s*:?\s*({DATE})"
    ));

    pub static ref DUE_DATE: Regex = build(&format!(
        r"(?i)(?:\bdue_date|\bdate\s+d['’]?[ée]ch[ée]ance|\b[ée]ch[ée]ance|\bdue\s+date|\bpayable\s+(?:avant\s+)?le)\s*:?\s*({DATE})"
    ));

    pub static ref CURRENCY: Regex = labelled(r"currency|devise|monnaie", r"[A-Z]{3}\b|€|\$|£");

    pub static ref CURRENCY_AFTER_AMOUNT: Regex = build(
        r"(?i)\d\s?(€|\$|£|\beur\b|\busd\b|\bgbp\b|\bchf\b|\bmad\b)"
    );

    // Payment
    pub static ref PAYMENT_REFERENCE: Regex = build(&format!(
        r"(?i)\b(?:payment_reference|r[ée]f[ée]rence\s+(?:du\s+)?(?:paiement|r[èe]glement|virement)|payment\s+(?:ref(?:erence)?|id)|transaction)\s*(?:n[°o])?\s*[:#]?\s*({DOC_NUMBER})"
    ));

    pub static ref PAYMENT_DATE: Regex = build(&format!(
        r"(?i)\b(?:payment_date|date\s+(?:de\s+|du\s+)?(?:paiement|r[èe]glement|virement)|payment\s+date|pay[ée]\s+le|date)\s*:?\s*({DATE})"
    ));

    pub static ref PAYMENT_AMOUNT: Regex = build(&format!(
        r"(?i)\b(?:amount|montant(?:\s+(?:pay[ée]|r[ée]gl[ée]|vers[ée]))?|somme)\s*:?\s*({AMOUNT}){NOT_PERCENT}"
    ));

    pub static ref PAYMENT_METHOD: Regex = labelled_text(
        r"payment_method|mode\s+de\s+(?:paiement|r[èe]glement)|moyen\s+de\s+paiement|payment\s+method|pay[ée]\s+par"
    );

    pub static ref PAYMENT_METHOD_BARE: Regex = build(
        r"(?i)\b(virement(?:\s+bancaire)?|ch[èe]que|esp[èe]ces|carte\s+bancaire|carte|pr[ée]l[èe]vement)\b"
    );

    pub static ref PAID_INVOICE: Regex = build(&format!(
        r"(?i)\b(?:invoice_number|facture(?:\s+n[°o])?|invoice(?:\s+no)?)\s*[:#]?\s*({DOC_NUMBER})"
    ));

    pub static ref PAYER: Regex = labelled_text(
        r"payer|payeur|client|donneur\s+d['’]?ordre|[ée]metteur\s+du\s+paiement"
    );

    pub static ref BANK: Regex = labelled_text(
        r"bank|banque|[ée]tablissement"
    );

    // Quotation
    pub static ref QUOTATION_NUMBER: Regex = build(&format!(
        r"(?i)\b(?:quotation_number\s*:?|(?:devis|quotation|quote|offre)\s*(?:n[°o]\.?|num[ée]ro|no\.?|number|#)?\s*:?)\s*({DOC_NUMBER})"
    ));

    pub static ref QUOTATION_DATE: Regex = build(&format!(
        r"(?i)\b(?:quotation_date|date\s+(?:du\s+)?devis|quotation\s+date|date)\s*:?\s*({DATE})"
    ));

    pub static ref VALIDITY_DATE: Regex = build(&format!(
        r"(?i)\b(?:validity_date|valable\s+jusqu['’]?\s*au|valide\s+jusqu['’]?\s*au|date\s+de\s+validit[ée]|valid\s+until)\s*:?\s*({DATE})"
    ));

    pub static ref VALIDITY_DAYS: Regex = build(
        r"(?i)\b(?:valable|validit[ée]|valid\s+for)\s*:?\s*(\d{1,3})\s*(?:jours|days)\b"
    );

    pub static ref CLIENT: Regex = labelled_text(
        r"client|customer|destinataire|[àa]\s+l['’]?attention\s+de"
    );
}
