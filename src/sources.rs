//! Per-source extraction configuration and the extracted product shape.
//!
//! Selectors are fixed per deployment. Each retailer gets one
//! [`ExtractionRule`] describing where the product container, link, name and
//! price live in its listing markup, plus the literal text the site renders
//! when the filtered listing is empty.

use serde::{Deserialize, Serialize};

/// How to read product data out of one retailer's listing page.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// Locates each candidate product element.
    pub container_selector: &'static str,
    /// Locates the anchor inside a container. Supplies the href, and the
    /// display name when `name_selector` is absent.
    pub link_selector: &'static str,
    /// Optional dedicated name node. `None` falls back to the link text.
    pub name_selector: Option<&'static str>,
    /// Locates the price display node.
    pub price_selector: &'static str,
    /// Literal text whose presence anywhere in the rendered markup means
    /// "no stock", regardless of what the container query would return.
    pub out_of_stock_marker: &'static str,
    /// Base origin prepended to relative hrefs.
    pub link_prefix: &'static str,
}

/// One extracted item. Missing sub-nodes degrade field by field: empty name
/// or price, bare prefix link. Never an error, never a dropped item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub price: String,
}

/// One monitored retailer: a name for log tagging, an optional target URL
/// (`None` disables the source without code changes) and its extraction rule.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub name: &'static str,
    pub url: Option<String>,
    pub rule: ExtractionRule,
}

impl SourceConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.url = None;
        self
    }
}

const LDLC_URL: &str = "https://www.ldlc.com/informatique/pieces-informatique/carte-graphique-interne/c4684/+fdi-1+fv1026-5801+fv121-19183,19184.html";
const TOPACHAT_URL: &str = "https://www.topachat.com/pages/produits_cat_est_micro_puis_rubrique_est_wgfx_pcie_puis_ordre_est_P_puis_sens_est_ASC_puis_f_est_58-11447,11445|s-1.html";
const MATERIELNET_URL: &str = "https://www.materiel.net/carte-graphique/l426/+fdi-1+fv121-19183,19184/";

pub fn ldlc() -> SourceConfig {
    SourceConfig {
        name: "LDLC",
        url: Some(LDLC_URL.to_string()),
        rule: ExtractionRule {
            container_selector: ".listing-product .pdt-item",
            link_selector: ".pdt-desc a",
            name_selector: None,
            price_selector: ".price",
            out_of_stock_marker: "Aucun produit ne correspond à vos critères.",
            link_prefix: "https://www.ldlc.com",
        },
    }
}

pub fn top_achat() -> SourceConfig {
    SourceConfig {
        name: "TOP ACHAT",
        url: Some(TOPACHAT_URL.to_string()),
        rule: ExtractionRule {
            container_selector: ".produits.list .grille-produit",
            link_selector: ".libelle a:not(.avis)",
            name_selector: Some(".libelle a:not(.avis) h3"),
            price_selector: ".price",
            out_of_stock_marker:
                "Il n’y a aucun article correspondant aux valeurs de filtres que vous avez choisies.",
            link_prefix: "https://www.topachat.com",
        },
    }
}

pub fn materiel_net() -> SourceConfig {
    SourceConfig {
        name: "MATERIEL.NET",
        url: Some(MATERIELNET_URL.to_string()),
        rule: ExtractionRule {
            container_selector: "ul.c-products-list .c-products-list__item",
            link_selector: ".c-product__meta a.c-product__link",
            name_selector: None,
            price_selector: ".o-product__prices",
            out_of_stock_marker: "Aucun article ne correspond",
            link_prefix: "https://www.materiel.net",
        },
    }
}

/// Catalog of monitored retailers, in notification order.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![ldlc(), top_achat(), materiel_net()]
}
