use crate::types::Marketplace;

/// Hostname substrings, checked in order. First match wins.
const DOMAIN_TABLE: &[(&str, Marketplace)] = &[
    ("avito", Marketplace::Avito),
    ("market.yandex", Marketplace::YandexMarket),
    ("ozon", Marketplace::Ozon),
    ("aliexpress", Marketplace::Aliexpress),
    ("ebay", Marketplace::Ebay),
];

pub fn identify_marketplace(hostname: &str) -> Option<Marketplace> {
    let hostname = hostname.to_ascii_lowercase();
    DOMAIN_TABLE
        .iter()
        .find(|(needle, _)| hostname.contains(needle))
        .map(|&(_, m)| m)
}

/// Where a marketplace keeps its listing data in the page markup.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionStrategy {
    /// One match per listing card.
    pub listing: &'static str,
    /// Tried in order inside each card; the card's own text is the fallback.
    pub title: &'static [&'static str],
    pub price: Option<PriceSource>,
    /// Text such as "1,024 sold"; digits are taken as the sales count.
    pub sales: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub enum PriceSource {
    /// Element text.
    Text(&'static str),
    /// Attribute on the matched element (e.g. schema.org `content`).
    Attr(&'static str, &'static str),
}

impl Marketplace {
    pub fn strategy(&self) -> ExtractionStrategy {
        match self {
            Marketplace::Avito => ExtractionStrategy {
                listing: r#"[data-marker="item"]"#,
                title: &[r#"[itemprop="name"]"#, r#"[data-marker="item-title"]"#],
                price: Some(PriceSource::Attr(r#"[itemprop="price"]"#, "content")),
                sales: None,
            },
            Marketplace::YandexMarket => ExtractionStrategy {
                listing: r#"[data-auto="snippet-cell"], article[data-autotest-id="product-snippet"]"#,
                title: &[r#"[data-auto="snippet-title"]"#, "h3"],
                price: Some(PriceSource::Text(r#"[data-auto="snippet-price-current"]"#)),
                sales: None,
            },
            Marketplace::Ozon => ExtractionStrategy {
                listing: r#".tile-root, [data-widget="searchResultsV2"] > div > div"#,
                title: &[".tsBody500Medium", "a span"],
                price: Some(PriceSource::Text(".tsHeadline500Medium")),
                sales: None,
            },
            Marketplace::Aliexpress => ExtractionStrategy {
                listing: ".search-item-card-wrapper-gallery, .product-card",
                title: &["h3", ".product-title"],
                price: Some(PriceSource::Text(r#"[class*="price-sale"]"#)),
                sales: Some(r#"[class*="trade"]"#),
            },
            Marketplace::Ebay => ExtractionStrategy {
                listing: "li.s-item, .s-card",
                title: &[".s-item__title", ".it-ttl"],
                price: Some(PriceSource::Text(".s-item__price")),
                sales: Some(".s-item__quantitySold, .s-item__hotness"),
            },
        }
    }
}
