//! robots.txt and sitemap.xml generation.

use askama::Template;
use chrono::{DateTime, Utc};

use crate::models::{Page, Product, SeoSettings};

const DEFAULT_ROBOTS: &str = "User-agent: *\nAllow: /\nDisallow: /api/\nDisallow: /admin/\n";

/// One `<url>` entry.
#[derive(Debug, Clone)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: String,
    pub changefreq: &'static str,
    pub priority: &'static str,
}

#[derive(Template)]
#[template(path = "sitemap.xml")]
struct SitemapTemplate<'a> {
    urls: &'a [SitemapUrl],
}

/// The robots.txt body.
///
/// Uses the configured text or a default; when the sitemap is enabled a
/// `Sitemap:` line is appended unless one is already present.
#[must_use]
pub fn robots_txt(seo: &SeoSettings, base_url: &str) -> String {
    let mut body = seo
        .robots_txt
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(DEFAULT_ROBOTS)
        .to_owned();

    let has_sitemap = body
        .lines()
        .any(|line| line.trim_start().to_ascii_lowercase().starts_with("sitemap:"));

    if seo.sitemap_enabled && !has_sitemap {
        if !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&format!("\nSitemap: {base_url}/sitemap.xml\n"));
    }

    body
}

/// Sitemap entries: home, catalog, every product and every active page.
#[must_use]
pub fn sitemap_urls(
    base_url: &str,
    products: &[Product],
    pages: &[Page],
    now: DateTime<Utc>,
) -> Vec<SitemapUrl> {
    let date = |at: DateTime<Utc>| at.format("%Y-%m-%d").to_string();

    let mut urls = vec![
        SitemapUrl {
            loc: format!("{base_url}/"),
            lastmod: date(now),
            changefreq: "daily",
            priority: "1.0",
        },
        SitemapUrl {
            loc: format!("{base_url}/catalog"),
            lastmod: date(now),
            changefreq: "daily",
            priority: "0.9",
        },
    ];

    urls.extend(products.iter().map(|product| SitemapUrl {
        loc: format!("{base_url}/products/{}", product.slug),
        lastmod: date(product.updated_at.unwrap_or(product.created_at)),
        changefreq: "weekly",
        priority: "0.8",
    }));

    urls.extend(pages.iter().filter(|page| page.active).map(|page| SitemapUrl {
        loc: format!("{base_url}/pages/{}", page.slug),
        lastmod: date(page.updated_at.unwrap_or(page.created_at)),
        changefreq: "monthly",
        priority: "0.5",
    }));

    urls
}

/// Render the sitemap document.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn render_sitemap(urls: &[SitemapUrl]) -> Result<String, askama::Error> {
    SitemapTemplate { urls }.render()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nexx_core::{PageId, ProductId, Slug};
    use rust_decimal::Decimal;

    use super::*;

    fn product(slug: &str) -> Product {
        Product {
            id: ProductId::generate(),
            name: slug.to_owned(),
            description: None,
            part_number: "1".to_owned(),
            brand: "JCB".to_owned(),
            category: "Прочее".to_owned(),
            price: Decimal::ONE,
            image_url: None,
            slug: Slug::parse(slug).unwrap(),
            stock_quantity: 1,
            in_stock: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn page(slug: &str, active: bool) -> Page {
        Page {
            id: PageId::generate(),
            title: slug.to_owned(),
            slug: Slug::parse(slug).unwrap(),
            content: String::new(),
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_default_robots_has_sitemap() {
        let body = robots_txt(&SeoSettings::default(), "https://nexx.ru");
        assert!(body.starts_with("User-agent: *"));
        assert!(body.contains("Disallow: /api/"));
        assert!(body.ends_with("Sitemap: https://nexx.ru/sitemap.xml\n"));
    }

    #[test]
    fn test_custom_robots() {
        let seo = SeoSettings {
            robots_txt: Some("User-agent: *\nDisallow: /cart".to_owned()),
            ..SeoSettings::default()
        };
        assert_eq!(
            robots_txt(&seo, "https://nexx.ru"),
            "User-agent: *\nDisallow: /cart\n\nSitemap: https://nexx.ru/sitemap.xml\n"
        );

        let seo = SeoSettings {
            robots_txt: Some("User-agent: *\nSitemap: https://cdn.nexx.ru/map.xml\n".to_owned()),
            ..SeoSettings::default()
        };
        assert_eq!(robots_txt(&seo, "https://nexx.ru").matches("Sitemap:").count(), 1);

        let seo = SeoSettings {
            sitemap_enabled: false,
            ..SeoSettings::default()
        };
        assert!(!robots_txt(&seo, "https://nexx.ru").contains("Sitemap:"));
    }

    #[test]
    fn test_sitemap_lists_products_and_active_pages() {
        let urls = sitemap_urls(
            "https://nexx.ru",
            &[product("filtr-maslyanyy")],
            &[page("dostavka", true), page("chernovik", false)],
            Utc::now(),
        );
        assert_eq!(urls.len(), 4);

        let xml = render_sitemap(&urls).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(xml.matches("<url>").count(), 4);
        assert!(xml.contains("filtr-maslyanyy"));
        assert!(xml.contains("dostavka"));
        assert!(!xml.contains("chernovik"));
    }
}
