//! Data directory setup and the demo catalog.
//!
//! Seeding is idempotent: products whose slug already exists are skipped, so
//! running `init --seed` twice leaves a single copy of each part.

use std::path::Path;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use nexx_api::db::{Database, ProductRepository, RepositoryError};
use nexx_api::models::Product;
use nexx_core::{ProductId, Slug, SlugError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Data directory error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Invalid demo slug: {0}")]
    Slug(#[from] SlugError),
}

/// One demo catalog entry.
struct DemoPart {
    name: &'static str,
    description: &'static str,
    part_number: &'static str,
    category: &'static str,
    price: i64,
    image: &'static str,
    slug: &'static str,
    stock: u32,
}

const DEMO_PARTS: [DemoPart; 5] = [
    DemoPart {
        name: "Фильтр гидравлический JCB 32/925994",
        description: "Оригинальный гидравлический фильтр для экскаваторов JCB. Высокое качество, длительный срок службы.",
        part_number: "32/925994",
        category: "Гидравлика",
        price: 8500,
        image: "/images/hydraulic-filter.jpg",
        slug: "filtr-gidravlicheskij-jcb-32-925994",
        stock: 15,
    },
    DemoPart {
        name: "Тормозные колодки передние JCB 15/920200",
        description: "Высококачественные тормозные колодки для спецтехники JCB. Обеспечивают надежное торможение.",
        part_number: "15/920200",
        category: "Тормозная система",
        price: 12_500,
        image: "/images/brake-pads.jpg",
        slug: "tormoznye-kolodki-jcb-15-920200",
        stock: 8,
    },
    DemoPart {
        name: "Масляный фильтр двигателя JCB 02/100284",
        description: "Оригинальный масляный фильтр для двигателей JCB. Обеспечивает чистоту масла и продлевает срок службы двигателя.",
        part_number: "02/100284",
        category: "Двигатель",
        price: 1200,
        image: "/images/oil-filter.jpg",
        slug: "maslyanyj-filtr-jcb-02-100284",
        stock: 25,
    },
    DemoPart {
        name: "Коленвал JCB 320/03336",
        description: "Коленчатый вал для двигателей JCB. Высокое качество изготовления, точное соответствие оригинальным спецификациям.",
        part_number: "320/03336",
        category: "Двигатель",
        price: 95_000,
        image: "/images/crankshaft.jpg",
        slug: "kolenval-jcb-320-03336",
        stock: 3,
    },
    DemoPart {
        name: "Гидронасос основной JCB 20/925592",
        description: "Основной гидравлический насос для экскаваторов JCB. Обеспечивает стабильную работу гидросистемы.",
        part_number: "20/925592",
        category: "Гидравлика",
        price: 185_000,
        image: "/images/hydraulic-pump.jpg",
        slug: "gidronasos-osnovnoj-jcb-20-925592",
        stock: 2,
    },
];

/// Create the data directory and every collection file.
///
/// # Errors
///
/// Returns an error if the directory or a collection file cannot be created.
pub async fn init(data_dir: &Path) -> Result<Database, SeedError> {
    let db = Database::open(data_dir).await?;
    info!(dir = %data_dir.display(), "Data directory ready");
    Ok(db)
}

/// Load the demo JCB catalog.
///
/// # Returns
///
/// How many products were inserted.
///
/// # Errors
///
/// Returns an error if the catalog cannot be written.
pub async fn demo_catalog(db: &Database) -> Result<usize, SeedError> {
    let now = Utc::now();
    let products = DEMO_PARTS
        .iter()
        .map(|part| {
            Ok(Product {
                id: ProductId::generate(),
                name: part.name.to_owned(),
                description: Some(part.description.to_owned()),
                part_number: part.part_number.to_owned(),
                brand: "JCB".to_owned(),
                category: part.category.to_owned(),
                price: Decimal::new(part.price, 0),
                image_url: Some(part.image.to_owned()),
                slug: Slug::parse(part.slug)?,
                stock_quantity: part.stock,
                in_stock: part.stock > 0,
                created_at: now,
                updated_at: None,
            })
        })
        .collect::<Result<Vec<_>, SeedError>>()?;

    let inserted = ProductRepository::new(db).insert_many(products).await?;
    info!(
        inserted,
        skipped = DEMO_PARTS.len() - inserted,
        "Demo catalog seeded"
    );
    Ok(inserted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_catalog_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = init(&dir.path().join("data")).await.unwrap();

        assert_eq!(demo_catalog(&db).await.unwrap(), 5);
        assert_eq!(demo_catalog(&db).await.unwrap(), 0);

        let products = ProductRepository::new(&db).all().await.unwrap();
        assert_eq!(products.len(), 5);
        assert!(products.iter().all(|p| p.brand == "JCB" && p.in_stock));
    }

    #[tokio::test]
    async fn test_demo_slugs_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let db = init(dir.path()).await.unwrap();
        demo_catalog(&db).await.unwrap();

        let pump = ProductRepository::new(&db)
            .get_by_slug("gidronasos-osnovnoj-jcb-20-925592")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pump.price, Decimal::new(185_000, 0));
        assert_eq!(pump.stock_quantity, 2);
    }
}
