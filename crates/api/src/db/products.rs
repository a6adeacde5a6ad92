//! Product repository.

use std::collections::BTreeMap;

use chrono::Utc;

use nexx_core::{ProductId, Slug};

use super::{Database, RepositoryError};
use crate::models::{
    CatalogFacets, FacetCount, NewProduct, Product, ProductFilter, ProductSort, ProductUpdate,
};

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    db: &'a Database,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All products in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        self.db.products().load().await
    }

    /// Filtered and sorted catalog listing.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let products = self.all().await?;
        Ok(apply_filter(products, filter))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|p| p.id == id))
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .find(|p| p.slug.as_str() == slug))
    }

    /// Create a product.
    ///
    /// Without an explicit slug one is generated from the name and made unique
    /// with a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an explicit slug is taken.
    pub async fn create(&self, input: NewProduct) -> Result<Product, RepositoryError> {
        self.db
            .products()
            .update(move |products| {
                let slug = match input.slug {
                    Some(slug) => {
                        ensure_slug_free(products, &slug, None)?;
                        slug
                    }
                    None => unique_slug(products, &input.name),
                };

                let mut product = Product {
                    id: ProductId::generate(),
                    name: input.name,
                    description: input.description,
                    part_number: input.part_number,
                    brand: input.brand,
                    category: input.category,
                    price: input.price,
                    image_url: input.image_url,
                    slug,
                    stock_quantity: input.stock_quantity,
                    in_stock: false,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                product.refresh_stock_flag();
                products.push(product.clone());
                Ok(product)
            })
            .await
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        changes: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        self.db
            .products()
            .update(move |products| {
                if let Some(slug) = &changes.slug {
                    ensure_slug_free(products, slug, Some(id))?;
                }

                let product = products
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(RepositoryError::NotFound)?;

                if let Some(name) = changes.name {
                    product.name = name;
                }
                if let Some(description) = changes.description {
                    product.description = Some(description);
                }
                if let Some(part_number) = changes.part_number {
                    product.part_number = part_number;
                }
                if let Some(brand) = changes.brand {
                    product.brand = brand;
                }
                if let Some(category) = changes.category {
                    product.category = category;
                }
                if let Some(price) = changes.price {
                    product.price = price;
                }
                if let Some(image_url) = changes.image_url {
                    product.image_url = Some(image_url);
                }
                if let Some(slug) = changes.slug {
                    product.slug = slug;
                }
                if let Some(stock) = changes.stock_quantity {
                    product.stock_quantity = stock;
                }
                product.refresh_stock_flag();
                product.updated_at = Some(Utc::now());

                Ok(product.clone())
            })
            .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.db
            .products()
            .update(|products| {
                let before = products.len();
                products.retain(|p| p.id != id);
                if products.len() == before {
                    return Err(RepositoryError::NotFound);
                }
                Ok(())
            })
            .await
    }

    /// Insert products as-is, skipping slugs that already exist.
    ///
    /// Returns how many were inserted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn insert_many(&self, new: Vec<Product>) -> Result<usize, RepositoryError> {
        self.db
            .products()
            .update(|products| {
                let mut inserted = 0;
                for mut product in new {
                    if products.iter().any(|p| p.slug == product.slug) {
                        continue;
                    }
                    product.refresh_stock_flag();
                    products.push(product);
                    inserted += 1;
                }
                Ok(inserted)
            })
            .await
    }

    /// Brand and category facets with product counts, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn facets(&self) -> Result<CatalogFacets, RepositoryError> {
        let products = self.all().await?;
        Ok(CatalogFacets {
            brands: count_by(&products, |p| &p.brand),
            categories: count_by(&products, |p| &p.category),
        })
    }
}

fn ensure_slug_free(
    products: &[Product],
    slug: &Slug,
    except: Option<ProductId>,
) -> Result<(), RepositoryError> {
    if products
        .iter()
        .any(|p| &p.slug == slug && Some(p.id) != except)
    {
        return Err(RepositoryError::Conflict(format!(
            "product with slug '{slug}' already exists"
        )));
    }
    Ok(())
}

fn unique_slug(products: &[Product], name: &str) -> Slug {
    let base = Slug::from_title(name);
    let taken = |slug: &Slug| products.iter().any(|p| &p.slug == slug);
    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = base.with_suffix(n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Count products per value, grouped case-insensitively like the list
/// filter. A facet shows the first spelling seen.
fn count_by(products: &[Product], key: impl Fn(&Product) -> &String) -> Vec<FacetCount> {
    let mut counts: BTreeMap<String, FacetCount> = BTreeMap::new();
    for product in products {
        let value = key(product).trim();
        if value.is_empty() {
            continue;
        }
        counts
            .entry(value.to_lowercase())
            .or_insert_with(|| FacetCount {
                value: value.to_owned(),
                count: 0,
            })
            .count += 1;
    }
    counts.into_values().collect()
}

/// Filter and sort a product list according to catalog query parameters.
fn apply_filter(products: Vec<Product>, filter: &ProductFilter) -> Vec<Product> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let eq = |wanted: Option<&String>, actual: &str| {
        wanted.is_none_or(|w| w.trim().to_lowercase() == actual.trim().to_lowercase())
    };

    let mut out: Vec<Product> = products
        .into_iter()
        .filter(|p| eq(filter.brand.as_ref(), &p.brand))
        .filter(|p| eq(filter.category.as_ref(), &p.category))
        .filter(|p| filter.in_stock.is_none_or(|wanted| p.in_stock == wanted))
        .filter(|p| needle.as_deref().is_none_or(|n| p.matches_search(n)))
        .collect();

    match filter.sort {
        Some(ProductSort::PriceAsc) => out.sort_by(|a, b| a.price.cmp(&b.price)),
        Some(ProductSort::PriceDesc) => out.sort_by(|a, b| b.price.cmp(&a.price)),
        Some(ProductSort::Name) => out.sort_by_key(|p| p.name.to_lowercase()),
        Some(ProductSort::Newest) => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        None => {}
    }
    out
}
