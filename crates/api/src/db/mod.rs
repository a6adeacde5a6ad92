//! JSON-file document store.
//!
//! # Layout
//!
//! One pretty-printed JSON document per collection inside the data directory:
//!
//! - `products.json` - Catalog
//! - `users.json` - Accounts (password hashes included)
//! - `carts.json` - Map of user id to cart lines
//! - `orders.json` - Orders with item snapshots
//! - `suppliers.json` - Supplier integrations
//! - `payment_settings.json` - One entry per payment provider
//! - `payments.json` - Payment records
//! - `pages.json` - Content pages
//! - `media.json` - Uploaded media metadata
//! - `settings.json` - Singleton settings (site, SEO, SMS, ABCP, 1C)
//! - `sync_history.json` - 1C sync runs
//!
//! Missing or empty files read as the collection's default value. Writes
//! replace the whole file through a temporary file and a rename. Each document
//! has its own async mutex, so read-modify-write sequences inside one process
//! never interleave; across processes the last write wins.

pub mod carts;
pub mod media;
pub mod orders;
pub mod pages;
pub mod payments;
pub mod products;
pub mod settings;
pub mod suppliers;
pub mod sync_history;
pub mod users;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use nexx_core::UserId;

use crate::models::{
    CartItem, MediaFile, Order, Page, Payment, PaymentSetting, Product, Settings, Supplier,
    SyncRun, User,
};

pub use carts::CartRepository;
pub use media::MediaRepository;
pub use orders::OrderRepository;
pub use pages::PageRepository;
pub use payments::PaymentRepository;
pub use products::ProductRepository;
pub use settings::SettingsRepository;
pub use suppliers::SupplierRepository;
pub use sync_history::SyncHistoryRepository;
pub use users::UserRepository;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Reading or writing a document failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Uniqueness violation (e.g., duplicate username or slug).
    #[error("{0}")]
    Conflict(String),
}

/// A single JSON document on disk, guarded by an async mutex.
pub struct Document<T> {
    path: PathBuf,
    mutex: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Document<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            mutex: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Read the current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Io` or `RepositoryError::Serialization` if the
    /// file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<T, RepositoryError> {
        let _guard = self.mutex.lock().await;
        self.read().await
    }

    /// Lock the document and read it for a multi-step modification.
    ///
    /// The lock is held until the returned guard is saved or dropped. Callers
    /// locking several documents must always lock them in the same order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn lock(&self) -> Result<Locked<'_, T>, RepositoryError> {
        let guard = self.mutex.lock().await;
        let value = self.read().await?;
        Ok(Locked {
            doc: self,
            _guard: guard,
            value,
        })
    }

    /// Run `f` on the current value and persist the result.
    ///
    /// Nothing is written when `f` returns an error.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a storage error from reading or writing.
    pub async fn update<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let mut locked = self.lock().await?;
        let result = f(&mut *locked)?;
        locked.save().await?;
        Ok(result)
    }

    /// Write the default value if the file does not exist yet.
    async fn ensure_exists(&self) -> Result<(), RepositoryError> {
        let _guard = self.mutex.lock().await;
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        self.write(&T::default()).await
    }

    async fn read(&self) -> Result<T, RepositoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, value: &T) -> Result<(), RepositoryError> {
        let mut json = serde_json::to_vec_pretty(value)?;
        json.push(b'\n');

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// A locked, loaded document. Changes are persisted by [`Locked::save`].
pub struct Locked<'a, T>
where
    T: Default + Serialize + DeserializeOwned,
{
    doc: &'a Document<T>,
    _guard: MutexGuard<'a, ()>,
    value: T,
}

impl<T> Locked<'_, T>
where
    T: Default + Serialize + DeserializeOwned,
{
    /// Write the value back and release the lock.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub async fn save(self) -> Result<(), RepositoryError> {
        self.doc.write(&self.value).await
    }

    /// Write the value back and keep holding the lock.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be written.
    pub async fn persist(&self) -> Result<(), RepositoryError> {
        self.doc.write(&self.value).await
    }
}

impl<T> Deref for Locked<'_, T>
where
    T: Default + Serialize + DeserializeOwned,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Locked<'_, T>
where
    T: Default + Serialize + DeserializeOwned,
{
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Handle to the data directory and all of its documents.
///
/// Cheaply cloneable; all clones share the same per-document locks.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    dir: PathBuf,
    products: Document<Vec<Product>>,
    users: Document<Vec<User>>,
    carts: Document<BTreeMap<UserId, Vec<CartItem>>>,
    orders: Document<Vec<Order>>,
    suppliers: Document<Vec<Supplier>>,
    payment_settings: Document<Vec<PaymentSetting>>,
    payments: Document<Vec<Payment>>,
    pages: Document<Vec<Page>>,
    media: Document<Vec<MediaFile>>,
    settings: Document<Settings>,
    sync_history: Document<Vec<SyncRun>>,
}

impl Database {
    /// Open (and if needed create) the data directory.
    ///
    /// Every collection file that does not exist yet is created with its
    /// default value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Io` if the directory or a file cannot be
    /// created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let doc = |name: &str| dir.join(format!("{name}.json"));
        let inner = DatabaseInner {
            products: Document::new(doc("products")),
            users: Document::new(doc("users")),
            carts: Document::new(doc("carts")),
            orders: Document::new(doc("orders")),
            suppliers: Document::new(doc("suppliers")),
            payment_settings: Document::new(doc("payment_settings")),
            payments: Document::new(doc("payments")),
            pages: Document::new(doc("pages")),
            media: Document::new(doc("media")),
            settings: Document::new(doc("settings")),
            sync_history: Document::new(doc("sync_history")),
            dir,
        };

        inner.products.ensure_exists().await?;
        inner.users.ensure_exists().await?;
        inner.carts.ensure_exists().await?;
        inner.orders.ensure_exists().await?;
        inner.suppliers.ensure_exists().await?;
        inner.payment_settings.ensure_exists().await?;
        inner.payments.ensure_exists().await?;
        inner.pages.ensure_exists().await?;
        inner.media.ensure_exists().await?;
        inner.settings.ensure_exists().await?;
        inner.sync_history.ensure_exists().await?;

        tracing::debug!(dir = %inner.dir.display(), "Data directory opened");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// The data directory this handle was opened on.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Check that the data directory is still readable.
    pub async fn is_ready(&self) -> bool {
        tokio::fs::read_dir(&self.inner.dir).await.is_ok()
    }

    pub(crate) fn products(&self) -> &Document<Vec<Product>> {
        &self.inner.products
    }

    pub(crate) fn users(&self) -> &Document<Vec<User>> {
        &self.inner.users
    }

    pub(crate) fn carts(&self) -> &Document<BTreeMap<UserId, Vec<CartItem>>> {
        &self.inner.carts
    }

    pub(crate) fn orders(&self) -> &Document<Vec<Order>> {
        &self.inner.orders
    }

    pub(crate) fn suppliers(&self) -> &Document<Vec<Supplier>> {
        &self.inner.suppliers
    }

    pub(crate) fn payment_settings(&self) -> &Document<Vec<PaymentSetting>> {
        &self.inner.payment_settings
    }

    pub(crate) fn payments(&self) -> &Document<Vec<Payment>> {
        &self.inner.payments
    }

    pub(crate) fn pages(&self) -> &Document<Vec<Page>> {
        &self.inner.pages
    }

    pub(crate) fn media(&self) -> &Document<Vec<MediaFile>> {
        &self.inner.media
    }

    pub(crate) fn settings(&self) -> &Document<Settings> {
        &self.inner.settings
    }

    pub(crate) fn sync_history(&self) -> &Document<Vec<SyncRun>> {
        &self.inner.sync_history
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("data")).await.unwrap();

        for name in ["products", "users", "carts", "settings", "sync_history"] {
            let path = db.dir().join(format!("{name}.json"));
            assert!(path.exists(), "{name}.json missing");
        }
        assert!(db.is_ready().await);
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("orders.json"), "  \n").unwrap();

        let db = Database::open(dir.path()).await.unwrap();
        assert!(db.orders().load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let doc: Document<Vec<u32>> = Document::new(dir.path().join("numbers.json"));

        doc.update(|v| {
            v.push(1);
            Ok(())
        })
        .await
        .unwrap();

        let err = doc
            .update(|v| {
                v.push(2);
                Err::<(), _>(RepositoryError::Conflict("nope".to_owned()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(doc.load().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_write_is_pretty_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.json");
        let doc: Document<Vec<u32>> = Document::new(path.clone());

        doc.update(|v| {
            v.extend([1, 2]);
            Ok(())
        })
        .await
        .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  1"));
        assert!(!dir.path().join("numbers.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.json");
        std::fs::write(&path, "{not json").unwrap();
        let doc: Document<Vec<u32>> = Document::new(path);

        assert!(matches!(
            doc.load().await.unwrap_err(),
            RepositoryError::Serialization(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let doc: Arc<Document<Vec<u32>>> =
            Arc::new(Document::new(dir.path().join("numbers.json")));

        let mut handles = Vec::new();
        for i in 0..20 {
            let doc = Arc::clone(&doc);
            handles.push(tokio::spawn(async move {
                doc.update(|v| {
                    v.push(i);
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(doc.load().await.unwrap().len(), 20);
    }
}
