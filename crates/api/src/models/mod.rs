//! Domain models.
//!
//! Stored records, request bodies and response views. Stored records derive
//! both `Serialize` and `Deserialize`; request-only types derive
//! `Deserialize`, response-only types `Serialize`.

pub mod analytics;
pub mod cart;
pub mod order;
pub mod page;
pub mod payment;
pub mod product;
pub mod session;
pub mod settings;
pub mod supplier;
pub mod user;

pub use analytics::Dashboard;
pub use cart::{Cart, CartItem};
pub use order::{NewOrder, Order, OrderItem};
pub use page::{MediaFile, NewPage, Page, PageUpdate, RenderedPage};
pub use payment::{NewPayment, Payment, PaymentProvider, PaymentSetting};
pub use product::{
    CatalogFacets, FacetCount, NewProduct, Product, ProductFilter, ProductSort, ProductUpdate,
};
pub use session::{CurrentUser, keys as session_keys};
pub use settings::{
    AbcpSettings, OneCSettings, SeoSettings, Settings, SiteSettings, SmsSettings, SyncResults,
    SyncRun, SyncType,
};
pub use supplier::{Supplier, SupplierInput, SupplierOffer};
pub use user::{NewUser, User, UserChanges, UserDetails, UserFilter, UserProfile};

/// Placeholder returned instead of any stored secret.
pub const MASK: &str = "***";
